//! Transport layer for the MCP server.
//!
//! A single transport is provided: Server-Sent Events for server → client
//! traffic and HTTP POST for client → server requests, both served by axum.

pub(crate) mod config;
mod error;
mod service;
pub mod sse;

pub use config::TransportConfig;
pub use error::{TransportError, TransportResult};
pub use service::TransportService;
pub use sse::{ApiError, SseTransport};
