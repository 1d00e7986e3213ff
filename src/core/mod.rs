//! Core module containing shared infrastructure components.
//!
//! This module provides the foundational building blocks for the MCP server:
//! configuration, error handling, the wire protocol, sessions, request
//! dispatch, server assembly and the SSE transport.

pub mod config;
pub mod dispatch;
pub mod error;
pub mod protocol;
pub mod server;
pub mod session;
pub mod transport;

pub use config::Config;
pub use dispatch::{DispatchPolicy, Dispatcher};
pub use error::{Error, Result};
pub use server::McpServer;
pub use session::{SessionId, SessionManager};
pub use transport::{SseTransport, TransportConfig, TransportService};
