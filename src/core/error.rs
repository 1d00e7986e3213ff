//! Error types and handling for the MCP server.
//!
//! This module defines a unified error type that can represent errors from
//! the startup path: building the tool registry, parsing configuration and
//! running the transport. Per-request failures never reach it; they are
//! answered on the POST or as error Responses on the stream.

use thiserror::Error;

/// A specialized Result type for MCP server operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for the MCP server.
#[derive(Debug, Error)]
pub enum Error {
    /// Error originating from the tools domain.
    #[error("Tool error: {0}")]
    Tool(#[from] crate::domains::tools::ToolError),

    /// Error from the HTTP/SSE transport.
    #[error("Transport error: {0}")]
    Transport(#[from] crate::core::transport::TransportError),

    /// Configuration-related errors.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Create a new configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}
