//! Tool-specific error types.

use thiserror::Error;

use crate::core::protocol::ErrorCode;

/// Errors that can occur during tool operations.
#[derive(Debug, Error)]
pub enum ToolError {
    /// The requested tool was not found.
    #[error("Unknown tool: {0}")]
    NotFound(String),

    /// A tool with this name is already registered.
    #[error("Tool already registered: {0}")]
    Duplicate(String),

    /// Invalid arguments were provided to the tool.
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    /// The tool execution failed.
    #[error("Execution failed: {0}")]
    ExecutionFailed(String),

    /// The tool timed out during execution.
    #[error("Tool execution timed out after {0}s")]
    Timeout(u64),

    /// The tool panicked or its task was cancelled.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ToolError {
    /// Create a new "not found" error.
    pub fn not_found(name: impl Into<String>) -> Self {
        Self::NotFound(name.into())
    }

    /// Create a new "invalid arguments" error.
    pub fn invalid_arguments(msg: impl Into<String>) -> Self {
        Self::InvalidArguments(msg.into())
    }

    /// Create a new "execution failed" error.
    pub fn execution_failed(msg: impl Into<String>) -> Self {
        Self::ExecutionFailed(msg.into())
    }

    /// Create a new "internal" error.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Wire code for the error Response.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::NotFound(_) => ErrorCode::UnknownTool,
            Self::InvalidArguments(_) => ErrorCode::InvalidParams,
            Self::Duplicate(_) | Self::ExecutionFailed(_) | Self::Timeout(_) | Self::Internal(_) => {
                ErrorCode::ToolError
            }
        }
    }
}
