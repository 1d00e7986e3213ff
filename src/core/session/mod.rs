//! Per-client SSE sessions.
//!
//! A session pairs one open event stream with the POSTed requests that
//! target it. The [`SessionManager`] owns every live [`Session`]; the stream
//! side and the dispatcher only keep a `Weak` handle or the session id.
//!
//! Lifecycle: `Connecting` → `Open` (endpoint frame written) → `Closing`
//! (client gone, server shutdown or explicit close) → `Closed` (stream
//! released).

mod channel;
mod handle;
mod manager;

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::protocol::{ErrorCode, JsonRpcResponse, RequestId};

pub use channel::{ChannelReceivers, MessageChannel};
pub use handle::Session;
pub use manager::SessionManager;

/// Opaque session token handed to the client in the endpoint frame.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Mint a fresh random id (UUID v4, simple hex form).
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for SessionId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for SessionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Session lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Connecting,
    Open,
    Closing,
    Closed,
}

impl SessionState {
    /// Whether new inbound requests are accepted.
    pub fn is_accepting(self) -> bool {
        matches!(self, Self::Open)
    }

    pub fn is_terminating(self) -> bool {
        matches!(self, Self::Closing | Self::Closed)
    }
}

/// Outbound stream item.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// Session-established control frame carrying the POST endpoint.
    Endpoint { uri: String },
    /// A Response to a previously accepted Request.
    Message(JsonRpcResponse),
    /// Last frame of the stream.
    Close { reason: String },
}

impl Event {
    pub fn is_close(&self) -> bool {
        matches!(self, Self::Close { .. })
    }
}

/// Errors raised by session lookup, submission and delivery.
#[derive(Debug, Error)]
pub enum SessionError {
    /// No live session with this id.
    #[error("Could not find session {0}")]
    NotFound(SessionId),

    /// The session is closing or closed.
    #[error("Session {0} is closed")]
    Closed(SessionId),

    /// The session's inbound queue is full.
    #[error("Session {0} is busy, retry later")]
    Busy(SessionId),

    /// A request with this id is still being processed.
    #[error("Request id {0} is already in flight")]
    DuplicateRequest(RequestId),
}

impl SessionError {
    /// Wire code reported to the client.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::NotFound(_) | Self::Closed(_) => ErrorCode::SessionNotFound,
            Self::Busy(_) => ErrorCode::SessionBusy,
            Self::DuplicateRequest(_) => ErrorCode::ProtocolError,
        }
    }
}
