//! JSON-RPC 2.0 wire types shared by the transport and the dispatcher.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Client-supplied correlation token.
///
/// JSON-RPC allows either a string or an integer; both are kept verbatim so
/// the Response echoes exactly what the client sent.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    Number(i64),
    String(String),
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{}", n),
            Self::String(s) => f.write_str(s),
        }
    }
}

impl From<i64> for RequestId {
    fn from(value: i64) -> Self {
        Self::Number(value)
    }
}

impl From<&str> for RequestId {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

/// Error codes carried in error Responses.
///
/// Serialized as the JSON-RPC integer code; the variant name is also
/// attached as `data.kind` so clients can match on it without a code table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "i32", try_from = "i32")]
pub enum ErrorCode {
    ParseError,
    ProtocolError,
    MethodNotFound,
    InvalidParams,
    ToolError,
    SessionNotFound,
    UnknownTool,
    SessionBusy,
}

impl ErrorCode {
    /// Numeric JSON-RPC code.
    pub fn code(self) -> i32 {
        match self {
            Self::ParseError => -32700,
            Self::ProtocolError => -32600,
            Self::MethodNotFound => -32601,
            Self::InvalidParams => -32602,
            Self::ToolError => -32603,
            Self::SessionNotFound => -32001,
            Self::UnknownTool => -32002,
            Self::SessionBusy => -32003,
        }
    }

    /// Symbolic name, used as `data.kind`.
    pub fn kind(self) -> &'static str {
        match self {
            Self::ParseError => "ParseError",
            Self::ProtocolError => "ProtocolError",
            Self::MethodNotFound => "MethodNotFound",
            Self::InvalidParams => "InvalidParams",
            Self::ToolError => "ToolError",
            Self::SessionNotFound => "SessionNotFound",
            Self::UnknownTool => "UnknownTool",
            Self::SessionBusy => "SessionBusy",
        }
    }
}

impl From<ErrorCode> for i32 {
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

impl TryFrom<i32> for ErrorCode {
    type Error = String;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        let code = match value {
            -32700 => Self::ParseError,
            -32600 => Self::ProtocolError,
            -32601 => Self::MethodNotFound,
            -32602 => Self::InvalidParams,
            -32603 => Self::ToolError,
            -32001 => Self::SessionNotFound,
            -32002 => Self::UnknownTool,
            -32003 => Self::SessionBusy,
            other => return Err(format!("unknown error code {}", other)),
        };
        Ok(code)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.kind(), self.code())
    }
}

/// JSON-RPC error object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcError {
    /// Create an error object tagged with the code's symbolic kind.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: Some(json!({ "kind": code.kind() })),
        }
    }
}

/// JSON-RPC response envelope. Exactly one of `result` / `error` is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    pub id: RequestId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    /// Create a success response.
    pub fn success(id: RequestId, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Create an error response.
    pub fn failure(id: RequestId, code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(JsonRpcError::new(code, message)),
        }
    }

    /// Method not found error.
    pub fn method_not_found(id: RequestId, method: &str) -> Self {
        Self::failure(id, ErrorCode::MethodNotFound, format!("Method not found: {}", method))
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Error code, if this is an error response.
    pub fn error_code(&self) -> Option<ErrorCode> {
        self.error.as_ref().map(|e| e.code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_serializes_as_integer() {
        let response = JsonRpcResponse::failure(RequestId::from(7), ErrorCode::ToolError, "boom");
        let value = serde_json::to_value(&response).unwrap();

        assert_eq!(value["jsonrpc"], "2.0");
        assert_eq!(value["id"], 7);
        assert_eq!(value["error"]["code"], -32603);
        assert_eq!(value["error"]["data"]["kind"], "ToolError");
        assert!(value.get("result").is_none());
    }

    #[test]
    fn test_error_code_parses_back() {
        let raw = r#"{"jsonrpc":"2.0","id":"a","error":{"code":-32002,"message":"nope"}}"#;
        let response: JsonRpcResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(response.id, RequestId::from("a"));
        assert_eq!(response.error_code(), Some(ErrorCode::UnknownTool));
    }

    #[test]
    fn test_unknown_error_code_rejected() {
        let raw = r#"{"code":-1,"message":"?"}"#;
        assert!(serde_json::from_str::<JsonRpcError>(raw).is_err());
    }

    #[test]
    fn test_request_id_display() {
        assert_eq!(RequestId::from(42).to_string(), "42");
        assert_eq!(RequestId::from("req-1").to_string(), "req-1");
    }
}
