//! Inbound message model and the POST body parser.
//!
//! Two body shapes are understood:
//!
//! - the compact call `{"requestId", "toolName", "params"}`
//! - a JSON-RPC 2.0 envelope carrying the MCP methods `initialize`, `ping`,
//!   `tools/list`, `tools/call` and `notifications/*`

use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;

use super::jsonrpc::{ErrorCode, RequestId};
use crate::core::session::SessionId;

/// JSON object used for tool parameters.
pub type Params = Map<String, Value>;

/// Errors raised while parsing a POSTed message. Always answered on the
/// POST itself, never on the stream.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The body was not valid JSON.
    #[error("Invalid JSON: {0}")]
    InvalidJson(String),

    /// The body was valid JSON but not an acceptable message.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// No session id in the query, header or body.
    #[error("Missing session id")]
    MissingSessionId,
}

impl ProtocolError {
    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::InvalidRequest(msg.into())
    }

    /// Wire code reported to the client.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidJson(_) => ErrorCode::ParseError,
            _ => ErrorCode::ProtocolError,
        }
    }
}

/// How a tool's result is placed into the Response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultFormat {
    /// The tool's JSON value is the Response result.
    Raw,
    /// MCP `tools/call` shape: a text content block holding the JSON.
    McpContent,
}

/// A resolved tool invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCall {
    pub tool_name: String,
    pub params: Params,
    pub format: ResultFormat,
}

/// What a Request asks the server to do.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Initialize,
    Ping,
    ListTools,
    CallTool(ToolCall),
    /// A method this server does not implement; answered with `MethodNotFound`.
    Unknown { method: String },
}

/// A Request accepted onto a session's inbound queue.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub session_id: SessionId,
    pub request_id: RequestId,
    pub body: RequestBody,
}

impl Request {
    /// Tool name if this is a tool call.
    pub fn tool_name(&self) -> Option<&str> {
        match &self.body {
            RequestBody::CallTool(call) => Some(&call.tool_name),
            _ => None,
        }
    }
}

/// Parsed POST body, before it is bound to a session.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    Request { id: RequestId, body: RequestBody },
    /// JSON-RPC message without an id. Acknowledged, never answered.
    Notification { method: String },
}

/// Result of [`parse_message`].
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedMessage {
    /// `sessionId` found in the body, if any.
    pub session_hint: Option<String>,
    pub inbound: Inbound,
}

impl ParsedMessage {
    /// Bind a parsed request to its session.
    pub fn into_request(self, session_id: SessionId) -> Option<Request> {
        match self.inbound {
            Inbound::Request { id, body } => Some(Request {
                session_id,
                request_id: id,
                body,
            }),
            Inbound::Notification { .. } => None,
        }
    }
}

#[derive(Deserialize)]
struct RpcEnvelope {
    jsonrpc: String,
    #[serde(default)]
    id: Option<RequestId>,
    method: String,
    #[serde(default)]
    params: Option<Value>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CompactCall {
    request_id: RequestId,
    tool_name: String,
    #[serde(default)]
    params: Option<Params>,
}

#[derive(Deserialize)]
struct CallToolParams {
    name: String,
    #[serde(default)]
    arguments: Option<Params>,
}

/// Parse a POST body into an [`Inbound`] message.
pub fn parse_message(body: &[u8]) -> Result<ParsedMessage, ProtocolError> {
    let value: Value =
        serde_json::from_slice(body).map_err(|e| ProtocolError::InvalidJson(e.to_string()))?;

    let Value::Object(mut object) = value else {
        return Err(ProtocolError::invalid_request("message must be a JSON object"));
    };

    let session_hint = match object.remove("sessionId") {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s),
        Some(_) => return Err(ProtocolError::invalid_request("sessionId must be a string")),
    };

    let inbound = if object.contains_key("method") {
        parse_rpc(object)?
    } else if object.contains_key("toolName") {
        parse_compact(object)?
    } else {
        return Err(ProtocolError::invalid_request(
            "expected a JSON-RPC `method` or a `toolName`",
        ));
    };

    Ok(ParsedMessage {
        session_hint,
        inbound,
    })
}

fn parse_compact(object: Params) -> Result<Inbound, ProtocolError> {
    let call: CompactCall = serde_json::from_value(Value::Object(object))
        .map_err(|e| ProtocolError::invalid_request(e.to_string()))?;

    Ok(Inbound::Request {
        id: call.request_id,
        body: RequestBody::CallTool(ToolCall {
            tool_name: call.tool_name,
            params: call.params.unwrap_or_default(),
            format: ResultFormat::Raw,
        }),
    })
}

fn parse_rpc(object: Params) -> Result<Inbound, ProtocolError> {
    let envelope: RpcEnvelope = serde_json::from_value(Value::Object(object))
        .map_err(|e| ProtocolError::invalid_request(e.to_string()))?;

    if envelope.jsonrpc != "2.0" {
        return Err(ProtocolError::invalid_request("jsonrpc must be '2.0'"));
    }

    let Some(id) = envelope.id else {
        return Ok(Inbound::Notification {
            method: envelope.method,
        });
    };

    let body = match envelope.method.as_str() {
        "initialize" => RequestBody::Initialize,
        "ping" => RequestBody::Ping,
        "tools/list" => RequestBody::ListTools,
        "tools/call" => {
            let params = envelope
                .params
                .ok_or_else(|| ProtocolError::invalid_request("tools/call requires params"))?;
            let params: CallToolParams = serde_json::from_value(params)
                .map_err(|e| ProtocolError::invalid_request(e.to_string()))?;
            RequestBody::CallTool(ToolCall {
                tool_name: params.name,
                params: params.arguments.unwrap_or_default(),
                format: ResultFormat::McpContent,
            })
        }
        other => RequestBody::Unknown {
            method: other.to_string(),
        },
    };

    Ok(Inbound::Request { id, body })
}
