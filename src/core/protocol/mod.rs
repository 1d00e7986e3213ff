//! Wire protocol: JSON-RPC 2.0 envelopes and the inbound message model.

mod jsonrpc;
mod message;

pub use jsonrpc::{ErrorCode, JsonRpcError, JsonRpcResponse, RequestId};
pub use message::{
    Inbound, Params, ParsedMessage, ProtocolError, Request, RequestBody, ResultFormat, ToolCall,
    parse_message,
};

/// MCP protocol revision announced in `initialize`.
pub const PROTOCOL_VERSION: &str = "2024-11-05";
