//! Request dispatch.
//!
//! One dispatcher task per session drains the inbound queue, resolves each
//! request against the [`ToolRegistry`] and delivers exactly one Response
//! per request onto the session's outbound queue.

use std::sync::{Arc, Weak};
use std::time::Duration;

use serde::Serialize;
use serde_json::{Value, json};
use tokio::sync::{Semaphore, mpsc};
use tokio::task::JoinHandle;
use tracing::{Instrument, debug, info, info_span, warn};

use super::config::{Config, ServerConfig};
use super::protocol::{
    JsonRpcResponse, PROTOCOL_VERSION, Params, Request, RequestBody, RequestId, ResultFormat,
    ToolCall,
};
use super::session::{Event, Session};
use crate::domains::tools::{ToolError, ToolRegistry};

/// Execution policy for requests from a single session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum DispatchPolicy {
    /// One request at a time; Responses come back in submission order.
    #[default]
    Sequential,
    /// Up to `max_in_flight` requests at once; Responses in completion order.
    Concurrent { max_in_flight: usize },
}

impl DispatchPolicy {
    pub const DEFAULT_MAX_IN_FLIGHT: usize = 8;

    /// Policy from its `MCP_DISPATCH_MODE` name.
    pub fn from_mode(mode: &str, max_in_flight: usize) -> Option<Self> {
        match mode.to_lowercase().as_str() {
            "sequential" => Some(Self::Sequential),
            "concurrent" => Some(Self::Concurrent {
                max_in_flight: max_in_flight.max(1),
            }),
            _ => None,
        }
    }
}

/// Routes requests to tools and turns outcomes into Responses.
#[derive(Debug)]
pub struct Dispatcher {
    registry: Arc<ToolRegistry>,
    policy: DispatchPolicy,
    tool_timeout: Duration,
    server: ServerConfig,
}

impl Dispatcher {
    pub fn new(registry: Arc<ToolRegistry>, config: &Config) -> Self {
        Self {
            registry,
            policy: config.dispatch.policy,
            tool_timeout: config.dispatch.tool_timeout(),
            server: config.server.clone(),
        }
    }

    pub fn with_policy(mut self, policy: DispatchPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_tool_timeout(mut self, timeout: Duration) -> Self {
        self.tool_timeout = timeout;
        self
    }

    pub fn policy(&self) -> DispatchPolicy {
        self.policy
    }

    /// Start draining a session's inbound queue.
    ///
    /// The task holds the session weakly and ends once the session is gone
    /// and its queue is drained.
    pub fn spawn(
        self: &Arc<Self>,
        session: Weak<Session>,
        inbound: mpsc::Receiver<Request>,
    ) -> JoinHandle<()> {
        let span = match session.upgrade() {
            Some(s) => info_span!("dispatch", session = %s.id()),
            None => info_span!("dispatch"),
        };
        tokio::spawn(Arc::clone(self).run(session, inbound).instrument(span))
    }

    async fn run(self: Arc<Self>, session: Weak<Session>, mut inbound: mpsc::Receiver<Request>) {
        let limiter = match self.policy {
            DispatchPolicy::Sequential => None,
            DispatchPolicy::Concurrent { max_in_flight } => {
                Some(Arc::new(Semaphore::new(max_in_flight.max(1))))
            }
        };

        while let Some(request) = inbound.recv().await {
            if session.upgrade().is_none() {
                inbound.close();
            }
            match &limiter {
                None => self.serve(&session, request).await,
                Some(limiter) => {
                    let Ok(permit) = Arc::clone(limiter).acquire_owned().await else {
                        break;
                    };
                    let this = Arc::clone(&self);
                    let session = session.clone();
                    tokio::spawn(
                        async move {
                            this.serve(&session, request).await;
                            drop(permit);
                        }
                        .in_current_span(),
                    );
                }
            }
        }

        debug!("Inbound queue closed, dispatcher stopping");
    }

    async fn serve(&self, session: &Weak<Session>, request: Request) {
        let request_id = request.request_id.clone();
        let session_id = request.session_id.clone();

        // Queued requests of a closing session are dropped unrun.
        let live = session
            .upgrade()
            .filter(|s| !s.state().is_terminating())
            .is_some();
        if !live {
            debug!(session = %session_id, "Session closing, dropping request {}", request_id);
            return;
        }

        debug!(
            "Dispatching request {} ({})",
            request_id,
            request.tool_name().unwrap_or("protocol")
        );
        let response = self.handle(request).await;

        let Some(session) = session.upgrade() else {
            debug!(session = %session_id, "Session gone, discarding response to {}", request_id);
            return;
        };
        session.complete(&request_id);

        if let Err(e) = session.deliver(Event::Message(response)).await {
            debug!("Discarding response to {}: {}", request_id, e);
        }
    }

    /// Produce the Response for one request. Never fails: every outcome is
    /// encoded in the Response.
    pub async fn handle(&self, request: Request) -> JsonRpcResponse {
        let Request {
            request_id, body, ..
        } = request;

        match body {
            RequestBody::Initialize => {
                info!("Processing initialize request");
                JsonRpcResponse::success(request_id, self.server_info())
            }
            RequestBody::Ping => JsonRpcResponse::success(request_id, json!({})),
            RequestBody::ListTools => {
                debug!("Processing tools/list request");
                JsonRpcResponse::success(request_id, json!({ "tools": self.registry.list_tools() }))
            }
            RequestBody::CallTool(call) => self.handle_call(request_id, call).await,
            RequestBody::Unknown { method } => {
                warn!("Unknown method: {}", method);
                JsonRpcResponse::method_not_found(request_id, &method)
            }
        }
    }

    async fn handle_call(&self, request_id: RequestId, call: ToolCall) -> JsonRpcResponse {
        let ToolCall {
            tool_name,
            params,
            format,
        } = call;
        debug!("Calling tool {} for request {}", tool_name, request_id);

        match self.invoke(&tool_name, params).await {
            Ok(value) => {
                let result = match format {
                    ResultFormat::Raw => value,
                    ResultFormat::McpContent => mcp_content(&value),
                };
                JsonRpcResponse::success(request_id, result)
            }
            Err(e) => {
                warn!("Tool {} failed: {}", tool_name, e);
                JsonRpcResponse::failure(request_id, e.code(), e.to_string())
            }
        }
    }

    /// Run one tool in its own task, bounded by the tool timeout.
    ///
    /// A panicking handler is reported as [`ToolError::Internal`].
    pub async fn invoke(&self, name: &str, params: Params) -> Result<Value, ToolError> {
        let handler = self.registry.resolve(name)?.handler();
        let mut task = tokio::spawn(async move { handler.call(params).await });

        match tokio::time::timeout(self.tool_timeout, &mut task).await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) if e.is_panic() => Err(ToolError::internal(format!("tool '{}' panicked", name))),
            Ok(Err(e)) => Err(ToolError::internal(e.to_string())),
            Err(_) => {
                task.abort();
                Err(ToolError::Timeout(self.tool_timeout.as_secs()))
            }
        }
    }

    fn server_info(&self) -> Value {
        json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {
                "tools": { "listChanged": false }
            },
            "serverInfo": {
                "name": self.server.name,
                "version": self.server.version
            },
            "instructions": "Inventory tools: product listing, sales data and seasonal stocking priorities."
        })
    }
}

/// MCP `tools/call` result wrapping.
fn mcp_content(value: &Value) -> Value {
    let text = serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string());
    json!({
        "content": [{ "type": "text", "text": text }],
        "isError": false
    })
}
