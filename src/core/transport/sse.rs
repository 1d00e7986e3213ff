//! SSE transport implementation.
//!
//! Clients open `GET /sse` and receive an `endpoint` event naming the URL to
//! POST requests to. Every Response for that session is then written to the
//! same stream as a `message` event.

use std::convert::Infallible;
use std::sync::{Arc, Weak};
use std::time::Duration;

use axum::{
    Json, Router,
    body::Bytes,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{
        Html, IntoResponse, Response,
        sse::{Event as Frame, KeepAlive, Sse},
    },
    routing::{get, post},
};
use futures::Stream;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, info, instrument, warn};

use super::{TransportConfig, TransportError, TransportResult};
use crate::core::McpServer;
use crate::core::protocol::{Inbound, JsonRpcError, ProtocolError, parse_message};
use crate::core::session::{
    ChannelReceivers, Event, Session, SessionError, SessionId, SessionManager,
};

/// Header carrying the session id when the query string does not.
pub const SESSION_HEADER: &str = "mcp-session-id";

/// SSE transport handler.
pub struct SseTransport {
    config: TransportConfig,
}

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    server: McpServer,
    sse_path: Arc<str>,
    message_path: Arc<str>,
    keep_alive: Duration,
}

impl SseTransport {
    /// Create a new SSE transport with the given config.
    pub fn new(config: TransportConfig) -> Self {
        Self { config }
    }

    /// Build the axum router serving the landing page, health check, event
    /// stream and message endpoint.
    pub fn router(&self, server: McpServer) -> Router {
        let state = AppState {
            server,
            sse_path: Arc::from(self.config.sse_path.as_str()),
            message_path: Arc::from(self.config.message_path.as_str()),
            keep_alive: self.config.keep_alive(),
        };

        let mut app = Router::new()
            .route("/", get(homepage))
            .route("/health", get(health_check))
            .route(&self.config.sse_path, get(sse_handler))
            .route(&self.config.message_path, post(message_handler));

        // Accept the message path with and without its trailing slash.
        let trimmed = self.config.message_path.trim_end_matches('/');
        if !trimmed.is_empty() && trimmed != self.config.message_path {
            app = app.route(trimmed, post(message_handler));
        }

        let mut app = app.with_state(state).layer(TraceLayer::new_for_http());

        if self.config.enable_cors {
            let cors = CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any);
            app = app.layer(cors);
        }

        app
    }

    /// Bind and serve until `shutdown` resolves, then close every session.
    pub async fn run<F>(self, server: McpServer, shutdown: F) -> TransportResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = self.config.address();
        let sessions = server.sessions().clone();
        let app = self.router(server);

        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| TransportError::bind(&addr, e))?;

        let cors_status = if self.config.enable_cors {
            "enabled"
        } else {
            "disabled"
        };
        info!("Ready - listening on {} (SSE, CORS {})", addr, cors_status);
        info!("  → Stream:   GET {}", self.config.sse_path);
        info!("  → Messages: POST {}", self.config.message_path);
        info!("  → Health:   GET /health");

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                shutdown.await;
                let closed = sessions.close_all("server shutting down");
                info!("Closed {} sessions", closed);
            })
            .await
            .map_err(|e| TransportError::http(e.to_string()))?;

        Ok(())
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Failure answered directly on the POST.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Session(#[from] SessionError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Protocol(_) => StatusCode::BAD_REQUEST,
            Self::Session(SessionError::NotFound(_) | SessionError::Closed(_)) => {
                StatusCode::NOT_FOUND
            }
            Self::Session(SessionError::Busy(_)) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Session(SessionError::DuplicateRequest(_)) => StatusCode::BAD_REQUEST,
        }
    }

    fn to_rpc_error(&self) -> JsonRpcError {
        let code = match self {
            Self::Protocol(e) => e.code(),
            Self::Session(e) => e.code(),
        };
        JsonRpcError::new(code, self.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(json!({ "error": self.to_rpc_error() }))).into_response()
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// Landing page with an in-browser stream tester.
async fn homepage(State(state): State<AppState>) -> Html<String> {
    Html(HOMEPAGE.replace("{{SSE_PATH}}", &state.sse_path))
}

/// Health check endpoint.
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "sessions": state.server.sessions().session_count()
    }))
}

/// Open a session and stream its events.
async fn sse_handler(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Frame, Infallible>>> {
    let sessions = state.server.sessions().clone();
    let (session, receivers) = sessions.create();
    let ChannelReceivers {
        inbound,
        mut outbound,
    } = receivers;

    state
        .server
        .dispatcher()
        .spawn(Arc::downgrade(&session), inbound);

    session.try_deliver(Event::Endpoint {
        uri: endpoint_uri(&state.message_path, session.id()),
    });

    let guard = StreamGuard {
        sessions,
        id: session.id().clone(),
        session: Arc::downgrade(&session),
        finished: false,
    };

    let stream = async_stream::stream! {
        let mut guard = guard;
        if let Some(session) = guard.session.upgrade() {
            session.open();
        }

        while let Some(event) = outbound.recv().await {
            let last = event.is_close();
            yield Ok::<_, Infallible>(to_frame(event));
            if last {
                break;
            }
        }

        guard.finished = true;
    };

    Sse::new(stream).keep_alive(KeepAlive::new().interval(state.keep_alive).text("ping"))
}

#[derive(Debug, Deserialize)]
struct MessageQuery {
    session_id: Option<String>,
}

/// Accept one request for a session. The Response arrives on the stream.
#[instrument(skip_all)]
async fn message_handler(
    State(state): State<AppState>,
    Query(query): Query<MessageQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let parsed = parse_message(&body)?;

    let session_id = query
        .session_id
        .or_else(|| {
            headers
                .get(SESSION_HEADER)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        })
        .or_else(|| parsed.session_hint.clone())
        .map(SessionId::from)
        .ok_or(ProtocolError::MissingSessionId)?;

    let session = state.server.sessions().lookup(&session_id)?;

    if let Inbound::Notification { method } = &parsed.inbound {
        info!(session = %session_id, "Client notification: {}", method);
        return Ok((StatusCode::ACCEPTED, "Accepted"));
    }

    if let Some(request) = parsed.into_request(session_id.clone()) {
        debug!(session = %session_id, "Accepted request {}", request.request_id);
        session.submit(request)?;
    }

    Ok((StatusCode::ACCEPTED, "Accepted"))
}

// ============================================================================
// Stream plumbing
// ============================================================================

/// Tears the session down when its stream is dropped, whether the client
/// disconnected or a close frame ended it.
struct StreamGuard {
    sessions: Arc<SessionManager>,
    id: SessionId,
    session: Weak<Session>,
    /// Set once the stream ran to its end; unset means the client went away.
    finished: bool,
}

impl Drop for StreamGuard {
    fn drop(&mut self) {
        self.sessions.release(&self.id);
        let lifetime = self.session.upgrade().map(|session| {
            session.mark_closed();
            (chrono::Utc::now() - session.created_at()).num_seconds()
        });

        if self.finished {
            info!(session = %self.id, lifetime_secs = ?lifetime, "Stream closed by server");
        } else {
            warn!(session = %self.id, lifetime_secs = ?lifetime, "Client disconnected, stream dropped");
        }
    }
}

fn endpoint_uri(message_path: &str, id: &SessionId) -> String {
    format!("{}?session_id={}", message_path, id)
}

fn to_frame(event: Event) -> Frame {
    match event {
        Event::Endpoint { uri } => Frame::default().event("endpoint").data(uri),
        Event::Message(response) => {
            let data = serde_json::to_string(&response).unwrap_or_else(|e| {
                warn!("Failed to encode response {}: {}", response.id, e);
                String::from("{}")
            });
            Frame::default().event("message").data(data)
        }
        Event::Close { reason } => Frame::default().event("close").data(reason),
    }
}

const HOMEPAGE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Inventory MCP Server</title>
    <style>
        body { font-family: Arial, sans-serif; max-width: 800px; margin: 0 auto; padding: 20px; }
        h1 { color: #333; }
        button { background-color: #4CAF50; color: white; border: none; padding: 10px 20px; cursor: pointer; }
        .status { border: 1px solid #ccc; padding: 10px; margin-top: 10px; min-height: 20px; }
        pre { background: #f5f5f5; padding: 10px; overflow-x: auto; }
    </style>
</head>
<body>
    <h1>Inventory MCP Server</h1>
    <p>Tools: <code>get_all_products</code>, <code>get_sales_data</code>, <code>get_season</code>.</p>
    <button id="connect-button">Connect to SSE</button>
    <div class="status" id="status">Not connected</div>
    <pre id="events"></pre>
    <script>
        document.getElementById('connect-button').addEventListener('click', function() {
            const status = document.getElementById('status');
            const events = document.getElementById('events');
            status.textContent = 'Connecting...';
            const source = new EventSource('{{SSE_PATH}}');
            source.onopen = function() { status.textContent = 'Connected'; };
            source.addEventListener('endpoint', function(e) {
                events.textContent += 'endpoint: ' + e.data + '\n';
            });
            source.addEventListener('message', function(e) {
                events.textContent += 'message: ' + e.data + '\n';
            });
            source.onerror = function() {
                status.textContent = 'Connection error';
                source.close();
            };
        });
    </script>
</body>
</html>
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Config;
    use crate::core::session::SessionState;
    use axum::body::Body;
    use axum::http::{Request, header};
    use http_body_util::BodyExt;
    use serde_json::Value;
    use std::fs;
    use tempfile::TempDir;
    use tower::ServiceExt;

    struct EventReader {
        body: Body,
        buffer: String,
    }

    /// One parsed SSE event: `(event name, data)`. Comments come back with
    /// the name `":"`.
    type SseItem = (String, String);

    impl EventReader {
        fn new(body: Body) -> Self {
            Self {
                body,
                buffer: String::new(),
            }
        }

        async fn next(&mut self) -> Option<SseItem> {
            loop {
                if let Some(pos) = self.buffer.find("\n\n") {
                    let raw: String = self.buffer.drain(..pos + 2).collect();
                    return Some(parse_item(&raw));
                }
                let frame = tokio::time::timeout(Duration::from_secs(3), self.body.frame())
                    .await
                    .expect("timed out waiting for an event")?
                    .unwrap();
                if let Ok(data) = frame.into_data() {
                    self.buffer.push_str(std::str::from_utf8(&data).unwrap());
                }
            }
        }

        /// Next event named `name`. Keep-alive comments are skipped unless
        /// `name` is `":"`.
        async fn expect(&mut self, name: &str) -> String {
            loop {
                let (event, data) = self.next().await.expect("stream ended");
                if event == ":" && name != ":" {
                    continue;
                }
                assert_eq!(event, name, "unexpected event with data {}", data);
                return data;
            }
        }
    }

    fn parse_item(raw: &str) -> SseItem {
        let mut event = String::from("message");
        let mut data = Vec::new();
        for line in raw.lines() {
            if let Some(value) = line.strip_prefix("event:") {
                event = value.trim().to_string();
            } else if let Some(value) = line.strip_prefix("data:") {
                data.push(value.strip_prefix(' ').unwrap_or(value).to_string());
            } else if line.starts_with(':') {
                event = ":".to_string();
                data.push(line[1..].trim().to_string());
            }
        }
        (event, data.join("\n"))
    }

    fn test_server(keep_alive_secs: u64) -> (McpServer, Router, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let products = temp_dir.path().join("products.csv");
        fs::write(&products, "id,name\n1,fan\n2,heater\n3,umbrella\n").unwrap();

        let mut config = Config::default();
        config.data.products_path = products;
        config.data.sales_path = temp_dir.path().join("missing.csv");
        config.transport.keep_alive_secs = keep_alive_secs;

        let server = McpServer::new(config.clone()).unwrap();
        let router = SseTransport::new(config.transport).router(server.clone());
        (server, router, temp_dir)
    }

    async fn open_stream(router: &Router) -> (EventReader, String) {
        let response = router
            .clone()
            .oneshot(Request::get("/sse").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/event-stream"
        );

        let mut reader = EventReader::new(response.into_body());
        let endpoint = reader.expect("endpoint").await;
        (reader, endpoint)
    }

    fn session_of(endpoint: &str) -> SessionId {
        SessionId::from(endpoint.split("session_id=").nth(1).unwrap())
    }

    async fn post(router: &Router, uri: &str, body: &str) -> (StatusCode, Value) {
        let response = router
            .clone()
            .oneshot(
                Request::post(uri)
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    #[tokio::test]
    async fn test_endpoint_frame_first() {
        let (server, router, _dir) = test_server(15);
        let (_reader, endpoint) = open_stream(&router).await;

        assert!(endpoint.starts_with("/messages/?session_id="));
        let id = session_of(&endpoint);
        let session = server.sessions().lookup(&id).unwrap();
        assert_eq!(session.state(), SessionState::Open);
    }

    #[tokio::test]
    async fn test_tool_call_round_trip() {
        let (_server, router, _dir) = test_server(15);
        let (mut reader, endpoint) = open_stream(&router).await;

        let (status, _) = post(
            &router,
            &endpoint,
            r#"{"requestId": "r1", "toolName": "get_all_products", "params": {"limit": 2, "offset": 1}}"#,
        )
        .await;
        assert_eq!(status, StatusCode::ACCEPTED);

        let data = reader.expect("message").await;
        let response: Value = serde_json::from_str(&data).unwrap();
        assert_eq!(response["jsonrpc"], "2.0");
        assert_eq!(response["id"], "r1");
        assert_eq!(
            response["result"],
            json!([{"id": "2", "name": "heater"}, {"id": "3", "name": "umbrella"}])
        );
    }

    #[tokio::test]
    async fn test_jsonrpc_tools_call_with_header_session() {
        let (_server, router, _dir) = test_server(15);
        let (mut reader, endpoint) = open_stream(&router).await;
        let id = session_of(&endpoint);

        let response = router
            .clone()
            .oneshot(
                Request::post("/messages/")
                    .header(SESSION_HEADER, id.as_str())
                    .body(Body::from(
                        r#"{"jsonrpc": "2.0", "id": 5, "method": "tools/call", "params": {"name": "get_sales_data"}}"#,
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);

        let data = reader.expect("message").await;
        let response: Value = serde_json::from_str(&data).unwrap();
        assert_eq!(response["id"], 5);
        assert_eq!(response["result"]["content"][0]["text"], "[]");
    }

    #[tokio::test]
    async fn test_unknown_tool_is_error_response() {
        let (_server, router, _dir) = test_server(15);
        let (mut reader, endpoint) = open_stream(&router).await;

        let (status, _) = post(
            &router,
            &endpoint,
            r#"{"requestId": 9, "toolName": "get_weather", "params": {}}"#,
        )
        .await;
        assert_eq!(status, StatusCode::ACCEPTED);

        let response: Value = serde_json::from_str(&reader.expect("message").await).unwrap();
        assert_eq!(response["id"], 9);
        assert_eq!(response["error"]["code"], -32002);
        assert_eq!(response["error"]["data"]["kind"], "UnknownTool");
    }

    #[tokio::test]
    async fn test_unknown_session_is_404() {
        let (_server, router, _dir) = test_server(1);
        let (mut reader, _endpoint) = open_stream(&router).await;

        let (status, body) = post(
            &router,
            "/messages/?session_id=deadbeef",
            r#"{"requestId": "r1", "toolName": "get_season"}"#,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], -32001);

        // The live stream sees nothing but keep-alive
        assert_eq!(reader.expect(":").await, "ping");
    }

    #[tokio::test]
    async fn test_malformed_body_is_400() {
        let (_server, router, _dir) = test_server(15);
        let (_reader, endpoint) = open_stream(&router).await;

        let (status, body) = post(&router, &endpoint, "{not json").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], -32700);

        let (status, body) = post(&router, &endpoint, r#"{"hello": "world"}"#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], -32600);

        let (status, _) = post(&router, "/messages/", r#"{"requestId": 1, "toolName": "get_season"}"#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_notification_is_acknowledged_only() {
        let (_server, router, _dir) = test_server(15);
        let (mut reader, endpoint) = open_stream(&router).await;

        let (status, _) = post(
            &router,
            &endpoint,
            r#"{"jsonrpc": "2.0", "method": "notifications/initialized"}"#,
        )
        .await;
        assert_eq!(status, StatusCode::ACCEPTED);

        let (status, _) = post(&router, &endpoint, r#"{"jsonrpc": "2.0", "id": 1, "method": "ping"}"#).await;
        assert_eq!(status, StatusCode::ACCEPTED);

        let response: Value = serde_json::from_str(&reader.expect("message").await).unwrap();
        assert_eq!(response["id"], 1);
        assert_eq!(response["result"], json!({}));
    }

    #[tokio::test]
    async fn test_sessions_are_isolated() {
        let (_server, router, _dir) = test_server(15);
        let (mut reader_a, endpoint_a) = open_stream(&router).await;
        let (mut reader_b, endpoint_b) = open_stream(&router).await;
        assert_ne!(endpoint_a, endpoint_b);

        post(&router, &endpoint_a, r#"{"requestId": "a", "toolName": "get_season"}"#).await;
        post(&router, &endpoint_b, r#"{"requestId": "b", "toolName": "get_season"}"#).await;

        let a: Value = serde_json::from_str(&reader_a.expect("message").await).unwrap();
        let b: Value = serde_json::from_str(&reader_b.expect("message").await).unwrap();
        assert_eq!(a["id"], "a");
        assert_eq!(b["id"], "b");
    }

    #[tokio::test]
    async fn test_events_never_cross_sessions() {
        let (_server, router, _dir) = test_server(1);
        let (mut reader_a, endpoint_a) = open_stream(&router).await;
        let (mut reader_b, _endpoint_b) = open_stream(&router).await;

        for id in ["a1", "a2"] {
            let body = format!(r#"{{"requestId": "{}", "toolName": "get_season"}}"#, id);
            let (status, _) = post(&router, &endpoint_a, &body).await;
            assert_eq!(status, StatusCode::ACCEPTED);
        }

        for expected in ["a1", "a2"] {
            let response: Value = serde_json::from_str(&reader_a.expect("message").await).unwrap();
            assert_eq!(response["id"], expected);
        }

        // B only ever gets keep-alive
        assert_eq!(reader_b.expect(":").await, "ping");
    }

    #[tokio::test]
    async fn test_disconnect_closes_session() {
        let (server, router, _dir) = test_server(15);
        let (reader, endpoint) = open_stream(&router).await;
        let id = session_of(&endpoint);
        let session = server.sessions().lookup(&id).unwrap();

        drop(reader);

        assert_eq!(session.state(), SessionState::Closed);
        assert_eq!(server.sessions().session_count(), 0);

        let (status, _) = post(&router, &endpoint, r#"{"requestId": 1, "toolName": "get_season"}"#).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_server_close_ends_stream() {
        let (server, router, _dir) = test_server(15);
        let (mut reader, endpoint) = open_stream(&router).await;

        assert_eq!(server.sessions().close_all("server shutting down"), 1);

        assert_eq!(reader.expect("close").await, "server shutting down");
        assert!(reader.next().await.is_none());

        let (status, _) = post(&router, &endpoint, r#"{"requestId": 1, "toolName": "get_season"}"#).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_keep_alive_ping() {
        let (_server, router, _dir) = test_server(1);
        let (mut reader, _endpoint) = open_stream(&router).await;

        let (event, data) = reader.next().await.unwrap();
        assert_eq!(event, ":");
        assert_eq!(data, "ping");
    }

    #[tokio::test]
    async fn test_run_reports_bind_failure() {
        let (server, _router, _dir) = test_server(15);
        let taken = std::net::TcpListener::bind("127.0.0.1:0").unwrap();

        let mut config = TransportConfig::default();
        config.host = "127.0.0.1".to_string();
        config.port = taken.local_addr().unwrap().port();

        let err = SseTransport::new(config)
            .run(server, std::future::pending())
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::BindError { .. }));

        let err = crate::core::Error::from(err);
        assert!(err.to_string().starts_with("Transport error: Failed to bind"));
    }

    #[tokio::test]
    async fn test_homepage_and_health() {
        let (_server, router, _dir) = test_server(15);

        let response = router
            .clone()
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let html = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(html.contains("Inventory MCP Server"));
        assert!(html.contains("new EventSource('/sse')"));

        let (_reader, _endpoint) = open_stream(&router).await;
        let response = router
            .clone()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let health: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(health["status"], "healthy");
        assert_eq!(health["sessions"], 1);
    }
}
