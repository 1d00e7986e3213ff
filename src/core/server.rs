//! MCP server assembly.
//!
//! [`McpServer`] bundles the configuration, the tool registry, the session
//! manager and the dispatcher. It is built once at startup and handed to the
//! transport; cloning it is cheap.

use std::sync::Arc;

use serde_json::Value;
use tracing::{info, instrument};

use super::config::Config;
use super::dispatch::Dispatcher;
use super::error::Result;
use super::protocol::Params;
use super::session::SessionManager;
use crate::domains::tools::{ToolError, ToolRegistry};

/// The main MCP server handle.
#[derive(Debug, Clone)]
pub struct McpServer {
    /// Server configuration.
    config: Arc<Config>,

    /// Registered tools, read-only after startup.
    registry: Arc<ToolRegistry>,

    /// Live sessions.
    sessions: Arc<SessionManager>,

    /// Request dispatcher shared by every session.
    dispatcher: Arc<Dispatcher>,
}

impl McpServer {
    /// Create a server exposing the inventory tools.
    pub fn new(config: Config) -> Result<Self> {
        let registry = ToolRegistry::from_config(&config)?;
        Ok(Self::with_registry(config, registry))
    }

    /// Create a server around an explicit registry.
    pub fn with_registry(config: Config, registry: ToolRegistry) -> Self {
        let registry = Arc::new(registry);
        let dispatcher = Arc::new(Dispatcher::new(registry.clone(), &config));
        let sessions = Arc::new(SessionManager::new(
            config.transport.inbound_capacity,
            config.transport.outbound_capacity,
        ));

        info!(
            "Server {} v{} ready with {} tools ({:?} dispatch)",
            config.server.name,
            config.server.version,
            registry.len(),
            dispatcher.policy()
        );

        Self {
            config: Arc::new(config),
            registry,
            sessions,
            dispatcher,
        }
    }

    /// Get the server name.
    pub fn name(&self) -> &str {
        &self.config.server.name
    }

    /// Get the server version.
    pub fn version(&self) -> &str {
        &self.config.server.version
    }

    pub fn sessions(&self) -> &Arc<SessionManager> {
        &self.sessions
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    /// Tool metadata for `tools/list`.
    pub fn list_tools(&self) -> Vec<Value> {
        self.registry.list_tools()
    }

    /// Call a tool directly, outside any session.
    #[instrument(skip(self, params))]
    pub async fn call_tool(&self, name: &str, params: Params) -> std::result::Result<Value, ToolError> {
        self.dispatcher.invoke(name, params).await
    }
}
