//! Transport configuration types.

use serde::Serialize;
use tracing::warn;

/// SSE transport configuration.
#[derive(Debug, Clone, Serialize)]
pub struct TransportConfig {
    /// Host address to bind to.
    pub host: String,

    /// Port number to listen on.
    pub port: u16,

    /// Path of the event stream endpoint.
    pub sse_path: String,

    /// Path clients POST messages to.
    pub message_path: String,

    /// Seconds of idle stream before a ping frame is written.
    pub keep_alive_secs: u64,

    /// Enable CORS for browser clients.
    pub enable_cors: bool,

    /// Per-session inbound queue capacity.
    pub inbound_capacity: usize,

    /// Per-session outbound queue capacity.
    pub outbound_capacity: usize,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_sse_path() -> String {
    "/sse".to_string()
}

fn default_message_path() -> String {
    "/messages/".to_string()
}

fn default_keep_alive_secs() -> u64 {
    15
}

fn default_cors() -> bool {
    true
}

fn default_inbound_capacity() -> usize {
    64
}

fn default_outbound_capacity() -> usize {
    256
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            sse_path: default_sse_path(),
            message_path: default_message_path(),
            keep_alive_secs: default_keep_alive_secs(),
            enable_cors: default_cors(),
            inbound_capacity: default_inbound_capacity(),
            outbound_capacity: default_outbound_capacity(),
        }
    }
}

impl TransportConfig {
    /// Load transport config from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(host) = std::env::var("MCP_HOST") {
            config.host = host;
        }
        if let Some(port) = parse_env("MCP_PORT") {
            config.port = port;
        }
        if let Ok(path) = std::env::var("MCP_SSE_PATH") {
            config.sse_path = path;
        }
        if let Ok(path) = std::env::var("MCP_MESSAGE_PATH") {
            config.message_path = path;
        }
        if let Some(secs) = parse_env("MCP_KEEP_ALIVE_SECS") {
            config.keep_alive_secs = secs;
        }
        if let Ok(cors) = std::env::var("MCP_HTTP_CORS") {
            config.enable_cors = cors.to_lowercase() != "false" && cors != "0";
        }
        if let Some(capacity) = parse_env("MCP_INBOUND_CAPACITY") {
            config.inbound_capacity = capacity;
        }
        if let Some(capacity) = parse_env("MCP_OUTBOUND_CAPACITY") {
            config.outbound_capacity = capacity;
        }

        config
    }

    /// Get the bind address.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Keep-alive interval, never below one second.
    pub fn keep_alive(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.keep_alive_secs.max(1))
    }

    /// Get a description of this transport for logging.
    pub fn description(&self) -> String {
        format!(
            "SSE on {} (stream {}, messages {})",
            self.address(),
            self.sse_path,
            self.message_path
        )
    }
}

/// Parse an environment variable, warning on malformed values.
pub(crate) fn parse_env<T: std::str::FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!("Ignoring invalid value for {}: {:?}", key, raw);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TransportConfig::default();
        assert_eq!(config.address(), "0.0.0.0:8080");
        assert_eq!(config.sse_path, "/sse");
        assert_eq!(config.message_path, "/messages/");
        assert_eq!(config.keep_alive_secs, 15);
    }

    #[test]
    fn test_keep_alive_floor() {
        let config = TransportConfig {
            keep_alive_secs: 0,
            ..Default::default()
        };
        assert_eq!(config.keep_alive(), std::time::Duration::from_secs(1));
    }
}
