//! Transport service - runs the SSE transport until shutdown.

use tracing::{info, warn};

use super::{SseTransport, TransportConfig};
use crate::core::McpServer;
use crate::core::error::Result;

/// Transport service - manages the transport layer for the MCP server.
pub struct TransportService {
    config: TransportConfig,
}

impl TransportService {
    /// Create a new transport service with the given configuration.
    pub fn new(config: TransportConfig) -> Self {
        Self { config }
    }

    /// Log information about the configured transport.
    pub fn log_info(&self) {
        info!("Starting transport: {}", self.config.description());
    }

    /// Start the transport with the given MCP server.
    ///
    /// Blocks until Ctrl-C or SIGTERM; open sessions are then closed so
    /// their streams end.
    pub async fn run(self, server: McpServer) -> Result<()> {
        self.log_info();
        SseTransport::new(self.config)
            .run(server, shutdown_signal())
            .await?;
        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
