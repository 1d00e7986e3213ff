//! Inventory MCP Server Entry Point
//!
//! Initializes logging, loads configuration and serves the SSE transport
//! until shutdown.

use anyhow::Result;
use clap::Parser;
use tracing::{Level, debug, info};
use tracing_subscriber::{EnvFilter, fmt};

use inventory_mcp_server::core::{Config, McpServer, TransportService};

/// Command-line overrides. Anything not given falls back to `MCP_*`
/// environment variables and then to defaults.
#[derive(Debug, Parser)]
#[command(name = "inventory-mcp-server", version, about)]
struct Cli {
    /// Host address to bind to
    #[arg(long, env = "MCP_HOST")]
    host: Option<String>,

    /// Port to listen on
    #[arg(long, env = "MCP_PORT")]
    port: Option<u16>,

    /// Seconds of idle stream before a keep-alive ping
    #[arg(long, env = "MCP_KEEP_ALIVE_SECS")]
    keep_alive_secs: Option<u64>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "MCP_LOG_LEVEL")]
    log_level: Option<String>,
}

impl Cli {
    fn apply(self, config: &mut Config) {
        if let Some(host) = self.host {
            config.transport.host = host;
        }
        if let Some(port) = self.port {
            config.transport.port = port;
        }
        if let Some(secs) = self.keep_alive_secs {
            config.transport.keep_alive_secs = secs;
        }
        if let Some(level) = self.log_level {
            config.logging.level = level;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration from environment, then apply flags
    let mut config = Config::from_env();
    Cli::parse().apply(&mut config);

    // Initialize logging
    init_logging(&config.logging.level);

    info!("Starting {} v{}", config.server.name, config.server.version);
    info!(
        "Data files: products={}, sales={}",
        config.data.products_path.display(),
        config.data.sales_path.display()
    );
    if let Ok(effective) = serde_json::to_string(&config) {
        debug!("Effective configuration: {}", effective);
    }

    // Create the MCP server
    let server = McpServer::new(config.clone())?;

    info!("Server initialized");

    // Create and run the transport service
    let transport = TransportService::new(config.transport);
    transport.run(server).await?;

    info!("Server shutting down");

    Ok(())
}

/// Initialize the logging subsystem.
///
/// Configures tracing with the specified log level and format.
fn init_logging(level: &str) {
    let level = match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .init();
}
