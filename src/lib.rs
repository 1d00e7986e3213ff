//! Inventory MCP Server Library
//!
//! An MCP server exposing inventory tools to clients over a Server-Sent
//! Events transport: clients hold an event stream open and POST requests
//! that are answered asynchronously on that stream.
//!
//! # Architecture
//!
//! - **core**: configuration, errors, wire protocol, sessions, dispatch and
//!   the SSE transport
//! - **domains**: business logic organized by bounded contexts
//!   - **tools**: `get_all_products`, `get_sales_data` and `get_season`
//!
//! # Example
//!
//! ```rust,no_run
//! use inventory_mcp_server::core::{Config, McpServer, TransportService};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env();
//!     let server = McpServer::new(config.clone())?;
//!     TransportService::new(config.transport).run(server).await?;
//!     Ok(())
//! }
//! ```

pub mod core;
pub mod domains;

// Re-export commonly used types for convenience
pub use core::{Config, Error, McpServer, Result};
