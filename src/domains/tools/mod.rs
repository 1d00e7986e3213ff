//! Tools domain module.
//!
//! Tools are executable functions that MCP clients call by name. Each one
//! receives a JSON object of parameters and returns a JSON value.
//!
//! ## Architecture
//!
//! - `definitions/` - Individual tool implementations (one file per tool)
//! - `handlers.rs` - `ToolHandler` trait and `ToolDefinition`
//! - `registry.rs` - Central tool registry and name lookup
//! - `error.rs` - Tool-specific error types
//!
//! ## Adding a New Tool
//!
//! 1. Create a new file in `definitions/` with a params struct and a
//!    `ToolHandler` impl
//! 2. Give it a `to_definition()` constructor
//! 3. Register it in `ToolRegistry::from_config`

pub mod definitions;
mod error;
mod handlers;
mod registry;

pub use error::ToolError;
pub use handlers::*;
pub use registry::ToolRegistry;
