//! Tool Registry - central registration and lookup for all tools.
//!
//! Tools are registered once at startup; the registry is then shared
//! behind an `Arc` and only read.

use std::collections::BTreeMap;

use serde_json::Value;
use tracing::debug;

use super::ToolError;
use super::definitions::{GetAllProductsTool, GetSalesDataTool, GetSeasonTool};
use super::handlers::ToolDefinition;
use crate::core::config::Config;

/// Tool registry - maps unique names to tool definitions.
#[derive(Debug, Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, ToolDefinition>,
}

impl ToolRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the registry holding every inventory tool.
    pub fn from_config(config: &Config) -> Result<Self, ToolError> {
        Self::new()
            .with_tool(GetAllProductsTool::to_definition(&config.data))?
            .with_tool(GetSalesDataTool::to_definition(&config.data))?
            .with_tool(GetSeasonTool::to_definition(&config.season))
    }

    /// Register a tool. Names must be unique.
    pub fn register(&mut self, tool: ToolDefinition) -> Result<(), ToolError> {
        if self.tools.contains_key(&tool.name) {
            return Err(ToolError::Duplicate(tool.name));
        }
        debug!("Registered tool: {}", tool.name);
        self.tools.insert(tool.name.clone(), tool);
        Ok(())
    }

    /// Builder-style [`register`](Self::register).
    pub fn with_tool(mut self, tool: ToolDefinition) -> Result<Self, ToolError> {
        self.register(tool)?;
        Ok(self)
    }

    /// Resolve a tool by name.
    pub fn resolve(&self, name: &str) -> Result<&ToolDefinition, ToolError> {
        self.tools.get(name).ok_or_else(|| ToolError::not_found(name))
    }

    /// Get all tool names, sorted.
    pub fn tool_names(&self) -> Vec<&str> {
        self.tools.keys().map(String::as_str).collect()
    }

    /// Tool metadata for `tools/list`.
    pub fn list_tools(&self) -> Vec<Value> {
        self.tools.values().map(ToolDefinition::describe).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
