//! Product listing tool definition.
//!
//! Returns a page of rows from the products table.

use std::path::PathBuf;

use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;
use tracing::info;

use super::table::{Row, load_rows};
use crate::core::config::DataConfig;
use crate::core::protocol::Params;
use crate::domains::tools::ToolError;
use crate::domains::tools::handlers::{ToolDefinition, ToolHandler, parse_params, schema_for};

// ============================================================================
// Tool Parameters
// ============================================================================

/// Parameters for the product listing tool.
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct GetAllProductsParams {
    /// Maximum number of products to return (default: 100)
    #[serde(default)]
    pub limit: Option<i64>,

    /// Number of products to skip for pagination (default: 0)
    #[serde(default)]
    pub offset: Option<i64>,
}

impl GetAllProductsParams {
    /// `(offset, limit)` with absent or negative values replaced by defaults.
    pub fn window(&self) -> (usize, usize) {
        let offset = self
            .offset
            .filter(|v| *v >= 0)
            .map_or(0, |v| v as usize);
        let limit = self
            .limit
            .filter(|v| *v >= 0)
            .map_or(GetAllProductsTool::DEFAULT_LIMIT, |v| v as usize);
        (offset, limit)
    }
}

// ============================================================================
// Tool Definition
// ============================================================================

/// Product listing tool.
pub struct GetAllProductsTool {
    path: PathBuf,
}

impl GetAllProductsTool {
    /// Tool name as registered in MCP.
    pub const NAME: &'static str = "get_all_products";

    /// Tool description shown to clients.
    pub const DESCRIPTION: &'static str = "Retrieve all products from inventory. Supports pagination with limit and offset.";

    pub const DEFAULT_LIMIT: usize = 100;

    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Contiguous slice of `rows` for the requested page.
    pub fn execute(rows: Vec<Row>, params: &GetAllProductsParams) -> Vec<Row> {
        let (offset, limit) = params.window();
        rows.into_iter().skip(offset).take(limit).collect()
    }

    pub fn to_definition(config: &DataConfig) -> ToolDefinition {
        ToolDefinition::new(
            Self::NAME,
            Self::DESCRIPTION,
            schema_for::<GetAllProductsParams>(),
            std::sync::Arc::new(Self::new(config.products_path.clone())),
        )
    }
}

#[async_trait::async_trait]
impl ToolHandler for GetAllProductsTool {
    async fn call(&self, params: Params) -> Result<Value, ToolError> {
        let params: GetAllProductsParams = parse_params(params)?;
        let rows = load_rows(self.path.clone()).await;
        let page = Self::execute(rows, &params);

        info!("Returning {} products", page.len());
        Ok(Value::Array(page.into_iter().map(Value::Object).collect()))
    }
}

// ============================================================================
// Tests
// ============================================================================
