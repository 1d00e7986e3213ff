//! Sales data tool definition.

use std::path::PathBuf;
use std::sync::Arc;

use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;
use tracing::info;

use super::table::load_rows;
use crate::core::config::DataConfig;
use crate::core::protocol::Params;
use crate::domains::tools::ToolError;
use crate::domains::tools::handlers::{ToolDefinition, ToolHandler, parse_params, schema_for};

/// The sales tool takes no parameters.
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct GetSalesDataParams {}

/// Returns the full sales table unmodified.
pub struct GetSalesDataTool {
    path: PathBuf,
}

impl GetSalesDataTool {
    pub const NAME: &'static str = "get_sales_data";
    pub const DESCRIPTION: &'static str = "Retrieve all sales data.";

    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn to_definition(config: &DataConfig) -> ToolDefinition {
        ToolDefinition::new(
            Self::NAME,
            Self::DESCRIPTION,
            schema_for::<GetSalesDataParams>(),
            Arc::new(Self::new(config.sales_path.clone())),
        )
    }
}

#[async_trait::async_trait]
impl ToolHandler for GetSalesDataTool {
    async fn call(&self, params: Params) -> Result<Value, ToolError> {
        let _: GetSalesDataParams = parse_params(params)?;
        let rows = load_rows(self.path.clone()).await;

        info!("Returning {} sales records", rows.len());
        Ok(Value::Array(rows.into_iter().map(Value::Object).collect()))
    }
}
