//! Tool handler trait and tool definitions.
//!
//! A [`ToolDefinition`] pairs a unique name and an input schema with a
//! [`ToolHandler`]. Definitions are immutable once registered.

use std::future::Future;
use std::sync::Arc;

use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use super::ToolError;
use crate::core::protocol::Params;

/// Trait implemented by every callable tool.
#[async_trait::async_trait]
pub trait ToolHandler: Send + Sync {
    /// Execute the tool with the given arguments.
    async fn call(&self, params: Params) -> Result<Value, ToolError>;
}

/// Adapter turning an async closure into a [`ToolHandler`].
pub struct FnHandler<F>(F);

#[async_trait::async_trait]
impl<F, Fut> ToolHandler for FnHandler<F>
where
    F: Fn(Params) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, ToolError>> + Send + 'static,
{
    async fn call(&self, params: Params) -> Result<Value, ToolError> {
        (self.0)(params).await
    }
}

/// A registered tool: name, description, JSON schema and handler.
#[derive(Clone)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
    handler: Arc<dyn ToolHandler>,
}

impl ToolDefinition {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        input_schema: Value,
        handler: Arc<dyn ToolHandler>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema,
            handler,
        }
    }

    /// Build a definition from an async closure.
    pub fn from_fn<F, Fut>(
        name: impl Into<String>,
        description: impl Into<String>,
        input_schema: Value,
        f: F,
    ) -> Self
    where
        F: Fn(Params) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, ToolError>> + Send + 'static,
    {
        Self::new(name, description, input_schema, Arc::new(FnHandler(f)))
    }

    pub fn handler(&self) -> Arc<dyn ToolHandler> {
        self.handler.clone()
    }

    /// MCP `tools/list` entry.
    pub fn describe(&self) -> Value {
        json!({
            "name": self.name,
            "description": self.description,
            "inputSchema": self.input_schema,
        })
    }
}

impl std::fmt::Debug for ToolDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolDefinition")
            .field("name", &self.name)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

/// JSON schema for a parameter struct.
pub fn schema_for<T: JsonSchema>() -> Value {
    serde_json::to_value(schemars::schema_for!(T)).unwrap_or_else(|_| json!({ "type": "object" }))
}

/// Validate arguments against a typed parameter struct.
pub fn parse_params<T: DeserializeOwned>(params: Params) -> Result<T, ToolError> {
    serde_json::from_value(Value::Object(params))
        .map_err(|e| ToolError::invalid_arguments(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, JsonSchema)]
    struct EchoParams {
        /// Text to echo back.
        text: String,
    }

    #[tokio::test]
    async fn test_fn_handler() {
        let tool = ToolDefinition::from_fn("echo", "Echo", schema_for::<EchoParams>(), |p| async move {
            let params: EchoParams = parse_params(p)?;
            Ok(json!(params.text))
        });

        let mut args = Params::new();
        args.insert("text".to_string(), json!("hi"));
        assert_eq!(tool.handler().call(args).await.unwrap(), json!("hi"));

        let err = tool.handler().call(Params::new()).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }

    #[test]
    fn test_describe_includes_schema() {
        let tool = ToolDefinition::from_fn("echo", "Echo", schema_for::<EchoParams>(), |_| async {
            Ok(Value::Null)
        });
        let described = tool.describe();
        assert_eq!(described["name"], "echo");
        assert_eq!(described["inputSchema"]["type"], "object");
        assert!(described["inputSchema"]["properties"]["text"].is_object());
    }
}
