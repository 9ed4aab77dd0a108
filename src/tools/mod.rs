//! Tool Dispatcher (C2): maps a tool-name + arguments to a registered
//! executor and returns the result or a typed error. The dispatcher itself
//! never retries; callers decide (§4.2).

pub mod search;

pub use search::SearchTool;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::ToolError;

/// Argument descriptor advertised to an LLM Adaptor provider when building a
/// tool-options list (`list_schemas`).
#[derive(Debug, Clone)]
pub struct ToolSchema {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn schema(&self) -> serde_json::Value;
    async fn execute(&self, args: serde_json::Value) -> Result<String, ToolError>;
}

/// Process-wide, immutable-after-startup mapping from tool name to executor
/// (§5: "the tool registry... is process-wide immutable after startup").
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn list_schemas(&self) -> Vec<ToolSchema> {
        self.tools
            .values()
            .map(|t| ToolSchema {
                name: t.name().to_string(),
                description: t.description().to_string(),
                parameters: t.schema(),
            })
            .collect()
    }

    pub fn schema_for(&self, name: &str) -> Option<ToolSchema> {
        self.tools.get(name).map(|t| ToolSchema {
            name: t.name().to_string(),
            description: t.description().to_string(),
            parameters: t.schema(),
        })
    }

    /// `dispatch(call) → string`. Fails with `UnknownTool`,
    /// `InvalidArguments`, or `ToolExecutionError(wrapped)`.
    pub async fn dispatch(&self, name: &str, args: serde_json::Value) -> Result<String, ToolError> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| ToolError::UnknownTool(name.to_string()))?;
        if !args.is_object() {
            return Err(ToolError::InvalidArguments(format!(
                "arguments for '{name}' must be a JSON object"
            )));
        }
        tool.execute(args).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }
        fn description(&self) -> &str {
            "echoes its input"
        }
        fn schema(&self) -> serde_json::Value {
            serde_json::json!({"type": "object", "properties": {"text": {"type": "string"}}})
        }
        async fn execute(&self, args: serde_json::Value) -> Result<String, ToolError> {
            Ok(args["text"].as_str().unwrap_or_default().to_string())
        }
    }

    #[tokio::test]
    async fn dispatch_unknown_tool_errors() {
        let registry = ToolRegistry::new();
        let err = registry.dispatch("missing", serde_json::json!({})).await.unwrap_err();
        assert!(matches!(err, ToolError::UnknownTool(_)));
    }

    #[tokio::test]
    async fn dispatch_invokes_registered_tool() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool));
        let result = registry
            .dispatch("echo", serde_json::json!({"text": "hi"}))
            .await
            .unwrap();
        assert_eq!(result, "hi");
    }

    #[tokio::test]
    async fn dispatch_rejects_non_object_arguments() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool));
        let err = registry.dispatch("echo", serde_json::json!([1, 2])).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }
}
