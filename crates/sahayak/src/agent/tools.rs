//! Tool trait and registry.
//!
//! The registry is a static name-to-callable map built at startup.
//! Dispatch policy is uniform: an unknown name is the caller's error
//! (`UnknownTool`), but anything that goes wrong *inside* a tool is swallowed
//! into an error-shaped JSON payload the model can read. No tool failure
//! unwinds out of a turn.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};

use crate::error::AgentError;
use crate::llm::ToolSchema;

/// One callable lookup the model may request.
///
/// `execute` returns the compact JSON summary for a successful lookup.
/// Provider-level problems (no results, unconfigured key) should be reported
/// as an `{"error": …}` value rather than an `Err`; transport failures may be
/// `Err` and are converted to the same shape by the registry.
#[async_trait]
pub trait AssistantTool: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    /// JSON Schema describing the tool's parameters.
    fn parameters_schema(&self) -> Value;
    async fn execute(&self, args: &Value) -> Result<Value>;
}

/// Static mapping from tool name to implementation.
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn AssistantTool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    pub fn register(&mut self, tool: Arc<dyn AssistantTool>) {
        tracing::debug!(tool = %tool.name(), "Registering tool");
        self.tools.insert(tool.name().to_string(), tool);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn AssistantTool>> {
        self.tools.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.keys().cloned().collect();
        names.sort();
        names
    }

    /// The schema array handed to the completion request.
    pub fn describe_all(&self) -> Vec<ToolSchema> {
        let mut schemas: Vec<ToolSchema> = self
            .tools
            .values()
            .map(|t| ToolSchema {
                name: t.name().to_string(),
                description: t.description().to_string(),
                parameters: t.parameters_schema(),
            })
            .collect();
        schemas.sort_by(|a, b| a.name.cmp(&b.name));
        schemas
    }

    /// Dispatch one call. `UnknownTool` is the only error this returns; every
    /// tool-internal failure comes back as an `{"error": …}` payload string.
    pub async fn invoke(&self, name: &str, args: &Value) -> Result<String, AgentError> {
        let tool = self
            .get(name)
            .ok_or_else(|| AgentError::UnknownTool(name.to_string()))?;

        match tool.execute(args).await {
            Ok(value) => Ok(value.to_string()),
            Err(e) => {
                tracing::warn!(tool = %name, error = %e, "Tool execution failed, returning error payload");
                Ok(json!({ "error": e.to_string() }).to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    struct EchoTool;

    #[async_trait]
    impl AssistantTool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }
        fn description(&self) -> &str {
            "Echo the arguments back"
        }
        fn parameters_schema(&self) -> Value {
            json!({
                "type": "object",
                "properties": {
                    "text": { "type": "string", "description": "Text to echo" }
                },
                "required": ["text"]
            })
        }
        async fn execute(&self, args: &Value) -> Result<Value> {
            Ok(json!({ "echoed": args["text"] }))
        }
    }

    struct BrokenTool;

    #[async_trait]
    impl AssistantTool for BrokenTool {
        fn name(&self) -> &str {
            "broken"
        }
        fn description(&self) -> &str {
            "Always fails"
        }
        fn parameters_schema(&self) -> Value {
            json!({ "type": "object", "properties": {} })
        }
        async fn execute(&self, _args: &Value) -> Result<Value> {
            Err(anyhow!("upstream service exploded"))
        }
    }

    fn registry() -> ToolRegistry {
        let mut reg = ToolRegistry::new();
        reg.register(Arc::new(EchoTool));
        reg.register(Arc::new(BrokenTool));
        reg
    }

    #[test]
    fn test_describe_all_yields_object_schemas() {
        let reg = registry();
        let schemas = reg.describe_all();
        assert_eq!(schemas.len(), 2);
        for schema in &schemas {
            assert_eq!(schema.parameters["type"], "object");
            assert!(!schema.description.is_empty());
        }
        // Deterministic ordering by name
        assert_eq!(schemas[0].name, "broken");
        assert_eq!(schemas[1].name, "echo");
    }

    #[tokio::test]
    async fn test_invoke_dispatches_and_serializes() {
        let reg = registry();
        let payload = reg
            .invoke("echo", &json!({ "text": "hello" }))
            .await
            .unwrap();
        let parsed: Value = serde_json::from_str(&payload).unwrap();
        assert_eq!(parsed["echoed"], "hello");
    }

    #[tokio::test]
    async fn test_unknown_tool_is_an_error() {
        let reg = registry();
        let err = reg.invoke("teleport", &json!({})).await.err().unwrap();
        assert_eq!(err.to_string(), "Unknown tool requested: teleport");
    }

    #[tokio::test]
    async fn test_tool_failures_become_error_payloads() {
        let reg = registry();
        // Not an Err: the failure is data for the model to read
        let payload = reg.invoke("broken", &json!({})).await.unwrap();
        let parsed: Value = serde_json::from_str(&payload).unwrap();
        assert!(parsed["error"]
            .as_str()
            .unwrap()
            .contains("upstream service exploded"));
    }
}
