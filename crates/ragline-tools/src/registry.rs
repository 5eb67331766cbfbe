//! Tool trait, registry, and timeout-isolated invocation

use ragline_core::{Error, Result, ToolDefinition, ToolOutcome};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

#[derive(Clone, Debug)]
pub enum ToolResult {
    Text(String),
    Json(Value),
    Error(String),
}

impl ToolResult {
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }

    pub fn error(s: impl Into<String>) -> Self {
        Self::Error(s.into())
    }

    pub fn to_content_string(&self) -> String {
        match self {
            Self::Text(s) => s.clone(),
            Self::Json(v) => serde_json::to_string_pretty(v).unwrap_or_default(),
            Self::Error(e) => format!("Error: {}", e),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }
}

/// The Tool trait - implement this to add a new capability.
#[async_trait::async_trait]
pub trait Tool: Send + Sync {
    /// Unique tool name (e.g. "calculator").
    fn name(&self) -> &str;

    /// Human-readable description sent to the model.
    fn description(&self) -> &str;

    /// JSON Schema for input parameters.
    fn input_schema(&self) -> Value;

    /// Execute the tool with the given arguments. Failures are reported
    /// through `ToolResult::Error`, not by panicking.
    async fn execute(&self, args: Value) -> ToolResult;

    fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            input_schema: self.input_schema(),
        }
    }
}

pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Register a tool. Replaces any existing tool with the same name.
    pub fn register(&mut self, tool: impl Tool + 'static) {
        let name = tool.name().to_string();
        self.tools.insert(name, Arc::new(tool));
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    pub fn list(&self) -> Vec<&str> {
        self.tools.keys().map(|s| s.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Tool definitions for the model.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.values().map(|t| t.to_definition()).collect()
    }

    /// Invoke a named tool under a timeout, on its own task.
    ///
    /// `UnknownTool`, `ToolTimeout`, and a panic inside the tool
    /// (`ToolExecution`) are returned as errors for the caller to
    /// classify; the process never goes down with the tool.
    pub async fn invoke(
        &self,
        name: &str,
        call_id: &str,
        args: Value,
        timeout: Duration,
    ) -> Result<ToolOutcome> {
        let tool = self
            .tools
            .get(name)
            .cloned()
            .ok_or_else(|| Error::UnknownTool(name.to_string()))?;

        let mut handle = tokio::spawn(async move { tool.execute(args).await });

        let result = match tokio::time::timeout(timeout, &mut handle).await {
            Err(_) => {
                handle.abort();
                return Err(Error::ToolTimeout {
                    name: name.to_string(),
                    timeout_ms: timeout.as_millis() as u64,
                });
            }
            Ok(Err(join_err)) => {
                warn!("Tool '{}' panicked: {}", name, join_err);
                return Err(Error::tool_execution(
                    name,
                    format!("tool panicked: {}", join_err),
                ));
            }
            Ok(Ok(result)) => result,
        };

        Ok(ToolOutcome {
            call_id: call_id.to_string(),
            content: result.to_content_string(),
            is_error: result.is_error(),
        })
    }
}
