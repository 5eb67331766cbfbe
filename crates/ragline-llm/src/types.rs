//! Request and streaming-response types for language models

use ragline_core::{Message, ToolCall, ToolDefinition};
use serde::Serialize;

/// A chat completion request
#[derive(Clone, Debug, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<Message>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolDefinition>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// System prompt, sent as the leading system message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
}

impl Default for ChatRequest {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            messages: Vec::new(),
            tools: Vec::new(),
            max_tokens: Some(4096),
            temperature: None,
            system: None,
        }
    }
}

/// The assistant's reply to one reasoning turn: text content plus
/// zero or more tool-call requests.
#[derive(Clone, Debug, Default)]
pub struct AssistantTurn {
    pub content: String,
    pub tool_calls: Vec<ToolCall>,
}

/// Streaming delta from the model
#[derive(Clone, Debug)]
pub enum StreamDelta {
    Text(String),
    ToolCallStart { id: String, name: String },
    ToolCallDelta { id: String, arguments: String },
    ToolCallEnd { id: String },
    Done { stop_reason: Option<String> },
    Error(String),
}

/// Tool call accumulated from streaming argument fragments
#[derive(Clone, Debug, Default)]
pub struct AccumulatedToolCall {
    pub id: String,
    pub name: String,
    pub arguments: String,
}

impl AccumulatedToolCall {
    /// Parse the accumulated argument fragments. An empty buffer parses
    /// as an empty object, which models emit for zero-argument calls.
    pub fn parse_arguments(&self) -> serde_json::Value {
        if self.arguments.trim().is_empty() {
            return serde_json::json!({});
        }
        serde_json::from_str(&self.arguments).unwrap_or(serde_json::Value::Null)
    }

    pub fn into_tool_call(self) -> ToolCall {
        let arguments = self.parse_arguments();
        ToolCall {
            id: self.id,
            name: self.name,
            arguments,
        }
    }
}
