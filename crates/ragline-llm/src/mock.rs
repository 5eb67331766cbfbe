//! Deterministic model and embedder implementations for testing
//!
//! `MockModel` replays a scripted sequence of behaviors, one per reasoning
//! turn. `HashEmbedder` maps text to a fixed-dimension vector from token
//! hashes, so identical text always embeds identically and texts sharing
//! tokens land near each other.

use crate::provider::{Embedder, LanguageModel, LlmError, LlmResult, LlmStream};
use crate::types::{AssistantTurn, ChatRequest, StreamDelta};
use ragline_core::ToolCall;
use serde_json::Value;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Mutex;

/// One scripted model turn
#[derive(Clone, Debug)]
pub enum MockBehavior {
    /// Text-only response
    Text(String),
    /// A single tool call with the given name and arguments
    ToolCall { name: String, args: Value },
    /// Several tool calls in one turn
    MultiToolCall(Vec<(String, Value)>),
    /// Text followed by a tool call
    TextThenTool {
        text: String,
        tool_name: String,
        tool_args: Value,
    },
    /// Model-level failure
    Error(String),
}

/// A scripted language model. Each call pops the next behavior; when the
/// sequence is exhausted the default behavior repeats.
pub struct MockModel {
    behaviors: Mutex<Vec<MockBehavior>>,
    default_behavior: MockBehavior,
    calls: AtomicUsize,
}

impl MockModel {
    /// Always return the same behavior.
    pub fn constant(behavior: MockBehavior) -> Self {
        Self {
            behaviors: Mutex::new(Vec::new()),
            default_behavior: behavior,
            calls: AtomicUsize::new(0),
        }
    }

    /// Consume behaviors in order, then fall back to a fixed text reply.
    pub fn sequence(behaviors: Vec<MockBehavior>) -> Self {
        Self {
            behaviors: Mutex::new(behaviors),
            default_behavior: MockBehavior::Text("(mock: sequence exhausted)".to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of reasoning turns served so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn next_behavior(&self) -> MockBehavior {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut behaviors = self.behaviors.lock().await;
        if behaviors.is_empty() {
            self.default_behavior.clone()
        } else {
            behaviors.remove(0)
        }
    }

    fn turn_for(&self, behavior: MockBehavior, n: usize) -> LlmResult<AssistantTurn> {
        let call_id = |i: usize| format!("call_mock_{}_{}", n, i);
        match behavior {
            MockBehavior::Text(text) => Ok(AssistantTurn {
                content: text,
                tool_calls: Vec::new(),
            }),
            MockBehavior::ToolCall { name, args } => Ok(AssistantTurn {
                content: String::new(),
                tool_calls: vec![ToolCall {
                    id: call_id(0),
                    name,
                    arguments: args,
                }],
            }),
            MockBehavior::MultiToolCall(calls) => Ok(AssistantTurn {
                content: String::new(),
                tool_calls: calls
                    .into_iter()
                    .enumerate()
                    .map(|(i, (name, args))| ToolCall {
                        id: call_id(i),
                        name,
                        arguments: args,
                    })
                    .collect(),
            }),
            MockBehavior::TextThenTool {
                text,
                tool_name,
                tool_args,
            } => Ok(AssistantTurn {
                content: text,
                tool_calls: vec![ToolCall {
                    id: call_id(0),
                    name: tool_name,
                    arguments: tool_args,
                }],
            }),
            MockBehavior::Error(message) => Err(LlmError::RequestFailed(message)),
        }
    }
}

#[async_trait::async_trait]
impl LanguageModel for MockModel {
    fn name(&self) -> &str {
        "mock"
    }

    async fn generate(&self, _request: ChatRequest) -> LlmResult<AssistantTurn> {
        let n = self.call_count();
        let behavior = self.next_behavior().await;
        self.turn_for(behavior, n)
    }

    async fn stream(&self, request: ChatRequest) -> LlmResult<LlmStream> {
        let turn = self.generate(request).await?;
        let stream = async_stream::stream! {
            // Chunked like a real model streams tokens
            let bytes = turn.content.as_bytes();
            for chunk in bytes.chunks(8) {
                yield Ok(StreamDelta::Text(String::from_utf8_lossy(chunk).to_string()));
            }
            for tc in turn.tool_calls {
                yield Ok(StreamDelta::ToolCallStart { id: tc.id.clone(), name: tc.name.clone() });
                yield Ok(StreamDelta::ToolCallDelta {
                    id: tc.id.clone(),
                    arguments: tc.arguments.to_string(),
                });
                yield Ok(StreamDelta::ToolCallEnd { id: tc.id });
            }
            yield Ok(StreamDelta::Done { stop_reason: Some("end_turn".to_string()) });
        };
        Ok(Box::pin(stream))
    }
}

/// Hash-based embedder: each whitespace token bumps one dimension, then the
/// vector is L2-normalized. Deterministic across runs and processes.
pub struct HashEmbedder {
    dimension: usize,
}

impl HashEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self::new(64)
    }
}

#[async_trait::async_trait]
impl Embedder for HashEmbedder {
    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed(&self, text: &str) -> LlmResult<Vec<f32>> {
        let mut vector = vec![0.0f32; self.dimension];
        for token in text.to_lowercase().split_whitespace() {
            let mut hasher = DefaultHasher::new();
            token.hash(&mut hasher);
            let slot = (hasher.finish() as usize) % self.dimension;
            vector[slot] += 1.0;
        }
        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut vector {
                *v /= norm;
            }
        }
        Ok(vector)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn hash_embedder_is_deterministic() {
        let embedder = HashEmbedder::new(32);
        let a = embedder.embed("rust agents are fun").await.unwrap();
        let b = embedder.embed("rust agents are fun").await.unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 32);
    }

    #[tokio::test]
    async fn mock_sequence_is_consumed_in_order() {
        let model = MockModel::sequence(vec![
            MockBehavior::Text("first".to_string()),
            MockBehavior::Text("second".to_string()),
        ]);
        let one = model.generate(ChatRequest::default()).await.unwrap();
        let two = model.generate(ChatRequest::default()).await.unwrap();
        let three = model.generate(ChatRequest::default()).await.unwrap();
        assert_eq!(one.content, "first");
        assert_eq!(two.content, "second");
        assert!(three.content.contains("exhausted"));
        assert_eq!(model.call_count(), 3);
    }

    #[tokio::test]
    async fn mock_stream_ends_with_done() {
        use futures::StreamExt;
        let model = MockModel::constant(MockBehavior::Text("hello world".to_string()));
        let mut stream = model.stream(ChatRequest::default()).await.unwrap();
        let mut saw_done = false;
        let mut text = String::new();
        while let Some(delta) = stream.next().await {
            match delta.unwrap() {
                StreamDelta::Text(t) => text.push_str(&t),
                StreamDelta::Done { .. } => saw_done = true,
                _ => {}
            }
        }
        assert_eq!(text, "hello world");
        assert!(saw_done);
    }
}
