//! LanguageModel and Embedder traits

use crate::types::{AssistantTurn, ChatRequest, StreamDelta};
use futures::Stream;
use std::pin::Pin;

/// Result type for LLM operations
pub type LlmResult<T> = Result<T, LlmError>;

/// LLM error types
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("request failed: {0}")]
    RequestFailed(String),

    #[error("authentication failed: {0}")]
    AuthFailed(String),

    #[error("rate limited: retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("stream error: {0}")]
    StreamError(String),

    #[error("network error: {0}")]
    NetworkError(#[from] reqwest::Error),
}

impl From<LlmError> for ragline_core::Error {
    fn from(e: LlmError) -> Self {
        ragline_core::Error::LanguageModel(e.to_string())
    }
}

/// Stream type for model responses
pub type LlmStream = Pin<Box<dyn Stream<Item = LlmResult<StreamDelta>> + Send>>;

/// Language model contract consumed by the agent loop.
///
/// `generate` returns one full assistant turn; `stream` yields deltas in
/// generation order and terminates with `StreamDelta::Done`.
#[async_trait::async_trait]
pub trait LanguageModel: Send + Sync {
    fn name(&self) -> &str;

    async fn generate(&self, request: ChatRequest) -> LlmResult<AssistantTurn>;

    async fn stream(&self, request: ChatRequest) -> LlmResult<LlmStream>;
}

/// Embedding contract consumed by the retrieval engine
#[async_trait::async_trait]
pub trait Embedder: Send + Sync {
    /// Fixed output dimension for every vector this embedder produces.
    fn dimension(&self) -> usize;

    async fn embed(&self, text: &str) -> LlmResult<Vec<f32>>;
}
