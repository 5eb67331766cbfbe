//! Ragline LLM - language-model and embedder contracts with an
//! OpenAI-compatible streaming provider

pub mod mock;
pub mod openai;
pub mod provider;
pub mod types;

pub use openai::{OpenAiEmbedder, OpenAiProvider};
pub use provider::{Embedder, LanguageModel, LlmError, LlmResult, LlmStream};
pub use types::*;
