//! Error types for ragline
//!
//! Tool and retrieval failures are absorbed by the agent loop and become
//! degraded inputs for the next reasoning turn; language-model and
//! missing-session errors propagate to the caller as run failures.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("session not found: {0}")]
    SessionNotFound(String),

    #[error("unknown tool: {0}")]
    UnknownTool(String),

    #[error("tool '{name}' timed out after {timeout_ms}ms")]
    ToolTimeout { name: String, timeout_ms: u64 },

    #[error("tool '{name}' failed: {message}")]
    ToolExecution { name: String, message: String },

    #[error("retrieval unavailable: {0}")]
    RetrievalUnavailable(String),

    #[error("language model error: {0}")]
    LanguageModel(String),

    #[error("persistence failure: {0}")]
    Persistence(String),

    #[error("run deadline exceeded")]
    DeadlineExceeded,

    #[error("message must not be empty")]
    EmptyMessage,

    #[error("config error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn tool_execution(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ToolExecution {
            name: name.into(),
            message: message.into(),
        }
    }

    pub fn language_model(message: impl Into<String>) -> Self {
        Self::LanguageModel(message.into())
    }

    /// Whether the agent loop absorbs this error into a degraded input
    /// instead of failing the run.
    pub fn is_absorbed(&self) -> bool {
        matches!(
            self,
            Self::UnknownTool(_)
                | Self::ToolTimeout { .. }
                | Self::ToolExecution { .. }
                | Self::RetrievalUnavailable(_)
                | Self::Persistence(_)
        )
    }
}
