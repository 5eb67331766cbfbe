//! Configuration for the agent runtime and its components
//!
//! Loaded from a TOML file with every field defaulted, so a missing or
//! partial config is always valid.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Agent loop configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AgentConfig {
    #[serde(default = "default_model")]
    pub model: String,
    /// Hard cap on reasoning turns per run - the primary fail-safe
    /// against runaway tool-calling loops.
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
    #[serde(default = "default_true")]
    pub enable_retrieval: bool,
    /// Number of chunks pulled into the system prompt per run.
    #[serde(default = "default_retrieval_k")]
    pub retrieval_k: usize,
    #[serde(default)]
    pub system_prompt: Option<String>,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            max_iterations: default_max_iterations(),
            enable_retrieval: true,
            retrieval_k: default_retrieval_k(),
            system_prompt: None,
            max_tokens: default_max_tokens(),
        }
    }
}

/// Hybrid retrieval configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetrievalConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
    #[serde(default = "default_vector_weight")]
    pub vector_weight: f32,
    #[serde(default = "default_keyword_weight")]
    pub keyword_weight: f32,
    /// Minimum fused score; results below it are dropped.
    #[serde(default)]
    pub score_threshold: Option<f32>,
    #[serde(default = "default_k")]
    pub k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            vector_weight: default_vector_weight(),
            keyword_weight: default_keyword_weight(),
            score_threshold: None,
            k: default_k(),
        }
    }
}

/// Session memory configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Sliding expiration in seconds, refreshed on every write.
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
    /// Maximum message history per session; oldest messages evicted first.
    #[serde(default = "default_max_history")]
    pub max_history: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_ttl_secs(),
            max_history: default_max_history(),
        }
    }
}

/// Tool invocation configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolConfig {
    #[serde(default = "default_tool_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_tool_timeout_secs(),
        }
    }
}

/// Top-level configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RaglineConfig {
    #[serde(default)]
    pub agent: AgentConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub tools: ToolConfig,
}

impl RaglineConfig {
    /// Load from a TOML file. A missing file yields the defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)?;
        toml::from_str(&raw).map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
    }
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}
fn default_max_iterations() -> usize {
    10
}
fn default_retrieval_k() -> usize {
    3
}
fn default_max_tokens() -> u32 {
    4096
}
fn default_chunk_size() -> usize {
    1000
}
fn default_chunk_overlap() -> usize {
    200
}
fn default_vector_weight() -> f32 {
    0.7
}
fn default_keyword_weight() -> f32 {
    0.3
}
fn default_k() -> usize {
    5
}
fn default_ttl_secs() -> u64 {
    3600
}
fn default_max_history() -> usize {
    50
}
fn default_tool_timeout_secs() -> u64 {
    30
}
fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = RaglineConfig::default();
        assert_eq!(config.agent.max_iterations, 10);
        assert!(config.agent.enable_retrieval);
        assert_eq!(config.retrieval.vector_weight, 0.7);
        assert_eq!(config.retrieval.keyword_weight, 0.3);
        assert_eq!(config.retrieval.chunk_size, 1000);
        assert_eq!(config.retrieval.chunk_overlap, 200);
        assert_eq!(config.session.max_history, 50);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let config: RaglineConfig =
            toml::from_str("[agent]\nmax_iterations = 3\n[retrieval]\nk = 2\n").unwrap();
        assert_eq!(config.agent.max_iterations, 3);
        assert_eq!(config.agent.model, "gpt-4o-mini");
        assert_eq!(config.retrieval.k, 2);
        assert_eq!(config.retrieval.chunk_size, 1000);
    }
}
