//! ragline — agent orchestration over hybrid retrieval
//!
//! Facade crate re-exporting the workspace: a bounded reason/act agent
//! loop (`AgentRuntime`), hybrid vector+keyword retrieval, TTL session
//! memory, and a timeout-isolated tool registry.

pub use ragline_agent::{AgentEvent, AgentRuntime, RunOptions, RunOutcome, ToolCallRecord};
pub use ragline_core::{
    AgentConfig, Error, Message, RaglineConfig, Result, RetrievalConfig, RetrievalHit, Role,
    SessionConfig, ToolCall, ToolConfig, ToolDefinition, ToolOutcome,
};
pub use ragline_llm::{Embedder, LanguageModel, LlmError, OpenAiEmbedder, OpenAiProvider};
pub use ragline_memory::{
    CacheBackend, DurableStore, MemoryCache, NullDurableStore, SessionRecord, SessionStore,
};
pub use ragline_retrieval::RetrievalEngine;
pub use ragline_tools::{create_default_registry, Tool, ToolRegistry, ToolResult};

use std::sync::Arc;

/// Assemble a runtime from config: OpenAI provider and embedder, the
/// default tool registry, and in-process session memory.
///
/// Tests and offline callers should wire `AgentRuntime::new` by hand
/// with mock components instead.
pub fn build_runtime(api_key: &str, config: RaglineConfig) -> Arc<AgentRuntime> {
    let model = Arc::new(OpenAiProvider::new(api_key));
    let embedder = Arc::new(OpenAiEmbedder::new(api_key, "text-embedding-3-small", 1536));
    let retrieval = Arc::new(RetrievalEngine::new(embedder, config.retrieval.clone()));
    let sessions = Arc::new(SessionStore::new(
        Arc::new(MemoryCache::new()),
        config.session.clone(),
    ));
    let tools = Arc::new(create_default_registry());
    Arc::new(AgentRuntime::new(model, retrieval, sessions, tools, config))
}
