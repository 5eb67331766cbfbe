//! Agent runtime - the bounded reason/act loop over retrieval, memory,
//! and tools

use crate::events::AgentEvent;
use crate::state::{LoopState, Phase, RunOptions, RunOutcome, ToolCallRecord};
use dashmap::DashMap;
use futures::StreamExt;
use ragline_core::{Error, Message, RaglineConfig, Result, RetrievalHit, ToolCall, ToolOutcome};
use ragline_llm::{AccumulatedToolCall, AssistantTurn, ChatRequest, LanguageModel, StreamDelta};
use ragline_memory::{DurableStore, NullDurableStore, SessionRecord, SessionStore};
use ragline_retrieval::RetrievalEngine;
use ragline_tools::ToolRegistry;
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio::time::Instant;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info, warn};

const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant. Use the available tools when \
     they help answer the question, and ground your answers in the provided context when it is \
     relevant.";

/// Gate map size above which idle gates are swept.
const GATE_SWEEP_THRESHOLD: usize = 64;

pub struct AgentRuntime {
    model: Arc<dyn LanguageModel>,
    retrieval: Arc<RetrievalEngine>,
    sessions: Arc<SessionStore>,
    tools: Arc<ToolRegistry>,
    durable: Arc<dyn DurableStore>,
    config: RaglineConfig,
    /// Per-session run gates. Runs against the same session serialize;
    /// runs against different sessions proceed concurrently.
    gates: DashMap<String, Arc<Mutex<()>>>,
}

impl AgentRuntime {
    pub fn new(
        model: Arc<dyn LanguageModel>,
        retrieval: Arc<RetrievalEngine>,
        sessions: Arc<SessionStore>,
        tools: Arc<ToolRegistry>,
        config: RaglineConfig,
    ) -> Self {
        Self {
            model,
            retrieval,
            sessions,
            tools,
            durable: Arc::new(NullDurableStore),
            config,
            gates: DashMap::new(),
        }
    }

    pub fn with_durable(mut self, durable: Arc<dyn DurableStore>) -> Self {
        self.durable = durable;
        self
    }

    pub fn tools(&self) -> &Arc<ToolRegistry> {
        &self.tools
    }

    pub fn config(&self) -> &RaglineConfig {
        &self.config
    }

    /// Run one user message to completion and return the final outcome.
    ///
    /// Tool and retrieval failures degrade the run but never fail it;
    /// model errors and a missing session are fatal.
    pub async fn run(
        &self,
        user_id: &str,
        session_id: Option<String>,
        message: &str,
        options: RunOptions,
    ) -> Result<RunOutcome> {
        if message.trim().is_empty() {
            return Err(Error::EmptyMessage);
        }
        let session_id = self.resolve_session(user_id, session_id).await?;
        let max_iterations = options
            .max_iterations
            .unwrap_or(self.config.agent.max_iterations);
        let mut state = LoopState::new(max_iterations);
        let response = self
            .run_loop(&session_id, message, &options, &mut state, None)
            .await?;

        info!(
            "Run complete: session={}, iterations={}, tool_calls={}",
            session_id,
            state.iterations,
            state.tool_calls.len()
        );
        Ok(RunOutcome {
            response,
            session_id,
            tool_calls: state.tool_calls,
            iterations: state.iterations,
        })
    }

    /// Streaming variant of [`run`](Self::run). Events arrive in causal
    /// order; the stream always terminates with exactly one `Done`,
    /// preceded by an `Error` when the run failed.
    pub fn stream(
        self: Arc<Self>,
        user_id: impl Into<String>,
        session_id: Option<String>,
        message: impl Into<String>,
        options: RunOptions,
    ) -> ReceiverStream<AgentEvent> {
        let (tx, rx) = mpsc::channel(64);
        let runtime = self;
        let user_id = user_id.into();
        let message = message.into();
        tokio::spawn(async move {
            runtime
                .stream_run(&user_id, session_id, &message, options, tx)
                .await;
        });
        ReceiverStream::new(rx)
    }

    async fn stream_run(
        &self,
        user_id: &str,
        session_id: Option<String>,
        message: &str,
        options: RunOptions,
        tx: mpsc::Sender<AgentEvent>,
    ) {
        if message.trim().is_empty() {
            let _ = tx
                .send(AgentEvent::Error {
                    message: Error::EmptyMessage.to_string(),
                })
                .await;
            let _ = tx
                .send(AgentEvent::Done {
                    session_id: session_id.unwrap_or_default(),
                    iterations: 0,
                })
                .await;
            return;
        }

        let resolved = match self.resolve_session(user_id, session_id).await {
            Ok(id) => id,
            Err(e) => {
                let _ = tx
                    .send(AgentEvent::Error {
                        message: e.to_string(),
                    })
                    .await;
                let _ = tx
                    .send(AgentEvent::Done {
                        session_id: String::new(),
                        iterations: 0,
                    })
                    .await;
                return;
            }
        };

        let max_iterations = options
            .max_iterations
            .unwrap_or(self.config.agent.max_iterations);
        let mut state = LoopState::new(max_iterations);
        if let Err(e) = self
            .run_loop(&resolved, message, &options, &mut state, Some(&tx))
            .await
        {
            let _ = tx
                .send(AgentEvent::Error {
                    message: e.to_string(),
                })
                .await;
        }
        let _ = tx
            .send(AgentEvent::Done {
                session_id: resolved,
                iterations: state.iterations,
            })
            .await;
    }

    /// The shared loop. `events` is present for streaming runs; the
    /// non-streaming path uses the model's one-shot API instead.
    async fn run_loop(
        &self,
        session_id: &str,
        message: &str,
        options: &RunOptions,
        state: &mut LoopState,
        events: Option<&mpsc::Sender<AgentEvent>>,
    ) -> Result<String> {
        let gate = self.gate(session_id);
        let _serial = gate.lock().await;
        check_deadline(options.deadline)?;

        // History is read once per run; later writers to other sessions
        // never interleave because of the gate.
        let record = self
            .sessions
            .get(session_id)
            .await?
            .ok_or_else(|| Error::SessionNotFound(session_id.to_string()))?;
        let mut messages = record.messages;

        let user_message = Message::user(message);
        messages.push(user_message.clone());
        self.sessions.append(session_id, user_message.clone()).await?;
        state.new_messages.push(user_message);

        let enable_retrieval = options
            .enable_retrieval
            .unwrap_or(self.config.agent.enable_retrieval);

        let mut phase = Phase::Retrieve;
        let mut context: Option<String> = None;
        let mut pending_calls: Vec<ToolCall> = Vec::new();
        let mut response = String::new();

        loop {
            match phase {
                Phase::Retrieve => {
                    if enable_retrieval {
                        context = self.retrieve_context(message).await;
                    }
                    phase = Phase::after_retrieve();
                }
                Phase::Reason => {
                    check_deadline(options.deadline)?;
                    let request = self.chat_request(&messages, context.as_deref());
                    let turn = match events {
                        Some(tx) => self.collect_stream(request, tx).await?,
                        None => self.model.generate(request).await?,
                    };
                    state.iterations += 1;

                    let requested = !turn.tool_calls.is_empty();
                    let assistant = if requested {
                        pending_calls = turn.tool_calls.clone();
                        Message::assistant_with_tools(turn.content.clone(), turn.tool_calls)
                    } else {
                        Message::assistant(turn.content.clone())
                    };
                    messages.push(assistant.clone());
                    self.sessions.append(session_id, assistant.clone()).await?;
                    state.new_messages.push(assistant);

                    if !turn.content.is_empty() {
                        response = turn.content;
                    }
                    phase = Phase::after_reason(requested, state.at_cap());
                }
                Phase::ActTools => {
                    for call in std::mem::take(&mut pending_calls) {
                        check_deadline(options.deadline)?;
                        if let Some(tx) = events {
                            let _ = tx
                                .send(AgentEvent::ToolStart {
                                    id: call.id.clone(),
                                    name: call.name.clone(),
                                })
                                .await;
                        }
                        let outcome = self.invoke_tool(&call).await?;
                        if let Some(tx) = events {
                            let _ = tx
                                .send(AgentEvent::ToolEnd {
                                    id: call.id.clone(),
                                    name: call.name.clone(),
                                    output: outcome.content.clone(),
                                    is_error: outcome.is_error,
                                })
                                .await;
                        }
                        state.tool_calls.push(ToolCallRecord {
                            name: call.name.clone(),
                            arguments: call.arguments.clone(),
                            output: outcome.content.clone(),
                            is_error: outcome.is_error,
                        });
                        let tool_message = Message::tool_result(call.id, outcome.content);
                        messages.push(tool_message.clone());
                        self.sessions
                            .append(session_id, tool_message.clone())
                            .await?;
                        state.new_messages.push(tool_message);
                    }
                    phase = Phase::after_act(state.at_cap());
                }
                Phase::Persist => {
                    self.persist_durable(session_id, &state.new_messages);
                    phase = Phase::Done;
                }
                Phase::Done => break,
            }
        }

        Ok(response)
    }

    /// Get or create a session. A supplied id that no longer exists is
    /// recreated under the same id, so expired sessions restart cleanly.
    async fn resolve_session(&self, user_id: &str, session_id: Option<String>) -> Result<String> {
        if let Some(id) = &session_id {
            if self.sessions.exists(id).await {
                return Ok(id.clone());
            }
            // The session expired; its gate is stale too.
            self.gates.remove(id.as_str());
        }
        self.sessions.create(user_id, session_id, None).await
    }

    fn gate(&self, session_id: &str) -> Arc<Mutex<()>> {
        // A gate referenced only by the map has no active or queued run;
        // sweeping it keeps the map bounded as sessions expire by TTL.
        // Dropped gates are recreated on the next run for that session.
        if self.gates.len() > GATE_SWEEP_THRESHOLD {
            self.gates.retain(|_, gate| Arc::strong_count(gate) > 1);
        }
        self.gates
            .entry(session_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Number of tracked run gates, for observability.
    pub fn active_gates(&self) -> usize {
        self.gates.len()
    }

    /// Retrieval is best-effort: a degraded or empty result means the
    /// model reasons without grounding context.
    async fn retrieve_context(&self, query: &str) -> Option<String> {
        match self
            .retrieval
            .search(query, self.config.agent.retrieval_k)
            .await
        {
            Ok(hits) if !hits.is_empty() => Some(RetrievalEngine::format_context(&hits)),
            Ok(_) => None,
            Err(e) => {
                warn!("Retrieval degraded, continuing without context: {}", e);
                None
            }
        }
    }

    fn chat_request(&self, messages: &[Message], context: Option<&str>) -> ChatRequest {
        let base = self
            .config
            .agent
            .system_prompt
            .clone()
            .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string());
        let system = match context {
            Some(ctx) => format!(
                "{}\n\nRelevant context from knowledge base:\n{}",
                base, ctx
            ),
            None => base,
        };
        ChatRequest {
            model: self.config.agent.model.clone(),
            messages: messages.to_vec(),
            tools: self.tools.definitions(),
            max_tokens: Some(self.config.agent.max_tokens),
            temperature: None,
            system: Some(system),
        }
    }

    /// Invoke one tool call. Absorbed errors (unknown tool, timeout,
    /// panic) come back as error-flagged outcomes the model can read
    /// on the next turn; anything else fails the run.
    async fn invoke_tool(&self, call: &ToolCall) -> Result<ToolOutcome> {
        let timeout = Duration::from_secs(self.config.tools.timeout_secs);
        match self
            .tools
            .invoke(&call.name, &call.id, call.arguments.clone(), timeout)
            .await
        {
            Ok(outcome) => Ok(outcome),
            Err(e) if e.is_absorbed() => {
                warn!("Tool call '{}' degraded: {}", call.name, e);
                Ok(ToolOutcome {
                    call_id: call.id.clone(),
                    content: format!("Error: {}", e),
                    is_error: true,
                })
            }
            Err(e) => Err(e),
        }
    }

    /// Drain one model stream into a full assistant turn, forwarding
    /// text tokens as events. Argument fragments accumulate per call id.
    async fn collect_stream(
        &self,
        request: ChatRequest,
        tx: &mpsc::Sender<AgentEvent>,
    ) -> Result<AssistantTurn> {
        let mut stream = self.model.stream(request).await?;
        let mut content = String::new();
        let mut open: Vec<AccumulatedToolCall> = Vec::new();
        let mut finished: Vec<ToolCall> = Vec::new();

        while let Some(delta) = stream.next().await {
            match delta? {
                StreamDelta::Text(text) => {
                    content.push_str(&text);
                    let _ = tx.send(AgentEvent::Token { text }).await;
                }
                StreamDelta::ToolCallStart { id, name } => {
                    open.push(AccumulatedToolCall {
                        id,
                        name,
                        arguments: String::new(),
                    });
                }
                StreamDelta::ToolCallDelta { id, arguments } => {
                    if let Some(call) = open.iter_mut().find(|c| c.id == id) {
                        call.arguments.push_str(&arguments);
                    }
                }
                StreamDelta::ToolCallEnd { id } => {
                    if let Some(pos) = open.iter().position(|c| c.id == id) {
                        finished.push(open.remove(pos).into_tool_call());
                    }
                }
                StreamDelta::Done { stop_reason } => {
                    debug!("Model stream done: stop_reason={:?}", stop_reason);
                    break;
                }
                StreamDelta::Error(message) => {
                    return Err(Error::language_model(message));
                }
            }
        }

        // Calls left open by a truncated stream are flushed as-is.
        for call in open {
            finished.push(call.into_tool_call());
        }

        Ok(AssistantTurn {
            content,
            tool_calls: finished,
        })
    }

    /// Fire-and-forget durable writes. Failures are logged and never
    /// affect the returned outcome.
    fn persist_durable(&self, session_id: &str, messages: &[Message]) {
        let durable = Arc::clone(&self.durable);
        let session_id = session_id.to_string();
        let messages = messages.to_vec();
        tokio::spawn(async move {
            for message in &messages {
                if let Err(e) = durable.append_message(&session_id, message).await {
                    warn!("Durable write failed for session {}: {}", session_id, e);
                }
            }
        });
    }

    // --- knowledge base and session facade ---

    pub async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<RetrievalHit>> {
        self.retrieval.search(query, k).await
    }

    pub async fn ingest_document(
        &self,
        content: &str,
        title: &str,
        source: Option<&str>,
        metadata: Option<Map<String, Value>>,
    ) -> Result<Vec<String>> {
        self.retrieval.ingest(content, title, source, metadata).await
    }

    pub async fn delete_document(&self, parent_id: &str) -> usize {
        self.retrieval.delete(parent_id).await
    }

    pub async fn create_session(&self, user_id: &str, session_id: Option<String>) -> Result<String> {
        self.sessions.create(user_id, session_id, None).await
    }

    pub async fn get_session(&self, session_id: &str) -> Result<Option<SessionRecord>> {
        self.sessions.get(session_id).await
    }

    pub async fn delete_session(&self, session_id: &str) -> bool {
        self.gates.remove(session_id);
        self.sessions.delete(session_id).await
    }
}

fn check_deadline(deadline: Option<Instant>) -> Result<()> {
    match deadline {
        Some(d) if Instant::now() >= d => Err(Error::DeadlineExceeded),
        _ => Ok(()),
    }
}
