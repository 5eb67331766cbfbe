//! Run loop phases and bookkeeping
//!
//! The loop is a small state machine: Retrieve -> Reason -> (ActTools ->
//! Reason)* -> Persist -> Done. Transitions are pure functions of what the
//! model requested and whether the iteration cap is reached, so the loop
//! shape is testable without a model.

use ragline_core::Message;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Retrieve,
    Reason,
    ActTools,
    Persist,
    Done,
}

impl Phase {
    /// Retrieval always hands off to reasoning, even when it degraded.
    pub fn after_retrieve() -> Self {
        Phase::Reason
    }

    /// A turn with no tool calls is final. Hitting the iteration cap ends
    /// the run normally; any requested calls at the cap are not executed.
    pub fn after_reason(requested_tools: bool, at_cap: bool) -> Self {
        if requested_tools && !at_cap {
            Phase::ActTools
        } else {
            Phase::Persist
        }
    }

    pub fn after_act(at_cap: bool) -> Self {
        if at_cap {
            Phase::Persist
        } else {
            Phase::Reason
        }
    }
}

/// Per-run options, overriding the configured defaults where set.
#[derive(Clone, Debug, Default)]
pub struct RunOptions {
    pub enable_retrieval: Option<bool>,
    pub max_iterations: Option<usize>,
    /// Absolute deadline for the whole run, checked at suspension points.
    pub deadline: Option<tokio::time::Instant>,
}

/// One executed tool call, recorded for the run outcome.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolCallRecord {
    pub name: String,
    pub arguments: Value,
    pub output: String,
    pub is_error: bool,
}

/// Mutable loop state for a single run.
pub struct LoopState {
    pub iterations: usize,
    pub max_iterations: usize,
    pub tool_calls: Vec<ToolCallRecord>,
    /// Messages created by this run, in order, for durable persistence.
    pub new_messages: Vec<Message>,
}

impl LoopState {
    pub fn new(max_iterations: usize) -> Self {
        Self {
            iterations: 0,
            max_iterations,
            tool_calls: Vec::new(),
            new_messages: Vec::new(),
        }
    }

    pub fn at_cap(&self) -> bool {
        self.iterations >= self.max_iterations
    }
}

/// The completed run, mirroring what non-streaming callers receive.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunOutcome {
    pub response: String,
    pub session_id: String,
    pub tool_calls: Vec<ToolCallRecord>,
    pub iterations: usize,
}
