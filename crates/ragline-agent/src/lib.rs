//! Ragline Agent - the bounded reason/act loop
//!
//! `AgentRuntime` wires the language model, hybrid retrieval, session
//! memory, and the tool registry into a single run loop. One run is one
//! user message carried to completion: retrieve context, reason, act on
//! tool calls, persist, done.

pub mod events;
pub mod runtime;
pub mod state;

pub use events::AgentEvent;
pub use runtime::AgentRuntime;
pub use state::{LoopState, Phase, RunOptions, RunOutcome, ToolCallRecord};
