//! Events emitted during a streaming run
//!
//! Wire-stable: the tagged JSON shape is what SSE/WebSocket front-ends
//! consume. A stream ends with exactly one `Done`, preceded by an `Error`
//! when the run failed.

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentEvent {
    /// Incremental assistant text.
    Token { text: String },
    ToolStart {
        id: String,
        name: String,
    },
    ToolEnd {
        id: String,
        name: String,
        output: String,
        is_error: bool,
    },
    Error { message: String },
    /// Terminal event, emitted exactly once per stream.
    Done { session_id: String, iterations: usize },
}
