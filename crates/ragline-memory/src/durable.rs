//! Durable persistence seam
//!
//! The agent writes to the durable store fire-and-forget after a run;
//! failures are logged and swallowed and never affect the returned
//! response.

use ragline_core::{Message, Result};
use tracing::debug;

#[async_trait::async_trait]
pub trait DurableStore: Send + Sync {
    async fn append_message(&self, session_id: &str, message: &Message) -> Result<()>;
}

/// No-op store for deployments without long-term persistence.
#[derive(Default)]
pub struct NullDurableStore;

#[async_trait::async_trait]
impl DurableStore for NullDurableStore {
    async fn append_message(&self, session_id: &str, message: &Message) -> Result<()> {
        debug!("Durable append skipped (null store): session={}", session_id);
        let _ = message;
        Ok(())
    }
}
