//! TTL-bounded session store
//!
//! The single source of truth for a run's conversational history. Records
//! are JSON-serialized into the cache backend under `session:{id}` with a
//! sliding expiration refreshed on every write. Messages are append-only;
//! the history trims oldest-first at `max_history`.

use crate::cache::CacheBackend;
use chrono::{DateTime, Utc};
use ragline_core::{Error, Message, Result, SessionConfig};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: String,
    pub user_id: String,
    pub messages: Vec<Message>,
    pub context: Map<String, Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub struct SessionStore {
    cache: Arc<dyn CacheBackend>,
    config: SessionConfig,
}

impl SessionStore {
    pub fn new(cache: Arc<dyn CacheBackend>, config: SessionConfig) -> Self {
        Self { cache, config }
    }

    fn key(id: &str) -> String {
        format!("session:{}", id)
    }

    fn ttl(&self) -> Duration {
        Duration::from_secs(self.config.ttl_secs)
    }

    async fn write(&self, record: &SessionRecord) -> Result<()> {
        let payload = serde_json::to_string(record)?;
        self.cache
            .set_with_ttl(&Self::key(&record.id), payload, self.ttl())
            .await;
        Ok(())
    }

    /// Create a session, generating an id when none is supplied.
    pub async fn create(
        &self,
        user_id: &str,
        session_id: Option<String>,
        initial_context: Option<Map<String, Value>>,
    ) -> Result<String> {
        let id = session_id.unwrap_or_else(|| Uuid::new_v4().to_string());
        let now = Utc::now();
        let record = SessionRecord {
            id: id.clone(),
            user_id: user_id.to_string(),
            messages: Vec::new(),
            context: initial_context.unwrap_or_default(),
            created_at: now,
            updated_at: now,
        };
        self.write(&record).await?;
        debug!("Session {} created for user {}", id, user_id);
        Ok(id)
    }

    pub async fn get(&self, session_id: &str) -> Result<Option<SessionRecord>> {
        match self.cache.get(&Self::key(session_id)).await {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    pub async fn exists(&self, session_id: &str) -> bool {
        self.cache.exists(&Self::key(session_id)).await
    }

    /// Delete a session. Returns false if it was absent.
    pub async fn delete(&self, session_id: &str) -> bool {
        self.cache.delete(&Self::key(session_id)).await
    }

    /// Append one message. Fails with `SessionNotFound` if the session has
    /// expired or never existed; trims to `max_history` oldest-first and
    /// refreshes the TTL.
    pub async fn append(&self, session_id: &str, message: Message) -> Result<()> {
        let mut record = self
            .get(session_id)
            .await?
            .ok_or_else(|| Error::SessionNotFound(session_id.to_string()))?;

        record.messages.push(message);
        let len = record.messages.len();
        if len > self.config.max_history {
            record.messages.drain(..len - self.config.max_history);
        }
        record.updated_at = Utc::now();
        self.write(&record).await
    }

    /// Merge (or replace) the session's free-form context map.
    pub async fn update_context(
        &self,
        session_id: &str,
        context: Map<String, Value>,
        merge: bool,
    ) -> Result<()> {
        let mut record = self
            .get(session_id)
            .await?
            .ok_or_else(|| Error::SessionNotFound(session_id.to_string()))?;

        if merge {
            record.context.extend(context);
        } else {
            record.context = context;
        }
        record.updated_at = Utc::now();
        self.write(&record).await
    }

    /// Refresh the TTL without writing. Returns false if the session is gone.
    pub async fn touch(&self, session_id: &str) -> bool {
        self.cache.expire(&Self::key(session_id), self.ttl()).await
    }
}
