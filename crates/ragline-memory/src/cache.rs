//! Key-value cache backend with per-key expiration
//!
//! The contract mirrors what a redis-style store provides: get,
//! set-with-ttl, delete, exists, and TTL refresh. `MemoryCache` is the
//! in-process implementation; deadlines use `tokio::time::Instant` so
//! expiry behaves correctly under the paused test clock.

use dashmap::DashMap;
use std::time::Duration;
use tokio::time::Instant;

#[async_trait::async_trait]
pub trait CacheBackend: Send + Sync {
    /// Get a value; absent or expired keys return None.
    async fn get(&self, key: &str) -> Option<String>;

    /// Set a value with a fresh TTL.
    async fn set_with_ttl(&self, key: &str, value: String, ttl: Duration);

    /// Delete a key. Returns false if it was absent.
    async fn delete(&self, key: &str) -> bool;

    async fn exists(&self, key: &str) -> bool;

    /// Refresh a key's TTL without touching the value.
    /// Returns false if the key was absent or expired.
    async fn expire(&self, key: &str, ttl: Duration) -> bool;
}

#[derive(Default)]
pub struct MemoryCache {
    entries: DashMap<String, (String, Instant)>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Expired entries are dropped lazily on access.
    fn live(&self, key: &str) -> Option<String> {
        let expired = match self.entries.get(key) {
            Some(entry) => {
                let (value, deadline) = entry.value();
                if Instant::now() < *deadline {
                    return Some(value.clone());
                }
                true
            }
            None => false,
        };
        if expired {
            self.entries.remove(key);
        }
        None
    }
}

#[async_trait::async_trait]
impl CacheBackend for MemoryCache {
    async fn get(&self, key: &str) -> Option<String> {
        self.live(key)
    }

    async fn set_with_ttl(&self, key: &str, value: String, ttl: Duration) {
        self.entries
            .insert(key.to_string(), (value, Instant::now() + ttl));
    }

    async fn delete(&self, key: &str) -> bool {
        let was_live = self.live(key).is_some();
        self.entries.remove(key);
        was_live
    }

    async fn exists(&self, key: &str) -> bool {
        self.live(key).is_some()
    }

    async fn expire(&self, key: &str, ttl: Duration) -> bool {
        if self.live(key).is_none() {
            return false;
        }
        if let Some(mut entry) = self.entries.get_mut(key) {
            entry.value_mut().1 = Instant::now() + ttl;
            return true;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn values_expire_after_ttl() {
        let cache = MemoryCache::new();
        cache
            .set_with_ttl("k", "v".to_string(), Duration::from_secs(10))
            .await;
        assert_eq!(cache.get("k").await.as_deref(), Some("v"));

        tokio::time::advance(Duration::from_secs(11)).await;
        assert!(cache.get("k").await.is_none());
        assert!(!cache.exists("k").await);
    }

    #[tokio::test(start_paused = true)]
    async fn expire_refreshes_the_deadline() {
        let cache = MemoryCache::new();
        cache
            .set_with_ttl("k", "v".to_string(), Duration::from_secs(10))
            .await;

        tokio::time::advance(Duration::from_secs(8)).await;
        assert!(cache.expire("k", Duration::from_secs(10)).await);

        tokio::time::advance(Duration::from_secs(8)).await;
        assert!(cache.exists("k").await);
    }

    #[tokio::test]
    async fn delete_reports_absence() {
        let cache = MemoryCache::new();
        assert!(!cache.delete("missing").await);
        cache
            .set_with_ttl("k", "v".to_string(), Duration::from_secs(10))
            .await;
        assert!(cache.delete("k").await);
        assert!(!cache.delete("k").await);
    }

    #[tokio::test(start_paused = true)]
    async fn expire_on_dead_key_is_false() {
        let cache = MemoryCache::new();
        cache
            .set_with_ttl("k", "v".to_string(), Duration::from_secs(1))
            .await;
        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(!cache.expire("k", Duration::from_secs(10)).await);
    }
}
