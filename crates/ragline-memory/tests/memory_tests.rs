//! Integration tests for the session store: ordering, trimming, TTL

use ragline_core::{Message, Role, SessionConfig};
use ragline_memory::{MemoryCache, SessionStore};
use std::sync::Arc;
use std::time::Duration;

fn store(ttl_secs: u64, max_history: usize) -> SessionStore {
    SessionStore::new(
        Arc::new(MemoryCache::new()),
        SessionConfig {
            ttl_secs,
            max_history,
        },
    )
}

#[tokio::test]
async fn append_then_get_reflects_tail_and_order() {
    let store = store(3600, 50);
    let id = store.create("user-1", None, None).await.unwrap();

    store.append(&id, Message::user("first")).await.unwrap();
    store.append(&id, Message::assistant("second")).await.unwrap();
    store.append(&id, Message::user("third")).await.unwrap();

    let record = store.get(&id).await.unwrap().unwrap();
    let contents: Vec<&str> = record.messages.iter().map(|m| m.content.as_str()).collect();
    assert_eq!(contents, vec!["first", "second", "third"]);
    assert_eq!(record.messages.last().unwrap().role, Role::User);
}

#[tokio::test]
async fn explicit_session_id_is_honored() {
    let store = store(3600, 50);
    let id = store
        .create("user-1", Some("my-session".to_string()), None)
        .await
        .unwrap();
    assert_eq!(id, "my-session");
    assert!(store.exists("my-session").await);
}

#[tokio::test]
async fn history_trims_oldest_first() {
    let store = store(3600, 3);
    let id = store.create("user-1", None, None).await.unwrap();

    for i in 0..5 {
        store.append(&id, Message::user(format!("m{}", i))).await.unwrap();
    }

    let record = store.get(&id).await.unwrap().unwrap();
    let contents: Vec<&str> = record.messages.iter().map(|m| m.content.as_str()).collect();
    assert_eq!(contents, vec!["m2", "m3", "m4"]);
}

#[tokio::test]
async fn append_to_missing_session_fails() {
    let store = store(3600, 50);
    let err = store.append("ghost", Message::user("hello")).await.unwrap_err();
    assert!(matches!(err, ragline_core::Error::SessionNotFound(_)));
}

#[tokio::test(start_paused = true)]
async fn idle_session_expires_after_ttl() {
    let store = store(1, 50);
    let id = store.create("user-1", None, None).await.unwrap();
    assert!(store.exists(&id).await);

    tokio::time::advance(Duration::from_secs(2)).await;
    assert!(!store.exists(&id).await);
    assert!(store.get(&id).await.unwrap().is_none());
    let err = store.append(&id, Message::user("late")).await.unwrap_err();
    assert!(matches!(err, ragline_core::Error::SessionNotFound(_)));
}

#[tokio::test(start_paused = true)]
async fn writes_slide_the_expiration() {
    let store = store(10, 50);
    let id = store.create("user-1", None, None).await.unwrap();

    // Keep writing just inside the TTL window; the session must survive
    // well past the original deadline.
    for _ in 0..3 {
        tokio::time::advance(Duration::from_secs(8)).await;
        store.append(&id, Message::user("ping")).await.unwrap();
    }
    assert!(store.exists(&id).await);

    tokio::time::advance(Duration::from_secs(11)).await;
    assert!(!store.exists(&id).await);
}

#[tokio::test(start_paused = true)]
async fn touch_refreshes_without_writing() {
    let store = store(10, 50);
    let id = store.create("user-1", None, None).await.unwrap();

    tokio::time::advance(Duration::from_secs(8)).await;
    assert!(store.touch(&id).await);
    tokio::time::advance(Duration::from_secs(8)).await;
    assert!(store.exists(&id).await);
    assert!(!store.touch("ghost").await);
}

#[tokio::test]
async fn delete_returns_false_when_absent() {
    let store = store(3600, 50);
    let id = store.create("user-1", None, None).await.unwrap();
    assert!(store.delete(&id).await);
    assert!(!store.delete(&id).await);
}

#[tokio::test]
async fn update_context_merges_and_replaces() {
    let store = store(3600, 50);
    let mut initial = serde_json::Map::new();
    initial.insert("lang".to_string(), serde_json::Value::from("en"));
    let id = store.create("user-1", None, Some(initial)).await.unwrap();

    let mut patch = serde_json::Map::new();
    patch.insert("tone".to_string(), serde_json::Value::from("formal"));
    store.update_context(&id, patch.clone(), true).await.unwrap();

    let record = store.get(&id).await.unwrap().unwrap();
    assert_eq!(record.context.len(), 2);

    store.update_context(&id, patch, false).await.unwrap();
    let record = store.get(&id).await.unwrap().unwrap();
    assert_eq!(record.context.len(), 1);
    assert!(record.context.contains_key("tone"));
}
