//! Integration tests for the hybrid retrieval engine

use ragline_core::RetrievalConfig;
use ragline_llm::mock::HashEmbedder;
use ragline_llm::{Embedder, LlmError, LlmResult};
use ragline_retrieval::RetrievalEngine;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Embedder with fixed per-text vectors, so vector similarity is fully
/// controlled by the test. Unknown texts embed to an orthogonal default.
struct StaticEmbedder {
    vectors: HashMap<String, Vec<f32>>,
    default: Vec<f32>,
}

impl StaticEmbedder {
    fn new(vectors: Vec<(&str, Vec<f32>)>) -> Self {
        Self {
            vectors: vectors
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
            default: vec![0.0, 0.0, 1.0],
        }
    }
}

#[async_trait::async_trait]
impl Embedder for StaticEmbedder {
    fn dimension(&self) -> usize {
        3
    }

    async fn embed(&self, text: &str) -> LlmResult<Vec<f32>> {
        Ok(self.vectors.get(text).cloned().unwrap_or_else(|| self.default.clone()))
    }
}

/// Embedder that serves a fixed number of calls and then fails, for
/// exercising mid-ingest embedding outages.
struct FailAfterEmbedder {
    budget: usize,
    calls: AtomicUsize,
}

impl FailAfterEmbedder {
    fn new(budget: usize) -> Self {
        Self {
            budget,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait::async_trait]
impl Embedder for FailAfterEmbedder {
    fn dimension(&self) -> usize {
        3
    }

    async fn embed(&self, _text: &str) -> LlmResult<Vec<f32>> {
        if self.calls.fetch_add(1, Ordering::SeqCst) < self.budget {
            Ok(vec![1.0, 0.0, 0.0])
        } else {
            Err(LlmError::RequestFailed("embedding service down".to_string()))
        }
    }
}

fn config() -> RetrievalConfig {
    RetrievalConfig {
        chunk_size: 1000,
        chunk_overlap: 0,
        ..Default::default()
    }
}

#[tokio::test]
async fn empty_content_ingests_zero_chunks() {
    let engine = RetrievalEngine::new(Arc::new(HashEmbedder::default()), config());
    let ids = engine.ingest("", "empty", None, None).await.unwrap();
    assert!(ids.is_empty());
    assert!(engine.index().is_empty().await);
}

#[tokio::test]
async fn no_match_query_returns_empty() {
    let engine = RetrievalEngine::new(Arc::new(HashEmbedder::default()), config());
    let hits = engine.search("anything at all", 5).await.unwrap();
    assert!(hits.is_empty());
}

#[tokio::test]
async fn repeated_ingest_is_deterministic() {
    let embedder = Arc::new(HashEmbedder::default());
    let text = "Sentence one is here. Sentence two follows it. Sentence three closes.";

    let a = RetrievalEngine::new(embedder.clone(), config());
    let b = RetrievalEngine::new(embedder, config());
    let ids_a = a.ingest(text, "doc", None, None).await.unwrap();
    let ids_b = b.ingest(text, "doc", None, None).await.unwrap();
    assert_eq!(ids_a.len(), ids_b.len());
    assert!(!ids_a.is_empty());
}

#[tokio::test]
async fn exact_text_outranks_lexically_distinct_at_equal_similarity() {
    // Both documents embed identically to the query: vector contribution is
    // a wash, so the keyword contribution must decide the order.
    let shared = vec![1.0, 0.0, 0.0];
    let embedder = StaticEmbedder::new(vec![
        ("rust borrow checker rules", shared.clone()),
        ("memory safety enforcement design", shared.clone()),
        ("rust borrow checker", shared),
    ]);
    let engine = RetrievalEngine::new(Arc::new(embedder), config());
    engine
        .ingest("rust borrow checker rules", "a", None, None)
        .await
        .unwrap();
    engine
        .ingest("memory safety enforcement design", "b", None, None)
        .await
        .unwrap();

    let hits = engine.search("rust borrow checker", 2).await.unwrap();
    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].content, "rust borrow checker rules");
    assert!(hits[0].score > hits[1].score);
}

#[tokio::test]
async fn fused_score_monotone_in_vector_weight() {
    let doc = "unrelated words entirely";
    let query = "the query text";
    let doc_vec = vec![1.0, 0.0, 0.0];
    // Query at 60% similarity to the doc; no keyword overlap, so the fused
    // score is purely the weighted vector similarity.
    let query_vec = vec![0.6, 0.8, 0.0];

    let mut score_by_weight = Vec::new();
    for vector_weight in [0.3f32, 0.5, 0.9] {
        let embedder = StaticEmbedder::new(vec![(doc, doc_vec.clone()), (query, query_vec.clone())]);
        let cfg = RetrievalConfig {
            vector_weight,
            keyword_weight: 0.3,
            ..config()
        };
        let engine = RetrievalEngine::new(Arc::new(embedder), cfg);
        engine.ingest(doc, "doc", None, None).await.unwrap();
        let hits = engine.search(query, 1).await.unwrap();
        score_by_weight.push(hits[0].score);
    }
    assert!(score_by_weight[0] < score_by_weight[1]);
    assert!(score_by_weight[1] < score_by_weight[2]);
}

#[tokio::test]
async fn results_present_in_both_sum_contributions() {
    let vec_a = vec![1.0, 0.0, 0.0];
    let embedder = StaticEmbedder::new(vec![
        ("alpha beta gamma", vec_a.clone()),
        ("alpha", vec_a),
    ]);
    let cfg = RetrievalConfig {
        vector_weight: 0.7,
        keyword_weight: 0.3,
        ..config()
    };
    let engine = RetrievalEngine::new(Arc::new(embedder), cfg);
    engine.ingest("alpha beta gamma", "doc", None, None).await.unwrap();

    let hits = engine.search("alpha", 1).await.unwrap();
    // vector: 0.7 * 1.0, keyword: 0.3 * (1/3) — content hit only
    assert_eq!(hits.len(), 1);
    assert!((hits[0].score - 0.8).abs() < 1e-5, "score = {}", hits[0].score);
}

#[tokio::test]
async fn score_threshold_filters_low_results() {
    let embedder = StaticEmbedder::new(vec![]);
    let cfg = RetrievalConfig {
        score_threshold: Some(0.99),
        ..config()
    };
    let engine = RetrievalEngine::new(Arc::new(embedder), cfg);
    engine.ingest("some document text", "doc", None, None).await.unwrap();
    // Default vectors match at similarity 1.0 * 0.7 = 0.7 < 0.99
    let hits = engine.search("different query", 5).await.unwrap();
    assert!(hits.is_empty());
}

#[tokio::test]
async fn failed_ingest_leaves_no_orphan_chunks() {
    // First embedding succeeds, second fails: the whole ingest must fail
    // without inserting anything.
    let embedder = Arc::new(FailAfterEmbedder::new(1));
    let cfg = RetrievalConfig {
        chunk_size: 10,
        chunk_overlap: 0,
        ..Default::default()
    };
    let engine = RetrievalEngine::new(embedder, cfg);

    let err = engine
        .ingest("first part\n\nsecond part", "doc", None, None)
        .await
        .unwrap_err();
    assert!(matches!(err, ragline_core::Error::RetrievalUnavailable(_)));
    assert_eq!(engine.index().len().await, 0);
}

#[tokio::test]
async fn delete_by_parent_removes_from_search() {
    let embedder = Arc::new(HashEmbedder::default());
    let engine = RetrievalEngine::new(embedder, config());

    let ids = engine
        .ingest("the moon orbits the earth", "astronomy", Some("test"), None)
        .await
        .unwrap();
    assert!(!ids.is_empty());

    let hits = engine.search("moon orbits", 5).await.unwrap();
    assert!(!hits.is_empty());
    let parent_id = hits[0]
        .metadata
        .get("parent_id")
        .and_then(|v| v.as_str())
        .unwrap()
        .to_string();

    let removed = engine.delete(&parent_id).await;
    assert_eq!(removed, ids.len());

    let hits = engine.search("moon orbits", 5).await.unwrap();
    assert!(hits.is_empty());
}

#[test]
fn format_context_includes_scores_and_sources() {
    use ragline_core::RetrievalHit;
    let mut metadata = serde_json::Map::new();
    metadata.insert("source".to_string(), serde_json::Value::from("handbook"));
    let hits = vec![RetrievalHit {
        chunk_id: "c1".to_string(),
        content: "chunk body".to_string(),
        score: 0.5,
        metadata,
    }];
    let formatted = RetrievalEngine::format_context(&hits);
    assert!(formatted.contains("[Document 1]"));
    assert!(formatted.contains("0.500"));
    assert!(formatted.contains("handbook"));
    assert!(formatted.contains("chunk body"));

    assert_eq!(RetrievalEngine::format_context(&[]), "No relevant documents found.");
}
