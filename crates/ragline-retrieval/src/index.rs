//! In-memory chunk index with cosine KNN and keyword scoring
//!
//! Shared across all runs; concurrent ingest and search take the inner
//! RwLock, so an insert during a search is either fully visible or not at
//! all - results are never corrupted. Scores tie-break by insertion order
//! (stable sort over the insertion sequence).

use serde_json::{Map, Value};
use std::sync::Arc;
use tokio::sync::RwLock;

/// A stored chunk. Created at ingestion, immutable thereafter.
#[derive(Clone, Debug)]
pub struct IndexedChunk {
    pub id: String,
    pub parent_id: String,
    pub title: String,
    pub source: Option<String>,
    pub content: String,
    pub metadata: Map<String, Value>,
    pub embedding: Vec<f32>,
}

/// A scored match from one sub-search
#[derive(Clone, Debug)]
pub struct ScoredChunk {
    pub chunk: Arc<IndexedChunk>,
    pub score: f32,
}

#[derive(Default)]
pub struct VectorIndex {
    entries: RwLock<Vec<Arc<IndexedChunk>>>,
}

impl VectorIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, chunk: IndexedChunk) {
        self.entries.write().await.push(Arc::new(chunk));
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    pub async fn get(&self, id: &str) -> Option<Arc<IndexedChunk>> {
        self.entries
            .read()
            .await
            .iter()
            .find(|c| c.id == id)
            .cloned()
    }

    /// Remove every chunk derived from one ingested document.
    /// Returns the number of chunks removed.
    pub async fn remove_parent(&self, parent_id: &str) -> usize {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|c| c.parent_id != parent_id);
        before - entries.len()
    }

    /// K-nearest-neighbor lookup by cosine similarity, clamped to [0, 1].
    pub async fn knn(&self, query: &[f32], k: usize) -> Vec<ScoredChunk> {
        let entries = self.entries.read().await;
        let mut scored: Vec<ScoredChunk> = entries
            .iter()
            .map(|chunk| ScoredChunk {
                chunk: chunk.clone(),
                score: cosine_similarity(query, &chunk.embedding).clamp(0.0, 1.0),
            })
            .collect();
        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored.truncate(k);
        scored
    }

    /// Keyword match over content and title. The score is the fraction of
    /// query terms found, with title hits weighted double, normalized to
    /// [0, 1]. Chunks matching no term are omitted.
    pub async fn keyword(&self, query: &str, k: usize) -> Vec<ScoredChunk> {
        let terms: Vec<String> = query
            .to_lowercase()
            .split_whitespace()
            .map(str::to_string)
            .collect();
        if terms.is_empty() {
            return Vec::new();
        }

        let entries = self.entries.read().await;
        let mut scored: Vec<ScoredChunk> = entries
            .iter()
            .filter_map(|chunk| {
                let content = chunk.content.to_lowercase();
                let title = chunk.title.to_lowercase();
                let mut weight = 0.0f32;
                for term in &terms {
                    if content.contains(term.as_str()) {
                        weight += 1.0;
                    }
                    if title.contains(term.as_str()) {
                        weight += 2.0;
                    }
                }
                if weight == 0.0 {
                    return None;
                }
                Some(ScoredChunk {
                    chunk: chunk.clone(),
                    score: (weight / (3.0 * terms.len() as f32)).clamp(0.0, 1.0),
                })
            })
            .collect();
        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored.truncate(k);
        scored
    }
}

/// Cosine similarity of two vectors; 0.0 when either has no magnitude or
/// the dimensions disagree.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(id: &str, parent: &str, title: &str, content: &str, embedding: Vec<f32>) -> IndexedChunk {
        IndexedChunk {
            id: id.to_string(),
            parent_id: parent.to_string(),
            title: title.to_string(),
            source: None,
            content: content.to_string(),
            metadata: Map::new(),
            embedding,
        }
    }

    #[test]
    fn cosine_basics() {
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]), 1.0);
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]), 0.0);
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 2.0]), 0.0);
    }

    #[tokio::test]
    async fn knn_orders_by_similarity() {
        let index = VectorIndex::new();
        index.insert(chunk("a", "p", "", "", vec![1.0, 0.0])).await;
        index.insert(chunk("b", "p", "", "", vec![0.0, 1.0])).await;
        index.insert(chunk("c", "p", "", "", vec![0.7, 0.7])).await;

        let hits = index.knn(&[1.0, 0.0], 2).await;
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].chunk.id, "a");
        assert_eq!(hits[1].chunk.id, "c");
    }

    #[tokio::test]
    async fn knn_tie_breaks_by_insertion_order() {
        let index = VectorIndex::new();
        index.insert(chunk("first", "p", "", "", vec![1.0, 0.0])).await;
        index.insert(chunk("second", "p", "", "", vec![1.0, 0.0])).await;
        let hits = index.knn(&[1.0, 0.0], 2).await;
        assert_eq!(hits[0].chunk.id, "first");
        assert_eq!(hits[1].chunk.id, "second");
    }

    #[tokio::test]
    async fn keyword_weights_title_double() {
        let index = VectorIndex::new();
        index
            .insert(chunk("body", "p", "other", "rust is nice", vec![1.0]))
            .await;
        index
            .insert(chunk("titled", "p", "rust guide", "something else", vec![1.0]))
            .await;
        let hits = index.keyword("rust", 10).await;
        assert_eq!(hits[0].chunk.id, "titled");
        assert!(hits[0].score > hits[1].score);
    }

    #[tokio::test]
    async fn keyword_omits_non_matches() {
        let index = VectorIndex::new();
        index.insert(chunk("a", "p", "", "alpha beta", vec![1.0])).await;
        index.insert(chunk("b", "p", "", "gamma delta", vec![1.0])).await;
        let hits = index.keyword("alpha", 10).await;
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].chunk.id, "a");
    }

    #[tokio::test]
    async fn remove_parent_removes_all_and_only() {
        let index = VectorIndex::new();
        index.insert(chunk("a1", "doc-a", "", "x", vec![1.0])).await;
        index.insert(chunk("a2", "doc-a", "", "x", vec![1.0])).await;
        index.insert(chunk("b1", "doc-b", "", "x", vec![1.0])).await;

        assert_eq!(index.remove_parent("doc-a").await, 2);
        assert_eq!(index.len().await, 1);
        assert!(index.get("b1").await.is_some());
        assert_eq!(index.remove_parent("doc-a").await, 0);
    }
}
