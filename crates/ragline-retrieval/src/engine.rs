//! Hybrid retrieval engine
//!
//! Fuses vector-similarity and keyword sub-searches by weighted score:
//! `combined = vector_weight * similarity + keyword_weight * keyword_score`.
//! A result present in both sub-searches sums its weighted contributions;
//! present in only one, it keeps that single contribution.

use crate::chunker::Chunker;
use crate::index::{IndexedChunk, ScoredChunk, VectorIndex};
use ragline_core::{Error, Result, RetrievalConfig, RetrievalHit};
use ragline_llm::Embedder;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

pub struct RetrievalEngine {
    index: Arc<VectorIndex>,
    embedder: Arc<dyn Embedder>,
    chunker: Chunker,
    config: RetrievalConfig,
}

impl RetrievalEngine {
    pub fn new(embedder: Arc<dyn Embedder>, config: RetrievalConfig) -> Self {
        Self {
            index: Arc::new(VectorIndex::new()),
            embedder,
            chunker: Chunker::new(config.chunk_size, config.chunk_overlap),
            config,
        }
    }

    pub fn index(&self) -> &Arc<VectorIndex> {
        &self.index
    }

    /// Hybrid search. Returns up to `k` hits sorted by fused score
    /// descending, no duplicate chunk ids, ties in insertion order.
    pub async fn search(&self, query: &str, k: usize) -> Result<Vec<RetrievalHit>> {
        if query.trim().is_empty() || k == 0 {
            return Ok(Vec::new());
        }

        let query_vector = self
            .embedder
            .embed(query)
            .await
            .map_err(|e| Error::RetrievalUnavailable(e.to_string()))?;

        // Over-fetch both sides so fusion has candidates to rerank.
        let vector_hits = self.index.knn(&query_vector, k * 2).await;
        let keyword_hits = self.index.keyword(query, k * 2).await;

        let mut order: Vec<(Arc<IndexedChunk>, f32)> = Vec::new();
        let mut slots: HashMap<String, usize> = HashMap::new();

        for ScoredChunk { chunk, score } in vector_hits {
            let contribution = self.config.vector_weight * score;
            slots.insert(chunk.id.clone(), order.len());
            order.push((chunk, contribution));
        }
        for ScoredChunk { chunk, score } in keyword_hits {
            let contribution = self.config.keyword_weight * score;
            match slots.get(&chunk.id) {
                Some(&slot) => order[slot].1 += contribution,
                None => {
                    slots.insert(chunk.id.clone(), order.len());
                    order.push((chunk, contribution));
                }
            }
        }

        // Stable sort keeps insertion order for equal scores.
        order.sort_by(|a, b| b.1.total_cmp(&a.1));
        order.truncate(k);

        let threshold = self.config.score_threshold;
        let hits = order
            .into_iter()
            .filter(|(_, score)| threshold.map_or(true, |t| *score >= t))
            .map(|(chunk, score)| RetrievalHit {
                chunk_id: chunk.id.clone(),
                content: chunk.content.clone(),
                score,
                metadata: chunk.metadata.clone(),
            })
            .collect();

        Ok(hits)
    }

    /// Split, embed, and store a document. Returns chunk ids in chunk
    /// order. Empty content ingests zero chunks and returns an empty vec.
    ///
    /// All chunks are embedded before anything is inserted: a failed
    /// embedding aborts the whole ingest and leaves the index untouched,
    /// never half a document.
    pub async fn ingest(
        &self,
        content: &str,
        title: &str,
        source: Option<&str>,
        metadata: Option<Map<String, Value>>,
    ) -> Result<Vec<String>> {
        let chunks = self.chunker.split(content);
        if chunks.is_empty() {
            return Ok(Vec::new());
        }

        let mut embeddings = Vec::with_capacity(chunks.len());
        for chunk_text in &chunks {
            let embedding = self
                .embedder
                .embed(chunk_text)
                .await
                .map_err(|e| Error::RetrievalUnavailable(e.to_string()))?;
            embeddings.push(embedding);
        }

        let parent_id = Uuid::new_v4().to_string();
        let mut ids = Vec::with_capacity(chunks.len());

        for (chunk_index, (chunk_text, embedding)) in
            chunks.into_iter().zip(embeddings).enumerate()
        {
            let id = Uuid::new_v4().to_string();
            let mut chunk_metadata = metadata.clone().unwrap_or_default();
            chunk_metadata.insert("title".to_string(), Value::from(title));
            chunk_metadata.insert("chunk_index".to_string(), Value::from(chunk_index));
            chunk_metadata.insert("parent_id".to_string(), Value::from(parent_id.clone()));
            if let Some(source) = source {
                chunk_metadata.insert("source".to_string(), Value::from(source));
            }

            self.index
                .insert(IndexedChunk {
                    id: id.clone(),
                    parent_id: parent_id.clone(),
                    title: title.to_string(),
                    source: source.map(str::to_string),
                    content: chunk_text,
                    metadata: chunk_metadata,
                    embedding,
                })
                .await;
            ids.push(id);
        }

        debug!("Ingested '{}': {} chunks, parent={}", title, ids.len(), parent_id);
        Ok(ids)
    }

    /// Remove every chunk derived from one ingested document.
    pub async fn delete(&self, parent_id: &str) -> usize {
        let removed = self.index.remove_parent(parent_id).await;
        debug!("Deleted {} chunks for parent={}", removed, parent_id);
        removed
    }

    /// Format hits into a context block for the system prompt.
    pub fn format_context(hits: &[RetrievalHit]) -> String {
        if hits.is_empty() {
            return "No relevant documents found.".to_string();
        }
        hits.iter()
            .enumerate()
            .map(|(i, hit)| {
                let source = hit
                    .metadata
                    .get("source")
                    .and_then(|v| v.as_str())
                    .unwrap_or("Unknown");
                format!(
                    "[Document {}] (Score: {:.3}, Source: {})\n{}",
                    i + 1,
                    hit.score,
                    source,
                    hit.content
                )
            })
            .collect::<Vec<_>>()
            .join("\n\n---\n\n")
    }
}
