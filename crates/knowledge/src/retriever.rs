//! Full-book retrieval: embed, search, filter, fetch.

use crate::embeddings::EmbeddingProvider;
use crate::retry::RetryPolicy;
use crate::store::{ChunkStore, VectorIndex};
use crate::types::{BookChunk, RetrievalResult};
use bookrag_core::{AppError, AppResult};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Turns a question into ranked, threshold-filtered book chunks.
pub struct Retriever {
    embedder: Arc<dyn EmbeddingProvider>,
    index: Arc<dyn VectorIndex>,
    store: Arc<dyn ChunkStore>,
    retry: RetryPolicy,
}

/// Map a raw similarity into `[0, 1]`.
fn clamp_score(score: f32) -> f32 {
    if score.is_nan() {
        0.0
    } else {
        score.clamp(0.0, 1.0)
    }
}

impl Retriever {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        index: Arc<dyn VectorIndex>,
        store: Arc<dyn ChunkStore>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            embedder,
            index,
            store,
            retry,
        }
    }

    /// Retrieve chunks scoring at least `similarity_threshold`.
    ///
    /// Results are ordered by score descending, ties by chunk id ascending,
    /// and ranked from 1. An empty result is a normal outcome.
    pub async fn retrieve(
        &self,
        query_text: &str,
        top_k: usize,
        similarity_threshold: f32,
    ) -> AppResult<Vec<RetrievalResult>> {
        let embedding = self
            .retry
            .run("query embedding", || self.embedder.embed(query_text))
            .await
            .map_err(|e| AppError::RetrievalUnavailable(e.to_string()))?;

        let hits = self
            .retry
            .run("vector search", || self.index.search(&embedding, top_k))
            .await
            .map_err(|e| AppError::RetrievalUnavailable(e.to_string()))?;
        let candidates = hits.len();

        let mut seen = HashSet::new();
        let mut kept: Vec<(String, f32)> = hits
            .into_iter()
            .map(|(id, score)| (id, clamp_score(score)))
            .filter(|(_, score)| *score >= similarity_threshold)
            .filter(|(id, _)| seen.insert(id.clone()))
            .collect();
        kept.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });
        kept.truncate(top_k);

        debug!(
            candidates,
            kept = kept.len(),
            threshold = similarity_threshold,
            "Filtered vector hits"
        );

        if kept.is_empty() {
            info!("No chunk reached the similarity threshold {:.2}", similarity_threshold);
            return Ok(Vec::new());
        }

        let ids: Vec<String> = kept.iter().map(|(id, _)| id.clone()).collect();
        let chunks = self
            .retry
            .run("chunk fetch", || self.store.get_chunks(&ids))
            .await
            .map_err(|e| AppError::RetrievalUnavailable(e.to_string()))?;
        let mut by_id: HashMap<String, BookChunk> =
            chunks.into_iter().map(|c| (c.id.clone(), c)).collect();

        let mut results = Vec::with_capacity(kept.len());
        for (id, score) in kept {
            match by_id.remove(&id) {
                Some(chunk) => results.push(RetrievalResult {
                    chunk,
                    score,
                    rank: results.len() + 1,
                }),
                None => warn!(chunk_id = %id, "Index hit missing from chunk store, dropped"),
            }
        }

        info!(
            results = results.len(),
            top_score = results.first().map(|r| r.score).unwrap_or(0.0),
            "Retrieved chunks"
        );
        Ok(results)
    }
}
