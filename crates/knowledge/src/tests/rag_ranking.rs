//! Tests for ranking correctness over the SQLite chunk store.

use crate::embeddings::EmbeddingProvider;
use crate::retriever::Retriever;
use crate::retry::RetryPolicy;
use crate::store::{SqliteChunkStore, VectorIndex};
use crate::types::BookChunk;
use bookrag_core::{AppError, AppResult};
use std::sync::Arc;
use tempfile::TempDir;

/// Helper to create a test chunk with embedding.
fn create_test_chunk(id: &str, text: &str, embedding: Vec<f32>) -> BookChunk {
    BookChunk {
        id: id.to_string(),
        text: text.to_string(),
        embedding,
        section: "Locomotion".to_string(),
        position: 0,
        token_count: text.split_whitespace().count(),
    }
}

/// Helper to create a normalized embedding.
fn normalize(v: &[f32]) -> Vec<f32> {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        v.iter().map(|x| x / norm).collect()
    } else {
        v.to_vec()
    }
}

fn open_store(temp: &TempDir, chunks: &[BookChunk]) -> SqliteChunkStore {
    let store = SqliteChunkStore::open(temp.path().join("book.sqlite")).unwrap();
    store.insert_chunks(chunks).unwrap();
    store
}

/// Embeds every query to the same fixed vector.
#[derive(Debug)]
struct FixedEmbedder(Vec<f32>);

#[async_trait::async_trait]
impl EmbeddingProvider for FixedEmbedder {
    fn provider_name(&self) -> &str {
        "fixed"
    }

    fn model_name(&self) -> &str {
        "fixed"
    }

    fn dimensions(&self) -> usize {
        self.0.len()
    }

    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|_| self.0.clone()).collect())
    }
}

#[tokio::test]
async fn test_relevant_query_returns_high_scores() {
    let temp = TempDir::new().unwrap();
    let store = open_store(
        &temp,
        &[
            create_test_chunk(
                "chunk1",
                "Bipeds turn by rotating the stance foot",
                normalize(&[1.0, 0.5, 0.2, 0.1]),
            ),
            create_test_chunk(
                "chunk2",
                "Battery packs sit in the torso",
                normalize(&[-0.3, -0.8, 0.4, -0.2]),
            ),
        ],
    );

    let results = store.search(&normalize(&[0.9, 0.4, 0.3, 0.1]), 5).await.unwrap();

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].0, "chunk1", "Most relevant chunk should be first");
    assert!(
        results[0].1 > 0.8,
        "Relevant chunk score should be high: {}",
        results[0].1
    );
    assert!(results[0].1 > results[1].1, "Scores should be ordered");
}

#[tokio::test]
async fn test_scores_are_ordered_descending() {
    let temp = TempDir::new().unwrap();
    let store = open_store(
        &temp,
        &[
            create_test_chunk("chunk1", "Text A", normalize(&[1.0, 0.0, 0.0])),
            create_test_chunk("chunk2", "Text B", normalize(&[0.7, 0.7, 0.0])),
            create_test_chunk("chunk3", "Text C", normalize(&[0.0, 1.0, 0.0])),
            create_test_chunk("chunk4", "Text D", normalize(&[-1.0, 0.0, 0.0])),
        ],
    );

    let results = store.search(&normalize(&[1.0, 0.0, 0.0]), 10).await.unwrap();

    for i in 1..results.len() {
        assert!(
            results[i - 1].1 >= results[i].1,
            "Scores should be ordered: {} >= {}",
            results[i - 1].1,
            results[i].1
        );
    }
    assert_eq!(results[0].0, "chunk1");
    assert!(results[0].1 > 0.99, "Perfect match should have score near 1.0");
}

#[tokio::test]
async fn test_retriever_filters_negative_and_low_scores() {
    let temp = TempDir::new().unwrap();
    let store = Arc::new(open_store(
        &temp,
        &[
            create_test_chunk("chunk1", "Text A", normalize(&[1.0, 0.0, 0.0])),
            create_test_chunk("chunk2", "Text B", normalize(&[0.7, 0.7, 0.0])),
            create_test_chunk("chunk3", "Text C", normalize(&[0.0, 1.0, 0.0])),
            create_test_chunk("chunk4", "Text D", normalize(&[-1.0, 0.0, 0.0])),
        ],
    ));
    let retriever = Retriever::new(
        Arc::new(FixedEmbedder(normalize(&[1.0, 0.0, 0.0]))),
        store.clone(),
        store,
        RetryPolicy::default(),
    );

    let results = retriever.retrieve("how do bipeds turn?", 10, 0.7).await.unwrap();

    let ranked: Vec<(&str, usize)> = results
        .iter()
        .map(|r| (r.chunk.id.as_str(), r.rank))
        .collect();
    assert_eq!(ranked, vec![("chunk1", 1), ("chunk2", 2)]);
    assert!(results.iter().all(|r| (0.0..=1.0).contains(&r.score)));
    assert_eq!(results[0].chunk.text, "Text A");

    let strict = retriever.retrieve("how do bipeds turn?", 10, 0.95).await.unwrap();
    assert_eq!(strict.len(), 1);
    assert_eq!(strict[0].chunk.id, "chunk1");
}

#[tokio::test]
async fn test_embedding_model_mismatch_is_unavailable() {
    let temp = TempDir::new().unwrap();
    let store = Arc::new(open_store(
        &temp,
        &[create_test_chunk("chunk1", "Text A", normalize(&[1.0, 0.0, 0.0]))],
    ));
    let retriever = Retriever::new(
        Arc::new(FixedEmbedder(normalize(&[1.0, 0.0]))),
        store.clone(),
        store,
        RetryPolicy::default(),
    );

    let err = retriever.retrieve("how do bipeds turn?", 5, 0.0).await.unwrap_err();
    assert!(matches!(err, AppError::RetrievalUnavailable(_)), "got {:?}", err);
}

#[tokio::test]
async fn test_top_k_limits_results() {
    let temp = TempDir::new().unwrap();
    let chunks: Vec<BookChunk> = (0..8)
        .map(|i| {
            create_test_chunk(
                &format!("chunk{}", i),
                "Text",
                normalize(&[1.0, i as f32 * 0.05, 0.0]),
            )
        })
        .collect();
    let store = open_store(&temp, &chunks);

    let results = store.search(&normalize(&[1.0, 0.0, 0.0]), 3).await.unwrap();
    let ids: Vec<&str> = results.iter().map(|(id, _)| id.as_str()).collect();
    assert_eq!(ids, vec!["chunk0", "chunk1", "chunk2"]);
}
