//! Chunk storage and vector search.
//!
//! [`ChunkStore`] is the source of truth for passage text and citation
//! metadata; [`VectorIndex`] answers nearest-neighbour queries over chunk
//! embeddings. Both are implemented by the SQLite store used in production
//! and by the in-memory corpus used in tests.

use crate::types::{BookChunk, CorpusStats};
use bookrag_core::{AppError, AppResult};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

/// Nearest-neighbour search over chunk embeddings.
#[async_trait::async_trait]
pub trait VectorIndex: Send + Sync {
    /// Search for the `top_k` chunks most similar to `vector`.
    ///
    /// Returns `(chunk_id, score)` pairs ordered by descending score.
    async fn search(&self, vector: &[f32], top_k: usize) -> AppResult<Vec<(String, f32)>>;
}

/// Read access to stored chunks.
#[async_trait::async_trait]
pub trait ChunkStore: Send + Sync {
    /// Fetch chunks by id, in the order requested. Unknown ids are skipped.
    async fn get_chunks(&self, ids: &[String]) -> AppResult<Vec<BookChunk>>;

    /// Count chunks, sections and tokens.
    async fn stats(&self) -> AppResult<CorpusStats>;
}

/// Calculate cosine similarity between two vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

/// Score a stored embedding against the query vector.
///
/// A length mismatch means the store was built with another embedding model.
fn score_hit(query: &[f32], id: String, embedding: &[f32]) -> AppResult<(String, f32)> {
    if query.len() != embedding.len() {
        return Err(AppError::Knowledge(format!(
            "Embedding dimension mismatch for chunk {}: query has {}, stored has {}",
            id,
            query.len(),
            embedding.len()
        )));
    }
    let score = cosine_similarity(query, embedding);
    Ok((id, score))
}

/// Rank `(id, score)` pairs: score descending, then id ascending.
fn rank_hits(mut hits: Vec<(String, f32)>, top_k: usize) -> Vec<(String, f32)> {
    hits.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });
    hits.truncate(top_k);
    hits
}

/// SQLite-backed chunk store with brute-force cosine search.
///
/// Each call opens its own connection on the blocking pool.
#[derive(Debug, Clone)]
pub struct SqliteChunkStore {
    path: PathBuf,
}

impl SqliteChunkStore {
    /// Open (creating if needed) the store at `path`.
    pub fn open(path: impl Into<PathBuf>) -> AppResult<Self> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                AppError::Knowledge(format!("Failed to create store directory: {}", e))
            })?;
        }

        let conn = connect(&path)?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS chunks (
                id TEXT PRIMARY KEY,
                text TEXT NOT NULL,
                embedding BLOB NOT NULL,
                section TEXT NOT NULL,
                position INTEGER NOT NULL,
                token_count INTEGER NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_chunks_section ON chunks(section);
            "#,
        )
        .map_err(|e| AppError::Knowledge(format!("Failed to create tables: {}", e)))?;

        tracing::debug!("Opened chunk store at {:?}", path);
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Insert or replace chunks in a single transaction.
    pub fn insert_chunks(&self, chunks: &[BookChunk]) -> AppResult<()> {
        let mut conn = connect(&self.path)?;
        let tx = conn
            .transaction()
            .map_err(|e| AppError::Knowledge(format!("Failed to start transaction: {}", e)))?;
        let created_at = Utc::now().to_rfc3339();

        for chunk in chunks {
            if chunk.embedding.is_empty() {
                return Err(AppError::Knowledge(format!(
                    "Chunk '{}' has no embedding",
                    chunk.id
                )));
            }
            tx.execute(
                "INSERT OR REPLACE INTO chunks (id, text, embedding, section, position, token_count, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    chunk.id,
                    chunk.text,
                    embedding_to_bytes(&chunk.embedding),
                    chunk.section,
                    chunk.position as i64,
                    chunk.token_count as i64,
                    created_at,
                ],
            )
            .map_err(|e| AppError::Knowledge(format!("Failed to insert chunk: {}", e)))?;
        }

        tx.commit()
            .map_err(|e| AppError::Knowledge(format!("Failed to commit chunks: {}", e)))?;
        tracing::debug!("Stored {} chunks", chunks.len());
        Ok(())
    }

    /// Run a blocking query against a fresh connection.
    async fn with_connection<T, F>(&self, f: F) -> AppResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> AppResult<T> + Send + 'static,
    {
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || {
            let conn = connect(&path)?;
            f(&conn)
        })
        .await
        .map_err(|e| AppError::Knowledge(format!("Chunk store task failed: {}", e)))?
    }
}

fn connect(path: &Path) -> AppResult<Connection> {
    Connection::open(path)
        .map_err(|e| AppError::Knowledge(format!("Failed to open chunk store: {}", e)))
}

fn read_chunk(row: &rusqlite::Row<'_>) -> rusqlite::Result<BookChunk> {
    let embedding_bytes: Vec<u8> = row.get(2)?;
    let embedding = bytes_to_embedding(&embedding_bytes)
        .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;

    Ok(BookChunk {
        id: row.get(0)?,
        text: row.get(1)?,
        embedding,
        section: row.get(3)?,
        position: row.get::<_, i64>(4)? as u32,
        token_count: row.get::<_, i64>(5)? as usize,
    })
}

#[async_trait::async_trait]
impl VectorIndex for SqliteChunkStore {
    async fn search(&self, vector: &[f32], top_k: usize) -> AppResult<Vec<(String, f32)>> {
        let query = vector.to_vec();
        self.with_connection(move |conn| {
            let mut stmt = conn
                .prepare("SELECT id, embedding FROM chunks")
                .map_err(|e| AppError::Knowledge(format!("Failed to prepare search: {}", e)))?;

            let rows = stmt
                .query_map([], |row| {
                    let id: String = row.get(0)?;
                    let bytes: Vec<u8> = row.get(1)?;
                    Ok((id, bytes))
                })
                .map_err(|e| AppError::Knowledge(format!("Failed to scan chunks: {}", e)))?;

            let mut hits = Vec::new();
            for row in rows {
                let (id, bytes) =
                    row.map_err(|e| AppError::Knowledge(format!("Failed to read chunk: {}", e)))?;
                let embedding = bytes_to_embedding(&bytes)?;
                hits.push(score_hit(&query, id, &embedding)?);
            }

            let hits = rank_hits(hits, top_k);
            tracing::debug!("Vector search returned {} hits (top-{})", hits.len(), top_k);
            Ok(hits)
        })
        .await
    }
}

#[async_trait::async_trait]
impl ChunkStore for SqliteChunkStore {
    async fn get_chunks(&self, ids: &[String]) -> AppResult<Vec<BookChunk>> {
        let ids = ids.to_vec();
        self.with_connection(move |conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT id, text, embedding, section, position, token_count FROM chunks WHERE id = ?1",
                )
                .map_err(|e| AppError::Knowledge(format!("Failed to prepare fetch: {}", e)))?;

            let mut chunks = Vec::with_capacity(ids.len());
            for id in &ids {
                let chunk = stmt
                    .query_row(params![id], read_chunk)
                    .optional()
                    .map_err(|e| AppError::Knowledge(format!("Failed to fetch chunk: {}", e)))?;
                if let Some(chunk) = chunk {
                    chunks.push(chunk);
                }
            }
            Ok(chunks)
        })
        .await
    }

    async fn stats(&self) -> AppResult<CorpusStats> {
        self.with_connection(|conn| {
            conn.query_row(
                "SELECT COUNT(*), COUNT(DISTINCT section), COALESCE(SUM(token_count), 0) FROM chunks",
                [],
                |row| {
                    Ok(CorpusStats {
                        chunks: row.get::<_, i64>(0)? as usize,
                        sections: row.get::<_, i64>(1)? as usize,
                        total_tokens: row.get::<_, i64>(2)? as usize,
                    })
                },
            )
            .map_err(|e| AppError::Knowledge(format!("Failed to read corpus stats: {}", e)))
        })
        .await
    }
}

/// In-memory corpus for tests and small fixed books.
#[derive(Debug, Clone, Default)]
pub struct MemoryCorpus {
    chunks: Vec<BookChunk>,
}

impl MemoryCorpus {
    pub fn new(chunks: Vec<BookChunk>) -> Self {
        Self { chunks }
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}

#[async_trait::async_trait]
impl VectorIndex for MemoryCorpus {
    async fn search(&self, vector: &[f32], top_k: usize) -> AppResult<Vec<(String, f32)>> {
        let hits = self
            .chunks
            .iter()
            .map(|c| score_hit(vector, c.id.clone(), &c.embedding))
            .collect::<AppResult<Vec<_>>>()?;
        Ok(rank_hits(hits, top_k))
    }
}

#[async_trait::async_trait]
impl ChunkStore for MemoryCorpus {
    async fn get_chunks(&self, ids: &[String]) -> AppResult<Vec<BookChunk>> {
        let by_id: HashMap<&str, &BookChunk> =
            self.chunks.iter().map(|c| (c.id.as_str(), c)).collect();
        Ok(ids
            .iter()
            .filter_map(|id| by_id.get(id.as_str()).map(|c| (*c).clone()))
            .collect())
    }

    async fn stats(&self) -> AppResult<CorpusStats> {
        let sections: HashSet<&str> = self.chunks.iter().map(|c| c.section.as_str()).collect();
        Ok(CorpusStats {
            chunks: self.chunks.len(),
            sections: sections.len(),
            total_tokens: self.chunks.iter().map(|c| c.token_count).sum(),
        })
    }
}

/// Convert embedding vector to bytes for storage.
fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(embedding.len() * 4);
    for &value in embedding {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}

/// Convert bytes back to embedding vector.
fn bytes_to_embedding(bytes: &[u8]) -> AppResult<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return Err(AppError::Knowledge(
            "Invalid embedding bytes length".to_string(),
        ));
    }

    Ok(bytes
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn chunk(id: &str, section: &str, embedding: Vec<f32>) -> BookChunk {
        BookChunk {
            id: id.to_string(),
            text: format!("text of {}", id),
            embedding,
            section: section.to_string(),
            position: 0,
            token_count: 3,
        }
    }

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0, 0.0], &[1.0, 0.0, 0.0]) - 1.0).abs() < 0.001);
        assert!(cosine_similarity(&[1.0, 0.0, 0.0], &[0.0, 1.0, 0.0]).abs() < 0.001);
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[1.0, 0.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn test_rank_hits_breaks_ties_by_id() {
        let hits = vec![
            ("b".to_string(), 0.8),
            ("c".to_string(), 0.9),
            ("a".to_string(), 0.8),
        ];
        let ranked = rank_hits(hits, 2);
        assert_eq!(ranked[0].0, "c");
        assert_eq!(ranked[1].0, "a");
    }

    #[tokio::test]
    async fn test_sqlite_roundtrip_and_stats() {
        let temp = TempDir::new().unwrap();
        let store = SqliteChunkStore::open(temp.path().join("nested/book.sqlite")).unwrap();
        store
            .insert_chunks(&[
                chunk("c1", "Gait", vec![1.0, 0.0, 0.0]),
                chunk("c2", "Gait", vec![0.0, 1.0, 0.0]),
                chunk("c3", "Balance", vec![0.0, 0.0, 1.0]),
            ])
            .unwrap();

        let fetched = store
            .get_chunks(&["c3".to_string(), "missing".to_string(), "c1".to_string()])
            .await
            .unwrap();
        let ids: Vec<&str> = fetched.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["c3", "c1"]);
        assert_eq!(fetched[0].embedding, vec![0.0, 0.0, 1.0]);

        let stats = store.stats().await.unwrap();
        assert_eq!(
            stats,
            CorpusStats {
                chunks: 3,
                sections: 2,
                total_tokens: 9
            }
        );
    }

    #[tokio::test]
    async fn test_sqlite_rejects_chunk_without_embedding() {
        let temp = TempDir::new().unwrap();
        let store = SqliteChunkStore::open(temp.path().join("book.sqlite")).unwrap();
        let result = store.insert_chunks(&[chunk("c1", "Gait", Vec::new())]);
        assert!(matches!(result, Err(AppError::Knowledge(_))));
    }

    #[tokio::test]
    async fn test_search_rejects_mismatched_dimensions() {
        let temp = TempDir::new().unwrap();
        let store = SqliteChunkStore::open(temp.path().join("book.sqlite")).unwrap();
        store
            .insert_chunks(&[chunk("c1", "Gait", vec![1.0, 0.0, 0.0])])
            .unwrap();

        let result = store.search(&[1.0, 0.0], 5).await;
        assert!(matches!(result, Err(AppError::Knowledge(ref m)) if m.contains("dimension")));

        let corpus = MemoryCorpus::new(vec![chunk("c1", "Gait", vec![1.0, 0.0, 0.0])]);
        assert!(matches!(
            corpus.search(&[1.0, 0.0], 5).await,
            Err(AppError::Knowledge(_))
        ));
    }

    #[tokio::test]
    async fn test_memory_corpus_search() {
        let corpus = MemoryCorpus::new(vec![
            chunk("c1", "Gait", vec![1.0, 0.0]),
            chunk("c2", "Gait", vec![0.7, 0.7]),
            chunk("c3", "Gait", vec![-1.0, 0.0]),
        ]);

        let hits = corpus.search(&[1.0, 0.0], 2).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].0, "c1");
        assert_eq!(hits[1].0, "c2");
        assert_eq!(corpus.stats().await.unwrap().sections, 1);
    }
}
