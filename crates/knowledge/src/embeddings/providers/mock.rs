//! Deterministic embeddings from character trigrams.

use crate::embeddings::provider::EmbeddingProvider;
use bookrag_core::AppResult;
use std::collections::HashMap;
use unicode_segmentation::UnicodeSegmentation;

const MODEL_NAME: &str = "trigram-v1";

const STOP_WORDS: &[&str] = &[
    "the", "is", "at", "which", "on", "a", "an", "as", "are", "was", "were", "for", "to", "of",
    "in", "and", "or", "but", "with", "by", "from", "this", "that", "be", "have", "has", "had",
    "it", "its", "their", "they", "them", "what", "how", "does", "do",
];

/// Offline embedding provider.
///
/// Each content word adds weight to the buckets of its padded character
/// trigrams and to a bucket for the whole word, then the vector is scaled to
/// unit length. Not semantic, but stable and content-dependent, so the same
/// text always lands on the same vector and overlapping texts score high.
#[derive(Debug)]
pub struct MockProvider {
    dimensions: usize,
}

impl MockProvider {
    /// Create a new mock provider with specified dimensions.
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }

    fn bucket(&self, feature: &str, seed: u64) -> usize {
        let hash = feature
            .bytes()
            .fold(seed, |acc, b| acc.wrapping_mul(0x100_0000_01b3).wrapping_add(b as u64));
        (hash % self.dimensions as u64) as usize
    }

    fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut embedding = vec![0.0f32; self.dimensions];

        let mut word_freq: HashMap<String, u32> = HashMap::new();
        for word in text.unicode_words() {
            let word = word.to_lowercase();
            if word.chars().count() > 2 && !STOP_WORDS.contains(&word.as_str()) {
                *word_freq.entry(word).or_insert(0) += 1;
            }
        }

        for (word, freq) in &word_freq {
            let padded: Vec<char> = format!(" {} ", word).chars().collect();
            for window in padded.windows(3) {
                let trigram: String = window.iter().collect();
                let idx = self.bucket(&trigram, 0xcbf2_9ce4_8422_2325);
                embedding[idx] += (*freq as f32).sqrt();
            }
            let idx = self.bucket(word, 0x8422_2325);
            embedding[idx] += *freq as f32;
        }

        let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut embedding {
                *v /= norm;
            }
        }

        embedding
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for MockProvider {
    fn provider_name(&self) -> &str {
        "mock"
    }

    fn model_name(&self) -> &str {
        MODEL_NAME
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|text| self.embed_text(text)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::cosine_similarity;

    fn norm(v: &[f32]) -> f32 {
        v.iter().map(|x| x * x).sum::<f32>().sqrt()
    }

    #[tokio::test]
    async fn test_embed_is_unit_length() {
        let provider = MockProvider::new(384);
        let embedding = provider.embed("The gait cycle has four phases").await.unwrap();
        assert_eq!(embedding.len(), 384);
        assert!((norm(&embedding) - 1.0).abs() < 0.001);
    }

    #[tokio::test]
    async fn test_embed_is_deterministic() {
        let provider = MockProvider::new(384);
        let a = provider.embed("turning radius of a biped").await.unwrap();
        let b = provider.embed("turning radius of a biped").await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_related_text_scores_higher() {
        let provider = MockProvider::new(384);
        let query = provider.embed("turning radius formula for a biped").await.unwrap();
        let related = provider
            .embed("The turning radius of a biped follows from its step length.")
            .await
            .unwrap();
        let unrelated = provider
            .embed("Lithium batteries store energy chemically.")
            .await
            .unwrap();

        assert!(cosine_similarity(&query, &related) > cosine_similarity(&query, &unrelated));
    }

    #[tokio::test]
    async fn test_stop_words_only_gives_zero_vector() {
        let provider = MockProvider::new(64);
        let embedding = provider.embed("what is the").await.unwrap();
        assert!(embedding.iter().all(|&x| x == 0.0));
    }

    #[tokio::test]
    async fn test_batch_and_utf8() {
        let provider = MockProvider::new(128);
        let texts = vec![
            "Équilibre dynamique 🤖".to_string(),
            "Zero moment point".to_string(),
        ];
        let embeddings = provider.embed_batch(&texts).await.unwrap();
        assert_eq!(embeddings.len(), 2);
        for embedding in &embeddings {
            assert!((norm(embedding) - 1.0).abs() < 0.001);
        }
    }
}
