//! Claim support scorers.

use super::claims::{all_words, content_words};
use bookrag_core::{AppError, AppResult};
use std::collections::HashSet;
use std::sync::Arc;

/// Scores how well a passage supports a claim, in `[0, 1]`.
///
/// Implementations must be deterministic and depend only on the two texts.
pub trait SupportScorer: Send + Sync + std::fmt::Debug {
    fn name(&self) -> &str;

    fn score(&self, claim: &str, evidence: &str) -> f32;
}

/// Fraction of the claim's distinct content words present in the evidence.
#[derive(Debug, Clone, Copy, Default)]
pub struct LexicalOverlapScorer;

impl SupportScorer for LexicalOverlapScorer {
    fn name(&self) -> &str {
        "lexical"
    }

    fn score(&self, claim: &str, evidence: &str) -> f32 {
        let claim_words: HashSet<String> = content_words(claim).into_iter().collect();
        if claim_words.is_empty() {
            return 0.0;
        }
        let evidence_words: HashSet<String> = all_words(evidence).into_iter().collect();
        let found = claim_words
            .iter()
            .filter(|w| evidence_words.contains(*w))
            .count();
        found as f32 / claim_words.len() as f32
    }
}

/// Fraction of the claim's character trigrams present in the evidence.
///
/// More tolerant of inflection and compound words than word overlap.
#[derive(Debug, Clone, Copy, Default)]
pub struct TrigramScorer;

impl TrigramScorer {
    fn trigrams(words: &[String]) -> HashSet<String> {
        let mut grams = HashSet::new();
        for word in words {
            let padded: Vec<char> = format!(" {} ", word).chars().collect();
            for window in padded.windows(3) {
                grams.insert(window.iter().collect());
            }
        }
        grams
    }
}

impl SupportScorer for TrigramScorer {
    fn name(&self) -> &str {
        "trigram"
    }

    fn score(&self, claim: &str, evidence: &str) -> f32 {
        let claim_grams = Self::trigrams(&content_words(claim));
        if claim_grams.is_empty() {
            return 0.0;
        }
        let evidence_grams = Self::trigrams(&all_words(evidence));
        let found = claim_grams.intersection(&evidence_grams).count();
        found as f32 / claim_grams.len() as f32
    }
}

/// Look up a scorer by its configured name.
pub fn scorer_by_name(name: &str) -> AppResult<Arc<dyn SupportScorer>> {
    match name {
        "lexical" => Ok(Arc::new(LexicalOverlapScorer)),
        "trigram" => Ok(Arc::new(TrigramScorer)),
        other => Err(AppError::Config(format!(
            "Unknown claim scorer '{}'. Supported: lexical, trigram",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EVIDENCE: &str = "The gait cycle has four phases: heel strike, stance, toe off and swing.";

    #[test]
    fn test_lexical_full_and_partial_overlap() {
        let scorer = LexicalOverlapScorer;
        assert_eq!(scorer.score("The gait cycle has four phases", EVIDENCE), 1.0);
        // gait, cycle, phase found; lasts, two, seconds missing
        let partial = scorer.score("A gait cycle phase lasts two seconds", EVIDENCE);
        assert!((partial - 3.0 / 6.0).abs() < 1e-6);
        assert_eq!(scorer.score("the of and", EVIDENCE), 0.0);
    }

    #[test]
    fn test_lexical_is_case_and_plural_insensitive() {
        let scorer = LexicalOverlapScorer;
        assert_eq!(scorer.score("Phase", "PHASES of walking"), 1.0);
    }

    #[test]
    fn test_trigram_tolerates_inflection() {
        let lexical = LexicalOverlapScorer.score("walking robots", "a robot walks");
        let trigram = TrigramScorer.score("walking robots", "a robot walks");
        assert!(trigram > lexical);
        assert!(trigram > 0.0 && trigram < 1.0);
    }

    #[test]
    fn test_scorer_by_name() {
        assert_eq!(scorer_by_name("lexical").unwrap().name(), "lexical");
        assert_eq!(scorer_by_name("trigram").unwrap().name(), "trigram");
        assert!(matches!(scorer_by_name("llm"), Err(AppError::Config(_))));
    }
}
