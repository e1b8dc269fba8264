//! Grounding validation of draft answers.
//!
//! The validator starts every draft in [`VerdictState::Pending`] and settles
//! it exactly once into `Grounded`, `Unsupported` or `InsufficientContext`.
//! No model is involved; the outcome depends only on the draft, the context
//! and the configured scorer.

pub mod claims;
pub mod scoring;

pub use claims::{decompose, Claim};
pub use scoring::{scorer_by_name, LexicalOverlapScorer, SupportScorer, TrigramScorer};

use crate::types::{
    AssembledContext, ClaimSpan, GeneratedAnswer, SupportedClaim, ValidationVerdict, VerdictState,
};
use bookrag_core::{AppResult, RagConfig};
use std::sync::Arc;
use tracing::debug;

/// Phrases that signal knowledge from outside the book.
const EXTERNAL_KNOWLEDGE: &[&str] = &[
    "according to my knowledge",
    "i know that",
    "from general knowledge",
    "in my experience",
    "recently",
    "currently",
    "today",
    "this year",
    "latest",
    "new developments",
];

/// Phrases a model uses when it declines to answer from the context.
const MODEL_REFUSALS: &[&str] = &[
    "cannot answer",
    "can't answer",
    "unable to answer",
    "not in the provided",
    "not contain enough information",
    "no information about",
    "i don't know",
    "i do not know",
];

impl ValidationVerdict {
    fn settle(mut self, state: VerdictState, reason: Option<String>) -> Self {
        debug_assert_eq!(self.state, VerdictState::Pending, "verdict settled twice");
        self.state = state;
        self.reason = reason;
        self
    }
}

/// Deterministic claim-by-claim check of a draft against its context.
#[derive(Debug, Clone)]
pub struct GroundingValidator {
    scorer: Arc<dyn SupportScorer>,
    claim_support_threshold: f32,
    min_context_chars: usize,
}

impl GroundingValidator {
    pub fn new(
        scorer: Arc<dyn SupportScorer>,
        claim_support_threshold: f32,
        min_context_chars: usize,
    ) -> Self {
        Self {
            scorer,
            claim_support_threshold,
            min_context_chars,
        }
    }

    pub fn from_config(config: &RagConfig) -> AppResult<Self> {
        Ok(Self::new(
            scorer_by_name(&config.scorer)?,
            config.claim_support_threshold,
            config.min_context_chars,
        ))
    }

    pub fn with_scorer(mut self, scorer: Arc<dyn SupportScorer>) -> Self {
        self.scorer = scorer;
        self
    }

    pub fn scorer_name(&self) -> &str {
        self.scorer.name()
    }

    pub fn validate(&self, answer: &GeneratedAnswer) -> ValidationVerdict {
        let verdict = ValidationVerdict::pending();
        let context = &answer.context;

        if answer.is_no_context() || context.is_empty() {
            return verdict.settle(
                VerdictState::InsufficientContext,
                Some("no context passed the retrieval threshold".to_string()),
            );
        }

        let chars = context.total_chars();
        if !context.is_selection() && chars < self.min_context_chars {
            return verdict.settle(
                VerdictState::InsufficientContext,
                Some(format!(
                    "context holds {} characters, at least {} are required",
                    chars, self.min_context_chars
                )),
            );
        }

        if is_model_refusal(&answer.text) {
            return verdict.settle(
                VerdictState::InsufficientContext,
                Some("the model found no answer in the context".to_string()),
            );
        }

        let claims = decompose(&answer.text);
        if claims.is_empty() {
            return verdict.settle(
                VerdictState::Unsupported,
                Some("the answer contains no verifiable claims".to_string()),
            );
        }

        let mut verdict = verdict;
        let mut external = 0;
        for claim in &claims {
            let span = ClaimSpan {
                start: claim.start,
                end: claim.end,
                text: claim.text.clone(),
            };

            if let Some(phrase) = external_indicator(&claim.text) {
                debug!(claim = %claim.text, phrase, "Claim relies on outside knowledge");
                external += 1;
                verdict.unsupported_spans.push(span);
                continue;
            }

            match self.best_support(claim, context) {
                Some((marker, score)) => {
                    debug!(claim = %claim.text, marker, score, "Claim supported");
                    verdict.supported_claims.push(SupportedClaim {
                        span,
                        marker,
                        score,
                    });
                }
                None => {
                    debug!(claim = %claim.text, "Claim unsupported");
                    verdict.unsupported_spans.push(span);
                }
            }
        }

        if verdict.unsupported_spans.is_empty() {
            let reason = format!("all {} claims supported", claims.len());
            verdict.settle(VerdictState::Grounded, Some(reason))
        } else {
            let mut reason = format!(
                "{} of {} claims lack support in the context",
                verdict.unsupported_spans.len(),
                claims.len()
            );
            if external > 0 {
                reason.push_str(&format!(" ({} rely on outside knowledge)", external));
            }
            verdict.settle(VerdictState::Unsupported, Some(reason))
        }
    }

    /// Entry supporting `claim`, if any reaches the threshold.
    ///
    /// Explicitly cited entries win when they qualify; otherwise the highest
    /// score wins, earlier marker on ties.
    fn best_support(&self, claim: &Claim, context: &AssembledContext) -> Option<(usize, f32)> {
        let qualifying: Vec<(usize, f32)> = context
            .entries
            .iter()
            .map(|e| (e.marker, self.scorer.score(&claim.text, &e.text)))
            .filter(|(_, score)| *score >= self.claim_support_threshold)
            .collect();

        let cited = strongest(
            qualifying
                .iter()
                .filter(|(marker, _)| claim.cited_markers.contains(marker)),
        );
        cited.or_else(|| strongest(qualifying.iter()))
    }
}

/// Highest score, first candidate on ties.
fn strongest<'a>(candidates: impl Iterator<Item = &'a (usize, f32)>) -> Option<(usize, f32)> {
    candidates.fold(None, |best, &(marker, score)| match best {
        Some((_, best_score)) if score <= best_score => best,
        _ => Some((marker, score)),
    })
}

fn is_model_refusal(text: &str) -> bool {
    let lower = text.to_lowercase().replace('’', "'");
    MODEL_REFUSALS.iter().any(|phrase| lower.contains(phrase))
}

/// First outside-knowledge phrase found in `text`, matched on whole words.
fn external_indicator(text: &str) -> Option<&'static str> {
    use unicode_segmentation::UnicodeSegmentation;

    let words: Vec<String> = text.unicode_words().map(|w| w.to_lowercase()).collect();
    EXTERNAL_KNOWLEDGE.iter().copied().find(|phrase| {
        let needle: Vec<&str> = phrase.split(' ').collect();
        words
            .windows(needle.len())
            .any(|window| window.iter().zip(&needle).all(|(w, n)| w == n))
    })
}
