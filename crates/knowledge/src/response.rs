//! Final response shaping.

use crate::types::{
    GeneratedAnswer, Response, ResponseStatus, SourceCitation, ValidationVerdict,
};

const SNIPPET_CHARS: usize = 150;

/// Turns a settled verdict into the caller-facing [`Response`].
///
/// Only a grounded verdict lets the draft through. Every other outcome
/// becomes the configured refusal with no sources.
#[derive(Debug, Clone)]
pub struct ResponseBuilder {
    refusal_message: String,
}

impl ResponseBuilder {
    pub fn new(refusal_message: impl Into<String>) -> Self {
        Self {
            refusal_message: refusal_message.into(),
        }
    }

    pub fn refusal_message(&self) -> &str {
        &self.refusal_message
    }

    pub fn build(
        &self,
        query_id: &str,
        verdict: &ValidationVerdict,
        answer: &GeneratedAnswer,
    ) -> Response {
        if !verdict.grounded() {
            return self.refusal(query_id, verdict);
        }

        let mut markers: Vec<usize> = verdict.supported_claims.iter().map(|c| c.marker).collect();
        markers.sort_unstable();
        markers.dedup();

        let sources: Vec<SourceCitation> = markers
            .iter()
            .filter_map(|marker| answer.context.entry(*marker))
            .map(|entry| SourceCitation {
                marker: entry.marker,
                origin: entry.origin.clone(),
                snippet: snippet(&entry.text),
            })
            .collect();

        if sources.is_empty() {
            return self.refusal(query_id, verdict);
        }

        Response {
            query_id: query_id.to_string(),
            answer: answer.text.clone(),
            confidence: confidence(verdict, &sources),
            sources,
            grounded: true,
            status: ResponseStatus::Answered,
            reason: None,
        }
    }

    fn refusal(&self, query_id: &str, verdict: &ValidationVerdict) -> Response {
        Response {
            query_id: query_id.to_string(),
            answer: self.refusal_message.clone(),
            sources: Vec::new(),
            grounded: false,
            status: ResponseStatus::Refused,
            reason: verdict.reason.clone(),
            confidence: 0.0,
        }
    }
}

/// Mean of retrieval strength and claim support, in `[0, 1]`.
fn confidence(verdict: &ValidationVerdict, sources: &[SourceCitation]) -> f32 {
    let retrieval = sources.iter().map(|s| s.origin.score()).sum::<f32>() / sources.len() as f32;
    let support = if verdict.supported_claims.is_empty() {
        0.0
    } else {
        verdict.supported_claims.iter().map(|c| c.score).sum::<f32>()
            / verdict.supported_claims.len() as f32
    };
    ((retrieval + support) / 2.0).clamp(0.0, 1.0)
}

/// First ~150 characters of `text`, cut on a word boundary.
fn snippet(text: &str) -> String {
    if text.chars().count() <= SNIPPET_CHARS {
        return text.to_string();
    }
    let cut = text
        .char_indices()
        .nth(SNIPPET_CHARS)
        .map_or(text.len(), |(idx, _)| idx);
    let head = &text[..cut];
    let head = match head.rfind(char::is_whitespace) {
        Some(space) if space > 0 => &head[..space],
        _ => head,
    };
    format!("{}...", head.trim_end())
}
