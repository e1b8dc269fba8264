//! Domain types shared by the answering pipeline.

use serde::{Deserialize, Serialize};

/// An immutable passage of the book, created at ingestion time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookChunk {
    /// Stable chunk identifier
    pub id: String,

    /// Passage text
    pub text: String,

    /// Embedding in the same space as query embeddings
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub embedding: Vec<f32>,

    /// Chapter or section title
    pub section: String,

    /// Position of the chunk within its section
    pub position: u32,

    /// Token count recorded at ingestion
    pub token_count: usize,
}

/// Query mode as it arrives on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryType {
    /// Answer from the whole book
    #[default]
    FullBook,
    /// Answer only from the text the reader selected
    SelectionBased,
}

/// Inbound question.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRequest {
    pub query: String,

    #[serde(default)]
    pub query_type: QueryType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_text: Option<String>,
}

impl QueryRequest {
    /// A question against the whole book.
    pub fn full_book(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            query_type: QueryType::FullBook,
            selected_text: None,
        }
    }

    /// A question against a selected span of text.
    pub fn selection(query: impl Into<String>, selected_text: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            query_type: QueryType::SelectionBased,
            selected_text: Some(selected_text.into()),
        }
    }
}

/// Validated query dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryKind {
    FullBook,
    Selection { selected_text: String },
}

impl QueryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryKind::FullBook => "full_book",
            QueryKind::Selection { .. } => "selection_based",
        }
    }
}

/// A validated question. Built through [`Query::parse`](crate::query).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    pub text: String,
    pub kind: QueryKind,
}

/// A chunk that cleared the similarity threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalResult {
    pub chunk: BookChunk,

    /// Similarity in `[0, 1]`
    pub score: f32,

    /// 1-based rank, best first
    pub rank: usize,
}

/// Input of the context assembler.
#[derive(Debug, Clone)]
pub enum ContextSource {
    Retrieved(Vec<RetrievalResult>),
    Selection(String),
}

/// Where a context entry came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ContextOrigin {
    Chunk {
        chunk_id: String,
        section: String,
        position: u32,
        score: f32,
    },
    Selection,
}

impl ContextOrigin {
    /// Human-readable label used in prompts and source listings.
    pub fn label(&self) -> String {
        match self {
            ContextOrigin::Chunk {
                section, position, ..
            } => format!("{}, passage {}", section, position),
            ContextOrigin::Selection => "user selection".to_string(),
        }
    }

    /// Retrieval score, or full confidence for the reader's own selection.
    pub fn score(&self) -> f32 {
        match self {
            ContextOrigin::Chunk { score, .. } => *score,
            ContextOrigin::Selection => 1.0,
        }
    }
}

/// One marked passage inside an assembled context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextEntry {
    /// Citation number; rendered as `[n]`
    pub marker: usize,
    pub origin: ContextOrigin,
    pub text: String,
    pub token_count: usize,
}

impl ContextEntry {
    pub fn marker_label(&self) -> String {
        format!("[{}]", self.marker)
    }
}

/// Ordered, budget-bounded evidence handed to the model and the validator.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AssembledContext {
    pub entries: Vec<ContextEntry>,
    pub token_budget: usize,
}

impl AssembledContext {
    pub fn empty(token_budget: usize) -> Self {
        Self {
            entries: Vec::new(),
            token_budget,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn total_tokens(&self) -> usize {
        self.entries.iter().map(|e| e.token_count).sum()
    }

    /// Total characters of evidence text.
    pub fn total_chars(&self) -> usize {
        self.entries.iter().map(|e| e.text.chars().count()).sum()
    }

    /// Whether this context is the reader's selection rather than retrieved chunks.
    pub fn is_selection(&self) -> bool {
        self.entries
            .iter()
            .any(|e| matches!(e.origin, ContextOrigin::Selection))
    }

    pub fn entry(&self, marker: usize) -> Option<&ContextEntry> {
        self.entries.iter().find(|e| e.marker == marker)
    }

    /// Render entries for a prompt, one marked block per entry.
    pub fn render(&self) -> String {
        self.entries
            .iter()
            .map(|e| format!("{} ({})\n{}", e.marker_label(), e.origin.label(), e.text))
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerKind {
    /// Model output awaiting validation
    Draft,
    /// Sentinel produced without calling the model
    NoContext,
}

/// Draft answer together with the context it was generated from.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedAnswer {
    pub text: String,
    pub context: AssembledContext,
    pub kind: AnswerKind,
}

impl GeneratedAnswer {
    pub fn draft(text: impl Into<String>, context: AssembledContext) -> Self {
        Self {
            text: text.into(),
            context,
            kind: AnswerKind::Draft,
        }
    }

    pub fn no_context(context: AssembledContext) -> Self {
        Self {
            text: String::new(),
            context,
            kind: AnswerKind::NoContext,
        }
    }

    pub fn is_no_context(&self) -> bool {
        self.kind == AnswerKind::NoContext
    }
}

/// Grounding validator states. `Pending` is the only non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerdictState {
    Pending,
    Grounded,
    Unsupported,
    InsufficientContext,
}

/// A claim located in the draft by byte range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimSpan {
    pub start: usize,
    pub end: usize,
    pub text: String,
}

/// A claim together with the entry that supports it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupportedClaim {
    pub span: ClaimSpan,
    pub marker: usize,
    pub score: f32,
}

/// Outcome of grounding validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationVerdict {
    pub state: VerdictState,
    pub unsupported_spans: Vec<ClaimSpan>,
    pub supported_claims: Vec<SupportedClaim>,
    pub reason: Option<String>,
}

impl ValidationVerdict {
    pub fn pending() -> Self {
        Self {
            state: VerdictState::Pending,
            unsupported_spans: Vec::new(),
            supported_claims: Vec::new(),
            reason: None,
        }
    }

    pub fn grounded(&self) -> bool {
        self.state == VerdictState::Grounded
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseStatus {
    Answered,
    Refused,
}

/// Citation attached to a grounded answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceCitation {
    pub marker: usize,
    pub origin: ContextOrigin,
    pub snippet: String,
}

impl SourceCitation {
    pub fn chunk_id(&self) -> Option<&str> {
        match &self.origin {
            ContextOrigin::Chunk { chunk_id, .. } => Some(chunk_id),
            ContextOrigin::Selection => None,
        }
    }
}

/// The only value returned to callers for a query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub query_id: String,
    pub answer: String,
    pub sources: Vec<SourceCitation>,
    pub grounded: bool,
    pub status: ResponseStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub confidence: f32,
}

/// Summary of the stored corpus.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CorpusStats {
    pub chunks: usize,
    pub sections: usize,
    pub total_tokens: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(marker: usize, origin: ContextOrigin, text: &str) -> ContextEntry {
        ContextEntry {
            marker,
            origin,
            text: text.to_string(),
            token_count: text.split_whitespace().count(),
        }
    }

    #[test]
    fn test_query_request_wire_format() {
        let req: QueryRequest = serde_json::from_str(
            r#"{"query":"list the phases","query_type":"selection_based","selected_text":"gait cycle has four phases"}"#,
        )
        .unwrap();
        assert_eq!(req.query_type, QueryType::SelectionBased);
        assert_eq!(req.selected_text.as_deref(), Some("gait cycle has four phases"));

        let req: QueryRequest = serde_json::from_str(r#"{"query":"what is ZMP?"}"#).unwrap();
        assert_eq!(req.query_type, QueryType::FullBook);
    }

    #[test]
    fn test_render_uses_markers_and_origins() {
        let context = AssembledContext {
            entries: vec![
                entry(
                    1,
                    ContextOrigin::Chunk {
                        chunk_id: "c1".to_string(),
                        section: "Locomotion".to_string(),
                        position: 3,
                        score: 0.9,
                    },
                    "Bipeds walk.",
                ),
                entry(2, ContextOrigin::Selection, "Four phases."),
            ],
            token_budget: 100,
        };

        assert_eq!(
            context.render(),
            "[1] (Locomotion, passage 3)\nBipeds walk.\n\n[2] (user selection)\nFour phases."
        );
        assert!(context.is_selection());
        assert_eq!(context.entry(2).unwrap().text, "Four phases.");
        assert_eq!(context.total_chars(), 24);
    }

    #[test]
    fn test_response_serializes_snake_case() {
        let response = Response {
            query_id: "id".to_string(),
            answer: "no".to_string(),
            sources: Vec::new(),
            grounded: false,
            status: ResponseStatus::Refused,
            reason: None,
            confidence: 0.0,
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["status"], "refused");
        assert!(json.get("reason").is_none());
    }
}
