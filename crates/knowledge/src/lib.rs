//! Grounded question answering over a fixed book corpus.
//!
//! A query flows through [`retriever::Retriever`] (full-book only),
//! [`context::ContextAssembler`], [`generation::GenerationAgent`],
//! [`grounding::GroundingValidator`] and [`response::ResponseBuilder`].
//! [`pipeline::RagPipeline`] wires them together.

pub mod context;
pub mod embeddings;
pub mod generation;
pub mod grounding;
pub mod pipeline;
pub mod query;
pub mod response;
pub mod retriever;
pub mod retry;
pub mod store;
pub mod tokens;
pub mod types;

#[cfg(test)]
mod tests;

pub use context::ContextAssembler;
pub use embeddings::{create_provider, EmbeddingProvider, MockProvider, OllamaProvider};
pub use generation::{GenerationAgent, GenerationSettings, PromptSet};
pub use grounding::{
    scorer_by_name, GroundingValidator, LexicalOverlapScorer, SupportScorer, TrigramScorer,
};
pub use pipeline::RagPipeline;
pub use response::ResponseBuilder;
pub use retriever::Retriever;
pub use retry::RetryPolicy;
pub use store::{ChunkStore, MemoryCorpus, SqliteChunkStore, VectorIndex};
pub use types::{
    AssembledContext, BookChunk, ContextEntry, ContextOrigin, CorpusStats, GeneratedAnswer,
    Query, QueryKind, QueryRequest, QueryType, Response, ResponseStatus, RetrievalResult,
    SourceCitation, ValidationVerdict, VerdictState,
};
