//! Cross-component tests for the answering pipeline.

mod rag_ranking;
