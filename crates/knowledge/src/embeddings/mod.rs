//! Query and chunk embeddings.

pub mod provider;
pub mod providers;

pub use provider::{create_provider, EmbeddingProvider};
pub use providers::{MockProvider, OllamaProvider};
