//! LLM integration crate for bookrag.
//!
//! Provider-agnostic access to chat/completion models. The answering
//! pipeline depends only on the [`LlmClient`] trait.
//!
//! # Providers
//! - **Ollama**: local runtime (default)
//! - **OpenRouter** / **OpenAI**: OpenAI-compatible chat completions
//!
//! # Example
//! ```no_run
//! use bookrag_llm::{LlmClient, LlmRequest, providers::OllamaClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = OllamaClient::new();
//! let request = LlmRequest::new("What is a gait cycle?", "llama3.2");
//! let response = client.complete(&request).await?;
//! println!("{}", response.content);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod factory;
pub mod providers;
pub mod types;

pub use client::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
pub use factory::create_client;
pub use providers::{OllamaClient, OpenAiCompatibleClient};
pub use types::ProviderType;
