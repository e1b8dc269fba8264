//! The model seam used by answer generation.
//!
//! Generation only sees [`LlmClient`]; the Ollama and OpenAI-compatible
//! providers implement it, and tests replace it with scripted doubles.

use bookrag_core::AppResult;
use serde::{Deserialize, Serialize};

/// One grounded-answer call: the rendered prompt plus sampling limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmRequest {
    /// User message holding the numbered evidence and the reader's question
    pub prompt: String,

    /// Provider-side model name, e.g. "llama3.2" or "google/gemini-pro"
    pub model: String,

    /// Cap on answer length, in model tokens
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Kept low so answers stay close to the evidence
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// Instructions confining the model to the evidence
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
}

impl LlmRequest {
    pub fn new(prompt: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            model: model.into(),
            max_tokens: None,
            temperature: None,
            system: None,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }
}

/// The model's draft, before any grounding check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmResponse {
    pub content: String,

    /// Model name as reported by the provider
    pub model: String,

    pub usage: LlmUsage,
}

/// Token accounting reported by the provider. Missing counts read as zero.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct LlmUsage {
    #[serde(default)]
    pub prompt_tokens: u32,

    #[serde(default)]
    pub completion_tokens: u32,

    #[serde(default)]
    pub total_tokens: u32,
}

impl LlmUsage {
    pub fn new(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens.saturating_add(completion_tokens),
        }
    }
}

/// A language model that turns a grounded prompt into a draft answer.
///
/// A single call is a single attempt; timeouts and retries are applied by
/// the caller so every provider gets the same budget.
#[async_trait::async_trait]
pub trait LlmClient: Send + Sync {
    /// Short provider name for logs, e.g. "ollama"
    fn provider_name(&self) -> &str;

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse>;
}
