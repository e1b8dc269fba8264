//! LLM provider factory.
//!
//! Resolves a provider name from configuration into a concrete client.

use crate::client::LlmClient;
use crate::providers::{OllamaClient, OpenAiCompatibleClient};
use crate::types::ProviderType;
use std::sync::Arc;
use std::time::Duration;

/// HTTP-level ceiling applied to every provider client.
const HTTP_TIMEOUT: Duration = Duration::from_secs(120);

/// Create an LLM client based on the provider name.
///
/// # Arguments
/// * `provider` - Provider identifier ("openai", "openrouter", "ollama")
/// * `endpoint` - Optional custom endpoint URL
/// * `api_key` - API key, required by every provider except Ollama
///
/// # Errors
/// Returns an error if the provider is unknown, a required key is missing,
/// or the HTTP client cannot be built.
pub fn create_client(
    provider: &str,
    endpoint: Option<&str>,
    api_key: Option<&str>,
) -> Result<Arc<dyn LlmClient>, String> {
    let provider_type =
        ProviderType::parse(provider).ok_or_else(|| format!("Unknown provider: {}", provider))?;

    match provider_type {
        ProviderType::Ollama => {
            let base_url = endpoint.unwrap_or(provider_type.default_endpoint());
            let client = OllamaClient::with_base_url(base_url)
                .with_timeout(HTTP_TIMEOUT)
                .map_err(|e| e.to_string())?;
            Ok(Arc::new(client))
        }
        ProviderType::OpenAI | ProviderType::OpenRouter => {
            let key = api_key
                .filter(|k| !k.trim().is_empty())
                .ok_or_else(|| format!("{} provider requires API key", provider_type.as_str()))?;
            let client = OpenAiCompatibleClient::new(provider_type, endpoint, key, HTTP_TIMEOUT)
                .map_err(|e| e.to_string())?;
            Ok(Arc::new(client))
        }
    }
}
