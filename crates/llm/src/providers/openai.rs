//! OpenAI-compatible chat completions provider.
//!
//! Works against OpenAI itself and against OpenRouter, which exposes the same
//! `/chat/completions` contract under a different base URL.

use crate::client::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
use crate::types::ProviderType;
use bookrag_core::{AppError, AppResult};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Chat completions client for OpenAI-compatible endpoints.
pub struct OpenAiCompatibleClient {
    provider: ProviderType,
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    model: Option<String>,
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

impl OpenAiCompatibleClient {
    /// Create a client for the given provider.
    ///
    /// `base_url` falls back to the provider's public endpoint.
    pub fn new(
        provider: ProviderType,
        base_url: Option<&str>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> AppResult<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(AppError::Config(format!(
                "{} provider requires a non-empty API key",
                provider.as_str()
            )));
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Llm(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            provider,
            base_url: base_url
                .unwrap_or(provider.default_endpoint())
                .trim_end_matches('/')
                .to_string(),
            api_key,
            client,
        })
    }

    fn headers(&self) -> AppResult<HeaderMap> {
        let mut headers = HeaderMap::new();
        let auth = format!("Bearer {}", self.api_key.trim());
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&auth)
                .map_err(|_| AppError::Config("API key contains invalid characters".to_string()))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if self.provider == ProviderType::OpenRouter {
            headers.insert("X-Title", HeaderValue::from_static("bookrag"));
        }
        Ok(headers)
    }

    fn to_chat_request<'a>(&self, request: &'a LlmRequest) -> ChatRequest<'a> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = request.system.as_deref() {
            messages.push(ChatMessage {
                role: "system",
                content: system,
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: &request.prompt,
        });

        ChatRequest {
            model: &request.model,
            messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        }
    }

    fn convert_response(&self, request: &LlmRequest, response: ChatResponse) -> AppResult<LlmResponse> {
        let content = response
            .choices
            .into_iter()
            .find_map(|choice| choice.message.content)
            .ok_or_else(|| {
                AppError::Llm(format!(
                    "{} returned no message content",
                    self.provider.as_str()
                ))
            })?;

        let usage = response
            .usage
            .map(|u| LlmUsage::new(u.prompt_tokens, u.completion_tokens))
            .unwrap_or_default();

        Ok(LlmResponse {
            content,
            model: response.model.unwrap_or_else(|| request.model.clone()),
            usage,
        })
    }
}

#[async_trait::async_trait]
impl LlmClient for OpenAiCompatibleClient {
    fn provider_name(&self) -> &str {
        self.provider.as_str()
    }

    #[tracing::instrument(skip(self, request), fields(provider = self.provider.as_str(), model = %request.model))]
    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        tracing::debug!(
            provider = self.provider.as_str(),
            model = %request.model,
            "Sending chat completion request"
        );

        let url = format!("{}/chat/completions", self.base_url);
        let response = self
            .client
            .post(&url)
            .headers(self.headers()?)
            .json(&self.to_chat_request(request))
            .send()
            .await
            .map_err(|e| {
                AppError::Llm(format!(
                    "Failed to call {} chat completions: {}",
                    self.provider.as_str(),
                    e
                ))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            return Err(AppError::Llm(format!(
                "{} API error ({}): {}",
                self.provider.as_str(),
                status,
                text
            )));
        }

        let parsed: ChatResponse = response.json().await.map_err(|e| {
            AppError::Llm(format!(
                "Failed to parse {} response: {}",
                self.provider.as_str(),
                e
            ))
        })?;

        self.convert_response(request, parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> OpenAiCompatibleClient {
        OpenAiCompatibleClient::new(
            ProviderType::OpenRouter,
            None,
            "sk-test",
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[test]
    fn test_default_endpoint() {
        assert_eq!(client().base_url, "https://openrouter.ai/api/v1");
        assert_eq!(client().provider_name(), "openrouter");
    }

    #[test]
    fn test_empty_api_key_rejected() {
        let result =
            OpenAiCompatibleClient::new(ProviderType::OpenAI, None, "  ", Duration::from_secs(5));
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn test_chat_request_puts_system_first() {
        let client = client();
        let request = LlmRequest::new("Question?", "google/gemini-pro")
            .with_system("Only use the book.")
            .with_temperature(0.1)
            .with_max_tokens(500);

        let json = serde_json::to_value(client.to_chat_request(&request)).unwrap();
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["role"], "user");
        assert_eq!(json["messages"][1]["content"], "Question?");
        assert_eq!(json["max_tokens"], 500);
    }

    #[test]
    fn test_convert_response() {
        let client = client();
        let request = LlmRequest::new("q", "google/gemini-pro");
        let raw: ChatResponse = serde_json::from_str(
            r#"{"choices":[{"message":{"role":"assistant","content":"The gait cycle has four phases."}}],
                "usage":{"prompt_tokens":10,"completion_tokens":7}}"#,
        )
        .unwrap();

        let response = client.convert_response(&request, raw).unwrap();
        assert_eq!(response.content, "The gait cycle has four phases.");
        assert_eq!(response.model, "google/gemini-pro");
        assert_eq!(response.usage.total_tokens, 17);
    }

    #[test]
    fn test_convert_response_without_content_fails() {
        let client = client();
        let request = LlmRequest::new("q", "m");
        let raw: ChatResponse = serde_json::from_str(r#"{"choices":[]}"#).unwrap();
        assert!(matches!(
            client.convert_response(&request, raw),
            Err(AppError::Llm(_))
        ));
    }
}
