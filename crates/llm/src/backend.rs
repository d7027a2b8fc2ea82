//! Gemini chat backend
//!
//! Thin HTTP client over the `generateContent` endpoint. 5xx responses are
//! retried with a doubling backoff; 4xx responses are not.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use sherlock_config::constants::endpoints;
use sherlock_core::{ChatModel, GenerationOptions, Result};

use crate::LlmError;

/// Gemini service configuration, shared by the chat and embedding clients
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    /// Chat model name, e.g. `gemini-1.5-flash`
    pub chat_model: String,
    /// Embedding model name, e.g. `text-embedding-004`
    pub embed_model: String,
    /// Embedding dimension fixed by the model
    pub embedding_dim: usize,
    pub endpoint: String,
    /// Per-call timeout
    pub timeout: Duration,
    /// Maximum retry attempts for transient failures
    pub max_retries: u32,
    /// Initial backoff, doubled each retry
    pub initial_backoff: Duration,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            chat_model: "gemini-1.5-flash".to_string(),
            embed_model: "text-embedding-004".to_string(),
            embedding_dim: 768,
            endpoint: endpoints::GEMINI_DEFAULT.to_string(),
            timeout: Duration::from_secs(10),
            max_retries: 2,
            initial_backoff: Duration::from_millis(100),
        }
    }
}

impl GeminiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            ..Default::default()
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_chat_model(mut self, model: impl Into<String>) -> Self {
        self.chat_model = model.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct GenerationConfig {
    temperature: f32,
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: usize,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

/// Chat client for the Gemini `generateContent` API
#[derive(Clone)]
pub struct GeminiChat {
    client: Client,
    config: GeminiConfig,
}

impl GeminiChat {
    pub fn new(config: GeminiConfig) -> std::result::Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| LlmError::Configuration(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    fn api_url(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            self.config.endpoint, self.config.chat_model, self.config.api_key
        )
    }

    async fn execute(
        &self,
        request: &GenerateRequest<'_>,
    ) -> std::result::Result<GenerateResponse, LlmError> {
        let response = self.client.post(self.api_url()).json(request).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            if status.is_server_error() {
                return Err(LlmError::Network(format!("Server error {status}: {body}")));
            }
            return Err(LlmError::Api(format!("{status}: {body}")));
        }

        Ok(response.json().await?)
    }

    async fn generate_with_retry(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> std::result::Result<String, LlmError> {
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
            generation_config: GenerationConfig {
                temperature: options.temperature,
                max_output_tokens: options.max_output_tokens,
            },
        };

        let mut backoff = self.config.initial_backoff;
        let mut last_error = LlmError::Api("no attempts made".to_string());

        for attempt in 0..=self.config.max_retries {
            match self.execute(&request).await {
                Ok(response) => {
                    let text = response
                        .candidates
                        .into_iter()
                        .next()
                        .and_then(|c| c.content.parts.into_iter().next())
                        .map(|p| p.text)
                        .ok_or_else(|| {
                            LlmError::InvalidResponse("response carried no candidates".to_string())
                        })?;
                    return Ok(text.trim().to_string());
                }
                Err(e @ (LlmError::Network(_) | LlmError::Timeout)) => {
                    tracing::warn!(attempt, error = %e, "Chat call failed, retrying");
                    last_error = e;
                    if attempt < self.config.max_retries {
                        tokio::time::sleep(backoff).await;
                        backoff *= 2;
                    }
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_error)
    }
}

#[async_trait]
impl ChatModel for GeminiChat {
    async fn generate(&self, prompt: &str, options: &GenerationOptions) -> Result<String> {
        self.generate_with_retry(prompt, options)
            .await
            .map_err(Into::into)
    }

    fn model_name(&self) -> &str {
        &self.config.chat_model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = GeminiConfig::new("secret")
            .with_chat_model("gemini-1.5-pro")
            .with_endpoint("http://localhost:9999")
            .with_timeout(Duration::from_secs(3));
        assert_eq!(config.chat_model, "gemini-1.5-pro");
        assert_eq!(config.endpoint, "http://localhost:9999");
        assert_eq!(config.timeout, Duration::from_secs(3));
    }

    #[test]
    fn test_api_url_shape() {
        let chat = GeminiChat::new(GeminiConfig::new("k")).unwrap();
        let url = chat.api_url();
        assert!(url.contains("/v1beta/models/gemini-1.5-flash:generateContent"));
        assert!(url.ends_with("key=k"));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_an_error() {
        let config = GeminiConfig::new("k")
            .with_endpoint("http://127.0.0.1:1")
            .with_timeout(Duration::from_millis(200));
        let chat = GeminiChat::new(config).unwrap();
        let result = chat
            .generate("hello", &GenerationOptions::default())
            .await;
        assert!(result.is_err());
    }

    #[test]
    fn test_response_parsing() {
        let json = r#"{"candidates":[{"content":{"parts":[{"text":"simple"}]}}]}"#;
        let response: GenerateResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.candidates[0].content.parts[0].text, "simple");
    }
}
