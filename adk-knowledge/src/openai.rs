//! OpenAI-backed embedding provider and chat generator.
//!
//! This module is only available when the `openai` feature is enabled.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::embedding::EmbeddingProvider;
use crate::error::{KnowledgeError, Result};
use crate::generation::Generator;

/// The default OpenAI API base URL.
const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// The default model for embeddings.
const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";

/// The default model for chat completions.
const DEFAULT_CHAT_MODEL: &str = "gpt-3.5-turbo";

const PROVIDER: &str = "OpenAI";

/// Connection settings shared by the OpenAI embedding provider and generator.
#[derive(Debug, Clone)]
pub struct OpenAIConfig {
    /// Bearer token for the API.
    pub api_key: String,
    /// API base URL; override for OpenAI-compatible servers.
    pub base_url: String,
    /// Model used for embeddings.
    pub embedding_model: String,
    /// Model used for chat completions.
    pub chat_model: String,
    /// Upper bound on generated tokens.
    pub max_tokens: u32,
    /// Sampling temperature.
    pub temperature: f32,
}

impl OpenAIConfig {
    /// Create a configuration with default models and the public endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`KnowledgeError::Config`] if the key is empty.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(KnowledgeError::Config("OpenAI API key must not be empty".into()));
        }
        Ok(Self {
            api_key,
            base_url: DEFAULT_BASE_URL.into(),
            embedding_model: DEFAULT_EMBEDDING_MODEL.into(),
            chat_model: DEFAULT_CHAT_MODEL.into(),
            max_tokens: 1000,
            temperature: 0.3,
        })
    }

    /// Create a configuration from the `OPENAI_API_KEY` environment variable.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY").map_err(|_| {
            KnowledgeError::Config("OPENAI_API_KEY environment variable not set".into())
        })?;
        Self::new(api_key)
    }

    /// Point at an OpenAI-compatible server.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set the embedding model.
    pub fn with_embedding_model(mut self, model: impl Into<String>) -> Self {
        self.embedding_model = model.into();
        self
    }

    /// Set the chat model.
    pub fn with_chat_model(mut self, model: impl Into<String>) -> Self {
        self.chat_model = model.into();
        self
    }
}

// ── OpenAI API request/response types ──────────────────────────────

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    max_tokens: u32,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatContent,
}

#[derive(Deserialize)]
struct ChatContent {
    content: String,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

fn provider_error(message: String) -> KnowledgeError {
    KnowledgeError::Embedding { provider: PROVIDER.into(), message }
}

fn generation_error(message: String) -> KnowledgeError {
    KnowledgeError::Generation { provider: PROVIDER.into(), message }
}

/// POST `body` to `{base_url}/{path}` and decode a successful JSON reply.
///
/// Transport failures, non-2xx statuses and undecodable bodies all come back
/// as `Err(message)`; the caller picks the error variant.
async fn post_json<B: Serialize, R: for<'de> Deserialize<'de>>(
    client: &reqwest::Client,
    config: &OpenAIConfig,
    path: &str,
    body: &B,
) -> std::result::Result<R, String> {
    let url = format!("{}/{path}", config.base_url);
    let response = client
        .post(&url)
        .bearer_auth(&config.api_key)
        .json(body)
        .send()
        .await
        .map_err(|e| format!("request failed: {e}"))?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let detail =
            serde_json::from_str::<ErrorResponse>(&body).map(|e| e.error.message).unwrap_or(body);
        return Err(format!("API returned {status}: {detail}"));
    }

    response.json::<R>().await.map_err(|e| format!("failed to parse response: {e}"))
}

/// An [`EmbeddingProvider`] backed by the OpenAI embeddings API.
///
/// Sends one `{model, input}` request per text and reads `data[0].embedding`.
///
/// # Example
///
/// ```rust,ignore
/// use adk_knowledge::openai::{OpenAIConfig, OpenAIEmbeddingProvider};
///
/// let provider = OpenAIEmbeddingProvider::new(OpenAIConfig::from_env()?);
/// let embedding = provider.embed("office hours").await?;
/// ```
pub struct OpenAIEmbeddingProvider {
    client: reqwest::Client,
    config: OpenAIConfig,
}

impl OpenAIEmbeddingProvider {
    /// Create a provider from a shared configuration.
    pub fn new(config: OpenAIConfig) -> Self {
        Self { client: reqwest::Client::new(), config }
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAIEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        debug!(provider = PROVIDER, text_len = text.len(), model = %self.config.embedding_model, "embedding text");

        let request = EmbeddingRequest { model: &self.config.embedding_model, input: text };
        let response: EmbeddingResponse =
            post_json(&self.client, &self.config, "embeddings", &request).await.map_err(|e| {
                error!(provider = PROVIDER, error = %e, "embedding request failed");
                provider_error(e)
            })?;

        response
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| provider_error("API returned no embedding".into()))
    }

    fn name(&self) -> &str {
        PROVIDER
    }
}

/// A [`Generator`] backed by the OpenAI chat completions API.
pub struct OpenAIChatGenerator {
    client: reqwest::Client,
    config: OpenAIConfig,
}

impl OpenAIChatGenerator {
    /// Create a generator from a shared configuration.
    pub fn new(config: OpenAIConfig) -> Self {
        Self { client: reqwest::Client::new(), config }
    }
}

#[async_trait]
impl Generator for OpenAIChatGenerator {
    async fn generate(&self, system_prompt: &str, question: &str) -> Result<String> {
        debug!(provider = PROVIDER, model = %self.config.chat_model, "generating answer");

        let request = ChatRequest {
            model: &self.config.chat_model,
            messages: [
                ChatMessage { role: "system", content: system_prompt },
                ChatMessage { role: "user", content: question },
            ],
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        };
        let response: ChatResponse =
            post_json(&self.client, &self.config, "chat/completions", &request).await.map_err(
                |e| {
                    error!(provider = PROVIDER, error = %e, "chat request failed");
                    generation_error(e)
                },
            )?;

        response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content.trim().to_string())
            .ok_or_else(|| generation_error("API returned no choices".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_key() {
        assert!(OpenAIConfig::new("").is_err());
    }

    #[test]
    fn base_url_drops_trailing_slash() {
        let config = OpenAIConfig::new("sk-test").unwrap().with_base_url("http://localhost:8080/v1/");
        assert_eq!(config.base_url, "http://localhost:8080/v1");
        assert_eq!(config.embedding_model, "text-embedding-3-small");
    }

    #[test]
    fn embedding_request_shape() {
        let body = serde_json::to_value(EmbeddingRequest { model: "m", input: "hi" }).unwrap();
        assert_eq!(body, serde_json::json!({ "model": "m", "input": "hi" }));
    }

    #[test]
    fn parses_first_embedding() {
        let parsed: EmbeddingResponse =
            serde_json::from_str(r#"{"data":[{"embedding":[0.5,-1.0],"index":0}],"model":"m"}"#)
                .unwrap();
        assert_eq!(parsed.data[0].embedding, vec![0.5, -1.0]);
    }
}
