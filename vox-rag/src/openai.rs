//! OpenAI embedding provider and chat-completion answer generator.
//!
//! This module is only available when the `openai` feature is enabled. The
//! base URL is configurable, so any OpenAI-compatible server works too.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::generation::AnswerGenerator;

/// The default OpenAI API base URL.
pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// The default model for OpenAI embeddings.
const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";

/// The default chat model.
const DEFAULT_CHAT_MODEL: &str = "gpt-4o-mini";

/// Shared connection settings for OpenAI endpoints.
#[derive(Clone)]
struct OpenAIConnection {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl OpenAIConnection {
    fn new(api_key: String) -> std::result::Result<Self, String> {
        if api_key.is_empty() {
            return Err("API key must not be empty".into());
        }
        Ok(Self { client: reqwest::Client::new(), api_key, base_url: OPENAI_BASE_URL.into() })
    }

    fn from_env() -> std::result::Result<Self, String> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| "OPENAI_API_KEY environment variable not set".to_string())?;
        Self::new(api_key)
    }

    async fn post<B: Serialize, R: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        body: &B,
    ) -> std::result::Result<R, String> {
        let response = self
            .client
            .post(format!("{}{path}", self.base_url))
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                error!(provider = "OpenAI", error = %e, "request failed");
                format!("request failed: {e}")
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);

            error!(provider = "OpenAI", %status, "API error");
            return Err(format!("API returned {status}: {detail}"));
        }

        response.json().await.map_err(|e| {
            error!(provider = "OpenAI", error = %e, "failed to parse response");
            format!("failed to parse response: {e}")
        })
    }
}

/// An [`EmbeddingProvider`] backed by the OpenAI embeddings API.
///
/// # Configuration
///
/// - `model` – defaults to `text-embedding-3-small`.
/// - `dimensions` – optional Matryoshka dimension override.
/// - `api_key` – from the constructor or the `OPENAI_API_KEY` environment variable.
#[derive(Clone)]
pub struct OpenAIEmbeddingProvider {
    connection: OpenAIConnection,
    model: String,
    /// If set, passed to the API for Matryoshka dimension truncation.
    request_dimensions: Option<usize>,
}

impl OpenAIEmbeddingProvider {
    /// Create a new provider with the given API key.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Embedding`] if the key is empty.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let connection = OpenAIConnection::new(api_key.into()).map_err(embedding_error)?;
        Ok(Self { connection, model: DEFAULT_EMBEDDING_MODEL.into(), request_dimensions: None })
    }

    /// Create a new provider using the `OPENAI_API_KEY` environment variable.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Embedding`] if the variable is unset or empty.
    pub fn from_env() -> Result<Self> {
        let connection = OpenAIConnection::from_env().map_err(embedding_error)?;
        Ok(Self { connection, model: DEFAULT_EMBEDDING_MODEL.into(), request_dimensions: None })
    }

    /// Set the model name (e.g. `text-embedding-3-large`).
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Point at an OpenAI-compatible server.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.connection.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Request embeddings truncated to `dims` (Matryoshka support).
    pub fn with_dimensions(mut self, dims: usize) -> Self {
        self.request_dimensions = Some(dims);
        self
    }
}

/// An [`AnswerGenerator`] backed by the OpenAI chat completions API.
///
/// The composed prompt is sent as a single user message.
#[derive(Clone)]
pub struct OpenAIGenerator {
    connection: OpenAIConnection,
    model: String,
    temperature: Option<f32>,
}

impl OpenAIGenerator {
    /// Create a new generator with the given API key, using `gpt-4o-mini`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Generation`] if the key is empty.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let connection = OpenAIConnection::new(api_key.into()).map_err(generation_error)?;
        Ok(Self { connection, model: DEFAULT_CHAT_MODEL.into(), temperature: None })
    }

    /// Create a new generator using the `OPENAI_API_KEY` environment variable.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Generation`] if the variable is unset or empty.
    pub fn from_env() -> Result<Self> {
        let connection = OpenAIConnection::from_env().map_err(generation_error)?;
        Ok(Self { connection, model: DEFAULT_CHAT_MODEL.into(), temperature: None })
    }

    /// Set the chat model name.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Point at an OpenAI-compatible server.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.connection.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set the sampling temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

fn embedding_error(message: String) -> RagError {
    RagError::Embedding { provider: "OpenAI".into(), message }
}

fn generation_error(message: String) -> RagError {
    RagError::Generation { provider: "OpenAI".into(), message }
}

// ── OpenAI API request/response types ──────────────────────────────

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: Vec<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
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
    messages: [ChatMessage<'a>; 1],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
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
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

// ── Trait implementations ──────────────────────────────────────────

#[async_trait]
impl EmbeddingProvider for OpenAIEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        debug!(provider = "OpenAI", text_len = text.len(), "embedding single text");

        let results = self.embed_batch(&[text]).await?;
        results
            .into_iter()
            .next()
            .ok_or_else(|| embedding_error("API returned empty response".into()))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!(
            provider = "OpenAI",
            batch_size = texts.len(),
            model = %self.model,
            "embedding batch"
        );

        let request_body = EmbeddingRequest {
            model: &self.model,
            input: texts.to_vec(),
            dimensions: self.request_dimensions,
        };
        let response: EmbeddingResponse =
            self.connection.post("/embeddings", &request_body).await.map_err(embedding_error)?;

        Ok(response.data.into_iter().map(|d| d.embedding).collect())
    }

    fn name(&self) -> &str {
        "OpenAI"
    }
}

#[async_trait]
impl AnswerGenerator for OpenAIGenerator {
    async fn generate(&self, prompt: &str) -> Result<String> {
        debug!(provider = "OpenAI", model = %self.model, prompt_len = prompt.len(), "generating");

        let request_body = ChatRequest {
            model: &self.model,
            messages: [ChatMessage { role: "user", content: prompt }],
            temperature: self.temperature,
        };
        let response: ChatResponse = self
            .connection
            .post("/chat/completions", &request_body)
            .await
            .map_err(generation_error)?;

        response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content.unwrap_or_default())
            .ok_or_else(|| generation_error("API returned no choices".into()))
    }

    fn name(&self) -> &str {
        "OpenAI"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_key_rejected() {
        assert!(matches!(OpenAIEmbeddingProvider::new(""), Err(RagError::Embedding { .. })));
        assert!(matches!(OpenAIGenerator::new(""), Err(RagError::Generation { .. })));
    }

    #[test]
    fn chat_request_wraps_prompt_in_user_message() {
        let body = serde_json::to_value(ChatRequest {
            model: "gpt-4o-mini",
            messages: [ChatMessage { role: "user", content: "hi" }],
            temperature: None,
        })
        .unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "model": "gpt-4o-mini",
                "messages": [{"role": "user", "content": "hi"}]
            })
        );
    }

    #[test]
    fn base_url_override_trims_slash() {
        let generator =
            OpenAIGenerator::new("sk-test").unwrap().with_base_url("http://localhost:8000/v1/");
        assert_eq!(generator.connection.base_url, "http://localhost:8000/v1");
    }
}
