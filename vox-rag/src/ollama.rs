//! Ollama embedding provider and answer generator.
//!
//! This module is only available when the `ollama` feature is enabled. It
//! talks to a local Ollama server over its REST API with `reqwest`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::generation::AnswerGenerator;

/// The default Ollama server address.
pub const OLLAMA_DEFAULT_URL: &str = "http://localhost:11434";

/// The default model for both generation and embeddings.
pub const DEFAULT_MODEL: &str = "llama3.2:3b";

/// A client for a local Ollama server.
///
/// Implements both [`EmbeddingProvider`] (`/api/embed`) and
/// [`AnswerGenerator`] (`/api/generate`, non-streaming). Construct one handle
/// at startup and share it behind an `Arc`.
///
/// # Example
///
/// ```rust,ignore
/// use vox_rag::ollama::OllamaClient;
///
/// let client = OllamaClient::new().with_model("llama3.2:3b").with_embed_model("nomic-embed-text");
/// let answer = client.generate("Where is the campus?").await?;
/// ```
#[derive(Debug, Clone)]
pub struct OllamaClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
    embed_model: String,
}

impl OllamaClient {
    /// Create a client for `http://localhost:11434` using `llama3.2:3b`.
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: OLLAMA_DEFAULT_URL.into(),
            model: DEFAULT_MODEL.into(),
            embed_model: DEFAULT_MODEL.into(),
        }
    }

    /// Set the server address, e.g. `http://gpu-box:11434`.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set the generation model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the embedding model.
    pub fn with_embed_model(mut self, model: impl Into<String>) -> Self {
        self.embed_model = model.into();
        self
    }

    /// The generation model name.
    pub fn model(&self) -> &str {
        &self.model
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn post<B: Serialize + ?Sized, R: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        body: &B,
    ) -> std::result::Result<R, String> {
        let response = self
            .client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .map_err(|e| {
                error!(provider = "Ollama", url = %self.url(path), error = %e, "request failed");
                if e.is_connect() {
                    format!("cannot connect to Ollama at {}; is `ollama serve` running?", self.base_url)
                } else {
                    format!("request failed: {e}")
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let detail =
                serde_json::from_str::<ErrorResponse>(&body).map(|e| e.error).unwrap_or(body);
            error!(provider = "Ollama", %status, "API error");
            return Err(format!("API returned {status}: {detail}"));
        }

        response.json().await.map_err(|e| {
            error!(provider = "Ollama", error = %e, "failed to parse response");
            format!("failed to parse response: {e}")
        })
    }
}

impl Default for OllamaClient {
    fn default() -> Self {
        Self::new()
    }
}

// ── Ollama API request/response types ──────────────────────────────

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [&'a str],
}

#[derive(Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: String,
}

// ── Trait implementations ──────────────────────────────────────────

#[async_trait]
impl EmbeddingProvider for OllamaClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        debug!(provider = "Ollama", text_len = text.len(), "embedding single text");
        let results = self.embed_batch(&[text]).await?;
        results.into_iter().next().ok_or_else(|| RagError::Embedding {
            provider: "Ollama".into(),
            message: "API returned no embeddings".into(),
        })
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        debug!(provider = "Ollama", batch_size = texts.len(), model = %self.embed_model, "embedding batch");

        let request = EmbedRequest { model: &self.embed_model, input: texts };
        let response: EmbedResponse = self
            .post("/api/embed", &request)
            .await
            .map_err(|message| RagError::Embedding { provider: "Ollama".into(), message })?;
        Ok(response.embeddings)
    }

    fn name(&self) -> &str {
        "Ollama"
    }
}

#[async_trait]
impl AnswerGenerator for OllamaClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        debug!(provider = "Ollama", model = %self.model, prompt_len = prompt.len(), "generating");

        let request = GenerateRequest { model: &self.model, prompt, stream: false };
        let response: GenerateResponse = self
            .post("/api/generate", &request)
            .await
            .map_err(|message| RagError::Generation { provider: "Ollama".into(), message })?;
        Ok(response.response)
    }

    fn name(&self) -> &str {
        "Ollama"
    }
}
