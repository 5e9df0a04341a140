//! Request orchestration: question in, answer out.
//!
//! The [`Orchestrator`] runs one request through retrieval, prompt
//! composition, generation, and the fallback check. It holds only read-only
//! shared state, so one instance behind an `Arc` serves concurrent requests.
//!
//! Dropping the future returned by [`Orchestrator::answer`] drops the
//! in-flight upstream call with it.
//!
//! # Example
//!
//! ```rust,ignore
//! use vox_rag::{Orchestrator, QueryRequest, RagConfig};
//!
//! let orchestrator = Orchestrator::builder()
//!     .config(config)
//!     .generator(Arc::new(generator))
//!     .retriever(kb.retriever(embedder, &config))  // optional
//!     .background(background_text)                 // optional
//!     .build()?;
//!
//! let answer = orchestrator.answer("Where is the campus?").await?;
//! ```

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::RagConfig;
use crate::document::{AnswerResponse, QueryMode, QueryRequest};
use crate::error::{ErrorResponse, RagError, Result};
use crate::fallback::FallbackPolicy;
use crate::generation::AnswerGenerator;
use crate::prompt::{PromptTemplate, join_context};
use crate::retriever::Retriever;

/// The outward reply for one request: an answer or a structured error.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum Reply {
    /// The request was answered.
    Answer(AnswerResponse),
    /// The request failed; the service keeps running.
    Error(ErrorResponse),
}

/// Answers questions using optional retrieval and a language model.
pub struct Orchestrator {
    retriever: Option<Retriever>,
    generator: Arc<dyn AnswerGenerator>,
    qa_template: PromptTemplate,
    correction_template: PromptTemplate,
    fallback: FallbackPolicy,
    background: Option<String>,
    generate_timeout: Duration,
    timeout_retries: u32,
    degrade_on_retrieval_failure: bool,
}

impl Orchestrator {
    /// Create a new [`OrchestratorBuilder`].
    pub fn builder() -> OrchestratorBuilder {
        OrchestratorBuilder::default()
    }

    /// Whether retrieved context is used.
    pub fn has_retrieval(&self) -> bool {
        self.retriever.is_some()
    }

    /// Answer a question in question-answering mode.
    ///
    /// # Errors
    ///
    /// See [`handle`](Self::handle).
    pub async fn answer(&self, question: &str) -> Result<AnswerResponse> {
        self.handle(&QueryRequest::qa(question)).await
    }

    /// Answer a request with the template selected by its mode.
    ///
    /// # Errors
    ///
    /// - [`RagError::InvalidRequest`] if the question is blank
    /// - [`RagError::UpstreamTimeout`] if an upstream call still times out
    ///   after the configured retries
    /// - [`RagError::RetrievalUnavailable`] if embedding fails and degrading
    ///   is disabled
    /// - [`RagError::Generation`] or any other error from the generator
    pub async fn handle(&self, request: &QueryRequest) -> Result<AnswerResponse> {
        let question = request.question.trim();
        if question.is_empty() {
            return Err(RagError::InvalidRequest("question must not be empty".into()));
        }

        let context = self.context_for(question).await?;
        let prompt = self.template(request.mode).render(&context, question)?;

        let answer = self.generate(&prompt).await?;
        if !self.fallback.needs_fallback(&answer) {
            info!(mode = ?request.mode, used_fallback = false, "answered question");
            return Ok(AnswerResponse {
                query: request.question.clone(),
                response: answer,
                used_fallback: false,
            });
        }

        info!(mode = ?request.mode, "answer looked unhelpful, retrying without retrieved context");
        let prompt = FallbackPolicy::fallback_prompt(question, self.background.as_deref());
        let response = self.generate(&prompt).await?;

        info!(mode = ?request.mode, used_fallback = true, "answered question");
        Ok(AnswerResponse { query: request.question.clone(), response, used_fallback: true })
    }

    /// Like [`handle`](Self::handle), converting failures into [`Reply::Error`].
    pub async fn respond(&self, request: &QueryRequest) -> Reply {
        match self.handle(request).await {
            Ok(answer) => Reply::Answer(answer),
            Err(e) => {
                warn!(error = %e, recoverable = e.is_recoverable(), "request failed");
                Reply::Error(ErrorResponse::from(&e))
            }
        }
    }

    fn template(&self, mode: QueryMode) -> &PromptTemplate {
        match mode {
            QueryMode::Qa => &self.qa_template,
            QueryMode::Correct => &self.correction_template,
        }
    }

    /// The context region for `question`.
    ///
    /// Without a retriever the background text is the whole context.
    async fn context_for(&self, question: &str) -> Result<String> {
        let Some(retriever) = &self.retriever else {
            return Ok(self.background.clone().unwrap_or_default());
        };

        let top_k = retriever.top_k();
        match self.with_timeout_retry("embed", move || retriever.retrieve(question, top_k)).await {
            Ok(chunks) => {
                debug!(chunk_count = chunks.len(), "composed retrieved context");
                Ok(join_context(&chunks))
            }
            Err(e @ RagError::RetrievalUnavailable { .. }) if self.degrade_on_retrieval_failure => {
                warn!(error = %e, "retrieval unavailable, answering without retrieved context");
                Ok(self.background.clone().unwrap_or_default())
            }
            Err(e) => Err(e),
        }
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        let timeout = self.generate_timeout;
        let generator = &self.generator;
        self.with_timeout_retry("generate", move || async move {
            debug!(generator = generator.name(), prompt_len = prompt.len(), "calling generator");
            match tokio::time::timeout(timeout, generator.generate(prompt)).await {
                Ok(result) => result,
                Err(_) => Err(RagError::UpstreamTimeout { operation: "generate".into(), timeout }),
            }
        })
        .await
    }

    /// Run `call`, repeating it while it times out, up to `timeout_retries` extra times.
    async fn with_timeout_retry<T, F, Fut>(&self, operation: &str, mut call: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0;
        loop {
            match call().await {
                Err(e) if e.is_timeout() && attempt < self.timeout_retries => {
                    attempt += 1;
                    warn!(operation, attempt, "upstream call timed out, retrying");
                }
                other => return other,
            }
        }
    }
}

/// Builder for constructing an [`Orchestrator`].
///
/// Only the generator is required. Templates default to
/// [`PromptTemplate::qa`] and [`PromptTemplate::correction`]; the config
/// defaults to [`RagConfig::default`].
#[derive(Default)]
pub struct OrchestratorBuilder {
    config: Option<RagConfig>,
    generator: Option<Arc<dyn AnswerGenerator>>,
    retriever: Option<Retriever>,
    qa_template: Option<PromptTemplate>,
    correction_template: Option<PromptTemplate>,
    background: Option<String>,
}

impl OrchestratorBuilder {
    /// Set timeouts, retries, fallback phrases, and degrade behavior.
    pub fn config(mut self, config: RagConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the answer generator.
    pub fn generator(mut self, generator: Arc<dyn AnswerGenerator>) -> Self {
        self.generator = Some(generator);
        self
    }

    /// Set the retriever. `None` answers from the background text only.
    pub fn retriever(mut self, retriever: Option<Retriever>) -> Self {
        self.retriever = retriever;
        self
    }

    /// Override the question-answering template.
    pub fn qa_template(mut self, template: PromptTemplate) -> Self {
        self.qa_template = Some(template);
        self
    }

    /// Override the correction template.
    pub fn correction_template(mut self, template: PromptTemplate) -> Self {
        self.correction_template = Some(template);
        self
    }

    /// Set the fixed background text used by the fallback prompt.
    pub fn background(mut self, background: impl Into<String>) -> Self {
        let background = background.into();
        self.background = (!background.trim().is_empty()).then_some(background);
        self
    }

    /// Build the [`Orchestrator`], validating config and templates.
    ///
    /// # Errors
    ///
    /// - [`RagError::Configuration`] if the config is invalid or no generator is set
    /// - [`RagError::TemplateField`] if a template lacks a placeholder
    pub fn build(self) -> Result<Orchestrator> {
        let config = self.config.unwrap_or_default();
        config.validate()?;
        let generator = self
            .generator
            .ok_or_else(|| RagError::Configuration("generator is required".into()))?;

        let qa_template = self.qa_template.unwrap_or_else(PromptTemplate::qa);
        qa_template.validate()?;
        let correction_template = self.correction_template.unwrap_or_else(PromptTemplate::correction);
        correction_template.validate()?;

        Ok(Orchestrator {
            retriever: self.retriever,
            generator,
            qa_template,
            correction_template,
            fallback: FallbackPolicy::new(&config.fallback_phrases),
            background: self.background,
            generate_timeout: config.generate_timeout(),
            timeout_retries: config.timeout_retries,
            degrade_on_retrieval_failure: config.degrade_on_retrieval_failure,
        })
    }
}
