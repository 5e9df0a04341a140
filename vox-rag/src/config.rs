//! Configuration for chunking, retrieval, and request orchestration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{RagError, Result};

/// Phrases that mark an answer as low-confidence by default.
pub const DEFAULT_FALLBACK_PHRASES: &[&str] =
    &["don't know", "not sure", "cannot answer", "not aware"];

/// Configuration parameters for the answering pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RagConfig {
    /// Maximum chunk size in characters.
    pub chunk_size: usize,
    /// Number of overlapping characters between consecutive chunks.
    pub chunk_overlap: usize,
    /// Number of chunks retrieved per question.
    pub top_k: usize,
    /// Results scoring below this are dropped after the top-k cut.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub similarity_threshold: Option<f32>,
    /// Deadline for a single embedding call, in milliseconds.
    pub embed_timeout_ms: u64,
    /// Deadline for a single generation call, in milliseconds.
    pub generate_timeout_ms: u64,
    /// How many times a timed-out upstream call is retried.
    pub timeout_retries: u32,
    /// Lower-case phrases that trigger the context-free fallback.
    pub fallback_phrases: Vec<String>,
    /// Answer without retrieved context when the embedding provider is down.
    pub degrade_on_retrieval_failure: bool,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 150,
            top_k: 3,
            similarity_threshold: None,
            embed_timeout_ms: 30_000,
            generate_timeout_ms: 120_000,
            timeout_retries: 1,
            fallback_phrases: DEFAULT_FALLBACK_PHRASES.iter().map(|p| (*p).to_string()).collect(),
            degrade_on_retrieval_failure: true,
        }
    }
}

impl RagConfig {
    /// Create a new builder for constructing a [`RagConfig`].
    pub fn builder() -> RagConfigBuilder {
        RagConfigBuilder::default()
    }

    /// Deadline applied to each embedding call.
    pub fn embed_timeout(&self) -> Duration {
        Duration::from_millis(self.embed_timeout_ms)
    }

    /// Deadline applied to each generation call.
    pub fn generate_timeout(&self) -> Duration {
        Duration::from_millis(self.generate_timeout_ms)
    }

    /// Check that parameters are consistent.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Configuration`] if:
    /// - `chunk_size == 0`
    /// - `chunk_overlap >= chunk_size`
    /// - `top_k == 0`
    /// - either timeout is zero
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(RagError::Configuration("chunk_size must be greater than zero".into()));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(RagError::Configuration(format!(
                "chunk_overlap ({}) must be less than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        if self.top_k == 0 {
            return Err(RagError::Configuration("top_k must be greater than zero".into()));
        }
        if self.embed_timeout_ms == 0 || self.generate_timeout_ms == 0 {
            return Err(RagError::Configuration("upstream timeouts must be non-zero".into()));
        }
        Ok(())
    }
}

/// Builder for constructing a validated [`RagConfig`].
#[derive(Debug, Clone, Default)]
pub struct RagConfigBuilder {
    config: RagConfig,
}

impl RagConfigBuilder {
    /// Set the maximum chunk size in characters.
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.config.chunk_size = size;
        self
    }

    /// Set the overlap between consecutive chunks in characters.
    pub fn chunk_overlap(mut self, overlap: usize) -> Self {
        self.config.chunk_overlap = overlap;
        self
    }

    /// Set the number of chunks retrieved per question.
    pub fn top_k(mut self, k: usize) -> Self {
        self.config.top_k = k;
        self
    }

    /// Set the minimum similarity score kept after retrieval.
    pub fn similarity_threshold(mut self, threshold: f32) -> Self {
        self.config.similarity_threshold = Some(threshold);
        self
    }

    /// Set the embedding deadline.
    pub fn embed_timeout(mut self, timeout: Duration) -> Self {
        self.config.embed_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Set the generation deadline.
    pub fn generate_timeout(mut self, timeout: Duration) -> Self {
        self.config.generate_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Set how many times a timed-out upstream call is retried.
    pub fn timeout_retries(mut self, retries: u32) -> Self {
        self.config.timeout_retries = retries;
        self
    }

    /// Replace the low-confidence phrase set.
    pub fn fallback_phrases<I, S>(mut self, phrases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.fallback_phrases = phrases.into_iter().map(Into::into).collect();
        self
    }

    /// Choose whether an embedding outage degrades to a context-free answer.
    pub fn degrade_on_retrieval_failure(mut self, enabled: bool) -> Self {
        self.config.degrade_on_retrieval_failure = enabled;
        self
    }

    /// Build the [`RagConfig`], validating that parameters are consistent.
    ///
    /// # Errors
    ///
    /// See [`RagConfig::validate`].
    pub fn build(self) -> Result<RagConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = RagConfig::default();
        assert_eq!(config.chunk_size, 1000);
        assert_eq!(config.chunk_overlap, 150);
        assert_eq!(config.top_k, 3);
        assert_eq!(config.timeout_retries, 1);
        assert_eq!(config.fallback_phrases.len(), 4);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn overlap_must_be_smaller_than_chunk_size() {
        let err = RagConfig::builder().chunk_size(100).chunk_overlap(100).build().unwrap_err();
        assert!(matches!(err, RagError::Configuration(_)));
    }

    #[test]
    fn zero_top_k_rejected() {
        assert!(RagConfig::builder().top_k(0).build().is_err());
    }

    #[test]
    fn partial_document_fills_defaults() {
        let config: RagConfig = serde_json::from_str(r#"{"top_k": 5}"#).unwrap();
        assert_eq!(config.top_k, 5);
        assert_eq!(config.chunk_size, 1000);
    }
}
