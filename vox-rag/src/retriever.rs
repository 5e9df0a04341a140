//! Query-time retrieval: embed the question, then search the index.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error};

use crate::config::RagConfig;
use crate::document::{Chunk, ScoredChunk};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::inmemory::ensure_finite;
use crate::vectorstore::VectorIndex;

/// Finds the chunks most similar to a question.
///
/// Holds shared handles to an embedding provider and a read-only index, so a
/// single `Retriever` serves any number of concurrent requests.
#[derive(Clone)]
pub struct Retriever {
    embedder: Arc<dyn EmbeddingProvider>,
    index: Arc<dyn VectorIndex>,
    top_k: usize,
    embed_timeout: Duration,
    similarity_threshold: Option<f32>,
}

impl Retriever {
    /// Create a retriever with `top_k`, deadline, and threshold from `config`.
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        index: Arc<dyn VectorIndex>,
        config: &RagConfig,
    ) -> Self {
        Self {
            embedder,
            index,
            top_k: config.top_k,
            embed_timeout: config.embed_timeout(),
            similarity_threshold: config.similarity_threshold,
        }
    }

    /// The configured default `k`.
    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// The index this retriever searches.
    pub fn index(&self) -> &Arc<dyn VectorIndex> {
        &self.index
    }

    /// Return up to `k` chunks ordered by descending similarity to `question`.
    ///
    /// # Errors
    ///
    /// See [`retrieve_scored`](Self::retrieve_scored).
    pub async fn retrieve(&self, question: &str, k: usize) -> Result<Vec<Chunk>> {
        Ok(self.retrieve_scored(question, k).await?.into_iter().map(|r| r.chunk).collect())
    }

    /// Like [`retrieve`](Self::retrieve), keeping the similarity scores.
    ///
    /// Calls the embedding provider exactly once.
    ///
    /// # Errors
    ///
    /// - [`RagError::Configuration`] if `k == 0`
    /// - [`RagError::UpstreamTimeout`] if embedding exceeds the deadline
    /// - [`RagError::RetrievalUnavailable`] if the embedding provider fails
    /// - [`RagError::NonFiniteVector`] if the query embedding contains NaN or infinity
    /// - any error from [`VectorIndex::query`]
    pub async fn retrieve_scored(&self, question: &str, k: usize) -> Result<Vec<ScoredChunk>> {
        if k == 0 {
            return Err(RagError::Configuration("k must be at least 1".into()));
        }

        let provider = self.embedder.name().to_string();
        let embedding = match tokio::time::timeout(self.embed_timeout, self.embedder.embed(question))
            .await
        {
            Err(_) => {
                error!(provider = %provider, timeout = ?self.embed_timeout, "query embedding timed out");
                return Err(RagError::UpstreamTimeout {
                    operation: "embed".into(),
                    timeout: self.embed_timeout,
                });
            }
            Ok(Err(e)) => {
                error!(provider = %provider, error = %e, "query embedding failed");
                return Err(RagError::RetrievalUnavailable { provider, message: e.to_string() });
            }
            Ok(Ok(embedding)) => embedding,
        };
        if let Err(e) = ensure_finite(&embedding, || "query".into()) {
            error!(provider = %provider, "query embedding has non-finite values");
            return Err(e);
        }

        let mut results = self.index.query(&embedding, k)?;
        if let Some(threshold) = self.similarity_threshold {
            results.retain(|r| r.score >= threshold);
        }

        debug!(k, result_count = results.len(), "retrieved context");
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::embedding::HashEmbeddingProvider;
    use crate::inmemory::InMemoryIndex;

    struct CountingEmbedder {
        inner: HashEmbeddingProvider,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl EmbeddingProvider for CountingEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.inner.embed_text(text))
        }
    }

    struct BrokenEmbedder;

    #[async_trait]
    impl EmbeddingProvider for BrokenEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Err(RagError::Embedding { provider: "broken".into(), message: "connection refused".into() })
        }

        fn name(&self) -> &str {
            "broken"
        }
    }

    struct StalledEmbedder;

    #[async_trait]
    impl EmbeddingProvider for StalledEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(vec![1.0])
        }
    }

    struct NanEmbedder;

    #[async_trait]
    impl EmbeddingProvider for NanEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Ok(vec![f32::NAN; 128])
        }
    }

    fn index(provider: &HashEmbeddingProvider) -> Arc<InMemoryIndex> {
        let texts = [
            "The campus is located in Valachil, Mangaluru.",
            "Placement officer: Dr. Dheeraj Hebri.",
            "Aeronautical engineering faculty list.",
        ];
        let entries = texts.iter().enumerate().map(|(id, text)| {
            (Chunk { id, text: (*text).to_string(), source_offset: 0 }, provider.embed_text(text))
        });
        Arc::new(InMemoryIndex::build(entries).unwrap())
    }

    #[tokio::test]
    async fn embeds_question_once_and_ranks_relevant_chunk_first() {
        let inner = HashEmbeddingProvider::new(128);
        let index = index(&inner);
        let embedder = Arc::new(CountingEmbedder { inner, calls: AtomicUsize::new(0) });
        let retriever = Retriever::new(embedder.clone(), index, &RagConfig::default());

        let chunks = retriever.retrieve("placement officer name", 2).await.unwrap();
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 1);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].id, 1);
    }

    #[tokio::test]
    async fn provider_failure_is_retrieval_unavailable() {
        let index = index(&HashEmbeddingProvider::new(128));
        let retriever = Retriever::new(Arc::new(BrokenEmbedder), index, &RagConfig::default());
        let err = retriever.retrieve("anything", 3).await.unwrap_err();
        assert!(matches!(err, RagError::RetrievalUnavailable { ref provider, .. } if provider == "broken"));
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_provider_times_out() {
        let index = index(&HashEmbeddingProvider::new(128));
        let config = RagConfig::builder().embed_timeout(Duration::from_millis(50)).build().unwrap();
        let retriever = Retriever::new(Arc::new(StalledEmbedder), index, &config);
        let err = retriever.retrieve("anything", 3).await.unwrap_err();
        assert!(matches!(err, RagError::UpstreamTimeout { ref operation, .. } if operation == "embed"));
    }

    #[tokio::test]
    async fn zero_k_rejected() {
        let provider = HashEmbeddingProvider::new(128);
        let retriever = Retriever::new(Arc::new(provider.clone()), index(&provider), &RagConfig::default());
        assert!(matches!(retriever.retrieve("q", 0).await, Err(RagError::Configuration(_))));
    }

    #[tokio::test]
    async fn threshold_filters_weak_matches() {
        let provider = HashEmbeddingProvider::new(128);
        let config = RagConfig::builder().similarity_threshold(0.2).build().unwrap();
        let retriever = Retriever::new(Arc::new(provider.clone()), index(&provider), &config);
        let results = retriever.retrieve_scored("placement officer", 3).await.unwrap();
        assert!(!results.is_empty());
        assert!(results.iter().all(|r| r.score >= 0.2));
    }

    #[tokio::test]
    async fn non_finite_query_embedding_rejected() {
        let index = index(&HashEmbeddingProvider::new(128));
        let retriever = Retriever::new(Arc::new(NanEmbedder), index, &RagConfig::default());
        let err = retriever.retrieve("anything", 3).await.unwrap_err();
        assert!(matches!(err, RagError::NonFiniteVector { ref location } if location == "query"));
    }
}
