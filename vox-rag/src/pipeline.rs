//! Startup-time index construction.
//!
//! A [`KnowledgeBase`] is built once, before any request is served:
//! chunk the reference text, embed every chunk, and load the vectors into an
//! [`InMemoryIndex`]. Any failure aborts the build, so a partially-built index
//! is never served.
//!
//! # Example
//!
//! ```rust,ignore
//! use vox_rag::{KnowledgeBase, RagConfig};
//!
//! let config = RagConfig::default();
//! let kb = KnowledgeBase::build(&raw_text, embedder.as_ref(), &config).await?;
//! kb.save("index.json")?;
//! let retriever = kb.retriever(embedder.clone(), &config);
//! ```

use std::path::Path;
use std::sync::Arc;

use tracing::{error, info};

use crate::config::RagConfig;
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::inmemory::InMemoryIndex;
use crate::retriever::Retriever;
use crate::store::DocumentStore;
use crate::vectorstore::VectorIndex;

/// Chunks sent to the embedding provider per request during a build.
const EMBED_BATCH_SIZE: usize = 32;

/// The chunked reference document and its vector index.
#[derive(Debug, Clone)]
pub struct KnowledgeBase {
    store: DocumentStore,
    index: Arc<InMemoryIndex>,
}

impl KnowledgeBase {
    /// Chunk, embed, and index `raw_text`.
    ///
    /// Each embedding batch is bounded by the configured embedding deadline.
    ///
    /// # Errors
    ///
    /// - [`RagError::Configuration`] for invalid chunking parameters
    /// - [`RagError::UpstreamTimeout`] if a batch exceeds the deadline
    /// - [`RagError::Embedding`] if the provider fails or returns the wrong
    ///   number of vectors
    /// - [`RagError::DimensionMismatch`] if the provider's vectors disagree
    pub async fn build(
        raw_text: &str,
        embedder: &dyn EmbeddingProvider,
        config: &RagConfig,
    ) -> Result<Self> {
        config.validate()?;
        let store = DocumentStore::from_config(raw_text, config)?;
        let timeout = config.embed_timeout();

        let mut vectors = Vec::with_capacity(store.len());
        for batch in store.chunks().chunks(EMBED_BATCH_SIZE) {
            let texts: Vec<&str> = batch.iter().map(|c| c.text.as_str()).collect();
            let embedded = tokio::time::timeout(timeout, embedder.embed_batch(&texts))
                .await
                .map_err(|_| {
                    error!(provider = embedder.name(), ?timeout, "embedding timed out during index build");
                    RagError::UpstreamTimeout { operation: "embed".into(), timeout }
                })?
                .map_err(|e| {
                    error!(provider = embedder.name(), error = %e, "embedding failed during index build");
                    RagError::Embedding {
                        provider: embedder.name().to_string(),
                        message: format!("index build failed: {e}"),
                    }
                })?;
            if embedded.len() != texts.len() {
                return Err(RagError::Embedding {
                    provider: embedder.name().to_string(),
                    message: format!(
                        "expected {} embeddings but received {}",
                        texts.len(),
                        embedded.len()
                    ),
                });
            }
            vectors.extend(embedded);
        }

        let index = InMemoryIndex::build(store.chunks().iter().cloned().zip(vectors))?;
        info!(chunk_count = store.len(), dimension = index.dimension(), "knowledge base ready");
        Ok(Self { store, index: Arc::new(index) })
    }

    /// Wrap an index restored from disk; the document store is rebuilt from it.
    pub fn from_index(index: InMemoryIndex) -> Self {
        let store = DocumentStore::from_chunks(index.chunks().cloned().collect());
        Self { store, index: Arc::new(index) }
    }

    /// Load an index saved by [`save`](Self::save).
    ///
    /// # Errors
    ///
    /// See [`InMemoryIndex::load`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::from_index(InMemoryIndex::load(path)?))
    }

    /// Persist the index.
    ///
    /// # Errors
    ///
    /// See [`InMemoryIndex::save`].
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        self.index.save(path)
    }

    /// The chunked document.
    pub fn store(&self) -> &DocumentStore {
        &self.store
    }

    /// The shared vector index.
    pub fn index(&self) -> &Arc<InMemoryIndex> {
        &self.index
    }

    /// A retriever over this knowledge base, or `None` when it has no chunks.
    ///
    /// `embedder` must be the provider (or an identical one) that built the index.
    pub fn retriever(
        &self,
        embedder: Arc<dyn EmbeddingProvider>,
        config: &RagConfig,
    ) -> Option<Retriever> {
        if self.index.is_empty() {
            return None;
        }
        Some(Retriever::new(embedder, self.index.clone(), config))
    }
}
