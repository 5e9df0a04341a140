//! Vector index trait for similarity search over embedded chunks.

use crate::document::ScoredChunk;
use crate::error::Result;

/// A read-only similarity index over chunk embeddings.
///
/// Indexes are built once and then only queried, so implementations are
/// shared across concurrent requests without locking. The contract fixes only
/// inputs and outputs: a brute-force scan and an approximate structure are
/// interchangeable.
///
/// # Example
///
/// ```rust,ignore
/// use vox_rag::{InMemoryIndex, VectorIndex};
///
/// let index = InMemoryIndex::build(entries)?;
/// let results = index.query(&query_embedding, 3)?;
/// ```
pub trait VectorIndex: Send + Sync {
    /// Return up to `k` chunks ordered by descending cosine similarity.
    ///
    /// Equal scores are ordered by ascending chunk ID.
    ///
    /// # Errors
    ///
    /// - [`RagError::EmptyIndex`](crate::RagError::EmptyIndex) if nothing is stored
    /// - [`RagError::DimensionMismatch`](crate::RagError::DimensionMismatch) if
    ///   `vector` has the wrong length
    /// - [`RagError::Configuration`](crate::RagError::Configuration) if `k == 0`
    fn query(&self, vector: &[f32], k: usize) -> Result<Vec<ScoredChunk>>;

    /// Number of stored entries.
    fn len(&self) -> usize;

    /// Whether no entries are stored.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Vector dimension shared by all entries, if any are stored.
    fn dimension(&self) -> Option<usize>;
}
