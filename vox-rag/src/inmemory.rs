//! In-memory vector index using brute-force cosine similarity.
//!
//! [`InMemoryIndex`] scores every stored vector against the query. For the
//! hundreds to low thousands of chunks a single reference document produces
//! this is fast enough and fully deterministic. The index can be saved to and
//! restored from a JSON file.

use std::cmp::Ordering;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::document::{Chunk, ScoredChunk};
use crate::error::{RagError, Result};
use crate::vectorstore::VectorIndex;

/// Current on-disk format version written by [`InMemoryIndex::save`].
const FORMAT_VERSION: u32 = 1;

/// One stored chunk together with its embedding.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndexEntry {
    /// The indexed chunk.
    pub chunk: Chunk,
    /// The chunk's embedding.
    pub vector: Vec<f32>,
}

/// An immutable in-memory vector index.
///
/// # Example
///
/// ```rust
/// use vox_rag::{Chunk, InMemoryIndex, VectorIndex};
///
/// let chunk = |id: usize| Chunk { id, text: format!("chunk {id}"), source_offset: 0 };
/// let index = InMemoryIndex::build(vec![
///     (chunk(0), vec![1.0, 0.0]),
///     (chunk(1), vec![0.0, 1.0]),
/// ])
/// .unwrap();
/// let results = index.query(&[1.0, 0.1], 1).unwrap();
/// assert_eq!(results[0].chunk.id, 0);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InMemoryIndex {
    entries: Vec<IndexEntry>,
    dimension: Option<usize>,
}

#[derive(Serialize, Deserialize)]
struct PersistedIndex {
    version: u32,
    dimension: Option<usize>,
    entries: Vec<IndexEntry>,
}

/// Compute cosine similarity between two vectors.
///
/// Returns 0.0 if either vector has zero magnitude.
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// Reject vectors that would make similarity scores NaN.
pub(crate) fn ensure_finite(vector: &[f32], location: impl FnOnce() -> String) -> Result<()> {
    if vector.iter().all(|x| x.is_finite()) {
        Ok(())
    } else {
        Err(RagError::NonFiniteVector { location: location() })
    }
}

impl InMemoryIndex {
    /// Build an index from chunk/embedding pairs.
    ///
    /// An empty input builds an empty index, which rejects every query.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::DimensionMismatch`] if the vectors differ in length
    /// and [`RagError::NonFiniteVector`] if any component is NaN or infinite.
    pub fn build(entries: impl IntoIterator<Item = (Chunk, Vec<f32>)>) -> Result<Self> {
        let mut dimension = None;
        let mut stored = Vec::new();

        for (chunk, vector) in entries {
            match dimension {
                None => dimension = Some(vector.len()),
                Some(expected) if expected != vector.len() => {
                    return Err(RagError::DimensionMismatch { expected, actual: vector.len() });
                }
                Some(_) => {}
            }
            ensure_finite(&vector, || format!("chunk {}", chunk.id))?;
            stored.push(IndexEntry { chunk, vector });
        }

        info!(entry_count = stored.len(), dimension, "built vector index");
        Ok(Self { entries: stored, dimension })
    }

    /// Stored entries in insertion order.
    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    /// Stored chunks in insertion order.
    pub fn chunks(&self) -> impl Iterator<Item = &Chunk> {
        self.entries.iter().map(|e| &e.chunk)
    }

    /// Write the index to `path` as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Persistence`] if serialization fails and
    /// [`RagError::Io`] if the file cannot be written.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let persisted = PersistedIndex {
            version: FORMAT_VERSION,
            dimension: self.dimension,
            entries: self.entries.clone(),
        };
        let json = serde_json::to_vec(&persisted)
            .map_err(|e| RagError::Persistence(format!("failed to serialize index: {e}")))?;
        fs::write(path, json)?;
        info!(path = %path.display(), entry_count = self.entries.len(), "saved vector index");
        Ok(())
    }

    /// Read an index previously written by [`save`](Self::save).
    ///
    /// The loaded index answers every query exactly like the saved one.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Io`] if the file cannot be read,
    /// [`RagError::Persistence`] if it is malformed or from an unknown format
    /// version, and [`RagError::DimensionMismatch`] if its vectors disagree.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path)?;
        let persisted: PersistedIndex = serde_json::from_slice(&bytes).map_err(|e| {
            RagError::Persistence(format!("failed to parse index '{}': {e}", path.display()))
        })?;
        if persisted.version != FORMAT_VERSION {
            return Err(RagError::Persistence(format!(
                "unsupported index format version {} (expected {FORMAT_VERSION})",
                persisted.version
            )));
        }

        let index = Self::build(persisted.entries.into_iter().map(|e| (e.chunk, e.vector)))?;
        if let (Some(expected), Some(actual)) = (persisted.dimension, index.dimension) {
            if expected != actual {
                return Err(RagError::DimensionMismatch { expected, actual });
            }
        }
        info!(path = %path.display(), entry_count = index.len(), "loaded vector index");
        Ok(index)
    }
}

impl VectorIndex for InMemoryIndex {
    fn query(&self, vector: &[f32], k: usize) -> Result<Vec<ScoredChunk>> {
        let Some(dimension) = self.dimension.filter(|_| !self.entries.is_empty()) else {
            return Err(RagError::EmptyIndex);
        };
        if k == 0 {
            return Err(RagError::Configuration("k must be at least 1".into()));
        }
        if vector.len() != dimension {
            return Err(RagError::DimensionMismatch { expected: dimension, actual: vector.len() });
        }
        ensure_finite(vector, || "query".into())?;

        let mut scored: Vec<ScoredChunk> = self
            .entries
            .iter()
            .map(|entry| ScoredChunk {
                chunk: entry.chunk.clone(),
                score: cosine_similarity(&entry.vector, vector),
            })
            .collect();

        scored.sort_by(|a, b| match b.score.total_cmp(&a.score) {
            Ordering::Equal => a.chunk.id.cmp(&b.chunk.id),
            other => other,
        });
        scored.truncate(k);

        debug!(k, result_count = scored.len(), "vector index query");
        Ok(scored)
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn dimension(&self) -> Option<usize> {
        self.dimension
    }
}
