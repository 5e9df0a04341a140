//! The document store: chunked reference text, read-only after loading.

use crate::chunking::{Chunker, WindowChunker};
use crate::config::RagConfig;
use crate::document::Chunk;
use crate::error::Result;

/// Owns the chunks of one reference document for the process lifetime.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentStore {
    chunks: Vec<Chunk>,
}

impl DocumentStore {
    /// Split `raw_text` with the given chunker.
    pub fn load(raw_text: &str, chunker: &dyn Chunker) -> Self {
        Self { chunks: chunker.chunk(raw_text) }
    }

    /// Split `raw_text` with a [`WindowChunker`] sized from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Configuration`](crate::RagError::Configuration) when
    /// the configured overlap is not smaller than the chunk size.
    pub fn from_config(raw_text: &str, config: &RagConfig) -> Result<Self> {
        let chunker = WindowChunker::new(config.chunk_size, config.chunk_overlap)?;
        Ok(Self::load(raw_text, &chunker))
    }

    /// Wrap chunks that were produced earlier, e.g. restored from a saved index.
    pub fn from_chunks(chunks: Vec<Chunk>) -> Self {
        Self { chunks }
    }

    /// All chunks in source order.
    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    /// Look up a chunk by ID.
    pub fn get(&self, id: usize) -> Option<&Chunk> {
        self.chunks.get(id).filter(|c| c.id == id)
    }

    /// Number of chunks.
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Whether the store holds no chunks.
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Concatenate the chunks with overlapping regions removed.
    ///
    /// For chunks produced by a [`Chunker`] this returns the source text.
    pub fn reconstruct(&self) -> String {
        let mut out = String::new();
        let mut covered: usize = 0;
        for chunk in &self.chunks {
            let skip = covered.saturating_sub(chunk.source_offset).min(chunk.text.len());
            out.push_str(&chunk.text[skip..]);
            covered = covered.max(chunk.source_end());
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_config_uses_configured_window() {
        let config = RagConfig::builder().chunk_size(10).chunk_overlap(3).build().unwrap();
        let store =
            DocumentStore::from_config("one two three four five six seven", &config).unwrap();
        assert!(store.len() > 1);
        assert!(store.chunks().iter().all(|c| c.text.chars().count() <= 10));
        assert_eq!(store.reconstruct(), "one two three four five six seven");
    }

    #[test]
    fn from_config_rejects_bad_overlap() {
        let config = RagConfig { chunk_size: 10, chunk_overlap: 10, ..RagConfig::default() };
        assert!(DocumentStore::from_config("text", &config).is_err());
    }

    #[test]
    fn get_by_id() {
        let chunker = WindowChunker::new(4, 1).unwrap();
        let store = DocumentStore::load("abcdefgh", &chunker);
        assert_eq!(store.get(1).map(|c| c.text.as_str()), Some("defg"));
        assert!(store.get(99).is_none());
    }

    #[test]
    fn empty_document_is_empty_store() {
        let store = DocumentStore::from_config("", &RagConfig::default()).unwrap();
        assert!(store.is_empty());
        assert_eq!(store.reconstruct(), "");
    }

    #[test]
    fn reconstruct_skips_overlap_from_hand_built_chunks() {
        let store = DocumentStore::from_chunks(vec![
            Chunk { id: 0, text: "SIT is ".into(), source_offset: 0 },
            Chunk { id: 1, text: "is in Valachil".into(), source_offset: 4 },
        ]);
        assert_eq!(store.reconstruct(), "SIT is in Valachil");
    }
}
