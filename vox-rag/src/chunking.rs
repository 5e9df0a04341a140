//! Splitting reference text into overlapping chunks.
//!
//! This module provides the [`Chunker`] trait and [`WindowChunker`], which cuts
//! text into windows of at most `max_length` characters. Consecutive windows
//! share `overlap` characters, and each window prefers to end just after a
//! whitespace character so words are not split.

use crate::document::Chunk;
use crate::error::{RagError, Result};

/// A break is searched for in the last `1 / BREAK_SEARCH_FRACTION` of each window.
const BREAK_SEARCH_FRACTION: usize = 4;

/// A strategy for splitting text into chunks.
///
/// Implementations must return chunks in source order with sequential IDs
/// starting at 0, and every chunk must be an exact slice of the input whose
/// `source_offset` points at its first byte.
pub trait Chunker: Send + Sync {
    /// Split `text` into chunks. Returns an empty `Vec` for empty input.
    fn chunk(&self, text: &str) -> Vec<Chunk>;
}

/// Splits text into overlapping character windows, breaking at whitespace.
///
/// Lengths are counted in `char`s, so multi-byte UTF-8 text is never cut
/// inside a character.
///
/// # Example
///
/// ```rust
/// use vox_rag::{Chunker, WindowChunker};
///
/// let chunker = WindowChunker::new(5, 2).unwrap();
/// let chunks = chunker.chunk("AAAA BBBB CCCC");
/// assert_eq!(chunks[0].text, "AAAA ");
/// ```
#[derive(Debug, Clone)]
pub struct WindowChunker {
    max_length: usize,
    overlap: usize,
}

impl WindowChunker {
    /// Create a new `WindowChunker`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Configuration`] if `max_length` is zero or
    /// `overlap >= max_length`.
    pub fn new(max_length: usize, overlap: usize) -> Result<Self> {
        if max_length == 0 {
            return Err(RagError::Configuration("max_length must be greater than zero".into()));
        }
        if overlap >= max_length {
            return Err(RagError::Configuration(format!(
                "overlap ({overlap}) must be less than max_length ({max_length})"
            )));
        }
        Ok(Self { max_length, overlap })
    }

    /// Maximum window length in characters.
    pub fn max_length(&self) -> usize {
        self.max_length
    }

    /// Characters shared by consecutive windows.
    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Pick the end of the window starting at `start` (char indices).
    ///
    /// Whitespace is searched for only in the last quarter of the window, and
    /// only ends strictly beyond `start + overlap` are eligible, which keeps
    /// the next window's start ahead of this one.
    fn window_end(&self, chars: &[char], start: usize, hard_end: usize) -> usize {
        let tail = (self.max_length / BREAK_SEARCH_FRACTION).max(1);
        let earliest = (start + self.overlap).max(hard_end.saturating_sub(tail));
        (earliest..hard_end)
            .rev()
            .find(|&pos| chars[pos].is_whitespace())
            .map_or(hard_end, |pos| pos + 1)
    }
}

impl Chunker for WindowChunker {
    fn chunk(&self, text: &str) -> Vec<Chunk> {
        if text.is_empty() {
            return Vec::new();
        }

        let chars: Vec<char> = text.chars().collect();
        // bounds[i] is the byte offset of char i; bounds[len] == text.len()
        let bounds: Vec<usize> =
            text.char_indices().map(|(i, _)| i).chain(std::iter::once(text.len())).collect();
        let total = chars.len();

        let mut chunks = Vec::new();
        let mut start = 0;

        loop {
            let hard_end = (start + self.max_length).min(total);
            let end =
                if hard_end == total { total } else { self.window_end(&chars, start, hard_end) };

            chunks.push(Chunk {
                id: chunks.len(),
                text: text[bounds[start]..bounds[end]].to_string(),
                source_offset: bounds[start],
            });

            if end == total {
                break;
            }
            start = end - self.overlap;
        }

        chunks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reconstruct(chunks: &[Chunk]) -> String {
        let mut out = String::new();
        let mut covered: usize = 0;
        for chunk in chunks {
            let skip = covered.saturating_sub(chunk.source_offset).min(chunk.text.len());
            out.push_str(&chunk.text[skip..]);
            covered = covered.max(chunk.source_end());
        }
        out
    }

    #[test]
    fn rejects_overlap_not_smaller_than_length() {
        assert!(matches!(WindowChunker::new(5, 5), Err(RagError::Configuration(_))));
        assert!(matches!(WindowChunker::new(5, 9), Err(RagError::Configuration(_))));
        assert!(matches!(WindowChunker::new(0, 0), Err(RagError::Configuration(_))));
    }

    #[test]
    fn empty_text_yields_no_chunks() {
        let chunker = WindowChunker::new(10, 2).unwrap();
        assert!(chunker.chunk("").is_empty());
    }

    #[test]
    fn short_text_is_single_chunk() {
        let chunker = WindowChunker::new(1000, 150).unwrap();
        let chunks = chunker.chunk("SIT is located in Valachil.");
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].id, 0);
        assert_eq!(chunks[0].source_offset, 0);
        assert_eq!(chunks[0].text, "SIT is located in Valachil.");
    }

    #[test]
    fn small_windows_cover_whole_string() {
        let text = "AAAA BBBB CCCC";
        let chunker = WindowChunker::new(5, 2).unwrap();
        let chunks = chunker.chunk(text);

        assert_eq!(chunks[0].text, "AAAA ");
        assert!(chunks.iter().all(|c| c.text.chars().count() <= 5));
        assert_eq!(reconstruct(&chunks), text);
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.id, i);
            assert_eq!(&text[chunk.source_offset..chunk.source_end()], chunk.text);
        }
        for pair in chunks.windows(2) {
            // no gaps: the next chunk starts before the previous one ends
            assert!(pair[1].source_offset <= pair[0].source_end());
        }
    }

    #[test]
    fn prefers_whitespace_breaks() {
        let chunker = WindowChunker::new(12, 3).unwrap();
        let chunks = chunker.chunk("alpha beta gamma delta epsilon");
        assert_eq!(chunks[0].text, "alpha beta ");
        assert!(chunks[0].text.ends_with(' '));
    }

    #[test]
    fn cuts_at_hard_edge_without_whitespace() {
        let chunker = WindowChunker::new(4, 1).unwrap();
        let chunks = chunker.chunk("abcdefghij");
        assert_eq!(chunks[0].text, "abcd");
        assert_eq!(chunks[1].text, "defg");
        assert_eq!(reconstruct(&chunks), "abcdefghij");
    }

    #[test]
    fn early_whitespace_does_not_shrink_the_window() {
        let text = format!("ab {}", "c".repeat(40));
        let chunker = WindowChunker::new(20, 2).unwrap();
        let chunks = chunker.chunk(&text);
        assert_eq!(chunks[0].text.chars().count(), 20);
        assert_eq!(reconstruct(&chunks), text);
    }

    #[test]
    fn multibyte_text_is_not_split_inside_characters() {
        let text = "Mangaluru · Valachil campus · नमस्ते दुनिया";
        let chunker = WindowChunker::new(7, 2).unwrap();
        let chunks = chunker.chunk(text);
        assert!(chunks.len() > 1);
        assert_eq!(reconstruct(&chunks), text);
    }
}
