//! Data types for chunks, retrieval results, requests, and answers.

use serde::{Deserialize, Serialize};

/// A contiguous slice of the reference text used as a retrieval unit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Chunk {
    /// Sequential identifier, starting at 0 in source order.
    pub id: usize,
    /// The text content of the chunk.
    pub text: String,
    /// Byte offset of the chunk's first character in the source text.
    pub source_offset: usize,
}

impl Chunk {
    /// Byte offset one past the chunk's last character in the source text.
    pub fn source_end(&self) -> usize {
        self.source_offset + self.text.len()
    }
}

/// A retrieved [`Chunk`] paired with its similarity score.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoredChunk {
    /// The retrieved chunk.
    pub chunk: Chunk,
    /// Cosine similarity to the query (higher is more relevant).
    pub score: f32,
}

/// Which prompt template a request is answered with.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum QueryMode {
    /// Answer the question from the reference context.
    #[default]
    Qa,
    /// Correct grammar and spelling of the user's text.
    Correct,
}

impl std::str::FromStr for QueryMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "qa" => Ok(Self::Qa),
            "correct" => Ok(Self::Correct),
            other => Err(format!("unknown mode '{other}', expected 'qa' or 'correct'")),
        }
    }
}

/// An incoming question, created per call and discarded after answering.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QueryRequest {
    /// The user's question or text.
    pub question: String,
    /// Template selection.
    #[serde(default)]
    pub mode: QueryMode,
}

impl QueryRequest {
    /// A question-answering request.
    pub fn qa(question: impl Into<String>) -> Self {
        Self { question: question.into(), mode: QueryMode::Qa }
    }

    /// A text-correction request.
    pub fn correct(text: impl Into<String>) -> Self {
        Self { question: text.into(), mode: QueryMode::Correct }
    }
}

/// The answer returned to the serving layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AnswerResponse {
    /// The question as received.
    pub query: String,
    /// The generated answer text.
    pub response: String,
    /// Whether the context-free fallback produced `response`.
    pub used_fallback: bool,
}
