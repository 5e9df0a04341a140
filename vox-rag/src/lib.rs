//! # vox-rag
//!
//! Retrieval-augmented question answering for a voice assistant backend.
//!
//! ## Overview
//!
//! At startup a reference document is chunked, embedded, and loaded into a
//! vector index ([`KnowledgeBase`]). At request time the [`Orchestrator`]
//! retrieves the most similar chunks, fills a [`PromptTemplate`], asks an
//! [`AnswerGenerator`] for a completion, and re-asks without retrieved
//! context when the [`FallbackPolicy`] judges the answer unhelpful.
//!
//! Speech-to-text, text-to-speech, and HTTP serving are left to the caller.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use vox_rag::{KnowledgeBase, Orchestrator, RagConfig};
//! use vox_rag::ollama::OllamaClient;
//!
//! let config = RagConfig::default();
//! let client = Arc::new(OllamaClient::new());
//!
//! let kb = KnowledgeBase::build(&std::fs::read_to_string("data.txt")?, client.as_ref(), &config).await?;
//! let orchestrator = Orchestrator::builder()
//!     .config(config.clone())
//!     .generator(client.clone())
//!     .retriever(kb.retriever(client, &config))
//!     .build()?;
//!
//! let answer = orchestrator.answer("Where is the campus?").await?;
//! println!("{}", answer.response);
//! ```
//!
//! ## Features
//!
//! - `ollama` – [`ollama::OllamaClient`] for a local Ollama server
//! - `openai` – [`openai::OpenAIEmbeddingProvider`] and [`openai::OpenAIGenerator`]

pub mod chunking;
pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod fallback;
pub mod generation;
pub mod inmemory;
#[cfg(feature = "ollama")]
pub mod ollama;
#[cfg(feature = "openai")]
pub mod openai;
pub mod orchestrator;
pub mod pipeline;
pub mod prompt;
pub mod retriever;
pub mod store;
pub mod vectorstore;

pub use chunking::{Chunker, WindowChunker};
pub use config::{DEFAULT_FALLBACK_PHRASES, RagConfig, RagConfigBuilder};
pub use document::{AnswerResponse, Chunk, QueryMode, QueryRequest, ScoredChunk};
pub use embedding::{EmbeddingProvider, HashEmbeddingProvider};
pub use error::{ErrorResponse, RagError, Result};
pub use fallback::FallbackPolicy;
pub use generation::AnswerGenerator;
pub use inmemory::{InMemoryIndex, IndexEntry};
pub use orchestrator::{Orchestrator, OrchestratorBuilder, Reply};
pub use pipeline::KnowledgeBase;
pub use prompt::{PromptTemplate, compose};
pub use retriever::Retriever;
pub use store::DocumentStore;
pub use vectorstore::VectorIndex;
