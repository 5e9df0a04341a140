//! TOML configuration file loading
//!
//! `vox.toml` is a partial overlay on top of defaults. Every section and
//! field is optional; command-line flags win over anything set here.

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;
use vox_rag::RagConfig;

/// File looked up in the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "vox.toml";

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VoxConfigFile {
    /// Chunking, retrieval, timeout, and fallback settings
    #[serde(default)]
    pub rag: RagConfig,

    /// Model provider settings
    #[serde(default)]
    pub provider: ProviderFileConfig,

    /// Prompt templates and background text
    #[serde(default)]
    pub prompt: PromptFileConfig,
}

/// Model provider configuration
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderFileConfig {
    /// "ollama" or "openai"
    pub kind: Option<ProviderKind>,

    /// Generation model
    pub model: Option<String>,

    /// Embedding model
    pub embed_model: Option<String>,

    /// Server address override
    pub base_url: Option<String>,

    /// OpenAI API key; `OPENAI_API_KEY` is used when absent
    pub api_key: Option<String>,

    /// Use the offline hash embedder instead of the provider's embeddings
    pub hash_embeddings: Option<bool>,
}

/// Prompt configuration
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PromptFileConfig {
    /// Question-answering template text with `{context}` and `{question}`
    pub qa_template: Option<String>,

    /// Correction template text with `{context}` and `{question}`
    pub correction_template: Option<String>,

    /// File holding the fixed background text
    pub background: Option<PathBuf>,
}

/// Which backend serves embeddings and generation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// A local Ollama server
    #[default]
    Ollama,
    /// The OpenAI API or a compatible server
    Openai,
}

impl VoxConfigFile {
    /// Parse a configuration document.
    pub fn parse(raw: &str) -> anyhow::Result<Self> {
        let file: Self = toml::from_str(raw).context("invalid configuration file")?;
        file.rag.validate().context("invalid [rag] section")?;
        Ok(file)
    }

    /// Load `path`, or `vox.toml` from the working directory if it exists.
    ///
    /// An explicitly named file must exist; the implicit one is optional.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let (path, explicit) = match path {
            Some(path) => (path.to_path_buf(), true),
            None => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
        };

        if !explicit && !path.exists() {
            tracing::debug!("no {DEFAULT_CONFIG_FILE} found, using defaults");
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let file = Self::parse(&raw).with_context(|| format!("in {}", path.display()))?;
        tracing::info!(path = %path.display(), "loaded configuration");
        Ok(file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        let file = VoxConfigFile::parse("").unwrap();
        assert_eq!(file.rag, RagConfig::default());
        assert!(file.provider.kind.is_none());
        assert!(file.prompt.qa_template.is_none());
    }

    #[test]
    fn sections_overlay_defaults() {
        let file = VoxConfigFile::parse(
            r#"
            [rag]
            chunk_size = 500
            top_k = 5
            generate_timeout_ms = 60000
            fallback_phrases = ["no idea"]

            [provider]
            kind = "openai"
            model = "gpt-4o-mini"
            hash_embeddings = true

            [prompt]
            qa_template = "Context: {context}\nQ: {question}"
            background = "background.txt"
            "#,
        )
        .unwrap();

        assert_eq!(file.rag.chunk_size, 500);
        assert_eq!(file.rag.chunk_overlap, 150);
        assert_eq!(file.rag.top_k, 5);
        assert_eq!(file.rag.generate_timeout_ms, 60_000);
        assert_eq!(file.rag.fallback_phrases, vec!["no idea".to_string()]);
        assert_eq!(file.provider.kind, Some(ProviderKind::Openai));
        assert_eq!(file.provider.hash_embeddings, Some(true));
        assert_eq!(file.prompt.background, Some(PathBuf::from("background.txt")));
    }

    #[test]
    fn invalid_rag_section_rejected() {
        let err = VoxConfigFile::parse("[rag]\nchunk_size = 100\nchunk_overlap = 100\n").unwrap_err();
        assert!(format!("{err:#}").contains("chunk_overlap"));
    }

    #[test]
    fn unknown_provider_rejected() {
        assert!(VoxConfigFile::parse("[provider]\nkind = \"gemini\"\n").is_err());
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(VoxConfigFile::load(Some(&dir.path().join("missing.toml"))).is_err());
    }

    #[test]
    fn explicit_file_is_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vox.toml");
        std::fs::write(&path, "[rag]\ntop_k = 2\n").unwrap();
        assert_eq!(VoxConfigFile::load(Some(&path)).unwrap().rag.top_k, 2);
    }
}
