//! Model provider construction from resolved settings.

use std::sync::Arc;

use anyhow::Context;
use vox_rag::ollama::OllamaClient;
use vox_rag::openai::{OpenAIEmbeddingProvider, OpenAIGenerator};
use vox_rag::{AnswerGenerator, EmbeddingProvider, HashEmbeddingProvider};

use crate::config::{ProviderFileConfig, ProviderKind};

/// Provider settings after merging flags over the config file.
#[derive(Debug, Clone, Default)]
pub struct ProviderSettings {
    pub kind: ProviderKind,
    pub model: Option<String>,
    pub embed_model: Option<String>,
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub hash_embeddings: bool,
}

impl ProviderSettings {
    /// Overlay non-empty command-line values on the file section.
    pub fn resolve(file: ProviderFileConfig, flags: ProviderSettingsOverride) -> Self {
        Self {
            kind: flags.kind.or(file.kind).unwrap_or_default(),
            model: flags.model.or(file.model),
            embed_model: flags.embed_model.or(file.embed_model),
            base_url: flags.base_url.or(file.base_url),
            api_key: file.api_key,
            hash_embeddings: flags.hash_embeddings || file.hash_embeddings.unwrap_or(false),
        }
    }
}

/// Values given on the command line.
#[derive(Debug, Clone, Default)]
pub struct ProviderSettingsOverride {
    pub kind: Option<ProviderKind>,
    pub model: Option<String>,
    pub embed_model: Option<String>,
    pub base_url: Option<String>,
    pub hash_embeddings: bool,
}

/// The embedding and generation handles shared by every request.
pub struct Providers {
    pub embedder: Arc<dyn EmbeddingProvider>,
    pub generator: Arc<dyn AnswerGenerator>,
}

impl Providers {
    pub fn build(settings: &ProviderSettings) -> anyhow::Result<Self> {
        let (embedder, generator): (Arc<dyn EmbeddingProvider>, Arc<dyn AnswerGenerator>) =
            match settings.kind {
                ProviderKind::Ollama => {
                    let mut client = OllamaClient::new();
                    if let Some(base_url) = &settings.base_url {
                        client = client.with_base_url(base_url);
                    }
                    if let Some(model) = &settings.model {
                        client = client.with_model(model);
                    }
                    if let Some(model) = settings.embed_model.as_ref().or(settings.model.as_ref()) {
                        client = client.with_embed_model(model);
                    }
                    let client = Arc::new(client);
                    let embedder: Arc<dyn EmbeddingProvider> = client.clone();
                    let generator: Arc<dyn AnswerGenerator> = client;
                    (embedder, generator)
                }
                ProviderKind::Openai => {
                    let (mut embedder, mut generator) = match &settings.api_key {
                        Some(key) => (OpenAIEmbeddingProvider::new(key)?, OpenAIGenerator::new(key)?),
                        None => (
                            OpenAIEmbeddingProvider::from_env()
                                .context("set OPENAI_API_KEY or [provider] api_key")?,
                            OpenAIGenerator::from_env()?,
                        ),
                    };
                    if let Some(base_url) = &settings.base_url {
                        embedder = embedder.with_base_url(base_url);
                        generator = generator.with_base_url(base_url);
                    }
                    if let Some(model) = &settings.model {
                        generator = generator.with_model(model);
                    }
                    if let Some(model) = &settings.embed_model {
                        embedder = embedder.with_model(model);
                    }
                    let embedder: Arc<dyn EmbeddingProvider> = Arc::new(embedder);
                    let generator: Arc<dyn AnswerGenerator> = Arc::new(generator);
                    (embedder, generator)
                }
            };

        let embedder: Arc<dyn EmbeddingProvider> = if settings.hash_embeddings {
            Arc::new(HashEmbeddingProvider::default())
        } else {
            embedder
        };

        tracing::info!(
            provider = ?settings.kind,
            embedder = embedder.name(),
            generator = generator.name(),
            "providers ready"
        );
        Ok(Self { embedder, generator })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_file_values() {
        let file = ProviderFileConfig {
            kind: Some(ProviderKind::Openai),
            model: Some("gpt-4o-mini".into()),
            base_url: Some("http://file:8000".into()),
            ..Default::default()
        };
        let flags = ProviderSettingsOverride {
            kind: Some(ProviderKind::Ollama),
            model: Some("llama3.2:3b".into()),
            ..Default::default()
        };

        let settings = ProviderSettings::resolve(file, flags);
        assert_eq!(settings.kind, ProviderKind::Ollama);
        assert_eq!(settings.model.as_deref(), Some("llama3.2:3b"));
        assert_eq!(settings.base_url.as_deref(), Some("http://file:8000"));
        assert!(!settings.hash_embeddings);
    }

    #[test]
    fn hash_embeddings_replace_provider_embedder() {
        let settings = ProviderSettings { hash_embeddings: true, ..Default::default() };
        let providers = Providers::build(&settings).unwrap();
        assert_eq!(providers.embedder.name(), "hash");
        assert_eq!(providers.generator.name(), "Ollama");
    }

    #[test]
    fn openai_key_from_file_is_used() {
        let settings = ProviderSettings {
            kind: ProviderKind::Openai,
            api_key: Some("sk-test".into()),
            ..Default::default()
        };
        let providers = Providers::build(&settings).unwrap();
        assert_eq!(providers.generator.name(), "OpenAI");
    }
}
