//! Answer generator trait: the language-model completion collaborator.

use async_trait::async_trait;

use crate::error::Result;

/// A language-model endpoint that turns a composed prompt into answer text.
///
/// The transport (local HTTP server, cloud API, in-process model) is the
/// implementation's concern. Implementations should not retry internally;
/// the [`Orchestrator`](crate::Orchestrator) owns retries and deadlines.
#[async_trait]
pub trait AnswerGenerator: Send + Sync {
    /// Generate a completion for `prompt`.
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Short generator name used in logs and error messages.
    fn name(&self) -> &str {
        "generator"
    }
}
