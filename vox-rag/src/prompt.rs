//! Prompt templates and composition.
//!
//! A [`PromptTemplate`] holds text with `{context}` and `{question}`
//! placeholders. [`compose`] fills them in a single pass, so braces that
//! appear inside the question or the retrieved text are left untouched.

use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

use crate::document::Chunk;
use crate::error::{RagError, Result};

/// Separator placed between chunk texts in the context region.
pub const CONTEXT_SEPARATOR: &str = "\n\n";

/// Placeholders every template must contain, without braces.
pub const REQUIRED_FIELDS: [&str; 2] = ["context", "question"];

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{(context|question)\}").expect("placeholder pattern is valid"));

const QA_TEMPLATE: &str = "\
You are a helpful voice assistant.
Answer questions using the provided context accurately and politely.
If the question is unrelated to the context, reply as a general AI assistant.

Context:
{context}

Question:
{question}
";

const CORRECTION_TEMPLATE: &str = "\
You are a grammar correction and information-enhancement assistant.

Your responsibilities:
1. Correct grammar and spelling mistakes in the provided text.
2. Fix misspelled names that appear in the context so they are written correctly.
3. Maintain the original tone and style of the user's input.
4. If the text relates to the context, use the context to make the response informative and relevant.
5. If the text is unrelated to the context, only correct grammar and tone and do not add new details.

Context:
{context}

Question or Text to Correct:
{question}
";

/// A prompt template with `{context}` and `{question}` placeholders.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct PromptTemplate {
    template_text: String,
}

impl PromptTemplate {
    /// Wrap template text. Call [`validate`](Self::validate) before serving.
    pub fn new(template_text: impl Into<String>) -> Self {
        Self { template_text: template_text.into() }
    }

    /// The built-in question-answering template.
    pub fn qa() -> Self {
        Self::new(QA_TEMPLATE)
    }

    /// The built-in grammar-correction template.
    pub fn correction() -> Self {
        Self::new(CORRECTION_TEMPLATE)
    }

    /// The raw template text.
    pub fn text(&self) -> &str {
        &self.template_text
    }

    /// Check that both required placeholders are present.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::TemplateField`] naming the first missing field.
    pub fn validate(&self) -> Result<()> {
        for field in REQUIRED_FIELDS {
            if !self.template_text.contains(&format!("{{{field}}}")) {
                return Err(RagError::TemplateField { field: field.to_string() });
            }
        }
        Ok(())
    }

    /// Fill the template with an already-joined context string.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::TemplateField`] if a placeholder is missing.
    pub fn render(&self, context: &str, question: &str) -> Result<String> {
        self.validate()?;
        let rendered = PLACEHOLDER.replace_all(&self.template_text, |caps: &Captures<'_>| {
            match &caps[1] {
                "context" => context.to_string(),
                _ => question.to_string(),
            }
        });
        Ok(rendered.into_owned())
    }
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self::qa()
    }
}

/// Join chunk texts in the given order with [`CONTEXT_SEPARATOR`].
pub fn join_context(chunks: &[Chunk]) -> String {
    chunks.iter().map(|c| c.text.as_str()).collect::<Vec<_>>().join(CONTEXT_SEPARATOR)
}

/// Compose a completion prompt from a template, retrieved chunks, and a question.
///
/// Zero chunks is valid and yields an empty context region.
///
/// # Errors
///
/// Returns [`RagError::TemplateField`] if the template lacks `{context}` or
/// `{question}`.
pub fn compose(template: &PromptTemplate, context_chunks: &[Chunk], question: &str) -> Result<String> {
    template.render(&join_context(context_chunks), question)
}
