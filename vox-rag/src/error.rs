//! Error types for the `vox-rag` crate.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while building or serving the answering pipeline.
#[derive(Debug, Error)]
pub enum RagError {
    /// Invalid chunking, retrieval, or orchestrator parameters.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Vectors of different lengths were mixed in one index.
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// The dimension fixed by the index.
        expected: usize,
        /// The offending vector's dimension.
        actual: usize,
    },

    /// An embedding contained NaN or infinite components.
    #[error("Embedding for {location} contains NaN or infinite values")]
    NonFiniteVector {
        /// Which vector was rejected (`chunk 3`, `query`).
        location: String,
    },

    /// The index was queried without any stored entries.
    #[error("Vector index is empty")]
    EmptyIndex,

    /// The embedding provider failed while embedding a query.
    #[error("Retrieval unavailable ({provider}): {message}")]
    RetrievalUnavailable {
        /// The embedding provider that failed.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// A prompt template is missing a required placeholder.
    #[error("Prompt template is missing the {{{field}}} placeholder")]
    TemplateField {
        /// The missing field name, without braces.
        field: String,
    },

    /// An embedding or generation call exceeded its deadline.
    #[error("Upstream {operation} call timed out after {timeout:?}")]
    UpstreamTimeout {
        /// Which upstream call timed out (`embed` or `generate`).
        operation: String,
        /// The deadline that was exceeded.
        timeout: Duration,
    },

    /// An error reported by an embedding backend.
    #[error("Embedding error ({provider}): {message}")]
    Embedding {
        /// The embedding provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// An error reported by an answer generator backend.
    #[error("Generation error ({provider}): {message}")]
    Generation {
        /// The generator that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// The incoming request was malformed.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Index serialization or deserialization failed.
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// An I/O error while reading or writing index files.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl RagError {
    /// Whether the error belongs to a single request rather than to startup.
    ///
    /// Startup errors (configuration, dimension mismatch, template fields)
    /// must abort initialization; recoverable errors are reported to the
    /// caller and the service keeps running.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::RetrievalUnavailable { .. }
                | Self::UpstreamTimeout { .. }
                | Self::Embedding { .. }
                | Self::Generation { .. }
                | Self::InvalidRequest(_)
        )
    }

    /// Whether the error is a deadline expiry that may be retried.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::UpstreamTimeout { .. })
    }
}

/// The structured error body handed to the serving layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorResponse {
    /// Human-readable error message.
    pub error: String,
}

impl From<&RagError> for ErrorResponse {
    fn from(err: &RagError) -> Self {
        Self { error: err.to_string() }
    }
}

/// A convenience result type for pipeline operations.
pub type Result<T> = std::result::Result<T, RagError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_field_message_names_placeholder() {
        let err = RagError::TemplateField { field: "context".into() };
        assert_eq!(err.to_string(), "Prompt template is missing the {context} placeholder");
    }

    #[test]
    fn recoverable_classification() {
        assert!(
            RagError::UpstreamTimeout { operation: "generate".into(), timeout: Duration::ZERO }
                .is_recoverable()
        );
        assert!(!RagError::EmptyIndex.is_recoverable());
        assert!(!RagError::Configuration("bad".into()).is_recoverable());
        assert!(!RagError::NonFiniteVector { location: "query".into() }.is_recoverable());
    }

    #[test]
    fn error_response_carries_display_text() {
        let body = ErrorResponse::from(&RagError::EmptyIndex);
        assert_eq!(body.error, "Vector index is empty");
        assert_eq!(serde_json::to_string(&body).unwrap(), r#"{"error":"Vector index is empty"}"#);
    }
}
