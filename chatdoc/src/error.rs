//! Error types for the `chatdoc` crate.

use thiserror::Error;

/// Errors that can occur while ingesting documents or answering questions.
#[derive(Debug, Error)]
pub enum ChatError {
    /// The document contained no extractable text.
    #[error("Document '{document_id}' contains no extractable text")]
    EmptyDocument {
        /// The identifier of the rejected document.
        document_id: String,
    },

    /// The loader cannot handle the file's format.
    #[error("Unsupported file type: {0}")]
    UnsupportedFormat(String),

    /// A supported file could not be read or parsed.
    #[error("Failed to load document '{path}': {message}")]
    DocumentLoad {
        /// The path that failed to load.
        path: String,
        /// A description of the failure.
        message: String,
    },

    /// The index was queried before it was built.
    #[error("Index has not been built")]
    IndexNotBuilt,

    /// A question was asked before any document was ingested.
    #[error("Please add a document first.")]
    NoDocumentLoaded,

    /// The embedding or language-model service failed.
    #[error("Generation error ({service}): {message}")]
    Generation {
        /// The external service that produced the error.
        service: String,
        /// A description of the failure.
        message: String,
    },

    /// The embedding service returned vectors of inconsistent length.
    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Dimensionality of the vectors already in the index.
        expected: usize,
        /// Dimensionality of the offending vector.
        actual: usize,
    },

    /// A configuration validation error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ChatError {
    /// Build a [`ChatError::Generation`] for the given service.
    pub fn generation(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Generation { service: service.into(), message: message.into() }
    }

    /// Whether the session stays usable after this error.
    ///
    /// Only [`ChatError::IndexNotBuilt`] signals a sequencing bug in the caller.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::IndexNotBuilt)
    }
}

/// A convenience result type for `chatdoc` operations.
pub type Result<T> = std::result::Result<T, ChatError>;
