//! Error types for the `docrag` crate.

use thiserror::Error;

/// Errors that can occur in retrieval operations.
///
/// Every fallible operation in the crate is all-or-nothing: when one of these
/// is returned, the vector index is exactly as it was before the call.
#[derive(Debug, Error)]
pub enum RagError {
    /// Invalid chunking or retrieval parameters, rejected before any work starts.
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// The embedding backend failed on the given input.
    #[error("Embedding error ({provider}): {message}")]
    EmbeddingError {
        /// The embedding provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// A vector's length disagrees with the dimensionality of the index.
    #[error("Dimension mismatch: index expects {expected} dimensions, got {actual}")]
    DimensionMismatch {
        /// The dimensionality fixed by the index's embedding model.
        expected: usize,
        /// The dimensionality that was supplied.
        actual: usize,
    },

    /// An embedding holds a NaN or infinite component.
    #[error("Invalid embedding: {0}")]
    InvalidEmbedding(String),

    /// A persisted artifact cannot be used with the running configuration.
    #[error("Index incompatible: {0}")]
    IndexIncompatible(String),

    /// A lookup referenced a document that is not in the index.
    #[error("Document not found: {0}")]
    NotFound(String),

    /// A chunk id is already present in the index, or repeated within a batch.
    #[error("Duplicate chunk id: {0}")]
    DuplicateChunk(String),

    /// Reading or writing the persisted index failed.
    #[error("Persistence error ({path}): {message}")]
    Persistence {
        /// The path that was being read or written.
        path: String,
        /// A description of the failure.
        message: String,
    },

    /// An offloaded blocking task panicked or was cancelled by the runtime.
    #[error("Worker error: {0}")]
    Worker(String),
}

impl RagError {
    pub(crate) fn persistence(path: &std::path::Path, message: impl std::fmt::Display) -> Self {
        RagError::Persistence { path: path.display().to_string(), message: message.to_string() }
    }
}

impl From<tokio::task::JoinError> for RagError {
    fn from(err: tokio::task::JoinError) -> Self {
        RagError::Worker(err.to_string())
    }
}

/// A convenience result type for retrieval operations.
pub type Result<T> = std::result::Result<T, RagError>;
