//! Error types for the `embedomatic-rag` crate.

use thiserror::Error;

/// Coarse classification of a [`RagError`].
///
/// Lets a caller decide between halting (configuration), asking the user for
/// a different file (load), retrying later (provider, store) or prompting
/// for an ingestion first (session).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Required configuration is missing or malformed.
    Configuration,
    /// The uploaded file could not be read or parsed.
    Load,
    /// The embedding or chat-completion provider failed.
    Provider,
    /// The vector database failed or the collection is missing.
    Store,
    /// The session has no active collection.
    Session,
}

/// Errors that can occur in RAG operations.
#[derive(Debug, Error)]
pub enum RagError {
    /// A configuration validation error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// The document could not be read or parsed.
    #[error("Failed to load '{path}': {message}")]
    LoadError {
        /// Path of the offending file.
        path: String,
        /// A description of the failure.
        message: String,
    },

    /// The file extension is not one of the supported document formats.
    #[error("Unsupported document format: '{path}'")]
    UnsupportedFormat {
        /// Path of the offending file.
        path: String,
    },

    /// Splitting produced no chunks, so there is nothing to ingest.
    #[error("Nothing to ingest: '{document}' contains no text")]
    EmptyDocument {
        /// Identity of the empty document.
        document: String,
    },

    /// An error occurred during embedding generation.
    #[error("Embedding error ({provider}): {message}")]
    EmbeddingError {
        /// The embedding provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
        /// Whether repeating the request may succeed.
        transient: bool,
    },

    /// An error occurred during chat completion.
    #[error("Generation error ({provider}): {message}")]
    GenerationError {
        /// The chat provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
        /// Whether repeating the request may succeed.
        transient: bool,
    },

    /// An error occurred in the vector store backend.
    #[error("Vector store error ({backend}): {message}")]
    VectorStoreError {
        /// The vector store backend that produced the error.
        backend: String,
        /// A description of the failure.
        message: String,
    },

    /// The named collection does not exist in the vector store.
    #[error("Collection '{collection}' does not exist")]
    CollectionNotFound {
        /// The requested collection name.
        collection: String,
    },

    /// A query was issued before any document was ingested.
    #[error("No document has been processed yet")]
    NoActiveCollection,
}

impl RagError {
    /// Classify this error according to the failure taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ConfigError(_) => ErrorKind::Configuration,
            Self::LoadError { .. } | Self::UnsupportedFormat { .. } | Self::EmptyDocument { .. } => {
                ErrorKind::Load
            }
            Self::EmbeddingError { .. } | Self::GenerationError { .. } => ErrorKind::Provider,
            Self::VectorStoreError { .. } | Self::CollectionNotFound { .. } => ErrorKind::Store,
            Self::NoActiveCollection => ErrorKind::Session,
        }
    }

    /// Whether repeating the failed call may succeed without user action.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::EmbeddingError { transient, .. } | Self::GenerationError { transient, .. } => {
                *transient
            }
            _ => false,
        }
    }
}

/// A convenience result type for RAG operations.
pub type Result<T> = std::result::Result<T, RagError>;
