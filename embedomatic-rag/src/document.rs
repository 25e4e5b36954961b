//! Data types for documents, chunks, collections, and search results.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Metadata key holding the originating file identity.
pub const SOURCE_KEY: &str = "source";
/// Metadata key holding the position of a chunk within its document.
pub const CHUNK_INDEX_KEY: &str = "chunk_index";
/// Metadata key holding the character offset of a chunk in the document text.
pub const START_INDEX_KEY: &str = "start_index";

/// A source document containing extracted text and metadata.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    /// Unique identifier for the document.
    pub id: String,
    /// The extracted text content of the document.
    pub text: String,
    /// Key-value metadata associated with the document.
    pub metadata: HashMap<String, String>,
    /// Optional URI pointing to the original source.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_uri: Option<String>,
}

impl Document {
    /// Create a document whose `source` metadata is set to `source`.
    pub fn new(id: impl Into<String>, text: impl Into<String>, source: impl Into<String>) -> Self {
        let source = source.into();
        Self {
            id: id.into(),
            text: text.into(),
            metadata: HashMap::from([(SOURCE_KEY.to_string(), source.clone())]),
            source_uri: Some(source),
        }
    }

    /// The originating file identity, falling back to the document ID.
    pub fn source(&self) -> &str {
        self.metadata.get(SOURCE_KEY).map(String::as_str).unwrap_or(&self.id)
    }
}

/// A segment of a [`Document`] with its vector embedding.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chunk {
    /// Unique identifier for the chunk.
    pub id: String,
    /// The text content of the chunk.
    pub text: String,
    /// The vector embedding for this chunk's text. Empty until ingestion.
    pub embedding: Vec<f32>,
    /// Key-value metadata inherited from the parent document plus chunk-specific fields.
    pub metadata: HashMap<String, String>,
    /// The ID of the parent [`Document`].
    pub document_id: String,
}

impl Chunk {
    /// Character offset of this chunk in the document text, if recorded.
    pub fn start_index(&self) -> Option<usize> {
        self.metadata.get(START_INDEX_KEY).and_then(|v| v.parse().ok())
    }
}

/// A retrieved [`Chunk`] paired with its distance to the query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    /// The retrieved chunk.
    pub chunk: Chunk,
    /// Cosine distance to the query embedding (0 is identical, lower is closer).
    pub distance: f32,
}

impl SearchResult {
    /// Similarity score derived from the distance (higher is more relevant).
    pub fn score(&self) -> f32 {
        1.0 - self.distance
    }
}

/// A reference to a stored collection, held by a session between actions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionHandle {
    /// Name of the collection in the vector store.
    pub name: String,
    /// Number of chunks stored in the collection.
    pub chunk_count: usize,
    /// Dimensionality of the stored embeddings.
    pub dimensions: usize,
}

/// The result of answering a query: generated text plus the raw retrieved chunks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryOutcome {
    /// The chat model's answer, verbatim.
    pub answer: String,
    /// Retrieved chunks in retrieval order (closest first).
    pub results: Vec<SearchResult>,
}
