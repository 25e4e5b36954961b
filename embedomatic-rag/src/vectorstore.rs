//! Vector store trait for storing and searching vector embeddings.

use async_trait::async_trait;

use crate::document::{Chunk, SearchResult};
use crate::error::Result;

/// A storage backend for vector embeddings with similarity search.
///
/// Implementations manage named collections of [`Chunk`]s and support
/// replacing, upserting, and searching by vector distance.
///
/// # Example
///
/// ```rust,ignore
/// use embedomatic_rag::{InMemoryVectorStore, VectorStore};
///
/// let store = InMemoryVectorStore::new();
/// store.replace_collection("docs", 384, &chunks).await?;
/// let results = store.search("docs", &query_embedding, 5).await?;
/// ```
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Create a named collection. No-op if it already exists.
    async fn create_collection(&self, name: &str, dimensions: usize) -> Result<()>;

    /// Delete a named collection and all its data. No-op if it does not exist.
    async fn delete_collection(&self, name: &str) -> Result<()>;

    /// Upsert chunks into a collection. Chunks must have embeddings set.
    async fn upsert(&self, collection: &str, chunks: &[Chunk]) -> Result<()>;

    /// Number of chunks in a collection, or `None` if it does not exist.
    async fn count(&self, collection: &str) -> Result<Option<usize>>;

    /// Replace a collection's entire contents with `chunks`.
    ///
    /// The default implementation deletes the collection, recreates it, and
    /// upserts the chunks. It is not transactional: if the upsert fails the
    /// collection is left empty or partially populated. Backends that can swap
    /// a collection atomically override this.
    async fn replace_collection(
        &self,
        name: &str,
        dimensions: usize,
        chunks: &[Chunk],
    ) -> Result<()> {
        self.delete_collection(name).await?;
        self.create_collection(name, dimensions).await?;
        self.upsert(name, chunks).await
    }

    /// Search for the `top_k` chunks closest to the given embedding.
    ///
    /// Returns results ordered by ascending distance; ties keep insertion
    /// order. When `top_k` exceeds the collection size every chunk is returned.
    /// Fails with [`RagError::CollectionNotFound`](crate::RagError::CollectionNotFound)
    /// for an unknown collection.
    async fn search(
        &self,
        collection: &str,
        embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<SearchResult>>;
}
