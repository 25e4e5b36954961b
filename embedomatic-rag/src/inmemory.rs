//! In-memory vector store using cosine distance.
//!
//! This module provides [`InMemoryVectorStore`], a zero-dependency vector store
//! backed by a `HashMap` protected by a `tokio::sync::RwLock`. It is suitable
//! for development, testing, and single-process demos.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::document::{Chunk, SearchResult};
use crate::error::{RagError, Result};
use crate::vectorstore::VectorStore;

/// An in-memory vector store using cosine distance for search.
///
/// Each collection keeps its chunks in insertion order, which is also the
/// tie-break order for equal distances. [`replace_collection`](VectorStore::replace_collection)
/// builds the new collection first and swaps it in under a single write lock,
/// so readers never observe a half-populated collection.
///
/// # Example
///
/// ```rust,ignore
/// use embedomatic_rag::{InMemoryVectorStore, VectorStore};
///
/// let store = InMemoryVectorStore::new();
/// store.create_collection("docs", 384).await?;
/// ```
#[derive(Debug, Default)]
pub struct InMemoryVectorStore {
    collections: RwLock<HashMap<String, Vec<Chunk>>>,
}

impl InMemoryVectorStore {
    /// Create a new empty in-memory vector store.
    pub fn new() -> Self {
        Self::default()
    }
}

/// Compute cosine distance (`1 - cosine similarity`) between two vectors.
///
/// Returns 1.0 if either vector has zero magnitude.
pub(crate) fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 1.0;
    }
    1.0 - dot / (norm_a * norm_b)
}

fn insert_or_replace(store: &mut Vec<Chunk>, chunk: &Chunk) {
    match store.iter_mut().find(|existing| existing.id == chunk.id) {
        Some(existing) => *existing = chunk.clone(),
        None => store.push(chunk.clone()),
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn create_collection(&self, name: &str, _dimensions: usize) -> Result<()> {
        let mut collections = self.collections.write().await;
        collections.entry(name.to_string()).or_default();
        Ok(())
    }

    async fn delete_collection(&self, name: &str) -> Result<()> {
        let mut collections = self.collections.write().await;
        collections.remove(name);
        Ok(())
    }

    async fn upsert(&self, collection: &str, chunks: &[Chunk]) -> Result<()> {
        let mut collections = self.collections.write().await;
        let store = collections
            .get_mut(collection)
            .ok_or_else(|| RagError::CollectionNotFound { collection: collection.to_string() })?;
        for chunk in chunks {
            insert_or_replace(store, chunk);
        }
        Ok(())
    }

    async fn count(&self, collection: &str) -> Result<Option<usize>> {
        let collections = self.collections.read().await;
        Ok(collections.get(collection).map(Vec::len))
    }

    async fn replace_collection(
        &self,
        name: &str,
        _dimensions: usize,
        chunks: &[Chunk],
    ) -> Result<()> {
        let mut fresh = Vec::with_capacity(chunks.len());
        for chunk in chunks {
            insert_or_replace(&mut fresh, chunk);
        }

        let mut collections = self.collections.write().await;
        let previous = collections.insert(name.to_string(), fresh);
        debug!(
            collection = name,
            replaced = previous.map(|p| p.len()).unwrap_or(0),
            chunk_count = chunks.len(),
            "swapped in-memory collection"
        );
        Ok(())
    }

    async fn search(
        &self,
        collection: &str,
        embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<SearchResult>> {
        let collections = self.collections.read().await;
        let store = collections
            .get(collection)
            .ok_or_else(|| RagError::CollectionNotFound { collection: collection.to_string() })?;

        let mut scored: Vec<SearchResult> = store
            .iter()
            .map(|chunk| SearchResult {
                distance: cosine_distance(&chunk.embedding, embedding),
                chunk: chunk.clone(),
            })
            .collect();

        // Stable sort keeps insertion order among equal distances.
        scored.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        scored.truncate(top_k);
        Ok(scored)
    }
}
