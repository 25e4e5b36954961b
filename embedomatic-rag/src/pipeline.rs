//! RAG pipeline orchestrator.
//!
//! The [`RagPipeline`] coordinates the document-to-answer workflow by
//! composing an [`EmbeddingProvider`], a [`VectorStore`], a [`Chunker`],
//! and an optional [`AnswerSynthesizer`].
//!
//! Ingestion always replaces the whole collection: whatever was stored under
//! the same name before is gone once [`RagPipeline::ingest`] succeeds.
//!
//! # Example
//!
//! ```rust,ignore
//! use embedomatic_rag::{RagPipeline, RagConfig, InMemoryVectorStore, RecursiveChunker};
//!
//! let pipeline = RagPipeline::builder()
//!     .config(RagConfig::default())
//!     .embedding_provider(Arc::new(my_embedder))
//!     .vector_store(Arc::new(InMemoryVectorStore::new()))
//!     .chunker(Arc::new(RecursiveChunker::new(1000, 20)))
//!     .synthesizer(AnswerSynthesizer::new(Arc::new(chat_model)))
//!     .build()?;
//!
//! let handle = pipeline.ingest("docs", &document).await?;
//! let outcome = pipeline.answer(&handle, "What is X?", 2).await?;
//! ```

use std::sync::Arc;

use tracing::{error, info, warn};

use crate::chunking::{Chunker, RecursiveChunker};
use crate::config::RagConfig;
use crate::document::{CollectionHandle, Document, QueryOutcome, SearchResult};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::synthesis::AnswerSynthesizer;
use crate::vectorstore::VectorStore;

/// The RAG pipeline orchestrator.
///
/// Coordinates ingestion (chunk → embed → replace collection) and query
/// execution (embed → search → synthesize). Construct one via
/// [`RagPipeline::builder()`]. The pipeline holds no per-session state, so one
/// instance can be shared across sessions behind an `Arc`.
pub struct RagPipeline {
    config: RagConfig,
    embedding_provider: Arc<dyn EmbeddingProvider>,
    vector_store: Arc<dyn VectorStore>,
    chunker: Arc<dyn Chunker>,
    synthesizer: Option<AnswerSynthesizer>,
}

impl RagPipeline {
    /// Create a new [`RagPipelineBuilder`].
    pub fn builder() -> RagPipelineBuilder {
        RagPipelineBuilder::default()
    }

    /// Return a reference to the pipeline configuration.
    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    /// Return a reference to the embedding provider.
    pub fn embedding_provider(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.embedding_provider
    }

    /// Return a reference to the vector store.
    pub fn vector_store(&self) -> &Arc<dyn VectorStore> {
        &self.vector_store
    }

    /// Ingest a document: chunk → embed → replace the collection.
    ///
    /// Any existing collection named `collection` is replaced wholesale.
    ///
    /// # Errors
    ///
    /// - [`RagError::EmptyDocument`] if the document yields no chunks; the
    ///   store is not touched in that case.
    /// - Embedding failures are returned unchanged; the store is not touched.
    /// - Store failures are returned unchanged. Whether the previous
    ///   collection survives depends on the backend's `replace_collection`.
    pub async fn ingest(&self, collection: &str, document: &Document) -> Result<CollectionHandle> {
        // 1. Chunk the document
        let mut chunks = self.chunker.chunk(document);
        if chunks.is_empty() {
            warn!(document.id = %document.id, "document produced no chunks");
            return Err(RagError::EmptyDocument { document: document.source().to_string() });
        }

        // 2. Embed every chunk in one batch
        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        let embeddings = self.embedding_provider.embed_batch(&texts).await.map_err(|e| {
            error!(document.id = %document.id, error = %e, "embedding failed during ingestion");
            e
        })?;
        if embeddings.len() != chunks.len() {
            return Err(RagError::EmbeddingError {
                provider: "pipeline".into(),
                message: format!(
                    "expected {} embeddings, provider returned {}",
                    chunks.len(),
                    embeddings.len()
                ),
                transient: false,
            });
        }

        // The table is sized from the vectors, not from what the provider claims.
        let dimensions = embeddings.first().map(Vec::len).unwrap_or_default();
        if dimensions == 0 || embeddings.iter().any(|e| e.len() != dimensions) {
            return Err(RagError::EmbeddingError {
                provider: "pipeline".into(),
                message: format!(
                    "provider returned embeddings of inconsistent length (first has {dimensions})"
                ),
                transient: false,
            });
        }
        if dimensions != self.embedding_provider.dimensions() {
            warn!(
                reported = self.embedding_provider.dimensions(),
                actual = dimensions,
                "embedding provider reports a different dimension count than it returns"
            );
        }

        // 3. Attach embeddings to chunks
        for (chunk, embedding) in chunks.iter_mut().zip(embeddings) {
            chunk.embedding = embedding;
        }

        // 4. Replace the collection
        self.vector_store.replace_collection(collection, dimensions, &chunks).await.map_err(
            |e| {
                error!(collection, document.id = %document.id, error = %e, "store replace failed");
                e
            },
        )?;

        let chunk_count = chunks.len();
        info!(collection, document.id = %document.id, chunk_count, "ingested document");

        Ok(CollectionHandle { name: collection.to_string(), chunk_count, dimensions })
    }

    /// Get a handle for a collection that is already stored.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::CollectionNotFound`] if the store has no such collection.
    pub async fn open_collection(&self, name: &str) -> Result<CollectionHandle> {
        let chunk_count = self
            .vector_store
            .count(name)
            .await?
            .ok_or_else(|| RagError::CollectionNotFound { collection: name.to_string() })?;
        Ok(CollectionHandle {
            name: name.to_string(),
            chunk_count,
            dimensions: self.embedding_provider.dimensions(),
        })
    }

    /// Return the `k` stored chunks closest to `query`, closest first.
    ///
    /// The query is embedded with the same provider used for ingestion. If
    /// `k` exceeds the collection size, every stored chunk is returned.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if `k == 0`; embedding and store
    /// failures are returned unchanged.
    pub async fn similarity_search(
        &self,
        handle: &CollectionHandle,
        query: &str,
        k: usize,
    ) -> Result<Vec<SearchResult>> {
        if k == 0 {
            return Err(RagError::ConfigError("k must be greater than zero".to_string()));
        }

        // 1. Embed the query
        let query_embedding = self.embedding_provider.embed(query).await.map_err(|e| {
            error!(error = %e, "embedding failed during query");
            e
        })?;

        // 2. Search the vector store
        let results =
            self.vector_store.search(&handle.name, &query_embedding, k).await.map_err(|e| {
                error!(collection = %handle.name, error = %e, "vector store search failed");
                e
            })?;

        info!(collection = %handle.name, k, result_count = results.len(), "query completed");
        Ok(results)
    }

    /// Search with the configured `top_k`.
    pub async fn query(&self, handle: &CollectionHandle, query: &str) -> Result<Vec<SearchResult>> {
        self.similarity_search(handle, query, self.config.top_k).await
    }

    /// Retrieve the `k` closest chunks and synthesize an answer from them.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if no synthesizer was configured,
    /// otherwise any search or generation failure unchanged.
    pub async fn answer(
        &self,
        handle: &CollectionHandle,
        query: &str,
        k: usize,
    ) -> Result<QueryOutcome> {
        let synthesizer = self.synthesizer.as_ref().ok_or_else(|| {
            RagError::ConfigError("no answer synthesizer configured".to_string())
        })?;
        let results = self.similarity_search(handle, query, k).await?;
        let answer = synthesizer.synthesize(query, &results).await?;
        Ok(QueryOutcome { answer, results })
    }
}

/// Builder for constructing a [`RagPipeline`].
///
/// `embedding_provider` and `vector_store` are required. Without an explicit
/// chunker, a [`RecursiveChunker`] sized from the config is used; without a
/// config, [`RagConfig::default()`] applies. The synthesizer is optional, but
/// [`RagPipeline::answer`] needs one.
///
/// # Example
///
/// ```rust,ignore
/// let pipeline = RagPipeline::builder()
///     .config(RagConfig::default())
///     .embedding_provider(Arc::new(embedder))
///     .vector_store(Arc::new(store))
///     .synthesizer(AnswerSynthesizer::new(Arc::new(chat)))  // optional
///     .build()?;
/// ```
#[derive(Default)]
pub struct RagPipelineBuilder {
    config: Option<RagConfig>,
    embedding_provider: Option<Arc<dyn EmbeddingProvider>>,
    vector_store: Option<Arc<dyn VectorStore>>,
    chunker: Option<Arc<dyn Chunker>>,
    synthesizer: Option<AnswerSynthesizer>,
}

impl RagPipelineBuilder {
    /// Set the pipeline configuration.
    pub fn config(mut self, config: RagConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the embedding provider.
    pub fn embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedding_provider = Some(provider);
        self
    }

    /// Set the vector store backend.
    pub fn vector_store(mut self, store: Arc<dyn VectorStore>) -> Self {
        self.vector_store = Some(store);
        self
    }

    /// Set the document chunker.
    pub fn chunker(mut self, chunker: Arc<dyn Chunker>) -> Self {
        self.chunker = Some(chunker);
        self
    }

    /// Set the answer synthesizer.
    pub fn synthesizer(mut self, synthesizer: AnswerSynthesizer) -> Self {
        self.synthesizer = Some(synthesizer);
        self
    }

    /// Build the [`RagPipeline`], validating that all required fields are set.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if a required field is missing.
    pub fn build(self) -> Result<RagPipeline> {
        let config = self.config.unwrap_or_default();
        let embedding_provider = self
            .embedding_provider
            .ok_or_else(|| RagError::ConfigError("embedding_provider is required".to_string()))?;
        let vector_store = self
            .vector_store
            .ok_or_else(|| RagError::ConfigError("vector_store is required".to_string()))?;
        let chunker = self.chunker.unwrap_or_else(|| {
            Arc::new(RecursiveChunker::new(config.chunk_size, config.chunk_overlap))
        });

        Ok(RagPipeline {
            config,
            embedding_provider,
            vector_store,
            chunker,
            synthesizer: self.synthesizer,
        })
    }
}
