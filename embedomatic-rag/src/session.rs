//! Per-user session state for the presentation layer.
//!
//! A [`RagSession`] owns the only mutable state of the demo: the handle of
//! the collection produced by the last successful ingestion. It is passed
//! explicitly to every action, so several sessions can share one
//! [`RagPipeline`] without interfering.

use std::io::Write;
use std::ops::RangeInclusive;
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info};

use crate::document::{CollectionHandle, Document, QueryOutcome, SOURCE_KEY, SearchResult};
use crate::error::{RagError, Result};
use crate::loader::loader_for;
use crate::pipeline::RagPipeline;

/// Result counts a user may request per search.
pub const RESULT_COUNT_RANGE: RangeInclusive<usize> = 1..=5;

/// Result count used until the user picks one.
pub const DEFAULT_RESULT_COUNT: usize = 2;

/// A user session: one collection name, at most one active collection.
///
/// States are "nothing loaded" and "collection loaded". A successful
/// ingestion moves to (or stays in) the loaded state with a fresh handle; a
/// failed one leaves the session as it was.
pub struct RagSession {
    pipeline: Arc<RagPipeline>,
    collection_name: String,
    active: Option<CollectionHandle>,
}

impl RagSession {
    /// Create a session that ingests into `collection_name`.
    pub fn new(pipeline: Arc<RagPipeline>, collection_name: impl Into<String>) -> Self {
        Self { pipeline, collection_name: collection_name.into(), active: None }
    }

    /// The collection this session writes to.
    pub fn collection_name(&self) -> &str {
        &self.collection_name
    }

    /// The active collection, if a document has been ingested.
    pub fn active_collection(&self) -> Option<&CollectionHandle> {
        self.active.as_ref()
    }

    /// Whether a collection is loaded and queries can run.
    pub fn is_loaded(&self) -> bool {
        self.active.is_some()
    }

    /// Adopt the already stored collection named by this session, if any.
    ///
    /// Returns `Ok(false)` when the store has no such collection.
    pub async fn attach(&mut self) -> Result<bool> {
        match self.pipeline.open_collection(&self.collection_name).await {
            Ok(handle) => {
                debug!(collection = %handle.name, chunk_count = handle.chunk_count, "attached");
                self.active = Some(handle);
                Ok(true)
            }
            Err(RagError::CollectionNotFound { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Load, split, embed and store the file at `path`.
    pub async fn ingest_file(&mut self, path: &Path) -> Result<&CollectionHandle> {
        let document = loader_for(path)?.load(path)?;
        self.ingest_document(document).await
    }

    /// Ingest uploaded bytes named `file_name`.
    ///
    /// The bytes are written to a temporary file carrying the original
    /// extension; the file is removed when this call returns, whether or not
    /// ingestion succeeded.
    pub async fn ingest_upload(
        &mut self,
        file_name: &str,
        bytes: &[u8],
    ) -> Result<&CollectionHandle> {
        let upload_error = |e: std::io::Error| RagError::LoadError {
            path: file_name.to_string(),
            message: format!("failed to stage upload: {e}"),
        };

        let suffix = Path::new(file_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| format!(".{ext}"))
            .unwrap_or_default();
        let mut staged = tempfile::Builder::new()
            .prefix("embedomatic-")
            .suffix(&suffix)
            .tempfile()
            .map_err(upload_error)?;
        staged.write_all(bytes).map_err(upload_error)?;
        staged.flush().map_err(upload_error)?;

        let mut document = loader_for(staged.path())?.load(staged.path())?;
        // Report the user's file name, not the staging path.
        document.id = Path::new(file_name)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(file_name)
            .to_string();
        document.metadata.insert(SOURCE_KEY.to_string(), file_name.to_string());
        document.source_uri = Some(file_name.to_string());

        let result = self.ingest_document(document).await;
        drop(staged);
        result
    }

    async fn ingest_document(&mut self, document: Document) -> Result<&CollectionHandle> {
        let handle = self.pipeline.ingest(&self.collection_name, &document).await?;
        info!(
            collection = %handle.name,
            chunk_count = handle.chunk_count,
            source = document.source(),
            "session collection replaced"
        );
        Ok(self.active.insert(handle))
    }

    /// Retrieve up to `k` chunks closest to `query`; `k` is clamped to 1–5.
    pub async fn search(&self, query: &str, k: usize) -> Result<Vec<SearchResult>> {
        let handle = self.active.as_ref().ok_or(RagError::NoActiveCollection)?;
        self.pipeline.similarity_search(handle, query, clamp_result_count(k)).await
    }

    /// Retrieve up to `k` chunks and synthesize an answer; `k` is clamped to 1–5.
    pub async fn ask(&self, query: &str, k: usize) -> Result<QueryOutcome> {
        let handle = self.active.as_ref().ok_or(RagError::NoActiveCollection)?;
        self.pipeline.answer(handle, query, clamp_result_count(k)).await
    }
}

/// Clamp a requested result count into [`RESULT_COUNT_RANGE`].
pub fn clamp_result_count(k: usize) -> usize {
    k.clamp(*RESULT_COUNT_RANGE.start(), *RESULT_COUNT_RANGE.end())
}
