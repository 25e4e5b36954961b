//! Wiring: environment and flags in, a ready [`RagSession`] out.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use embedomatic_rag::loader::loader_for;
use embedomatic_rag::pgvector::PgVectorStore;
use embedomatic_rag::{
    AnswerSynthesizer, CollectionHandle, Environment, InMemoryVectorStore, OpenAIChatModel,
    OpenAIEmbeddingProvider, RagConfig, RagError, RagPipeline, RagSession, Result, VectorStore,
};
use tracing::info;

use crate::args::GlobalOptions;

/// Which vector store a session runs against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    PgVector,
    InMemory,
}

impl Backend {
    /// pgvector when a connection string is configured and not overridden.
    pub fn select(env: &Environment, options: &GlobalOptions) -> Self {
        if env.connection_string.is_some() && !options.memory {
            Self::PgVector
        } else {
            Self::InMemory
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::PgVector => "pgvector",
            Self::InMemory => "in-memory",
        }
    }
}

/// Chunking settings from the environment, with command-line overrides.
pub fn rag_config(env: &Environment, options: &GlobalOptions) -> Result<RagConfig> {
    RagConfig::builder()
        .chunk_size(options.chunk_size.unwrap_or(env.chunk_size))
        .chunk_overlap(options.chunk_overlap.unwrap_or(env.chunk_overlap))
        .build()
}

/// Collection name from `--collection`, else the environment.
pub fn collection_name(env: &Environment, options: &GlobalOptions) -> String {
    options.collection.clone().unwrap_or_else(|| env.collection_name.clone())
}

/// How long a store operation waits for a database connection.
pub const STORE_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(10);

/// Open the store for `backend`.
///
/// The pgvector pool connects on first use, so an unreachable database is
/// reported by the action that needed it.
pub fn open_store(
    backend: Backend,
    env: &Environment,
    acquire_timeout: Duration,
) -> Result<Arc<dyn VectorStore>> {
    let store: Arc<dyn VectorStore> = match (backend, env.connection_string.as_deref()) {
        (Backend::PgVector, Some(url)) => {
            Arc::new(PgVectorStore::connect_lazy(url, acquire_timeout)?)
        }
        _ => Arc::new(InMemoryVectorStore::new()),
    };
    Ok(store)
}

/// Build the pipeline and an empty session.
///
/// Fails only on configuration problems. Nothing here touches the network.
pub async fn build_session(env: &Environment, options: &GlobalOptions) -> Result<RagSession> {
    let api_key = env.require_api_key()?;
    let retry_policy = env.retry_policy();

    let embedder = OpenAIEmbeddingProvider::new(api_key)?
        .with_base_url(&env.openai_base_url)
        .with_model(&env.embedding_model)
        .with_retry_policy(retry_policy.clone());
    let chat = OpenAIChatModel::new(api_key)?
        .with_base_url(&env.openai_base_url)
        .with_model(&env.chat_model)
        .with_temperature(env.chat_temperature)
        .with_retry_policy(retry_policy);

    let backend = Backend::select(env, options);
    let store = open_store(backend, env, STORE_ACQUIRE_TIMEOUT)?;

    let pipeline = RagPipeline::builder()
        .config(rag_config(env, options)?)
        .embedding_provider(Arc::new(embedder))
        .vector_store(store)
        .synthesizer(AnswerSynthesizer::new(Arc::new(chat)))
        .build()?;

    let collection = collection_name(env, options);
    info!(backend = backend.label(), collection = %collection, "session ready");
    Ok(RagSession::new(Arc::new(pipeline), collection))
}

/// Ingest the file at `path` the way an upload is ingested.
///
/// The bytes are handed to [`RagSession::ingest_upload`], which stages them
/// in a temporary file and removes it when ingestion ends.
pub async fn upload<'s>(
    session: &'s mut RagSession,
    path: &Path,
) -> Result<&'s CollectionHandle> {
    // Unsupported formats are reported before any I/O.
    loader_for(path)?;
    let bytes = tokio::fs::read(path).await.map_err(|e| RagError::LoadError {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    session.ingest_upload(&file_name, &bytes).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(connection_string: Option<&str>) -> Environment {
        Environment::from_lookup(|key| match key {
            "OPENAI_API_KEY" => Some("sk-test".to_string()),
            "CONNECTION_STRING" => connection_string.map(str::to_string),
            _ => None,
        })
        .unwrap()
    }

    #[test]
    fn backend_follows_connection_string_and_memory_flag() {
        let memory = GlobalOptions { memory: true, ..GlobalOptions::default() };
        let defaults = GlobalOptions::default();

        assert_eq!(Backend::select(&env(None), &defaults), Backend::InMemory);
        assert_eq!(Backend::select(&env(Some("postgres://db/rag")), &defaults), Backend::PgVector);
        assert_eq!(Backend::select(&env(Some("postgres://db/rag")), &memory), Backend::InMemory);
    }

    #[test]
    fn flags_override_environment() {
        let options = GlobalOptions {
            collection: Some("reports".into()),
            chunk_size: Some(300),
            chunk_overlap: Some(30),
            memory: false,
        };
        let env = env(None);

        assert_eq!(collection_name(&env, &options), "reports");
        assert_eq!(collection_name(&env, &GlobalOptions::default()), "default_collection");
        let config = rag_config(&env, &options).unwrap();
        assert_eq!((config.chunk_size, config.chunk_overlap), (300, 30));
    }

    #[test]
    fn overlap_not_below_chunk_size_is_rejected() {
        let options = GlobalOptions { chunk_size: Some(10), ..GlobalOptions::default() };
        assert!(rag_config(&env(None), &options).is_err());
    }

    #[tokio::test]
    async fn in_memory_session_starts_empty() {
        let session = build_session(&env(None), &GlobalOptions::default()).await.unwrap();
        assert_eq!(session.collection_name(), "default_collection");
        assert!(!session.is_loaded());
    }

    const UNREACHABLE: &str = "postgres://embedomatic@127.0.0.1:1/rag";

    #[tokio::test]
    async fn startup_does_not_connect_to_the_database() {
        let session = build_session(&env(Some(UNREACHABLE)), &GlobalOptions::default()).await;
        assert!(!session.unwrap().is_loaded());
    }

    #[tokio::test]
    async fn unreachable_database_fails_the_action_that_needs_it() {
        let store =
            open_store(Backend::PgVector, &env(Some(UNREACHABLE)), Duration::from_millis(500))
                .unwrap();
        let err = store.count("default_collection").await.unwrap_err();
        assert_eq!(err.kind(), embedomatic_rag::ErrorKind::Store);
    }
}
