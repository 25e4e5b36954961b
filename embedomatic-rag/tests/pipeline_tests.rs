//! End-to-end pipeline and session tests with deterministic mock providers.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use embedomatic_rag::chat::{ChatMessage, ChatModel, ChatRole};
use embedomatic_rag::{
    AnswerSynthesizer, Document, EmbeddingProvider, ErrorKind, InMemoryVectorStore, RagConfig,
    RagError, RagPipeline, RagSession, Result, VectorStore,
};

const DIMS: usize = 1024;

const GEOGRAPHY: &str = "Paris is the capital of France.\n\n\
Berlin is the capital of Germany.\n\n\
X is Y.";

/// Bag-of-words embedder: each lowercase word bumps one hashed bucket.
struct BagOfWordsEmbedder;

#[async_trait]
impl EmbeddingProvider for BagOfWordsEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vector = vec![0.0; DIMS];
        for word in text.split(|c: char| !c.is_alphanumeric()).filter(|w| !w.is_empty()) {
            let hash = word.to_lowercase().bytes().fold(0xcbf2_9ce4_8422_2325u64, |h, b| {
                (h ^ u64::from(b)).wrapping_mul(0x100_0000_01b3)
            });
            vector[(hash % DIMS as u64) as usize] += 1.0;
        }
        Ok(vector)
    }

    fn dimensions(&self) -> usize {
        DIMS
    }
}

struct FailingEmbedder;

#[async_trait]
impl EmbeddingProvider for FailingEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Err(RagError::EmbeddingError {
            provider: "mock".into(),
            message: "service unavailable".into(),
            transient: true,
        })
    }

    fn dimensions(&self) -> usize {
        DIMS
    }
}

/// Records every request and replies with a fixed answer.
#[derive(Default)]
struct RecordingModel {
    requests: Mutex<Vec<Vec<ChatMessage>>>,
}

#[async_trait]
impl ChatModel for RecordingModel {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        self.requests.lock().unwrap().push(messages.to_vec());
        Ok("X is Y, according to the document.".to_string())
    }

    fn name(&self) -> &str {
        "recording"
    }
}

fn config() -> RagConfig {
    RagConfig::builder().chunk_size(40).chunk_overlap(0).build().unwrap()
}

fn pipeline_with(
    store: Arc<InMemoryVectorStore>,
    embedder: Arc<dyn EmbeddingProvider>,
    model: Option<Arc<RecordingModel>>,
) -> RagPipeline {
    let mut builder =
        RagPipeline::builder().config(config()).embedding_provider(embedder).vector_store(store);
    if let Some(model) = model {
        builder = builder.synthesizer(AnswerSynthesizer::new(model));
    }
    builder.build().unwrap()
}

fn geography() -> Document {
    Document::new("geography", GEOGRAPHY, "geography.txt")
}

#[tokio::test]
async fn ingest_splits_embeds_and_stores_every_chunk() {
    let store = Arc::new(InMemoryVectorStore::new());
    let pipeline = pipeline_with(store.clone(), Arc::new(BagOfWordsEmbedder), None);

    let handle = pipeline.ingest("docs", &geography()).await.unwrap();

    assert_eq!(handle.name, "docs");
    assert_eq!(handle.chunk_count, 3);
    assert_eq!(handle.dimensions, DIMS);
    assert_eq!(store.count("docs").await.unwrap(), Some(3));
}

#[tokio::test]
async fn query_matching_a_chunk_verbatim_returns_that_chunk_first() {
    let store = Arc::new(InMemoryVectorStore::new());
    let pipeline = pipeline_with(store, Arc::new(BagOfWordsEmbedder), None);
    let handle = pipeline.ingest("docs", &geography()).await.unwrap();

    let results = pipeline
        .similarity_search(&handle, "Berlin is the capital of Germany.\n\n", 3)
        .await
        .unwrap();

    assert_eq!(results.len(), 3);
    assert_eq!(results[0].chunk.text, "Berlin is the capital of Germany.\n\n");
    assert!(results[0].distance.abs() < 1e-5);
    assert!(results.windows(2).all(|w| w[0].distance <= w[1].distance));
}

#[tokio::test]
async fn k_larger_than_the_collection_returns_everything() {
    let store = Arc::new(InMemoryVectorStore::new());
    let pipeline = pipeline_with(store, Arc::new(BagOfWordsEmbedder), None);
    let handle = pipeline.ingest("docs", &geography()).await.unwrap();

    let results = pipeline.similarity_search(&handle, "capital", 10).await.unwrap();
    assert_eq!(results.len(), 3);

    let err = pipeline.similarity_search(&handle, "capital", 0).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Configuration);
}

#[tokio::test]
async fn reingesting_replaces_the_previous_collection() {
    let store = Arc::new(InMemoryVectorStore::new());
    let pipeline = pipeline_with(store.clone(), Arc::new(BagOfWordsEmbedder), None);
    pipeline.ingest("docs", &geography()).await.unwrap();

    let memo = Document::new("memo", "Only one paragraph here.", "memo.txt");
    let handle = pipeline.ingest("docs", &memo).await.unwrap();

    assert_eq!(handle.chunk_count, 1);
    assert_eq!(store.count("docs").await.unwrap(), Some(1));
    let results = pipeline.similarity_search(&handle, "capital of France", 5).await.unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].chunk.document_id, "memo");
}

#[tokio::test]
async fn empty_document_is_rejected_without_touching_the_store() {
    let store = Arc::new(InMemoryVectorStore::new());
    let pipeline = pipeline_with(store.clone(), Arc::new(BagOfWordsEmbedder), None);
    pipeline.ingest("docs", &geography()).await.unwrap();

    let blank = Document::new("blank", "  \n\n ", "blank.txt");
    let err = pipeline.ingest("docs", &blank).await.unwrap_err();

    assert!(matches!(err, RagError::EmptyDocument { ref document } if document == "blank.txt"));
    assert_eq!(store.count("docs").await.unwrap(), Some(3));
}

#[tokio::test]
async fn embedding_failure_keeps_the_previous_collection() {
    let store = Arc::new(InMemoryVectorStore::new());
    let working = pipeline_with(store.clone(), Arc::new(BagOfWordsEmbedder), None);
    working.ingest("docs", &geography()).await.unwrap();

    let failing = pipeline_with(store.clone(), Arc::new(FailingEmbedder), None);
    let memo = Document::new("memo", "Only one paragraph here.", "memo.txt");
    let err = failing.ingest("docs", &memo).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Provider);
    assert!(err.is_transient());
    assert_eq!(store.count("docs").await.unwrap(), Some(3));
}

#[tokio::test]
async fn answer_sends_the_query_and_retrieved_context() {
    let store = Arc::new(InMemoryVectorStore::new());
    let model = Arc::new(RecordingModel::default());
    let pipeline = pipeline_with(store, Arc::new(BagOfWordsEmbedder), Some(model.clone()));
    let handle = pipeline.ingest("docs", &geography()).await.unwrap();

    let outcome = pipeline.answer(&handle, "What is X?", 2).await.unwrap();

    assert_eq!(outcome.answer, "X is Y, according to the document.");
    assert_eq!(outcome.results.len(), 2);

    let requests = model.requests.lock().unwrap();
    assert_eq!(requests.len(), 1);
    let messages = &requests[0];
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].role, ChatRole::System);
    assert_eq!(messages[1].role, ChatRole::User);
    assert!(messages[1].content.starts_with("Query: What is X?\n"));
    assert!(messages[1].content.contains("X is Y"));
}

#[tokio::test]
async fn answer_without_a_synthesizer_is_a_configuration_error() {
    let store = Arc::new(InMemoryVectorStore::new());
    let pipeline = pipeline_with(store, Arc::new(BagOfWordsEmbedder), None);
    let handle = pipeline.ingest("docs", &geography()).await.unwrap();

    let err = pipeline.answer(&handle, "What is X?", 2).await.unwrap_err();
    assert!(matches!(err, RagError::ConfigError(_)));
}

fn session() -> (RagSession, Arc<InMemoryVectorStore>, Arc<RecordingModel>) {
    let store = Arc::new(InMemoryVectorStore::new());
    let model = Arc::new(RecordingModel::default());
    let pipeline =
        pipeline_with(store.clone(), Arc::new(BagOfWordsEmbedder), Some(model.clone()));
    (RagSession::new(Arc::new(pipeline), "default_collection"), store, model)
}

#[tokio::test]
async fn session_without_a_collection_refuses_queries() {
    let (session, _, model) = session();

    assert!(!session.is_loaded());
    let err = session.ask("What is X?", 2).await.unwrap_err();
    assert!(matches!(err, RagError::NoActiveCollection));
    assert_eq!(err.kind(), ErrorKind::Session);
    assert!(matches!(session.search("X", 2).await, Err(RagError::NoActiveCollection)));
    assert!(model.requests.lock().unwrap().is_empty());
}

#[tokio::test]
async fn session_ingests_files_and_clamps_result_counts() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("geography.txt");
    std::fs::write(&path, GEOGRAPHY).unwrap();

    let (mut session, _, _) = session();
    let handle = session.ingest_file(&path).await.unwrap().clone();

    assert_eq!(handle.name, "default_collection");
    assert_eq!(session.active_collection(), Some(&handle));
    assert_eq!(session.search("capital", 0).await.unwrap().len(), 1);
    assert_eq!(session.search("capital", 50).await.unwrap().len(), 3);

    let outcome = session.ask("What is X?", 2).await.unwrap();
    assert_eq!(outcome.results.len(), 2);
}

#[tokio::test]
async fn failed_ingestion_leaves_the_session_unchanged() {
    let (mut session, _, _) = session();
    let before = session
        .ingest_upload("geography.txt", GEOGRAPHY.as_bytes())
        .await
        .unwrap()
        .clone();

    let err = session.ingest_upload("slides.pptx", b"not a document").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Load);
    let err = session.ingest_upload("blank.txt", b"   ").await.unwrap_err();
    assert!(matches!(err, RagError::EmptyDocument { .. }));

    assert_eq!(session.active_collection(), Some(&before));
}

fn staged_uploads() -> HashSet<PathBuf> {
    std::fs::read_dir(std::env::temp_dir())
        .unwrap()
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with("embedomatic-") && n.ends_with(".md"))
        })
        .collect()
}

#[tokio::test]
async fn uploads_are_staged_and_removed() {
    let before = staged_uploads();
    let (mut session, store, _) = session();

    let handle = session.ingest_upload("notes.md", b"# Notes\n\nX is Y.").await.unwrap().clone();
    assert_eq!(handle.chunk_count, 1);
    let err = session.ingest_upload("empty.md", b"").await.unwrap_err();
    assert!(matches!(err, RagError::EmptyDocument { ref document } if document == "empty.md"));

    assert!(staged_uploads().is_subset(&before));

    let results = store.search("default_collection", &[1.0; DIMS], 1).await.unwrap();
    assert_eq!(results[0].chunk.document_id, "notes");
    assert_eq!(results[0].chunk.metadata.get("source").map(String::as_str), Some("notes.md"));
}

#[tokio::test]
async fn attach_adopts_an_existing_collection() {
    let (mut session, _, _) = session();
    assert!(!session.attach().await.unwrap());

    session.ingest_upload("geography.txt", GEOGRAPHY.as_bytes()).await.unwrap();
    let ingested = session.active_collection().cloned();

    assert!(session.attach().await.unwrap());
    assert_eq!(session.active_collection().cloned(), ingested);
}

/// Reports one size and returns another; length varies with `ragged`.
struct MismatchedEmbedder {
    ragged: bool,
}

#[async_trait]
impl EmbeddingProvider for MismatchedEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let len = if self.ragged && text.contains("Berlin") { 4 } else { 3 };
        Ok(vec![1.0; len])
    }

    fn dimensions(&self) -> usize {
        1536
    }
}

#[tokio::test]
async fn collection_is_sized_from_the_returned_vectors() {
    let store = Arc::new(InMemoryVectorStore::new());
    let embedder = Arc::new(MismatchedEmbedder { ragged: false });
    let pipeline = pipeline_with(store, embedder, None);

    let handle = pipeline.ingest("docs", &geography()).await.unwrap();
    assert_eq!(handle.dimensions, 3);
}

#[tokio::test]
async fn vectors_of_different_lengths_are_rejected() {
    let store = Arc::new(InMemoryVectorStore::new());
    let embedder = Arc::new(MismatchedEmbedder { ragged: true });
    let pipeline = pipeline_with(store.clone(), embedder, None);

    let err = pipeline.ingest("docs", &geography()).await.unwrap_err();
    assert!(matches!(err, RagError::EmbeddingError { transient: false, .. }));
    assert_eq!(store.count("docs").await.unwrap(), None);
}
