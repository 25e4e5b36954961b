//! # embedomatic-rag
//!
//! The document-to-answer pipeline behind Embed-o-Matic: load a document,
//! split it into overlapping chunks, embed the chunks, store them in a vector
//! database, then answer questions from the nearest chunks with a chat model.
//!
//! ## Overview
//!
//! - [`Environment`] reads API credentials, the connection string and the
//!   collection name at startup.
//! - [`load_document`] extracts text from `.docx`, `.txt` and `.md` files.
//! - [`RecursiveChunker`] splits text on paragraphs, lines, sentences, then words.
//! - [`EmbeddingProvider`] / [`OpenAIEmbeddingProvider`] turn text into vectors.
//! - [`VectorStore`] with [`InMemoryVectorStore`] and, behind the `pgvector`
//!   feature, [`PgVectorStore`](pgvector::PgVectorStore).
//! - [`AnswerSynthesizer`] fills the RAG prompt and calls a [`ChatModel`].
//! - [`RagPipeline`] ties these together; [`RagSession`] holds the active
//!   collection for one user.
//!
//! ## Features
//!
//! | Feature    | Enables                              |
//! |------------|--------------------------------------|
//! | `pgvector` | PostgreSQL + pgvector store via sqlx |
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use embedomatic_rag::*;
//!
//! let env = Environment::load()?;
//! let api_key = env.require_api_key()?;
//! let pipeline = RagPipeline::builder()
//!     .config(env.rag_config()?)
//!     .embedding_provider(Arc::new(OpenAIEmbeddingProvider::new(api_key)?))
//!     .vector_store(Arc::new(InMemoryVectorStore::new()))
//!     .synthesizer(AnswerSynthesizer::new(Arc::new(OpenAIChatModel::new(api_key)?)))
//!     .build()?;
//!
//! let mut session = RagSession::new(Arc::new(pipeline), env.collection_name.clone());
//! session.ingest_file("report.docx".as_ref()).await?;
//! let outcome = session.ask("What is X?", 2).await?;
//! println!("{}", outcome.answer);
//! ```

pub mod chat;
pub mod chunking;
pub mod config;
pub mod document;
pub mod embedding;
pub mod environment;
pub mod error;
pub mod inmemory;
pub mod loader;
pub mod openai;
pub mod pipeline;
pub mod retry;
pub mod session;
pub mod synthesis;
pub mod vectorstore;

#[cfg(feature = "pgvector")]
pub mod pgvector;

pub use chat::{ChatMessage, ChatModel, ChatRole, OpenAIChatModel};
pub use chunking::{Chunker, RecursiveChunker};
pub use config::{RagConfig, RagConfigBuilder};
pub use document::{Chunk, CollectionHandle, Document, QueryOutcome, SearchResult};
pub use embedding::EmbeddingProvider;
pub use environment::Environment;
pub use error::{ErrorKind, RagError, Result};
pub use inmemory::InMemoryVectorStore;
pub use loader::{DocumentLoader, DocxLoader, TextLoader, load_document};
pub use openai::OpenAIEmbeddingProvider;
pub use pipeline::{RagPipeline, RagPipelineBuilder};
pub use retry::RetryPolicy;
pub use session::RagSession;
pub use synthesis::AnswerSynthesizer;
pub use vectorstore::VectorStore;
