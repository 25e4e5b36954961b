//! Answer synthesis: retrieved chunks plus the user's query, sent to a chat model.

use std::sync::Arc;

use tracing::{error, info};

use crate::chat::{ChatMessage, ChatModel};
use crate::document::SearchResult;
use crate::error::Result;

/// System instruction describing the assistant's retrieval-augmented role.
pub const RAG_SYSTEM_PROMPT: &str = "You are an AI assistant designed to provide accurate and \
helpful answers to user queries. Specifically, you operate as a Retrieval-Augmented Generation \
(RAG) system that leverages information fetched from a PostgreSQL vector database. Your task is \
to combine your general knowledge with the provided context to generate articulate, \
human-readable responses. Focus on clarity, relevance, and coherence in your answers.";

/// Fills the two-message RAG template and asks a [`ChatModel`] for an answer.
#[derive(Clone)]
pub struct AnswerSynthesizer {
    model: Arc<dyn ChatModel>,
    system_prompt: String,
}

impl AnswerSynthesizer {
    /// Create a synthesizer using [`RAG_SYSTEM_PROMPT`].
    pub fn new(model: Arc<dyn ChatModel>) -> Self {
        Self { model, system_prompt: RAG_SYSTEM_PROMPT.to_string() }
    }

    /// Replace the system instruction.
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    /// Build the system and user messages for `query` over `context`.
    ///
    /// The user message is the query followed by every chunk text, one per
    /// line, in retrieval order.
    pub fn build_messages(&self, query: &str, context: &[SearchResult]) -> Vec<ChatMessage> {
        let context_text =
            context.iter().map(|r| r.chunk.text.as_str()).collect::<Vec<_>>().join("\n");
        let enhanced_query =
            format!("Query: {query}\nContext from similar documents:\n{context_text}");
        vec![ChatMessage::system(self.system_prompt.clone()), ChatMessage::user(enhanced_query)]
    }

    /// Generate an answer for `query` grounded in `context`.
    ///
    /// Provider failures are returned as-is; no fallback answer is produced.
    pub async fn synthesize(&self, query: &str, context: &[SearchResult]) -> Result<String> {
        let messages = self.build_messages(query, context);
        let answer = self.model.complete(&messages).await.map_err(|e| {
            error!(model = self.model.name(), error = %e, "answer synthesis failed");
            e
        })?;
        info!(model = self.model.name(), context_chunks = context.len(), "synthesized answer");
        Ok(answer)
    }
}
