//! Shell behaviour against an in-memory pipeline with canned providers.

use std::sync::Arc;

use async_trait::async_trait;
use embedomatic_cli::{Shell, ShellCommand};
use embedomatic_rag::chat::{ChatMessage, ChatModel};
use embedomatic_rag::{
    AnswerSynthesizer, EmbeddingProvider, InMemoryVectorStore, RagPipeline, RagSession, Result,
};

/// Embeds text as letter frequencies.
struct LetterEmbedder;

#[async_trait]
impl EmbeddingProvider for LetterEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vector = vec![0.0; 26];
        for c in text.chars().filter(char::is_ascii_alphabetic) {
            vector[(c.to_ascii_lowercase() as u8 - b'a') as usize] += 1.0;
        }
        Ok(vector)
    }

    fn dimensions(&self) -> usize {
        26
    }
}

/// Replies with the number of context lines it was given.
struct CountingModel;

#[async_trait]
impl ChatModel for CountingModel {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        let user = messages.last().map(|m| m.content.as_str()).unwrap_or_default();
        Ok(format!("saw {} lines", user.lines().count()))
    }

    fn name(&self) -> &str {
        "counting"
    }
}

fn shell() -> Shell {
    let pipeline = RagPipeline::builder()
        .embedding_provider(Arc::new(LetterEmbedder))
        .vector_store(Arc::new(InMemoryVectorStore::new()))
        .synthesizer(AnswerSynthesizer::new(Arc::new(CountingModel)))
        .build()
        .unwrap();
    Shell::new(RagSession::new(Arc::new(pipeline), "shell_test"), 2)
}

#[tokio::test]
async fn queries_before_loading_ask_for_a_document() {
    let mut shell = shell();
    let output = shell.execute(ShellCommand::parse("What is X?")).await.unwrap();
    assert!(output.contains("No document loaded"));
    assert!(!shell.session().is_loaded());
}

#[tokio::test]
async fn load_then_query_prints_answer_and_chunks() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notes.txt");
    std::fs::write(&path, "X is Y.").unwrap();

    let mut shell = shell();
    let loaded = shell.execute(ShellCommand::Load(path)).await.unwrap();
    assert!(loaded.contains("split into 1 chunks"), "{loaded}");

    let output = shell.execute(ShellCommand::parse("What is X?")).await.unwrap();
    assert!(output.starts_with("Result from LLM\nsaw 3 lines\n"), "{output}");
    assert!(output.contains("Result 1 (distance "));
    assert!(output.contains("X is Y."));
}

#[tokio::test]
async fn loaded_files_are_recorded_under_their_own_name() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("minutes.md");
    std::fs::write(&path, "The board met on Tuesday.").unwrap();

    let mut shell = shell();
    shell.execute(ShellCommand::Load(path.clone())).await.unwrap();

    let results = shell.session().search("board", 1).await.unwrap();
    let chunk = &results[0].chunk;
    assert_eq!(chunk.metadata["source"], "minutes.md");
    assert_eq!(chunk.document_id, "minutes");
    assert!(path.exists(), "the user's file is never removed");
}

#[tokio::test]
async fn failed_loads_are_reported_and_the_shell_continues() {
    let mut shell = shell();
    let output = shell.execute(ShellCommand::parse(":load /nonexistent/report.docx")).await;
    assert!(output.unwrap().starts_with("An error occurred: "));

    let output = shell.execute(ShellCommand::parse(":load slides.pptx")).await;
    assert!(output.unwrap().contains("Unsupported document format"));

    assert_eq!(shell.execute(ShellCommand::Quit).await, None);
}
