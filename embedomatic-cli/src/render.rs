//! Text shown to the user.

use std::fmt::Write;

use embedomatic_rag::{CollectionHandle, QueryOutcome, RagError, SearchResult};

const RULE: &str = "---";

/// Which user action failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Ingest,
    Search,
}

/// Confirmation printed after a successful ingestion.
pub fn ingested(source: &str, handle: &CollectionHandle) -> String {
    format!(
        "Document '{source}' split into {} chunks\nVector store '{}' created successfully!",
        handle.chunk_count, handle.name
    )
}

/// The synthesized answer followed by the retrieved chunks.
pub fn outcome(outcome: &QueryOutcome) -> String {
    let mut out = format!("Result from LLM\n{}\n{RULE}\n", outcome.answer.trim_end());
    out.push_str(&results(&outcome.results));
    out
}

/// Retrieved chunks, numbered in retrieval order.
pub fn results(results: &[SearchResult]) -> String {
    let mut out = String::new();
    for (i, result) in results.iter().enumerate() {
        let _ = writeln!(out, "Result {} (distance {:.4}):", i + 1, result.distance);
        let _ = writeln!(out, "{}", result.chunk.text.trim_end());
        let _ = writeln!(out, "{RULE}");
    }
    out
}

/// User-visible message for a failed action.
pub fn error(action: Action, err: &RagError) -> String {
    match (action, err) {
        (_, RagError::NoActiveCollection) => {
            "No document loaded yet. Ingest a document first.".to_string()
        }
        (Action::Ingest, err) => format!("An error occurred: {err}"),
        (Action::Search, err) => format!("Search error: {err}"),
    }
}
