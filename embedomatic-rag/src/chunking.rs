//! Document chunking.
//!
//! This module provides the [`Chunker`] trait and [`RecursiveChunker`], which
//! splits hierarchically by paragraphs, lines, sentences, then words, and
//! falls back to raw character cuts only when a single word is too long.
//!
//! Chunks are always contiguous spans of the source text. Consecutive chunks
//! share at most `chunk_overlap` characters, so dropping each chunk's overlap
//! (recorded through the `start_index` metadata field) and concatenating the
//! rest reproduces the document text exactly.

use std::ops::Range;

use crate::document::{CHUNK_INDEX_KEY, Chunk, Document, START_INDEX_KEY};

/// Separators tried in order, from the largest structural boundary down.
const SEPARATORS: [&str; 6] = ["\n\n", "\n", ". ", "! ", "? ", " "];

/// A strategy for splitting documents into chunks.
///
/// Implementations produce [`Chunk`]s with text and metadata but no embeddings.
/// Embeddings are attached later by the pipeline.
pub trait Chunker: Send + Sync {
    /// Split a document into chunks.
    ///
    /// Returns an empty `Vec` if the document has no text.
    /// Each returned chunk has an empty embedding vector.
    fn chunk(&self, document: &Document) -> Vec<Chunk>;
}

/// Splits text hierarchically: paragraphs → lines → sentences → words → characters.
///
/// Text is first cut into pieces no longer than `chunk_size` characters, using
/// the largest separator present in each oversized segment. Pieces are then
/// merged greedily. When the next piece does not fit, the current chunk is
/// emitted and the next one is seeded with up to `chunk_overlap` trailing
/// characters of it.
///
/// Sizes are counted in `char`s, so multi-byte text is never cut mid-character.
///
/// # Example
///
/// ```rust,ignore
/// use embedomatic_rag::RecursiveChunker;
///
/// let chunker = RecursiveChunker::new(1000, 20);
/// let chunks = chunker.chunk(&document);
/// ```
#[derive(Debug, Clone)]
pub struct RecursiveChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl RecursiveChunker {
    /// Create a new `RecursiveChunker`.
    ///
    /// # Arguments
    ///
    /// * `chunk_size` — maximum number of characters per chunk (at least 1)
    /// * `chunk_overlap` — maximum number of characters shared by consecutive chunks,
    ///   clamped below `chunk_size`
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self { chunk_size, chunk_overlap: chunk_overlap.min(chunk_size - 1) }
    }

    /// Split raw text into chunk strings without attaching metadata.
    pub fn split_text(&self, text: &str) -> Vec<String> {
        self.spans(text).into_iter().map(|span| text[span.range].to_string()).collect()
    }

    fn spans(&self, text: &str) -> Vec<Span> {
        if text.trim().is_empty() {
            return Vec::new();
        }
        let mut pieces = Vec::new();
        split_pieces(text, 0..text.len(), self.chunk_size, &SEPARATORS, &mut pieces);
        merge_pieces(text, pieces, self.chunk_size, self.chunk_overlap)
    }
}

/// A contiguous byte range of the source text and its length in characters.
#[derive(Debug, Clone)]
struct Span {
    range: Range<usize>,
    chars: usize,
}

/// Cut `range` into pieces of at most `chunk_size` characters.
///
/// Uses the first separator that occurs in an oversized segment and recurses
/// with the remaining ones. The separator stays attached to the preceding
/// piece, so the pieces tile the range without gaps.
fn split_pieces(
    text: &str,
    range: Range<usize>,
    chunk_size: usize,
    separators: &[&str],
    out: &mut Vec<Span>,
) {
    let slice = &text[range.clone()];
    let chars = slice.chars().count();
    if chars <= chunk_size {
        if chars > 0 {
            out.push(Span { range, chars });
        }
        return;
    }

    let Some(level) = separators.iter().position(|sep| slice.contains(sep)) else {
        split_by_chars(text, range, chunk_size, out);
        return;
    };
    let separator = separators[level];
    let remaining_separators = &separators[level + 1..];

    let mut start = range.start;
    for segment in slice.split_inclusive(separator) {
        let end = start + segment.len();
        split_pieces(text, start..end, chunk_size, remaining_separators, out);
        start = end;
    }
}

/// Raw character cuts, used when no separator is left.
fn split_by_chars(text: &str, range: Range<usize>, chunk_size: usize, out: &mut Vec<Span>) {
    let mut start = range.start;
    let mut chars = 0;
    for (offset, _) in text[range.clone()].char_indices() {
        if chars == chunk_size {
            let at = range.start + offset;
            out.push(Span { range: start..at, chars });
            start = at;
            chars = 0;
        }
        chars += 1;
    }
    if chars > 0 {
        out.push(Span { range: start..range.end, chars });
    }
}

/// Greedily merge adjacent pieces into chunks of at most `chunk_size` characters.
fn merge_pieces(
    text: &str,
    pieces: Vec<Span>,
    chunk_size: usize,
    chunk_overlap: usize,
) -> Vec<Span> {
    let mut chunks = Vec::new();
    let mut current: Option<Span> = None;

    for piece in pieces {
        let next = match current.take() {
            None => piece,
            Some(cur) if cur.chars + piece.chars <= chunk_size => {
                Span { range: cur.range.start..piece.range.end, chars: cur.chars + piece.chars }
            }
            Some(cur) => {
                // Overlap may not push the seeded chunk past chunk_size.
                let keep = chunk_overlap.min(chunk_size - piece.chars).min(cur.chars);
                let start = tail_start(text, &cur.range, keep);
                chunks.push(cur);
                Span { range: start..piece.range.end, chars: keep + piece.chars }
            }
        };
        current = Some(next);
    }

    chunks.extend(current);
    chunks
}

/// Byte offset at which the last `count` characters of `range` begin.
fn tail_start(text: &str, range: &Range<usize>, count: usize) -> usize {
    if count == 0 {
        return range.end;
    }
    text[range.clone()]
        .char_indices()
        .rev()
        .nth(count - 1)
        .map(|(offset, _)| range.start + offset)
        .unwrap_or(range.start)
}

impl Chunker for RecursiveChunker {
    fn chunk(&self, document: &Document) -> Vec<Chunk> {
        let text = &document.text;
        let spans = self.spans(text);

        // Chunk starts never move backwards, so char offsets can be counted incrementally.
        let mut byte_cursor = 0;
        let mut char_cursor = 0;

        spans
            .into_iter()
            .enumerate()
            .map(|(i, span)| {
                char_cursor += text[byte_cursor..span.range.start].chars().count();
                byte_cursor = span.range.start;

                let mut metadata = document.metadata.clone();
                metadata.insert(CHUNK_INDEX_KEY.to_string(), i.to_string());
                metadata.insert(START_INDEX_KEY.to_string(), char_cursor.to_string());
                Chunk {
                    id: format!("{}_{i}", document.id),
                    text: text[span.range].to_string(),
                    embedding: Vec::new(),
                    metadata,
                    document_id: document.id.clone(),
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn oversized_word_falls_back_to_character_cuts() {
        let chunker = RecursiveChunker::new(4, 0);
        assert_eq!(chunker.split_text("abcdefghij"), vec!["abcd", "efgh", "ij"]);
    }

    #[test]
    fn multibyte_text_is_measured_in_chars() {
        let chunker = RecursiveChunker::new(3, 1);
        assert_eq!(chunker.split_text("ééééé"), vec!["ééé", "ééé"]);
    }

    #[test]
    fn paragraphs_are_preferred_over_sentences() {
        let chunker = RecursiveChunker::new(20, 0);
        let chunks = chunker.split_text("One. Two.\n\nThree. Four.");
        assert_eq!(chunks, vec!["One. Two.\n\n", "Three. Four."]);
    }

    #[test]
    fn tail_start_counts_characters() {
        let text = "añb";
        assert_eq!(tail_start(text, &(0..text.len()), 2), 1);
        assert_eq!(tail_start(text, &(0..text.len()), 0), text.len());
        assert_eq!(tail_start(text, &(0..text.len()), 9), 0);
    }
}
