//! Document loaders: turn a file on disk into a [`Document`].
//!
//! [`DocxLoader`] reads Word `.docx` packages; [`TextLoader`] reads plain
//! UTF-8 `.txt` and `.md` files. [`load_document`] picks one by extension.

use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;
use zip::ZipArchive;

use crate::document::Document;
use crate::error::{RagError, Result};

/// Archive entry holding the main body of a `.docx` package.
const DOCX_BODY_ENTRY: &str = "word/document.xml";

/// Matches one XML tag (group 1: closing slash, group 2: name, group 3: self-closing
/// slash) or a run of character data (group 4).
static XML_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<(/?)([A-Za-z_][\w:.-]*)(?:\s[^>]*?)?(/?)>|<[!?][^>]*>|([^<]+)"#)
        .expect("valid XML token pattern")
});

/// Reads a file into a [`Document`].
pub trait DocumentLoader: Send + Sync {
    /// Load and extract the text of the file at `path`.
    ///
    /// Either the whole text is returned or an error; there are no partial results.
    fn load(&self, path: &Path) -> Result<Document>;
}

/// Loads Word `.docx` files.
///
/// Text runs (`<w:t>`) are kept verbatim, `<w:tab/>` becomes a tab,
/// `<w:br/>` and `<w:cr/>` become line breaks, and every paragraph ends with a
/// blank line so the splitter sees paragraph boundaries as `"\n\n"`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DocxLoader;

impl DocumentLoader for DocxLoader {
    fn load(&self, path: &Path) -> Result<Document> {
        let file = File::open(path).map_err(|e| load_error(path, e))?;
        let mut archive = ZipArchive::new(file).map_err(|e| load_error(path, e))?;
        let mut entry = archive.by_name(DOCX_BODY_ENTRY).map_err(|e| load_error(path, e))?;

        let mut xml = String::new();
        entry.read_to_string(&mut xml).map_err(|e| load_error(path, e))?;

        let text = extract_docx_text(&xml);
        debug!(path = %path.display(), chars = text.chars().count(), "extracted docx text");
        Ok(document_for(path, text))
    }
}

/// Loads UTF-8 text files as-is.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextLoader;

impl DocumentLoader for TextLoader {
    fn load(&self, path: &Path) -> Result<Document> {
        let text = std::fs::read_to_string(path).map_err(|e| load_error(path, e))?;
        Ok(document_for(path, text))
    }
}

/// Load `path` with the loader matching its extension.
///
/// `.docx` uses [`DocxLoader`]; `.txt` and `.md` use [`TextLoader`]. Anything
/// else fails with [`RagError::UnsupportedFormat`].
pub fn load_document(path: &Path) -> Result<Document> {
    loader_for(path)?.load(path)
}

/// The loader for `path`'s extension.
pub fn loader_for(path: &Path) -> Result<Box<dyn DocumentLoader>> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    match extension.as_str() {
        "docx" => Ok(Box::new(DocxLoader)),
        "txt" | "md" => Ok(Box::new(TextLoader)),
        _ => Err(RagError::UnsupportedFormat { path: path.display().to_string() }),
    }
}

fn load_error(path: &Path, e: impl std::fmt::Display) -> RagError {
    RagError::LoadError { path: path.display().to_string(), message: e.to_string() }
}

fn document_for(path: &Path, text: String) -> Document {
    let id = path
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("document")
        .to_string();
    Document::new(id, text, path.display().to_string())
}

/// Extract plain text from a WordprocessingML body.
fn extract_docx_text(xml: &str) -> String {
    let mut text = String::new();
    let mut in_text_run = false;

    for token in XML_TOKEN.captures_iter(xml) {
        if let Some(data) = token.get(4) {
            if in_text_run {
                text.push_str(&decode_entities(data.as_str()));
            }
            continue;
        }
        let Some(name) = token.get(2).map(|m| m.as_str()) else {
            continue;
        };
        let closing = token.get(1).is_some_and(|m| !m.as_str().is_empty());
        let self_closing = token.get(3).is_some_and(|m| !m.as_str().is_empty());

        match (name, closing) {
            ("w:t", false) => in_text_run = !self_closing,
            ("w:t", true) => in_text_run = false,
            ("w:tab", false) => text.push('\t'),
            ("w:br" | "w:cr", false) => text.push('\n'),
            ("w:p", true) => text.push_str("\n\n"),
            _ => {}
        }
    }

    text.trim().to_string()
}

/// Decode the predefined XML entities and numeric character references.
fn decode_entities(raw: &str) -> String {
    if !raw.contains('&') {
        return raw.to_string();
    }

    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let after = &rest[amp + 1..];
        let decoded = after.find(';').and_then(|semi| {
            let entity = &after[..semi];
            let ch = match entity {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                _ => entity
                    .strip_prefix("#x")
                    .or_else(|| entity.strip_prefix("#X"))
                    .and_then(|hex| u32::from_str_radix(hex, 16).ok())
                    .or_else(|| entity.strip_prefix('#').and_then(|dec| dec.parse().ok()))
                    .and_then(char::from_u32),
            };
            ch.map(|c| (c, semi))
        });
        match decoded {
            Some((c, semi)) => {
                out.push(c);
                rest = &after[semi + 1..];
            }
            None => {
                out.push('&');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}
