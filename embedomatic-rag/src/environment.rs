//! Startup configuration read from the process environment.
//!
//! [`Environment::load`] honours a `.env` file in the working directory (via
//! `dotenvy`) and then reads the variables below. Process variables take
//! precedence over `.env` entries.
//!
//! | Variable            | Default                       |
//! |---------------------|-------------------------------|
//! | `OPENAI_API_KEY`    | —                             |
//! | `CONNECTION_STRING` | — (falls back to `DATABASE_URL`) |
//! | `COLLECTION_NAME`   | `default_collection`          |
//! | `OPENAI_BASE_URL`   | `https://api.openai.com/v1`   |
//! | `EMBEDDING_MODEL`   | `text-embedding-3-small`      |
//! | `CHAT_MODEL`        | `gpt-4o-mini`                 |
//! | `CHAT_TEMPERATURE`  | `0.5`                         |
//! | `CHUNK_SIZE`        | `1000`                        |
//! | `CHUNK_OVERLAP`     | `20`                          |
//! | `MAX_RETRIES`       | `2`                           |

use std::str::FromStr;

use tracing::{debug, info};

use crate::chat::{DEFAULT_CHAT_MODEL, DEFAULT_TEMPERATURE};
use crate::config::{DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE, RagConfig};
use crate::error::{RagError, Result};
use crate::openai::{DEFAULT_BASE_URL, DEFAULT_EMBEDDING_MODEL};
use crate::retry::{DEFAULT_MAX_RETRIES, RetryPolicy};

/// Collection used when `COLLECTION_NAME` is unset.
pub const DEFAULT_COLLECTION_NAME: &str = "default_collection";

/// Configuration gathered once at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct Environment {
    /// Credential for the embedding and chat APIs.
    pub openai_api_key: Option<String>,
    /// Postgres connection string for the pgvector store.
    pub connection_string: Option<String>,
    /// Name of the collection documents are ingested into.
    pub collection_name: String,
    /// Base URL of the OpenAI-compatible API.
    pub openai_base_url: String,
    /// Embedding model name.
    pub embedding_model: String,
    /// Chat model name.
    pub chat_model: String,
    /// Chat sampling temperature.
    pub chat_temperature: f32,
    /// Maximum chunk size in characters.
    pub chunk_size: usize,
    /// Overlap between consecutive chunks in characters.
    pub chunk_overlap: usize,
    /// Transport retries for provider calls.
    pub max_retries: u32,
}

impl Environment {
    /// Load `.env` (if present) and read the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if neither `OPENAI_API_KEY` nor a
    /// connection string is set, or if a numeric variable does not parse.
    pub fn load() -> Result<Self> {
        match dotenvy::dotenv() {
            Ok(path) => debug!(path = %path.display(), "loaded .env file"),
            Err(e) if e.not_found() => {}
            Err(e) => return Err(RagError::ConfigError(format!("failed to read .env: {e}"))),
        }
        let env = Self::from_lookup(|key| std::env::var(key).ok())?;
        info!(collection = %env.collection_name, "environment loaded");
        Ok(env)
    }

    /// Build an [`Environment`] from any key → value source.
    ///
    /// Empty values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let openai_api_key = get("OPENAI_API_KEY");
        let connection_string = get("CONNECTION_STRING").or_else(|| get("DATABASE_URL"));
        if openai_api_key.is_none() && connection_string.is_none() {
            return Err(RagError::ConfigError(
                "OPENAI_API_KEY or CONNECTION_STRING not found in environment variables".into(),
            ));
        }

        Ok(Self {
            openai_api_key,
            connection_string,
            collection_name: get("COLLECTION_NAME")
                .unwrap_or_else(|| DEFAULT_COLLECTION_NAME.to_string()),
            openai_base_url: get("OPENAI_BASE_URL")
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            embedding_model: get("EMBEDDING_MODEL")
                .unwrap_or_else(|| DEFAULT_EMBEDDING_MODEL.to_string()),
            chat_model: get("CHAT_MODEL").unwrap_or_else(|| DEFAULT_CHAT_MODEL.to_string()),
            chat_temperature: parse_var(&get, "CHAT_TEMPERATURE", DEFAULT_TEMPERATURE)?,
            chunk_size: parse_var(&get, "CHUNK_SIZE", DEFAULT_CHUNK_SIZE)?,
            chunk_overlap: parse_var(&get, "CHUNK_OVERLAP", DEFAULT_CHUNK_OVERLAP)?,
            max_retries: parse_var(&get, "MAX_RETRIES", DEFAULT_MAX_RETRIES)?,
        })
    }

    /// The API key, or a configuration error naming the missing variable.
    pub fn require_api_key(&self) -> Result<&str> {
        self.openai_api_key
            .as_deref()
            .ok_or_else(|| RagError::ConfigError("OPENAI_API_KEY is not set".into()))
    }

    /// Validated pipeline configuration from the chunking variables.
    pub fn rag_config(&self) -> Result<RagConfig> {
        RagConfig::builder()
            .chunk_size(self.chunk_size)
            .chunk_overlap(self.chunk_overlap)
            .build()
    }

    /// Retry policy for provider calls.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::default().with_max_retries(self.max_retries)
    }
}

fn parse_var<T, G>(get: &G, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| RagError::ConfigError(format!("{key}='{raw}' is invalid: {e}"))),
    }
}
