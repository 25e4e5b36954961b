//! Chat-completion model trait and the OpenAI implementation.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::error::{RagError, Result};
use crate::openai::{DEFAULT_BASE_URL, endpoint, error_detail, is_transient_status};
use crate::retry::RetryPolicy;

/// The default chat model.
pub const DEFAULT_CHAT_MODEL: &str = "gpt-4o-mini";

/// The default sampling temperature.
pub const DEFAULT_TEMPERATURE: f32 = 0.5;

const PROVIDER: &str = "OpenAI";

/// The author of a [`ChatMessage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    /// Instructions that frame the assistant's behaviour.
    System,
    /// The human turn.
    User,
}

/// One message of a chat-completion request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Who wrote the message.
    pub role: ChatRole,
    /// The message text.
    pub content: String,
}

impl ChatMessage {
    /// A system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: ChatRole::System, content: content.into() }
    }

    /// A user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: ChatRole::User, content: content.into() }
    }
}

/// A hosted chat-completion model.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Send `messages` and return the generated reply text verbatim.
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String>;

    /// Model identifier, for logging.
    fn name(&self) -> &str;
}

/// A [`ChatModel`] backed by the OpenAI chat completions API.
///
/// Sampling parameters are fixed at construction: `temperature` defaults to
/// 0.5 and no token cap is sent. Every request runs under the configured
/// [`RetryPolicy`] (two retries by default).
///
/// # Example
///
/// ```rust,ignore
/// use embedomatic_rag::chat::{ChatMessage, ChatModel, OpenAIChatModel};
///
/// let model = OpenAIChatModel::new("sk-...")?;
/// let reply = model.complete(&[ChatMessage::user("hello")]).await?;
/// ```
pub struct OpenAIChatModel {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    temperature: f32,
    retry_policy: RetryPolicy,
}

impl OpenAIChatModel {
    /// Create a new chat model client with the given API key.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(RagError::ConfigError("OpenAI API key must not be empty".into()));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: DEFAULT_BASE_URL.into(),
            model: DEFAULT_CHAT_MODEL.into(),
            temperature: DEFAULT_TEMPERATURE,
            retry_policy: RetryPolicy::default(),
        })
    }

    /// Set the model name.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the sampling temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Point the client at a different OpenAI-compatible base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Set the retry policy applied to each request.
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    fn request_body<'a>(&'a self, messages: &'a [ChatMessage]) -> CompletionRequest<'a> {
        CompletionRequest {
            model: &self.model,
            messages,
            temperature: self.temperature,
        }
    }

    async fn request_once(&self, messages: &[ChatMessage]) -> Result<String> {
        let response = self
            .client
            .post(endpoint(&self.base_url, "chat/completions"))
            .bearer_auth(&self.api_key)
            .json(&self.request_body(messages))
            .send()
            .await
            .map_err(|e| {
                error!(provider = PROVIDER, error = %e, "request failed");
                generation_error(format!("request failed: {e}"), true)
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = error_detail(response).await;
            error!(provider = PROVIDER, %status, "API error");
            return Err(generation_error(
                format!("API returned {status}: {detail}"),
                is_transient_status(status),
            ));
        }

        let completion: CompletionResponse = response.json().await.map_err(|e| {
            error!(provider = PROVIDER, error = %e, "failed to parse response");
            generation_error(format!("failed to parse response: {e}"), false)
        })?;

        completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| generation_error("API returned no completion".into(), false))
    }
}

fn generation_error(message: String, transient: bool) -> RagError {
    RagError::GenerationError { provider: PROVIDER.into(), message, transient }
}

// ── OpenAI API request/response types ──────────────────────────────

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Deserialize)]
struct CompletionMessage {
    content: Option<String>,
}

#[async_trait]
impl ChatModel for OpenAIChatModel {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        debug!(
            provider = PROVIDER,
            model = %self.model,
            message_count = messages.len(),
            "chat completion"
        );
        self.retry_policy.run("openai.chat", || self.request_once(messages)).await
    }

    fn name(&self) -> &str {
        &self.model
    }
}
