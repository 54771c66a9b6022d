//! Core `ConversationAgent` trait and `ApiAgent` implementation.
//!
//! `ApiAgent` calls any OpenAI-compatible `/v1/chat/completions` endpoint:
//! Ollama (OpenAI mode), OpenAI, Groq, LM Studio, vLLM, etc.
//! All connection details come from [`AgentConfig`]; nothing is hardcoded.

use std::fmt;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use super::history::{ChatMessage, ConversationStore};
use crate::config::{AgentConfig, ConfigError};

// ---------------------------------------------------------------------------
// ConversationHandle
// ---------------------------------------------------------------------------

/// Opaque reference to one agent-side conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConversationHandle(Uuid);

impl ConversationHandle {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConversationHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConversationHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // First block is plenty for log lines.
        let s = self.0.to_string();
        f.write_str(s.split('-').next().unwrap_or(s.as_str()))
    }
}

// ---------------------------------------------------------------------------
// AgentError
// ---------------------------------------------------------------------------

/// Errors that can occur while talking to the interviewer model.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AgentError {
    /// HTTP transport or connection error.
    #[error("HTTP request failed: {0}")]
    Request(String),

    /// The request did not complete within the configured timeout.
    #[error("agent request timed out")]
    Timeout,

    /// Non-2xx response from the endpoint.
    #[error("agent endpoint returned {status}: {body}")]
    Status { status: u16, body: String },

    /// The HTTP response could not be parsed as expected JSON.
    #[error("failed to parse agent response: {0}")]
    Parse(String),

    /// The model returned a response with no usable text content.
    #[error("agent returned an empty response")]
    EmptyResponse,

    /// The handle was never opened or has been closed.
    #[error("unknown conversation")]
    UnknownConversation,

    /// The agent cannot be reached with the current settings.
    #[error(transparent)]
    Configuration(#[from] ConfigError),
}

impl From<reqwest::Error> for AgentError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            AgentError::Timeout
        } else {
            AgentError::Request(e.to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// ConversationAgent trait
// ---------------------------------------------------------------------------

/// Async, turn-taking interviewer.
///
/// Implementors must be `Send + Sync` so they can be shared across threads
/// (wrapped in `Arc<dyn ConversationAgent>`).  Prior turns are held by the
/// implementor, keyed by the handle returned from [`open`](Self::open).
#[async_trait]
pub trait ConversationAgent: Send + Sync {
    /// Start a conversation primed with `system_instruction`.
    async fn open(&self, system_instruction: &str) -> Result<ConversationHandle, AgentError>;

    /// Send one user message and return the agent's reply.
    async fn send(&self, handle: ConversationHandle, message: &str) -> Result<String, AgentError>;

    /// Discard agent-side context.  Closing an unknown handle is not an error.
    async fn close(&self, handle: ConversationHandle);
}

// ---------------------------------------------------------------------------
// ApiAgent
// ---------------------------------------------------------------------------

/// Calls an OpenAI-compatible `/v1/chat/completions` endpoint.
///
/// The full history of a conversation is sent with every request; the
/// endpoint itself is stateless.
pub struct ApiAgent {
    client: reqwest::Client,
    config: AgentConfig,
    api_key: Option<String>,
    store: ConversationStore,
}

impl ApiAgent {
    /// Build an `ApiAgent` from application config.
    ///
    /// Fails when the config cannot reach an agent at all (see
    /// [`AgentConfig::validate`]).  The HTTP client carries the per-request
    /// timeout from `config.timeout_secs`.
    pub fn from_config(config: &AgentConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Ok(Self {
            client,
            api_key: config.resolved_api_key(),
            config: config.clone(),
            store: ConversationStore::new(),
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1/chat/completions",
            self.config.base_url.trim_end_matches('/')
        )
    }

    fn request_body(&self, messages: &[ChatMessage]) -> serde_json::Value {
        serde_json::json!({
            "model":       self.config.model,
            "messages":    messages,
            "stream":      false,
            "temperature": self.config.temperature,
            "max_tokens":  self.config.max_tokens
        })
    }
}

/// Pull the assistant text out of a chat-completions response.
fn reply_text(json: &serde_json::Value) -> Result<String, AgentError> {
    let reply = json["choices"][0]["message"]["content"]
        .as_str()
        .ok_or(AgentError::EmptyResponse)?
        .trim()
        .to_string();

    if reply.is_empty() {
        return Err(AgentError::EmptyResponse);
    }
    Ok(reply)
}

#[async_trait]
impl ConversationAgent for ApiAgent {
    async fn open(&self, system_instruction: &str) -> Result<ConversationHandle, AgentError> {
        let handle = self.store.open(system_instruction);
        log::debug!("agent: opened conversation {handle}");
        Ok(handle)
    }

    /// The `Authorization: Bearer …` header is attached only when a
    /// non-empty key was resolved; local providers such as Ollama take
    /// none.
    async fn send(&self, handle: ConversationHandle, message: &str) -> Result<String, AgentError> {
        let messages = self.store.request_messages(handle, message)?;
        let body = self.request_body(&messages);

        let mut req = self.client.post(self.endpoint()).json(&body);
        if let Some(key) = self.api_key.as_deref().filter(|k| !k.is_empty()) {
            req = req.bearer_auth(key);
        }

        log::debug!(
            "agent: sending turn {} of conversation {handle}",
            messages.len()
        );
        let response = req.send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            log::warn!("agent: endpoint returned {status}");
            return Err(AgentError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| AgentError::Parse(e.to_string()))?;

        let reply = reply_text(&json)?;
        self.store.commit(handle, message, &reply)?;
        Ok(reply)
    }

    async fn close(&self, handle: ConversationHandle) {
        if self.store.close(handle) {
            log::debug!("agent: closed conversation {handle}");
        }
    }
}

// ---------------------------------------------------------------------------
// UnconfiguredAgent
// ---------------------------------------------------------------------------

/// Stand-in used when the agent settings are unusable.
///
/// Every `open` fails with the stored [`ConfigError`], so the setup screen
/// shows what to fix instead of the application refusing to launch.
pub struct UnconfiguredAgent {
    error: ConfigError,
}

impl UnconfiguredAgent {
    pub fn new(error: ConfigError) -> Self {
        Self { error }
    }
}

#[async_trait]
impl ConversationAgent for UnconfiguredAgent {
    async fn open(&self, _system_instruction: &str) -> Result<ConversationHandle, AgentError> {
        Err(AgentError::Configuration(self.error.clone()))
    }

    async fn send(&self, _handle: ConversationHandle, _message: &str) -> Result<String, AgentError> {
        Err(AgentError::Configuration(self.error.clone()))
    }

    async fn close(&self, _handle: ConversationHandle) {}
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
