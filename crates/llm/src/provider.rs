use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A chat message for the LLM.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// Trait for LLM completion providers — each backend implements this.
/// The categorized selection stage in [`crate::selection`] is built on top
/// of a single `complete` call, same as the original's `generate_content`.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Send a chat completion request and return the assistant's response text.
    async fn complete(
        &self,
        messages: Vec<Message>,
        temperature: f32,
        max_tokens: u32,
    ) -> Result<String, LlmError>;
}

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("API error: {status} — {body}")]
    Api { status: u16, body: String },
    #[error("authentication failed: {0}")]
    AuthFailed(String),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("rate limited / quota exceeded: {0}")]
    QuotaExceeded(String),
    #[error("failed to parse response: {0}")]
    ParseError(String),
    #[error("provider not configured: {0}")]
    NotConfigured(String),
}

impl LlmError {
    /// Classify an HTTP status code per SPEC_FULL §4.E / §7: 401/403 are
    /// auth failures (never retried), 400/404/422 are invalid requests
    /// (never retried), 429 is quota exhaustion (retried), 5xx is a
    /// transient provider error (retried).
    pub fn from_status(status: u16, body: String) -> Self {
        match status {
            401 | 403 => Self::AuthFailed(body),
            400 | 404 | 422 => Self::InvalidRequest(body),
            429 => Self::QuotaExceeded(body),
            _ => Self::Api { status, body },
        }
    }

    /// Whether this error should be retried by the selection stage's
    /// backoff loop. Auth and invalid-request errors propagate immediately.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::AuthFailed(_) | Self::InvalidRequest(_) | Self::NotConfigured(_) => false,
            Self::Transport(_) | Self::QuotaExceeded(_) | Self::ParseError(_) => true,
            Self::Api { status, .. } => *status >= 500,
        }
    }
}
