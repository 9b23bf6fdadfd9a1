//! [`PublishTarget`] trait definition and shared error type.
//!
//! Generalized from the teacher's `Notifier`/`NotifyError` shape
//! (`crates/notify/src/traits.rs`) — a narrow send seam with one
//! implementation per delivery channel — onto "send plain text to a named
//! chat-platform channel" instead of "deliver a structured alert".

#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("not connected")]
    NotConnected,

    #[error("channel '{0}' did not resolve to a sendable chat")]
    UnresolvedChannel(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("rate limited: retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },
}

/// A destination a rendered digest can be sent to: the target channel, an
/// optional preview channel, or the operator's personal account.
#[async_trait::async_trait]
pub trait PublishTarget: Send + Sync {
    /// Send `text` to the channel/account identified by `handle`.
    async fn send(&self, handle: &str, text: &str) -> Result<(), PublishError>;
}
