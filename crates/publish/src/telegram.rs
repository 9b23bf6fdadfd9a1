//! [`PublishTarget`] backed by a Telegram user session (`grammers-client`).
//!
//! Publication reuses the same kind of user-session client the listener
//! connects with (grounded on `crates/listener/src/grammers.rs`'s
//! `GrammersClient`), rather than a bot-API notifier: the specification's
//! account observes AND publishes as the same non-bot user (§1). Channel
//! handles are resolved to a sendable chat per call rather than cached,
//! since the publication stage runs once a day and resolution is cheap
//! relative to the LLM calls surrounding it.

use grammers_client::types::Chat;
use grammers_client::Client;

use crate::traits::{PublishError, PublishTarget};

pub struct GrammersPublisher {
    client: Client,
}

impl GrammersPublisher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl PublishTarget for GrammersPublisher {
    async fn send(&self, handle: &str, text: &str) -> Result<(), PublishError> {
        let chat = self
            .client
            .resolve_username(handle)
            .await
            .map_err(|e| PublishError::Transport(e.to_string()))?
            .ok_or_else(|| PublishError::UnresolvedChannel(handle.to_string()))?;

        if !matches!(chat, Chat::Channel(_) | Chat::Group(_) | Chat::User(_)) {
            return Err(PublishError::UnresolvedChannel(handle.to_string()));
        }

        self.client
            .send_message(chat.pack(), text)
            .await
            .map_err(|e| PublishError::Transport(e.to_string()))?;
        Ok(())
    }
}
