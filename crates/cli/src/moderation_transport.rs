//! [`ModerationTransport`] backed by the same Telegram user session used for
//! publication: sends the moderation listing to the operator's own account
//! (or a configured notify account) and waits for a reply there.
//!
//! Grounded on `crates/listener/src/grammers.rs`'s event loop shape: waiting
//! for a reply is a bounded `next_update` poll rather than a dedicated
//! subscription, since this transport only needs the next incoming message
//! from one chat, not a standing listener.

use std::time::Duration;

use grammers_client::types::{Chat, Update};
use grammers_client::Client;

use pulse_moderation::interactive::{ModerationError, ModerationTransport};

pub struct TelegramModerationTransport {
    client: Client,
    handle: String,
}

impl TelegramModerationTransport {
    pub fn new(client: Client, handle: String) -> Self {
        Self { client, handle }
    }
}

#[async_trait::async_trait]
impl ModerationTransport for TelegramModerationTransport {
    async fn send(&self, text: &str) -> Result<(), ModerationError> {
        let chat = self
            .client
            .resolve_username(&self.handle)
            .await
            .map_err(|e| ModerationError::Other(e.to_string()))?
            .ok_or_else(|| ModerationError::Other(format!("'{}' did not resolve", self.handle)))?;
        self.client
            .send_message(chat.pack(), text)
            .await
            .map_err(|e| ModerationError::Other(e.to_string()))?;
        Ok(())
    }

    async fn wait_reply(&self, timeout: Duration) -> Result<Option<String>, ModerationError> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            if remaining.is_zero() {
                return Ok(None);
            }

            let update = match tokio::time::timeout(remaining, self.client.next_update()).await {
                Ok(Ok(update)) => update,
                Ok(Err(e)) => return Err(ModerationError::Other(e.to_string())),
                Err(_elapsed) => return Ok(None),
            };

            let Some(Update::NewMessage(message)) = update else { continue };
            if message.outgoing() {
                continue;
            }
            let matches_handle = match message.chat() {
                Chat::Channel(c) => c.username() == Some(self.handle.trim_start_matches('@')),
                Chat::Group(g) => g.username() == Some(self.handle.trim_start_matches('@')),
                Chat::User(u) => u.username() == Some(self.handle.trim_start_matches('@')),
            };
            if matches_handle {
                return Ok(Some(message.text().to_string()));
            }
        }
    }
}
