//! Concrete [`PlatformClient`] backed by a Telegram user session via
//! `grammers-client`. Grounded on `services/telegram_listener.py`'s
//! `start`/`load_channels`/`handle_new_message`, translated from Telethon's
//! dialog/event model to grammers' `Client`/`Update` model.

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::Utc;
use grammers_client::types::{Chat, Update};
use grammers_client::{Client, Config, InitParams};
use grammers_session::Session;
use tracing::{info, warn};

use pulse_core::config::ListenerMode;

use crate::client::PlatformClient;
use crate::error::ListenerError;
use crate::types::{PlatformEvent, ResolvedChannel};

pub struct GrammersClient {
    api_id: i32,
    api_hash: String,
    session_path: PathBuf,
    client: Option<Client>,
}

impl GrammersClient {
    pub fn new(api_id: i32, api_hash: String, session_path: PathBuf) -> Self {
        Self { api_id, api_hash, session_path, client: None }
    }

    fn client(&self) -> Result<&Client, ListenerError> {
        self.client.as_ref().ok_or_else(|| ListenerError::Connect("client not connected".into()))
    }
}

#[async_trait]
impl PlatformClient for GrammersClient {
    async fn connect(&mut self) -> Result<(), ListenerError> {
        let session = Session::load_file_or_create(&self.session_path)
            .map_err(|e| ListenerError::Connect(e.to_string()))?;

        let client = Client::connect(Config {
            session,
            api_id: self.api_id,
            api_hash: self.api_hash.clone(),
            params: InitParams::default(),
        })
        .await
        .map_err(|e| ListenerError::Connect(e.to_string()))?;

        if !client.is_authorized().await.map_err(|e| ListenerError::Transport(e.to_string()))? {
            return Err(ListenerError::NotAuthorized);
        }

        self.client = Some(client);
        Ok(())
    }

    async fn resolve_channels(
        &mut self,
        mode: ListenerMode,
        manual_handles: &[String],
    ) -> Result<Vec<ResolvedChannel>, ListenerError> {
        let client = self.client()?;

        match mode {
            ListenerMode::Manual => {
                let mut resolved = Vec::new();
                for handle in manual_handles {
                    match client.resolve_username(handle).await {
                        Ok(Some(Chat::Channel(channel))) => {
                            resolved.push(ResolvedChannel {
                                handle: channel.username().unwrap_or(handle).to_string(),
                                title: channel.title().to_string(),
                            });
                        }
                        Ok(_) => warn!(handle, "manual channel handle did not resolve to a broadcast channel"),
                        Err(err) => warn!(handle, error = %err, "failed to resolve manual channel handle"),
                    }
                }
                Ok(resolved)
            }
            ListenerMode::Subscriptions => {
                let mut dialogs = client.iter_dialogs();
                let mut resolved = Vec::new();
                while let Some(dialog) = dialogs.next().await.map_err(|e| ListenerError::Transport(e.to_string()))? {
                    if let Chat::Channel(channel) = dialog.chat() {
                        let handle = channel.username().map(str::to_string).unwrap_or_else(|| channel.id().to_string());
                        resolved.push(ResolvedChannel { handle, title: channel.title().to_string() });
                    }
                }
                Ok(resolved)
            }
        }
    }

    async fn next_event(&mut self) -> Result<Option<PlatformEvent>, ListenerError> {
        let client = self.client()?;
        loop {
            let update = client.next_update().await.map_err(|e| ListenerError::Transport(e.to_string()))?;
            let Some(update) = update else { return Ok(None) };

            if let Update::NewMessage(message) = update {
                if message.outgoing() {
                    continue;
                }
                let Chat::Channel(channel) = message.chat() else { continue };

                let text = message.text();
                let raw_byte_size = text.len();
                let event = PlatformEvent {
                    channel_handle: channel.username().map(str::to_string).unwrap_or_else(|| channel.id().to_string()),
                    channel_title: channel.title().to_string(),
                    external_message_id: message.id() as i64,
                    text: if text.is_empty() { None } else { Some(text.to_string()) },
                    occurred_at: message.date().with_timezone(&Utc),
                    has_media: message.media().is_some(),
                    raw_byte_size,
                };
                info!(channel = %event.channel_handle, "received new message event");
                return Ok(Some(event));
            }
        }
    }
}
