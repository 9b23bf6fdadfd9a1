//! Long-running listener loop tying client + pipeline + heartbeat together
//! (SPEC_FULL §4.C). Strictly single-task: the listener is the only writer
//! of `RawMessage`, so no locking is needed around persistence.

use chrono::Utc;
use tracing::{error, info, warn};

use pulse_core::config::{FiltersConfig, ListenerConfig, ListenerMode};
use pulse_storage::Storage;

use crate::client::PlatformClient;
use crate::error::ListenerError;
use crate::heartbeat;
use crate::pipeline::{self, EventOutcome};

pub struct Listener<C: PlatformClient> {
    client: C,
    storage: Storage,
    listener_cfg: ListenerConfig,
    filters_cfg: FiltersConfig,
    last_heartbeat: std::time::Instant,
}

impl<C: PlatformClient> Listener<C> {
    pub fn new(client: C, storage: Storage, listener_cfg: ListenerConfig, filters_cfg: FiltersConfig) -> Self {
        Self {
            client,
            storage,
            listener_cfg,
            filters_cfg,
            last_heartbeat: std::time::Instant::now() - std::time::Duration::from_secs(3600),
        }
    }

    /// Connect, resolve channels for the configured mode (falling back to
    /// `subscriptions` with a warning for an unrecognized mode — there is no
    /// such variant in the closed `ListenerMode` enum today, but the
    /// fallback stays explicit so a future mode addition degrades safely),
    /// then run the event loop until the client reports a clean disconnect.
    pub async fn run(&mut self) -> Result<(), ListenerError> {
        self.client.connect().await?;

        let channels = self
            .client
            .resolve_channels(self.listener_cfg.mode, &self.listener_cfg.manual_channels)
            .await?;
        info!(count = channels.len(), mode = ?self.listener_cfg.mode, "resolved channels to observe");

        for channel in &channels {
            if let Err(err) = self.storage.add_channel(&channel.handle, &channel.title).await {
                warn!(handle = %channel.handle, error = %err, "failed to register channel");
            }
        }

        loop {
            self.maybe_heartbeat();

            match self.client.next_event().await {
                Ok(Some(event)) => {
                    let now = Utc::now();
                    match pipeline::handle_event(&self.storage, &self.listener_cfg, &self.filters_cfg, event, now).await {
                        Ok(EventOutcome::Persisted) => {}
                        Ok(EventOutcome::DuplicateExternalId) => {}
                        Ok(EventOutcome::Rejected(_reason)) => {}
                        Err(err) => error!(error = %err, "failed to handle event"),
                    }
                }
                Ok(None) => {
                    info!("client disconnected cleanly, stopping listener");
                    return Ok(());
                }
                Err(ListenerError::FloodWait(seconds)) => {
                    warn!(seconds, "flood wait, sleeping");
                    tokio::time::sleep(std::time::Duration::from_secs(seconds)).await;
                }
                Err(err) => return Err(err),
            }
        }
    }

    fn maybe_heartbeat(&mut self) {
        let interval = std::time::Duration::from_secs(self.listener_cfg.healthcheck.interval_seconds);
        if self.last_heartbeat.elapsed() >= interval {
            heartbeat::touch(&self.listener_cfg.healthcheck.heartbeat_path);
            self.last_heartbeat = std::time::Instant::now();
        }
    }
}

/// Normalize a possibly-unknown configured mode string to a known
/// [`ListenerMode`], defaulting to `Subscriptions` with a warning. Exists
/// because a future looser config format (e.g. raw strings from an older
/// config version) could carry a value outside the closed enum.
pub fn normalize_mode(raw: &str) -> ListenerMode {
    match raw.to_lowercase().as_str() {
        "manual" => ListenerMode::Manual,
        "subscriptions" => ListenerMode::Subscriptions,
        other => {
            warn!(mode = other, "unknown listener mode, falling back to subscriptions");
            ListenerMode::Subscriptions
        }
    }
}
