//! Per-event handling pipeline (SPEC_FULL §4.C).
//!
//! Grounded on `services/telegram_listener.py`'s `handle_new_message`
//! (length check → keyword filter → age check → channel resolve → persist),
//! with the payload-size DoS check added ahead of the rest of the pipeline
//! and sanitization inserted before persistence.

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, warn};

use pulse_core::config::{FiltersConfig, ListenerConfig};
use pulse_core::domain::ChannelId;
use pulse_core::sanitize::sanitize_default;
use pulse_storage::Storage;

use crate::error::ListenerError;
use crate::types::PlatformEvent;

/// Hard byte-size ceiling for an inbound event payload; anything larger is
/// rejected before any parsing or DB work (DoS protection).
pub const MAX_MESSAGE_SIZE: usize = 100_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventOutcome {
    Persisted,
    DuplicateExternalId,
    Rejected(&'static str),
}

/// Run one event through the filter chain, persisting it if it survives.
/// `now` is injected so tests can control the age check deterministically.
pub async fn handle_event(
    storage: &Storage,
    listener_cfg: &ListenerConfig,
    filters_cfg: &FiltersConfig,
    event: PlatformEvent,
    now: DateTime<Utc>,
) -> Result<EventOutcome, ListenerError> {
    let Some(text) = event.text.as_deref() else {
        return Ok(EventOutcome::Rejected("missing_text"));
    };
    let trimmed = text.trim();
    if trimmed.chars().count() < listener_cfg.min_message_length as usize {
        return Ok(EventOutcome::Rejected("too_short"));
    }

    if event.raw_byte_size > MAX_MESSAGE_SIZE {
        warn!(
            channel = %event.channel_handle,
            size = event.raw_byte_size,
            limit = MAX_MESSAGE_SIZE,
            "rejecting oversized payload"
        );
        return Ok(EventOutcome::Rejected("oversized_payload"));
    }

    let lower = trimmed.to_lowercase();
    if filters_cfg
        .exclude_keywords
        .iter()
        .any(|kw| lower.contains(&kw.to_lowercase()))
    {
        debug!(channel = %event.channel_handle, "message filtered by exclude keyword");
        return Ok(EventOutcome::Rejected("excluded_keyword"));
    }

    if !channel_allowed(&event.channel_handle, listener_cfg) {
        return Ok(EventOutcome::Rejected("channel_not_allowed"));
    }

    let sanitized = sanitize_default(trimmed);

    if event.occurred_at < now - Duration::hours(24) {
        return Ok(EventOutcome::Rejected("stale_event"));
    }

    let channel_id = resolve_channel(storage, &event.channel_handle, &event.channel_title).await?;

    let saved = storage
        .save_raw_message(
            channel_id,
            event.external_message_id,
            &sanitized,
            event.occurred_at,
            event.has_media,
        )
        .await?;

    match saved {
        Some(_id) => {
            info!(channel = %event.channel_handle, "message persisted");
            Ok(EventOutcome::Persisted)
        }
        None => {
            info!(channel = %event.channel_handle, external_id = event.external_message_id, "duplicate external id");
            Ok(EventOutcome::DuplicateExternalId)
        }
    }
}

fn channel_allowed(handle: &str, cfg: &ListenerConfig) -> bool {
    let lower = handle.to_lowercase();
    if !cfg.channel_blacklist.is_empty()
        && cfg.channel_blacklist.iter().any(|b| b.to_lowercase() == lower)
    {
        return false;
    }
    if !cfg.channel_whitelist.is_empty() {
        return cfg.channel_whitelist.iter().any(|w| w.to_lowercase() == lower);
    }
    true
}

async fn resolve_channel(storage: &Storage, handle: &str, title: &str) -> Result<ChannelId, ListenerError> {
    if let Some(id) = storage.get_channel_id(handle).await? {
        return Ok(id);
    }
    Ok(storage.add_channel(handle, title).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pulse_core::config::FiltersConfig;

    fn event(text: &str, size: usize, occurred_at: DateTime<Utc>) -> PlatformEvent {
        PlatformEvent {
            channel_handle: "news_chan".to_string(),
            channel_title: "News Channel".to_string(),
            external_message_id: 1,
            text: Some(text.to_string()),
            occurred_at,
            has_media: false,
            raw_byte_size: size,
        }
    }

    async fn test_storage() -> Storage {
        let dir = std::env::temp_dir().join(format!(
            "pulse-listener-test-{}-{}",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap()
                .as_nanos()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        let db_path = dir.join("test.db");
        Storage::connect(&db_path, &pulse_core::config::DatabaseConfig::default())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn rejects_short_messages() {
        let storage = test_storage().await;
        let outcome = handle_event(
            &storage,
            &ListenerConfig::default(),
            &FiltersConfig::default(),
            event("short", 5, Utc::now()),
            Utc::now(),
        )
        .await
        .unwrap();
        assert_eq!(outcome, EventOutcome::Rejected("too_short"));
    }

    #[tokio::test]
    async fn rejects_oversized_payload() {
        let storage = test_storage().await;
        let long_text = "x".repeat(200);
        let outcome = handle_event(
            &storage,
            &ListenerConfig::default(),
            &FiltersConfig::default(),
            event(&long_text, MAX_MESSAGE_SIZE + 1, Utc::now()),
            Utc::now(),
        )
        .await
        .unwrap();
        assert_eq!(outcome, EventOutcome::Rejected("oversized_payload"));
    }

    #[tokio::test]
    async fn rejects_stale_events() {
        let storage = test_storage().await;
        let long_text = "a".repeat(80);
        let old_time = Utc::now() - Duration::hours(48);
        let outcome = handle_event(
            &storage,
            &ListenerConfig::default(),
            &FiltersConfig::default(),
            event(&long_text, 80, old_time),
            Utc::now(),
        )
        .await
        .unwrap();
        assert_eq!(outcome, EventOutcome::Rejected("stale_event"));
    }

    #[tokio::test]
    async fn persists_valid_messages_and_flags_duplicates() {
        let storage = test_storage().await;
        let long_text = "a".repeat(80);
        let now = Utc::now();
        let e = event(&long_text, 80, now);

        let first = handle_event(&storage, &ListenerConfig::default(), &FiltersConfig::default(), e.clone(), now)
            .await
            .unwrap();
        assert_eq!(first, EventOutcome::Persisted);

        let second = handle_event(&storage, &ListenerConfig::default(), &FiltersConfig::default(), e, now)
            .await
            .unwrap();
        assert_eq!(second, EventOutcome::DuplicateExternalId);
    }
}
