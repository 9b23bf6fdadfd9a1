//! Publication dispatch (SPEC_FULL §4.G steps 4-6).
//!
//! Grounded on `crates/notify/src/dispatcher.rs`'s partial-failure-tolerant
//! dispatch shape: the optional preview send and the optional personal
//! notify are best-effort (logged, never block the main publish), while the
//! send to the target channel itself either succeeds or propagates — there
//! is no partial-publish rollback (§4.G's failure-handling note).

use pulse_core::config::PublicationConfig;
use tracing::{info, warn};

use crate::traits::{PublishError, PublishTarget};

/// Send the composed digest to the configured preview channel (if any), the
/// target channel, and the personal notify account (if any).
pub async fn publish_digest(
    target: &dyn PublishTarget,
    cfg: &PublicationConfig,
    digest: &str,
) -> Result<(), PublishError> {
    if let Some(preview) = &cfg.preview_channel {
        match target.send(preview, digest).await {
            Ok(()) => info!(channel = %preview, "preview digest sent"),
            Err(err) => warn!(channel = %preview, error = %err, "preview send failed, continuing to main publish"),
        }
    }

    target.send(&cfg.channel, digest).await?;
    info!(channel = %cfg.channel, "digest published");

    if let Some(account) = &cfg.notify_account {
        let message = "\u{2705} Дайджест успешно опубликован";
        if let Err(err) = target.send(account, message).await {
            warn!(account = %account, error = %err, "personal notify failed");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct RecordingTarget {
        sent: Mutex<Vec<(String, String)>>,
        fail_handles: Vec<String>,
        calls: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl PublishTarget for RecordingTarget {
        async fn send(&self, handle: &str, text: &str) -> Result<(), PublishError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_handles.contains(&handle.to_string()) {
                return Err(PublishError::Transport("boom".into()));
            }
            self.sent.lock().unwrap().push((handle.to_string(), text.to_string()));
            Ok(())
        }
    }

    fn cfg() -> PublicationConfig {
        PublicationConfig {
            channel: "@main".to_string(),
            preview_channel: Some("@preview".to_string()),
            header_template: String::new(),
            footer_template: String::new(),
            notify_account: Some("@me".to_string()),
        }
    }

    #[tokio::test]
    async fn sends_preview_main_and_notify() {
        let target = RecordingTarget { sent: Mutex::new(Vec::new()), fail_handles: vec![], calls: AtomicUsize::new(0) };
        publish_digest(&target, &cfg(), "digest text").await.unwrap();
        let sent = target.sent.lock().unwrap();
        assert_eq!(sent.len(), 3);
        assert_eq!(sent[0].0, "@preview");
        assert_eq!(sent[1].0, "@main");
        assert_eq!(sent[2].0, "@me");
    }

    #[tokio::test]
    async fn preview_failure_does_not_block_main_publish() {
        let target = RecordingTarget {
            sent: Mutex::new(Vec::new()),
            fail_handles: vec!["@preview".to_string()],
            calls: AtomicUsize::new(0),
        };
        publish_digest(&target, &cfg(), "digest text").await.unwrap();
        let sent = target.sent.lock().unwrap();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].0, "@main");
    }

    #[tokio::test]
    async fn main_publish_failure_propagates() {
        let target = RecordingTarget {
            sent: Mutex::new(Vec::new()),
            fail_handles: vec!["@main".to_string()],
            calls: AtomicUsize::new(0),
        };
        let result = publish_digest(&target, &cfg(), "digest text").await;
        assert!(result.is_err());
    }
}
