//! Ad-hoc status reporting (SPEC_FULL §4.H, surrounding collaborator).
//!
//! Grounded on `services/status_reporter.py`'s `send_status`: today's stats
//! are composed into one short message and sent over the same Telegram
//! session used for publication, since the closed config enumeration has no
//! separate "status chat" section — the notify account (or, failing that,
//! the main publication channel) stands in for it.

use tracing::info;

use pulse_core::timeutil::parse_tz;
use pulse_publish::{GrammersPublisher, PublishTarget};

use crate::app::{AppContext, AppError};

pub async fn send_status(ctx: &AppContext) -> Result<(), AppError> {
    let tz = parse_tz(&ctx.config.processor.timezone);
    let stats = ctx.storage.get_today_stats(tz).await?;
    let channels = ctx.storage.get_active_channels().await?;

    let message = format!(
        "\u{1F4CA} Status ({})\n\nIngested today: {}\nProcessed today: {}\nPublished today: {}\nDuplicates today: {}\nActive channels: {}",
        ctx.profile,
        stats.ingested,
        stats.processed,
        stats.published,
        stats.duplicates,
        channels.len()
    );

    let handle = ctx
        .config
        .publication
        .notify_account
        .clone()
        .unwrap_or_else(|| ctx.config.publication.channel.clone());

    let client = ctx.connect_telegram_client().await?;
    let target = GrammersPublisher::new(client);
    target
        .send(&handle, &message)
        .await
        .map_err(|e| AppError::Telegram(e.to_string()))?;

    info!(handle = %handle, "status report sent");
    Ok(())
}
