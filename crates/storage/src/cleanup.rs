use chrono::{Duration, Utc};
use sqlx::SqlitePool;

use crate::error::StorageError;

#[derive(Debug, Clone, Copy, Default)]
pub struct CleanupStats {
    pub raw_messages_deleted: u64,
    pub published_deleted: u64,
}

/// Delete rows older than the configured retention windows and reclaim the
/// freed pages. `VACUUM` requires no other connection hold a transaction
/// open, which holds for the single-writer processor's own connection but
/// not necessarily a concurrently-running listener — callers run cleanup
/// between processor runs, never while the listener is actively writing.
pub async fn cleanup(pool: &SqlitePool, raw_days: u32, published_days: u32) -> Result<CleanupStats, StorageError> {
    let raw_cutoff = Utc::now() - Duration::days(raw_days as i64);
    let published_cutoff = Utc::now() - Duration::days(published_days as i64);

    let raw_result = sqlx::query("DELETE FROM raw_messages WHERE occurred_at < ? AND processed = 1")
        .bind(raw_cutoff)
        .execute(pool)
        .await?;

    let published_result = sqlx::query("DELETE FROM published WHERE published_at < ?")
        .bind(published_cutoff)
        .execute(pool)
        .await?;

    sqlx::query("VACUUM").execute(pool).await?;

    Ok(CleanupStats {
        raw_messages_deleted: raw_result.rows_affected(),
        published_deleted: published_result.rows_affected(),
    })
}
