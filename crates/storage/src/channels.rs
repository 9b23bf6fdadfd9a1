use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};

use pulse_core::domain::{Channel, ChannelId};

use crate::error::StorageError;

/// Insert a channel by handle if it doesn't exist yet, returning its id either
/// way. Idempotent: re-registering an already-known handle is a no-op lookup,
/// not an error.
pub async fn add_channel(pool: &SqlitePool, handle: &str, title: &str) -> Result<ChannelId, StorageError> {
    sqlx::query("INSERT INTO channels (handle, title) VALUES (?, ?) ON CONFLICT(handle) DO NOTHING")
        .bind(handle)
        .bind(title)
        .execute(pool)
        .await?;

    let id: ChannelId = sqlx::query("SELECT id FROM channels WHERE handle = ?")
        .bind(handle)
        .fetch_one(pool)
        .await?
        .get(0);
    Ok(id)
}

pub async fn get_channel_id(pool: &SqlitePool, handle: &str) -> Result<Option<ChannelId>, StorageError> {
    let row = sqlx::query("SELECT id FROM channels WHERE handle = ?")
        .bind(handle)
        .fetch_optional(pool)
        .await?;
    Ok(row.map(|r| r.get(0)))
}

pub async fn get_active_channels(pool: &SqlitePool) -> Result<Vec<Channel>, StorageError> {
    let rows = sqlx::query("SELECT id, handle, title, active, created_at FROM channels WHERE active = 1")
        .fetch_all(pool)
        .await?;

    Ok(rows
        .iter()
        .map(|r| Channel {
            id: r.get(0),
            handle: r.get(1),
            title: r.get(2),
            active: r.get(3),
            created_at: r.get::<DateTime<Utc>, _>(4),
        })
        .collect())
}
