use chrono::{DateTime, Duration, Utc};
use sqlx::{Row, SqlitePool};

use pulse_core::domain::{ChannelId, MessageId, Published, PublishedId};

use crate::blob::{decode_embedding, encode_embedding, is_legacy_blob, migrate_blob};
use crate::error::StorageError;

pub async fn save_published(
    pool: &SqlitePool,
    text: &str,
    embedding: &[f32],
    source_message_id: Option<MessageId>,
    source_channel_id: Option<ChannelId>,
) -> Result<PublishedId, StorageError> {
    let blob = encode_embedding(embedding);
    let result = sqlx::query(
        "INSERT INTO published (text, embedding, source_message_id, source_channel_id) \
         VALUES (?, ?, ?, ?)",
    )
    .bind(text)
    .bind(blob)
    .bind(source_message_id)
    .bind(source_channel_id)
    .execute(pool)
    .await?;
    Ok(result.last_insert_rowid())
}

/// Embeddings published within the last `days`, used to seed the dedup
/// engine's rolling similarity matrix at the start of a processor run.
/// Legacy (pre-migration) blobs are migrated to the safe format in place as
/// they're read, so the one-shot migration makes forward progress on every
/// run rather than requiring an explicit maintenance pass.
pub async fn get_published_embeddings(
    pool: &SqlitePool,
    days: u32,
) -> Result<Vec<(PublishedId, Vec<f32>)>, StorageError> {
    let cutoff = Utc::now() - Duration::days(days as i64);
    let rows = sqlx::query("SELECT id, embedding FROM published WHERE published_at >= ? AND embedding IS NOT NULL")
        .bind(cutoff)
        .fetch_all(pool)
        .await?;

    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        let id: PublishedId = row.get(0);
        let blob: Vec<u8> = row.get(1);
        if is_legacy_blob(&blob) {
            match migrate_blob(&blob) {
                Ok(safe) => {
                    sqlx::query("UPDATE published SET embedding = ? WHERE id = ?")
                        .bind(safe)
                        .bind(id)
                        .execute(pool)
                        .await?;
                    tracing::info!(published_id = id, "migrated legacy embedding blob");
                }
                Err(e) => {
                    tracing::warn!(published_id = id, error = %e, "skipping unreadable legacy embedding blob");
                    continue;
                }
            }
        }
        match decode_embedding(&blob) {
            Ok(vector) => out.push((id, vector)),
            Err(e) => tracing::warn!(published_id = id, error = %e, "skipping unreadable embedding blob"),
        }
    }
    Ok(out)
}

/// Texts of the most recently published items, newest first, used to give
/// the LLM selection stage tematical memory of what has already run so it
/// can steer away from near-repeat topics across runs (SPEC_FULL §1, §4.E).
pub async fn get_recent_published_texts(
    pool: &SqlitePool,
    days: u32,
    limit: u32,
) -> Result<Vec<String>, StorageError> {
    let cutoff = Utc::now() - Duration::days(days as i64);
    let rows = sqlx::query(
        "SELECT text FROM published WHERE published_at >= ? ORDER BY published_at DESC LIMIT ?",
    )
    .bind(cutoff)
    .bind(limit)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(|row| row.get(0)).collect())
}

pub async fn get_published(pool: &SqlitePool, id: PublishedId) -> Result<Option<Published>, StorageError> {
    let row = sqlx::query(
        "SELECT id, text, embedding, source_message_id, source_channel_id, published_at \
         FROM published WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    let Some(row) = row else { return Ok(None) };
    let blob: Vec<u8> = row.get(2);
    let embedding = decode_embedding(&blob).unwrap_or_default();
    Ok(Some(Published {
        id: row.get(0),
        text: row.get(1),
        embedding,
        source_message_id: row.get(3),
        source_channel_id: row.get(4),
        published_at: row.get::<DateTime<Utc>, _>(5),
    }))
}
