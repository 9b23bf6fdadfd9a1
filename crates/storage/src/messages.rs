use chrono::{DateTime, Duration, Utc};
use sqlx::error::DatabaseError as _;
use sqlx::{Row, SqlitePool};

use pulse_core::domain::{MessageId, ProcessedUpdate, RawMessage, RejectionReason};

use crate::error::StorageError;

/// Persist an inbound message. Returns `None` if `(channel_id, external_message_id)`
/// already exists — the listener treats this as "already seen" rather than an error.
pub async fn save_raw_message(
    pool: &SqlitePool,
    channel_id: i64,
    external_message_id: i64,
    text: &str,
    occurred_at: DateTime<Utc>,
    has_media: bool,
) -> Result<Option<MessageId>, StorageError> {
    let result = sqlx::query(
        "INSERT INTO raw_messages (channel_id, external_message_id, text, occurred_at, has_media) \
         VALUES (?, ?, ?, ?, ?)",
    )
    .bind(channel_id)
    .bind(external_message_id)
    .bind(text)
    .bind(occurred_at)
    .bind(has_media)
    .execute(pool)
    .await;

    match result {
        Ok(res) => Ok(Some(res.last_insert_rowid())),
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub async fn get_unprocessed_messages(pool: &SqlitePool, hours: u32) -> Result<Vec<RawMessage>, StorageError> {
    let cutoff = Utc::now() - Duration::hours(hours as i64);
    let rows = sqlx::query(
        "SELECT m.id, m.channel_id, c.handle, m.external_message_id, m.text, m.occurred_at, \
                m.has_media, m.processed, m.is_duplicate, m.llm_score, m.rejection_reason, m.ingested_at \
         FROM raw_messages m JOIN channels c ON c.id = m.channel_id \
         WHERE m.processed = 0 AND m.occurred_at > ? \
         ORDER BY m.occurred_at DESC",
    )
    .bind(cutoff)
    .fetch_all(pool)
    .await?;

    Ok(rows.iter().map(row_to_message).collect())
}

fn row_to_message(r: &sqlx::sqlite::SqliteRow) -> RawMessage {
    let rejection_reason: Option<String> = r.get(10);
    RawMessage {
        id: r.get(0),
        channel_id: r.get(1),
        channel_handle: r.get(2),
        external_message_id: r.get(3),
        text: r.get(4),
        occurred_at: r.get(5),
        has_media: r.get(6),
        processed: r.get(7),
        is_duplicate: r.get(8),
        llm_score: r.get::<Option<i64>, _>(9).map(|v| v as u8),
        rejection_reason: rejection_reason.and_then(|s| parse_rejection_reason(&s)),
        ingested_at: r.get(11),
    }
}

fn parse_rejection_reason(s: &str) -> Option<RejectionReason> {
    use RejectionReason::*;
    Some(match s {
        "rejected_by_exclude_keywords" => RejectedByExcludeKeywords,
        "rejected_by_keywords_mismatch" => RejectedByKeywordsMismatch,
        "is_duplicate" => IsDuplicate,
        "rejected_by_llm" => RejectedByLlm,
        "rejected_by_moderator" => RejectedByModerator,
        "missing_title" => MissingTitle,
        "missing_description" => MissingDescription,
        "missing_text" => MissingText,
        "duplicate_in_final" => DuplicateInFinal,
        "exceeded_top_n_limit" => ExceededTopNLimit,
        "published" => Published,
        _ => return None,
    })
}

/// Apply a batch of processing-stage outcomes as a single transaction: either
/// every row in the batch updates, or none does. Measurably faster than
/// sequential single-row updates for the batch sizes the daily processor runs
/// (dozens to low hundreds of rows) since WAL fsyncs once at commit instead
/// of once per row.
pub async fn mark_processed_batch(pool: &SqlitePool, updates: &[ProcessedUpdate]) -> Result<(), StorageError> {
    if updates.is_empty() {
        return Ok(());
    }

    let mut tx = pool.begin().await?;
    for u in updates {
        sqlx::query(
            "UPDATE raw_messages SET processed = 1, \
                is_duplicate = COALESCE(?, is_duplicate), \
                llm_score = COALESCE(?, llm_score), \
                rejection_reason = COALESCE(?, rejection_reason) \
             WHERE id = ?",
        )
        .bind(u.is_duplicate)
        .bind(u.llm_score.map(|v| v as i64))
        .bind(u.rejection_reason.map(|r| r.as_str()))
        .bind(u.message_id)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;
    Ok(())
}
