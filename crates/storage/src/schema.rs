//! Table creation. Ported from the original schema, renamed to match
//! `pulse_core::domain`'s field names (`handle`/`active`/`occurred_at`/
//! `llm_score` in place of `username`/`is_active`/`date`/`gemini_score`).

use sqlx::SqlitePool;

use crate::error::StorageError;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS channels (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    handle TEXT UNIQUE NOT NULL,
    title TEXT NOT NULL DEFAULT '',
    active INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
);

CREATE TABLE IF NOT EXISTS raw_messages (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    channel_id INTEGER NOT NULL REFERENCES channels(id),
    external_message_id INTEGER NOT NULL,
    text TEXT NOT NULL,
    occurred_at TEXT NOT NULL,
    has_media INTEGER NOT NULL DEFAULT 0,
    processed INTEGER NOT NULL DEFAULT 0,
    is_duplicate INTEGER NOT NULL DEFAULT 0,
    llm_score INTEGER,
    rejection_reason TEXT,
    ingested_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
    UNIQUE(channel_id, external_message_id)
);

CREATE INDEX IF NOT EXISTS idx_raw_messages_processed ON raw_messages(processed, occurred_at);

CREATE TABLE IF NOT EXISTS published (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    text TEXT NOT NULL,
    embedding BLOB,
    source_message_id INTEGER REFERENCES raw_messages(id),
    source_channel_id INTEGER REFERENCES channels(id),
    published_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
);

CREATE INDEX IF NOT EXISTS idx_published_date ON published(published_at);
"#;

pub async fn init(pool: &SqlitePool) -> Result<(), StorageError> {
    sqlx::raw_sql(SCHEMA).execute(pool).await?;
    Ok(())
}
