//! SQLite-backed persistence for channels, raw ingested messages, and the
//! published digest history.
//!
//! Grounded on the original connection pool and schema, reworked around
//! sqlx's async pool (WAL pragmas, busy-timeout, and a fixed pool size) in
//! place of a hand-rolled thread-safe queue of raw connections, and around a
//! self-describing embedding blob format (see [`blob`]) in place of
//! `pickle`.

pub mod blob;
pub mod channels;
pub mod cleanup;
pub mod error;
pub mod messages;
pub mod pool;
pub mod published;
pub mod schema;
pub mod stats;

use std::path::Path;

use chrono_tz::Tz;
use sqlx::SqlitePool;

use pulse_core::config::{DatabaseConfig, RetryConfig};
use pulse_core::domain::{
    Channel, ChannelId, MessageId, ProcessedUpdate, Published, PublishedId, RawMessage, Stats,
};

pub use cleanup::CleanupStats;
pub use error::StorageError;

/// Facade over the connection pool and every table-scoped query module.
/// Cheaply cloneable: `SqlitePool` is an `Arc` internally.
#[derive(Clone)]
pub struct Storage {
    pool: SqlitePool,
    retry: RetryConfig,
}

impl Storage {
    /// Open (creating if missing) the SQLite database at `db_path`, apply the
    /// pragmas in `cfg`, and ensure the schema exists.
    pub async fn connect(db_path: &Path, cfg: &DatabaseConfig) -> Result<Self, StorageError> {
        let pool = pool::connect(db_path, cfg).await?;
        schema::init(&pool).await?;
        Ok(Self {
            pool,
            retry: cfg.retry.clone(),
        })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    pub async fn add_channel(&self, handle: &str, title: &str) -> Result<ChannelId, StorageError> {
        let pool = &self.pool;
        pool::with_retry(&self.retry, || channels::add_channel(pool, handle, title)).await
    }

    pub async fn get_channel_id(&self, handle: &str) -> Result<Option<ChannelId>, StorageError> {
        channels::get_channel_id(&self.pool, handle).await
    }

    pub async fn get_active_channels(&self) -> Result<Vec<Channel>, StorageError> {
        channels::get_active_channels(&self.pool).await
    }

    pub async fn save_raw_message(
        &self,
        channel_id: ChannelId,
        external_message_id: i64,
        text: &str,
        occurred_at: chrono::DateTime<chrono::Utc>,
        has_media: bool,
    ) -> Result<Option<MessageId>, StorageError> {
        let pool = &self.pool;
        pool::with_retry(&self.retry, || {
            messages::save_raw_message(pool, channel_id, external_message_id, text, occurred_at, has_media)
        })
        .await
    }

    pub async fn get_unprocessed_messages(&self, hours: u32) -> Result<Vec<RawMessage>, StorageError> {
        messages::get_unprocessed_messages(&self.pool, hours).await
    }

    pub async fn mark_processed_batch(&self, updates: &[ProcessedUpdate]) -> Result<(), StorageError> {
        let pool = &self.pool;
        pool::with_retry(&self.retry, || messages::mark_processed_batch(pool, updates)).await
    }

    pub async fn save_published(
        &self,
        text: &str,
        embedding: &[f32],
        source_message_id: Option<MessageId>,
        source_channel_id: Option<ChannelId>,
    ) -> Result<PublishedId, StorageError> {
        let pool = &self.pool;
        pool::with_retry(&self.retry, || {
            published::save_published(pool, text, embedding, source_message_id, source_channel_id)
        })
        .await
    }

    pub async fn get_published_embeddings(&self, days: u32) -> Result<Vec<(PublishedId, Vec<f32>)>, StorageError> {
        published::get_published_embeddings(&self.pool, days).await
    }

    pub async fn get_recent_published_texts(&self, days: u32, limit: u32) -> Result<Vec<String>, StorageError> {
        published::get_recent_published_texts(&self.pool, days, limit).await
    }

    pub async fn get_published(&self, id: PublishedId) -> Result<Option<Published>, StorageError> {
        published::get_published(&self.pool, id).await
    }

    pub async fn get_stats(&self) -> Result<Stats, StorageError> {
        stats::get_stats(&self.pool).await
    }

    pub async fn get_today_stats(&self, tz: Tz) -> Result<Stats, StorageError> {
        stats::get_today_stats(&self.pool, tz).await
    }

    pub async fn cleanup(&self, raw_days: u32, published_days: u32) -> Result<CleanupStats, StorageError> {
        cleanup::cleanup(&self.pool, raw_days, published_days).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pulse_core::domain::RejectionReason;

    async fn test_storage() -> Storage {
        let dir = std::env::temp_dir().join(format!(
            "pulse-storage-test-{}-{}",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap()
                .as_nanos()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        let db_path = dir.join("test.db");
        Storage::connect(&db_path, &DatabaseConfig::default()).await.unwrap()
    }

    #[tokio::test]
    async fn add_channel_is_idempotent() {
        let storage = test_storage().await;
        let id1 = storage.add_channel("news_ch", "News Channel").await.unwrap();
        let id2 = storage.add_channel("news_ch", "News Channel (renamed upstream)").await.unwrap();
        assert_eq!(id1, id2);
    }

    #[tokio::test]
    async fn save_raw_message_rejects_duplicate() {
        let storage = test_storage().await;
        let channel_id = storage.add_channel("ch", "Ch").await.unwrap();
        let now = chrono::Utc::now();

        let first = storage
            .save_raw_message(channel_id, 42, "hello", now, false)
            .await
            .unwrap();
        assert!(first.is_some());

        let second = storage
            .save_raw_message(channel_id, 42, "hello again", now, false)
            .await
            .unwrap();
        assert!(second.is_none());
    }

    #[tokio::test]
    async fn unprocessed_messages_round_trip() {
        let storage = test_storage().await;
        let channel_id = storage.add_channel("ch", "Ch").await.unwrap();
        let now = chrono::Utc::now();
        let id = storage
            .save_raw_message(channel_id, 1, "some news text", now, false)
            .await
            .unwrap()
            .unwrap();

        let unprocessed = storage.get_unprocessed_messages(24).await.unwrap();
        assert_eq!(unprocessed.len(), 1);
        assert_eq!(unprocessed[0].id, id);
        assert_eq!(unprocessed[0].channel_handle, "ch");

        storage
            .mark_processed_batch(&[ProcessedUpdate {
                message_id: id,
                is_duplicate: Some(false),
                llm_score: Some(8),
                rejection_reason: Some(RejectionReason::Published),
            }])
            .await
            .unwrap();

        let unprocessed_after = storage.get_unprocessed_messages(24).await.unwrap();
        assert!(unprocessed_after.is_empty());
    }

    #[tokio::test]
    async fn published_embeddings_round_trip() {
        let storage = test_storage().await;
        let id = storage
            .save_published("breaking news", &[0.1, 0.2, 0.3], None, None)
            .await
            .unwrap();

        let embeddings = storage.get_published_embeddings(60).await.unwrap();
        assert_eq!(embeddings.len(), 1);
        assert_eq!(embeddings[0].0, id);
        assert_eq!(embeddings[0].1, vec![0.1, 0.2, 0.3]);
    }

    #[tokio::test]
    async fn stats_count_ingested_and_published() {
        let storage = test_storage().await;
        let channel_id = storage.add_channel("ch", "Ch").await.unwrap();
        storage
            .save_raw_message(channel_id, 1, "a", chrono::Utc::now(), false)
            .await
            .unwrap();
        storage.save_published("a", &[0.0], None, None).await.unwrap();

        let stats = storage.get_stats().await.unwrap();
        assert_eq!(stats.ingested, 1);
        assert_eq!(stats.published, 1);
    }

    #[tokio::test]
    async fn cleanup_vacuums_without_error() {
        let storage = test_storage().await;
        let result = storage.cleanup(14, 60).await.unwrap();
        assert_eq!(result.raw_messages_deleted, 0);
    }
}
