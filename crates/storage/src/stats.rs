use chrono::Utc;
use chrono_tz::Tz;
use sqlx::{Row, SqlitePool};

use pulse_core::domain::Stats;
use pulse_core::timeutil::{end_of_day, start_of_day};

use crate::error::StorageError;

pub async fn get_stats(pool: &SqlitePool) -> Result<Stats, StorageError> {
    query_stats(pool, None).await
}

/// Stats for "today" in the configured timezone. Computed by deriving UTC day
/// boundaries in Rust and binding them as parameters, rather than relying on
/// SQLite's `date('now')` — which is always UTC and would silently mis-bucket
/// anything running outside that zone.
pub async fn get_today_stats(pool: &SqlitePool, tz: Tz) -> Result<Stats, StorageError> {
    let now = Utc::now();
    let start = start_of_day(now, tz);
    let end = end_of_day(now, tz);
    query_stats(pool, Some((start, end))).await
}

async fn query_stats(
    pool: &SqlitePool,
    window: Option<(chrono::DateTime<Utc>, chrono::DateTime<Utc>)>,
) -> Result<Stats, StorageError> {
    let (ingested, processed, duplicates) = match window {
        Some((start, end)) => {
            let row = sqlx::query(
                "SELECT COUNT(*), \
                        COALESCE(SUM(processed), 0), \
                        COALESCE(SUM(is_duplicate), 0) \
                 FROM raw_messages WHERE occurred_at >= ? AND occurred_at < ?",
            )
            .bind(start)
            .bind(end)
            .fetch_one(pool)
            .await?;
            (row.get::<i64, _>(0), row.get::<i64, _>(1), row.get::<i64, _>(2))
        }
        None => {
            let row = sqlx::query(
                "SELECT COUNT(*), COALESCE(SUM(processed), 0), COALESCE(SUM(is_duplicate), 0) FROM raw_messages",
            )
            .fetch_one(pool)
            .await?;
            (row.get::<i64, _>(0), row.get::<i64, _>(1), row.get::<i64, _>(2))
        }
    };

    let published = match window {
        Some((start, end)) => {
            sqlx::query("SELECT COUNT(*) FROM published WHERE published_at >= ? AND published_at < ?")
                .bind(start)
                .bind(end)
                .fetch_one(pool)
                .await?
                .get::<i64, _>(0)
        }
        None => {
            sqlx::query("SELECT COUNT(*) FROM published")
                .fetch_one(pool)
                .await?
                .get::<i64, _>(0)
        }
    };

    Ok(Stats {
        ingested: ingested as u64,
        processed: processed as u64,
        published: published as u64,
        duplicates: duplicates as u64,
    })
}
