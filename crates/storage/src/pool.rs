//! Connection pool setup and busy-retry wrapper.
//!
//! Mirrors the original connection pool's pragmas (WAL journal, NORMAL sync,
//! a 64MB page cache, MEMORY temp store) but hands pooling and the busy
//! timeout to sqlx rather than hand-rolling a queue of raw connections.

use std::path::Path;
use std::time::Duration;

use pulse_core::config::DatabaseConfig;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;

use crate::error::StorageError;

/// Pool size is fixed rather than config-driven: a single writer process
/// never benefits from more than a handful of connections against one
/// WAL-mode SQLite file, and the original's configurable max (1-10) was
/// only ever run at its default of 5.
const POOL_SIZE: u32 = 5;

pub async fn connect(db_path: &Path, cfg: &DatabaseConfig) -> Result<SqlitePool, StorageError> {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .busy_timeout(Duration::from_millis(cfg.busy_timeout_ms as u64))
        .pragma("cache_size", "-64000")
        .pragma("temp_store", "MEMORY");

    let pool = SqlitePoolOptions::new()
        .max_connections(POOL_SIZE)
        .acquire_timeout(Duration::from_secs(cfg.timeout_seconds as u64))
        .connect_with(options)
        .await?;

    Ok(pool)
}

/// Run `op` with exponential-backoff retry on `SQLITE_BUSY`/`SQLITE_LOCKED`,
/// per the retry policy in [`pulse_core::config::RetryConfig`]. Every other
/// error is returned immediately without retrying.
pub async fn with_retry<T, F, Fut>(cfg: &pulse_core::config::RetryConfig, mut op: F) -> Result<T, StorageError>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, StorageError>>,
{
    let mut attempt = 0u32;
    loop {
        match op().await {
            Ok(v) => return Ok(v),
            Err(e) if e.is_retryable() && attempt + 1 < cfg.max_attempts => {
                let delay = cfg.base_delay_seconds * cfg.backoff_multiplier.powi(attempt as i32);
                tracing::warn!(attempt, delay_seconds = delay, "database busy, retrying");
                tokio::time::sleep(Duration::from_secs_f64(delay)).await;
                attempt += 1;
            }
            Err(e) if e.is_retryable() => {
                return Err(StorageError::BusyRetriesExhausted {
                    attempts: cfg.max_attempts,
                })
            }
            Err(e) => return Err(e),
        }
    }
}
