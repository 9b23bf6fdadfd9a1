//! Storage error taxonomy.
//!
//! Narrow enough to distinguish transient contention (retried by [`crate::pool`])
//! from hard failures (surfaced to the caller), and to name the embedding-blob
//! safety rejection distinctly from ordinary decode failure.

use sqlx::error::DatabaseError as _;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("database busy after {attempts} attempts")]
    BusyRetriesExhausted { attempts: u32 },

    #[error("embedding blob rejected: {0}")]
    UnsafeEmbeddingBlob(String),

    #[error("embedding blob decode failed: {0}")]
    EmbeddingDecode(String),
}

impl StorageError {
    /// True if this is a transient SQLite contention error worth retrying.
    pub(crate) fn is_retryable(&self) -> bool {
        matches!(self, StorageError::Database(sqlx::Error::Database(e))
            if matches!(e.code().as_deref(), Some("5") | Some("6")))
    }
}

impl From<StorageError> for pulse_core::error::PipelineError {
    fn from(e: StorageError) -> Self {
        pulse_core::error::PipelineError::Storage(e.to_string())
    }
}
