#[derive(Debug, thiserror::Error)]
pub enum ListenerError {
    #[error("platform connection failed: {0}")]
    Connect(String),

    #[error("not authorized; run the auth flow first")]
    NotAuthorized,

    #[error("flood wait: retry after {0}s")]
    FloodWait(u64),

    #[error(transparent)]
    Storage(#[from] pulse_storage::error::StorageError),

    #[error("transport error: {0}")]
    Transport(String),
}
