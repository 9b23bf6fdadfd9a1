use thiserror::Error;

/// Crate-spanning error, aggregated at the orchestrator/CLI boundary.
///
/// Individual crates (`pulse-storage`, `pulse-llm`, `pulse-listener`, ...) define
/// their own narrower error enums; each converts into this one via `#[from]`
/// so the scheduler can log and continue without matching on every leaf type.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("configuration error: {0}")]
    InvalidConfig(String),

    #[error("not authorized: run the `auth` command")]
    NotAuthorized,

    #[error("flood wait: retry after {0}s")]
    FloodWait(u64),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("embedding error: {0}")]
    Embedding(String),

    #[error("llm error: {0}")]
    Llm(String),

    #[error("listener error: {0}")]
    Listener(String),

    #[error("publication error: {0}")]
    Publication(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}
