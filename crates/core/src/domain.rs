use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Surrogate key for a [`Channel`] row.
pub type ChannelId = i64;

/// Surrogate key for a [`RawMessage`] row.
pub type MessageId = i64;

/// Surrogate key for a [`Published`] row.
pub type PublishedId = i64;

/// A subscribed broadcast channel.
///
/// `handle` is unique and case-insensitive, and is treated as immutable once a
/// channel row has been created: the listener resolves by handle but never
/// renames an existing row on conflict.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Channel {
    pub id: ChannelId,
    pub handle: String,
    pub title: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

/// A tag explaining why a [`RawMessage`] did not end up published.
///
/// Closed set per the error taxonomy; the "published" variant is a sentinel
/// written when a message *did* end up published, so every processed row can
/// be explained by exactly one tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionReason {
    RejectedByExcludeKeywords,
    RejectedByKeywordsMismatch,
    IsDuplicate,
    RejectedByLlm,
    RejectedByModerator,
    MissingTitle,
    MissingDescription,
    MissingText,
    DuplicateInFinal,
    ExceededTopNLimit,
    Published,
}

impl RejectionReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RejectedByExcludeKeywords => "rejected_by_exclude_keywords",
            Self::RejectedByKeywordsMismatch => "rejected_by_keywords_mismatch",
            Self::IsDuplicate => "is_duplicate",
            Self::RejectedByLlm => "rejected_by_llm",
            Self::RejectedByModerator => "rejected_by_moderator",
            Self::MissingTitle => "missing_title",
            Self::MissingDescription => "missing_description",
            Self::MissingText => "missing_text",
            Self::DuplicateInFinal => "duplicate_in_final",
            Self::ExceededTopNLimit => "exceeded_top_n_limit",
            Self::Published => "published",
        }
    }
}

impl std::fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single ingested message, as persisted by the listener.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawMessage {
    pub id: MessageId,
    pub channel_id: ChannelId,
    /// Channel handle, joined in for convenience (not stored redundantly by
    /// the caller — the storage layer attaches it on read).
    pub channel_handle: String,
    pub external_message_id: i64,
    pub text: String,
    pub occurred_at: DateTime<Utc>,
    pub has_media: bool,
    pub processed: bool,
    pub is_duplicate: bool,
    pub llm_score: Option<u8>,
    pub rejection_reason: Option<RejectionReason>,
    pub ingested_at: DateTime<Utc>,
}

/// A single update applied during `mark_processed_batch`.
#[derive(Debug, Clone)]
pub struct ProcessedUpdate {
    pub message_id: MessageId,
    pub is_duplicate: Option<bool>,
    pub llm_score: Option<u8>,
    pub rejection_reason: Option<RejectionReason>,
}

/// A row in the published-digest table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Published {
    pub id: PublishedId,
    pub text: String,
    pub embedding: Vec<f32>,
    pub source_message_id: Option<MessageId>,
    pub source_channel_id: Option<ChannelId>,
    pub published_at: DateTime<Utc>,
}

/// Per-day counts used by `get_stats`/`get_today_stats`.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Stats {
    pub ingested: u64,
    pub processed: u64,
    pub published: u64,
    pub duplicates: u64,
}

/// A request id used to correlate LLM-call logging across retries and chunks.
pub fn new_request_id() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_string()
}
