use chrono::{DateTime, Utc};

/// A single inbound event from the platform, already shaped into the fields
/// the per-event pipeline needs. Concrete `PlatformClient` implementations
/// translate their wire event into this before handing it to the pipeline.
#[derive(Debug, Clone)]
pub struct PlatformEvent {
    pub channel_handle: String,
    pub channel_title: String,
    pub external_message_id: i64,
    pub text: Option<String>,
    pub occurred_at: DateTime<Utc>,
    pub has_media: bool,
    /// Raw payload size in bytes, measured before any parsing — the DoS
    /// size check (SPEC_FULL §4.C step 2) needs this even when `text` ends
    /// up `None` or gets rejected for other reasons.
    pub raw_byte_size: usize,
}

/// A resolved channel the listener should be watching, returned by
/// `PlatformClient::resolve_channels`.
#[derive(Debug, Clone)]
pub struct ResolvedChannel {
    pub handle: String,
    pub title: String,
}
