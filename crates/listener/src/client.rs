use async_trait::async_trait;

use pulse_core::config::ListenerMode;

use crate::error::ListenerError;
use crate::types::{PlatformEvent, ResolvedChannel};

/// Platform abstraction over the underlying chat transport, mirroring the
/// shape of `pulse_storage`'s facade and `QueueConsumer` from the teacher's
/// queue crate: a narrow trait the listener drives, with one concrete
/// implementation per backend.
#[async_trait]
pub trait PlatformClient: Send + Sync {
    /// Establish the session, performing auth if a cached session is absent.
    async fn connect(&mut self) -> Result<(), ListenerError>;

    /// Resolve which channels to observe for the configured mode. Unknown
    /// modes are the caller's responsibility to normalize before this call.
    async fn resolve_channels(
        &mut self,
        mode: ListenerMode,
        manual_handles: &[String],
    ) -> Result<Vec<ResolvedChannel>, ListenerError>;

    /// Block until the next event arrives, or `None` on a clean disconnect.
    async fn next_event(&mut self) -> Result<Option<PlatformEvent>, ListenerError>;
}
