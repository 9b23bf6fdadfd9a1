//! Publication stage (SPEC_FULL §4.G): render header/footer, compose the
//! numbered digest, dispatch it to the preview/main/notify targets, and
//! persist the published posts' embeddings for future dedup.

pub mod digest;
pub mod dispatcher;
pub mod persist;
pub mod telegram;
pub mod templating;
pub mod traits;

pub use digest::{compose_digest, number_emoji};
pub use dispatcher::publish_digest;
pub use persist::persist_published;
pub use telegram::GrammersPublisher;
pub use templating::{render_footer, render_header, HeaderFooterContext};
pub use traits::{PublishError, PublishTarget};
