pub mod client;
pub mod error;
pub mod grammers;
pub mod heartbeat;
pub mod listener;
pub mod pipeline;
pub mod types;

pub use client::PlatformClient;
pub use error::ListenerError;
pub use grammers::GrammersClient;
pub use listener::{normalize_mode, Listener};
pub use pipeline::{handle_event, EventOutcome, MAX_MESSAGE_SIZE};
pub use types::{PlatformEvent, ResolvedChannel};
