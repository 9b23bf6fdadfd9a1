pub mod json_extract;
pub mod prompts;
pub mod provider;
pub mod providers;
pub mod selection;

pub use provider::{LlmError, LlmProvider, Message, Role};
pub use providers::{create_provider, default_chunk_size};
pub use selection::{
    chunk_candidates, select_by_categories, CandidateMessage, SelectedItem, SelectionError,
};
