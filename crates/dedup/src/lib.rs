pub mod dbscan;
pub mod engine;

pub use engine::{DedupCandidate, DedupEngine};
