//! Moderation stage (SPEC_FULL §4.F): Auto (validate + final dedup + top-N)
//! or Interactive (numbered listing, bounded-retry reply parsing).

pub mod auto;
pub mod interactive;

use std::collections::HashMap;

use pulse_core::domain::{MessageId, RejectionReason};
use pulse_llm::SelectedItem;

/// Result of either moderation mode: the posts cleared for publication, and
/// why every other candidate was not.
#[derive(Debug, Default)]
pub struct ModerationOutcome {
    pub approved: Vec<SelectedItem>,
    pub rejections: HashMap<MessageId, RejectionReason>,
}

/// Flatten a category-keyed selection map into a single list, in a
/// deterministic category order (alphabetical) so repeated runs over the
/// same input produce the same numbering/ordering.
pub(crate) fn flatten_sorted(categorized: HashMap<String, Vec<SelectedItem>>) -> Vec<SelectedItem> {
    let mut categories: Vec<String> = categorized.keys().cloned().collect();
    categories.sort();
    let mut out = Vec::new();
    let mut categorized = categorized;
    for category in categories {
        if let Some(items) = categorized.remove(&category) {
            out.extend(items);
        }
    }
    out
}
