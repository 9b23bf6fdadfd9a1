//! Auto moderation (SPEC_FULL §4.F, "Auto"): field validation, descending
//! sort, a final local dedup pass, top-N truncation, then `ensure_post_fields`.
//!
//! Grounded on `auto_moderator.py`'s `AutoModerator.moderate`: same four
//! steps in the same order, generalized from a fixed
//! wildberries/ozon/general split to an arbitrary category map (categories
//! are irrelevant to this stage — it operates over the flattened candidate
//! list, same as the original's `_deduplicate` which also ignores category).

use std::collections::HashMap;

use pulse_core::domain::RejectionReason;
use pulse_core::ensure_post_fields;
use pulse_embed::{batch_cosine_similarity, EmbeddingService};
use pulse_llm::SelectedItem;
use tracing::{debug, info, warn};

use crate::{flatten_sorted, ModerationOutcome};

/// Run the auto-moderation pipeline over every category's selected items.
pub async fn moderate_auto(
    embedder: &EmbeddingService,
    categorized: HashMap<String, Vec<SelectedItem>>,
    duplicate_threshold: f32,
    final_top_n: u32,
) -> ModerationOutcome {
    let candidates = flatten_sorted(categorized);
    let mut rejections = HashMap::new();

    if candidates.is_empty() {
        warn!("auto moderation received no candidates");
        return ModerationOutcome::default();
    }

    // Step 1: validate required fields.
    let mut valid: Vec<SelectedItem> = Vec::with_capacity(candidates.len());
    for item in candidates {
        if item.title.trim().is_empty() {
            rejections.insert(item.source_message_id, RejectionReason::MissingTitle);
        } else if item.description.trim().is_empty() {
            rejections.insert(item.source_message_id, RejectionReason::MissingDescription);
        } else if item.text.trim().is_empty() {
            rejections.insert(item.source_message_id, RejectionReason::MissingText);
        } else {
            valid.push(item);
        }
    }
    debug!(valid = valid.len(), rejected = rejections.len(), "field validation complete");

    // Step 2: sort descending by score.
    valid.sort_by(|a, b| b.score.cmp(&a.score));

    // Step 3: final local dedup pass.
    let (unique, duplicates) = final_dedup(embedder, valid, duplicate_threshold).await;
    for dup in &duplicates {
        rejections.insert(dup.source_message_id, RejectionReason::DuplicateInFinal);
    }

    // Step 4: truncate to final_top_n.
    let target = final_top_n as usize;
    let (mut approved, overflow) = if unique.len() > target {
        let mut unique = unique;
        let overflow = unique.split_off(target);
        (unique, overflow)
    } else {
        (unique, Vec::new())
    };
    for item in &overflow {
        rejections.insert(item.source_message_id, RejectionReason::ExceededTopNLimit);
    }

    // Step 5: ensure_post_fields as a last defensive pass over what survived.
    for item in approved.iter_mut() {
        let (title, description) = ensure_post_fields(&item.text, &item.title, &item.description);
        item.title = title;
        item.description = description;
    }

    info!(approved = approved.len(), rejected = rejections.len(), "auto moderation complete");
    ModerationOutcome { approved, rejections }
}

/// Final dedup pass over the already-validated, score-sorted candidates:
/// batch-encode once, then check each candidate's embedding against the
/// cumulative set of embeddings accepted so far (same shape as the dedup
/// engine's pairwise pass, but local to this batch and independent of the
/// published-embeddings window).
async fn final_dedup(
    embedder: &EmbeddingService,
    candidates: Vec<SelectedItem>,
    threshold: f32,
) -> (Vec<SelectedItem>, Vec<SelectedItem>) {
    if candidates.is_empty() {
        return (Vec::new(), Vec::new());
    }

    let texts: Vec<String> = candidates.iter().map(|c| c.text.clone()).collect();
    let vectors = match embedder.encode_batch(&texts, 32).await {
        Ok(v) => v,
        Err(err) => {
            warn!(error = %err, "final dedup encode_batch failed, treating all candidates as unique");
            return (candidates, Vec::new());
        }
    };

    let mut unique = Vec::new();
    let mut duplicates = Vec::new();
    let mut seen: Vec<Vec<f32>> = Vec::new();

    for (candidate, vector) in candidates.into_iter().zip(vectors.into_iter()) {
        if seen.is_empty() {
            seen.push(vector);
            unique.push(candidate);
            continue;
        }
        let scores = batch_cosine_similarity(&vector, &seen);
        let max_score = scores.into_iter().fold(0.0f32, f32::max);
        if max_score >= threshold {
            duplicates.push(candidate);
        } else {
            seen.push(vector);
            unique.push(candidate);
        }
    }

    (unique, duplicates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct FixedEmbedder;

    #[async_trait]
    impl pulse_embed::Embedder for FixedEmbedder {
        async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, pulse_embed::EmbeddingError> {
            // Items whose text starts with "dup" all collide; others are distinct.
            Ok(texts
                .iter()
                .map(|t| if t.starts_with("dup") { vec![1.0, 0.0] } else { vec![0.0, t.len() as f32] })
                .collect())
        }
        fn dimensions(&self) -> usize {
            2
        }
    }

    fn embedder() -> EmbeddingService {
        EmbeddingService::new(Box::new(FixedEmbedder), pulse_core::config::NormalizationConfig::default(), 16)
    }

    fn item(id: i64, category: &str, score: u8, title: &str, description: &str, text: &str) -> SelectedItem {
        SelectedItem {
            source_message_id: id,
            source_channel_id: 1,
            source_link: format!("https://t.me/chan/{id}"),
            text: text.to_string(),
            category: category.to_string(),
            title: title.to_string(),
            description: description.to_string(),
            score,
            reason: "r".to_string(),
        }
    }

    #[tokio::test]
    async fn rejects_missing_fields() {
        let mut map = HashMap::new();
        map.insert(
            "general".to_string(),
            vec![
                item(1, "general", 9, "", "desc", "text"),
                item(2, "general", 8, "title", "", "text"),
                item(3, "general", 7, "title", "desc", ""),
                item(4, "general", 6, "title", "desc", "text"),
            ],
        );
        let outcome = moderate_auto(&embedder(), map, 0.85, 10).await;
        assert_eq!(outcome.approved.len(), 1);
        assert_eq!(outcome.rejections[&1], RejectionReason::MissingTitle);
        assert_eq!(outcome.rejections[&2], RejectionReason::MissingDescription);
        assert_eq!(outcome.rejections[&3], RejectionReason::MissingText);
    }

    #[tokio::test]
    async fn truncates_to_top_n() {
        let mut map = HashMap::new();
        map.insert(
            "general".to_string(),
            (0..5)
                .map(|i| item(i, "general", (10 - i) as u8, "t", "d", &format!("unique text {i}")))
                .collect(),
        );
        let outcome = moderate_auto(&embedder(), map, 0.85, 3).await;
        assert_eq!(outcome.approved.len(), 3);
        assert_eq!(outcome.approved[0].source_message_id, 0);
        assert!(outcome.rejections.values().any(|r| *r == RejectionReason::ExceededTopNLimit));
    }

    #[tokio::test]
    async fn final_dedup_rejects_duplicates() {
        let mut map = HashMap::new();
        map.insert(
            "general".to_string(),
            vec![
                item(1, "general", 9, "t1", "d1", "dup story one"),
                item(2, "general", 8, "t2", "d2", "dup story two"),
            ],
        );
        let outcome = moderate_auto(&embedder(), map, 0.5, 10).await;
        assert_eq!(outcome.approved.len(), 1);
        assert_eq!(outcome.approved[0].source_message_id, 1);
        assert_eq!(outcome.rejections[&2], RejectionReason::DuplicateInFinal);
    }
}
