//! Post-publish embedding persistence (SPEC_FULL §4.G steps 7-8, scenario S6).
//!
//! Batch-encodes every published text once, then persists each individually:
//! a `save_published` failure for one post does not prevent the others from
//! being saved, and the dedup cache only grows by the posts that actually
//! made it to storage — a failed post is invisible to cross-category dedup
//! for the remainder of this run (it will simply be encoded again, and
//! possibly re-saved, the next time it is selected).

use pulse_core::domain::PublishedId;
use pulse_dedup::DedupEngine;
use pulse_embed::EmbeddingService;
use pulse_llm::SelectedItem;
use pulse_storage::Storage;
use tracing::warn;

/// Persist every item in `items`, appending successes to `dedup`'s rolling
/// window. Returns the ids that were saved, in `items` order (skipping
/// failures).
pub async fn persist_published(
    storage: &Storage,
    embedder: &EmbeddingService,
    dedup: &mut DedupEngine,
    items: &[SelectedItem],
) -> Vec<PublishedId> {
    if items.is_empty() {
        return Vec::new();
    }

    let texts: Vec<String> = items.iter().map(|i| i.text.clone()).collect();
    let vectors = match embedder.encode_batch(&texts, 32).await {
        Ok(v) => v,
        Err(err) => {
            warn!(error = %err, "failed to encode published texts, nothing persisted this round");
            return Vec::new();
        }
    };

    let mut saved = Vec::new();
    for (item, vector) in items.iter().zip(vectors.into_iter()) {
        match storage
            .save_published(
                &item.text,
                &vector,
                Some(item.source_message_id),
                Some(item.source_channel_id),
            )
            .await
        {
            Ok(id) => {
                dedup.record_published(id, vector);
                saved.push(id);
            }
            Err(err) => {
                warn!(
                    source_message_id = item.source_message_id,
                    error = %err,
                    "save_published failed, post omitted from this run's dedup cache"
                );
            }
        }
    }

    saved
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use pulse_core::config::{DatabaseConfig, NormalizationConfig};

    struct FixedEmbedder;

    #[async_trait]
    impl pulse_embed::Embedder for FixedEmbedder {
        async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, pulse_embed::EmbeddingError> {
            Ok(texts.iter().map(|t| vec![t.len() as f32, 0.0]).collect())
        }
        fn dimensions(&self) -> usize {
            2
        }
    }

    fn item(id: i64, text: &str) -> SelectedItem {
        SelectedItem {
            source_message_id: id,
            source_channel_id: 1,
            source_link: format!("https://t.me/chan/{id}"),
            text: text.to_string(),
            category: "general".to_string(),
            title: "t".to_string(),
            description: "d".to_string(),
            score: 8,
            reason: "r".to_string(),
        }
    }

    async fn test_storage() -> Storage {
        let dir = std::env::temp_dir().join(format!(
            "pulse-publish-test-{}-{}",
            std::process::id(),
            std::time::SystemTime::now().duration_since(std::time::UNIX_EPOCH).unwrap().as_nanos()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        Storage::connect(&dir.join("test.db"), &DatabaseConfig::default()).await.unwrap()
    }

    #[tokio::test]
    async fn persists_all_and_grows_dedup_cache() {
        let storage = test_storage().await;
        let embedder = EmbeddingService::new(Box::new(FixedEmbedder), NormalizationConfig::default(), 16);
        let mut dedup = DedupEngine::new(Vec::new(), Vec::new(), &pulse_core::config::ProcessorConfig::default());

        let items = vec![item(1, "alpha story"), item(2, "beta story"), item(3, "gamma story")];
        let saved = persist_published(&storage, &embedder, &mut dedup, &items).await;

        assert_eq!(saved.len(), 3);
        assert_eq!(dedup.published_count(), 3);
    }
}
