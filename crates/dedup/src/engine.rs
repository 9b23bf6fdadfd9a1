//! Rolling semantic-duplicate engine (SPEC_FULL §4.D).
//!
//! The engine owns a per-run snapshot of published embeddings (`ids` +
//! `matrix`, aligned by index) and grows it as the same run publishes new
//! items, so a category selected later in the same run can be checked
//! against items a prior category already published (scenario S3).

use std::collections::HashMap;

use pulse_core::config::ProcessorConfig;
use pulse_core::domain::{MessageId, PublishedId, RejectionReason};
use pulse_embed::{batch_cosine_similarity, EmbeddingService};

use crate::dbscan::cluster_duplicates;

/// A raw candidate offered up for duplicate screening.
pub struct DedupCandidate {
    pub message_id: MessageId,
    pub text: String,
    /// Used only to pick a representative when the DBSCAN mode collapses
    /// several candidates into one newly formed cluster. RawMessage has no
    /// LLM score yet at this pipeline stage (dedup runs before selection),
    /// so callers typically pass something cheap like text length; ties
    /// favor the earlier candidate.
    pub tie_break_score: i64,
}

pub struct DedupEngine {
    ids: Vec<PublishedId>,
    matrix: Vec<Vec<f32>>,
    threshold: f32,
    use_dbscan: bool,
    dbscan_eps: f32,
    dbscan_min_samples: usize,
}

impl DedupEngine {
    /// `initial_ids`/`initial_matrix` are the published embeddings already
    /// within the configured retention window, aligned by index.
    pub fn new(initial_ids: Vec<PublishedId>, initial_matrix: Vec<Vec<f32>>, cfg: &ProcessorConfig) -> Self {
        Self {
            ids: initial_ids,
            matrix: initial_matrix,
            threshold: cfg.duplicate_threshold,
            use_dbscan: cfg.use_dbscan,
            dbscan_eps: cfg.dbscan_eps(),
            dbscan_min_samples: cfg.dbscan_min_samples as usize,
        }
    }

    pub fn published_count(&self) -> usize {
        self.ids.len()
    }

    /// Append a newly published item to the rolling window so subsequent
    /// `filter_duplicates` calls within the same run see it.
    pub fn record_published(&mut self, id: PublishedId, embedding: Vec<f32>) {
        self.ids.push(id);
        self.matrix.push(embedding);
    }

    /// Screen `candidates` against the rolling published window. Returns the
    /// ids that survived, and a map of rejected id to [`RejectionReason::IsDuplicate`].
    pub async fn filter_duplicates(
        &mut self,
        embedder: &EmbeddingService,
        candidates: &[DedupCandidate],
    ) -> (Vec<MessageId>, HashMap<MessageId, RejectionReason>) {
        if candidates.is_empty() {
            return (Vec::new(), HashMap::new());
        }

        let texts: Vec<String> = candidates.iter().map(|c| c.text.clone()).collect();
        let vectors = match embedder.encode_batch(&texts, 32).await {
            Ok(v) => v,
            Err(err) => {
                tracing::warn!(error = %err, "dedup encode_batch failed, treating all candidates as unique");
                return (candidates.iter().map(|c| c.message_id).collect(), HashMap::new());
            }
        };

        if self.use_dbscan {
            cluster_duplicates(&self.ids, &self.matrix, candidates, &vectors, self.dbscan_eps, self.dbscan_min_samples)
        } else {
            self.filter_pairwise(candidates, vectors)
        }
    }

    fn filter_pairwise(
        &self,
        candidates: &[DedupCandidate],
        vectors: Vec<Vec<f32>>,
    ) -> (Vec<MessageId>, HashMap<MessageId, RejectionReason>) {
        let mut unique = Vec::new();
        let mut rejections = HashMap::new();
        let mut seen: Vec<Vec<f32>> = self.matrix.clone();

        for (candidate, vector) in candidates.iter().zip(vectors.into_iter()) {
            let scores = batch_cosine_similarity(&vector, &seen);
            let max_score = scores.into_iter().fold(0.0f32, f32::max);

            if max_score >= self.threshold {
                rejections.insert(candidate.message_id, RejectionReason::IsDuplicate);
            } else {
                unique.push(candidate.message_id);
                seen.push(vector);
            }
        }

        (unique, rejections)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg(threshold: f32) -> ProcessorConfig {
        let mut cfg = ProcessorConfig::default();
        cfg.duplicate_threshold = threshold;
        cfg.use_dbscan = false;
        cfg
    }

    #[tokio::test]
    async fn pairwise_rejects_near_duplicate_against_published() {
        let mut engine = DedupEngine::new(vec![1], vec![vec![1.0, 0.0, 0.0]], &cfg(0.85));

        let embedder = test_embedder();
        let candidates = vec![DedupCandidate {
            message_id: 10,
            text: "same story".to_string(),
            tie_break_score: 0,
        }];
        // stub embedder returns [1.0, 0.0, 0.0] for any text in this test helper
        let (unique, rejections) = engine.filter_duplicates(&embedder, &candidates).await;
        assert!(unique.is_empty());
        assert_eq!(rejections.len(), 1);
    }

    fn test_embedder() -> EmbeddingService {
        EmbeddingService::new(
            Box::new(FixedEmbedder),
            pulse_core::config::NormalizationConfig::default(),
            16,
        )
    }

    struct FixedEmbedder;

    #[async_trait::async_trait]
    impl pulse_embed::Embedder for FixedEmbedder {
        async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, pulse_embed::EmbeddingError> {
            Ok(texts.iter().map(|_| vec![1.0, 0.0, 0.0]).collect())
        }
        fn dimensions(&self) -> usize {
            3
        }
    }
}
