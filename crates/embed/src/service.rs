//! The embedding service facade (SPEC_FULL §4.B contract): `encode`,
//! `encode_batch`, plus the similarity helpers re-exported from
//! [`crate::similarity`].

use tokio::sync::Mutex;

use pulse_core::config::NormalizationConfig;

use crate::cache::EmbeddingCache;
use crate::normalize::normalize;
use crate::traits::{Embedder, EmbeddingError};

pub struct EmbeddingService {
    embedder: Box<dyn Embedder>,
    normalization: NormalizationConfig,
    cache: Mutex<EmbeddingCache>,
}

impl EmbeddingService {
    pub fn new(embedder: Box<dyn Embedder>, normalization: NormalizationConfig, cache_capacity: usize) -> Self {
        Self {
            embedder,
            normalization,
            cache: Mutex::new(EmbeddingCache::new(cache_capacity)),
        }
    }

    pub fn dimensions(&self) -> usize {
        self.embedder.dimensions()
    }

    /// Encode a single text, normalizing first and consulting the cache.
    pub async fn encode(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let normalized = normalize(text, &self.normalization);

        {
            let mut cache = self.cache.lock().await;
            if let Some(hit) = cache.get(&normalized) {
                return Ok(hit);
            }
        }

        let vectors = self.embedder.embed_batch(&[normalized.as_str()]).await?;
        let vector = vectors.into_iter().next().unwrap_or_default();

        let mut cache = self.cache.lock().await;
        cache.put(&normalized, vector.clone());
        Ok(vector)
    }

    /// Encode many texts in fixed-size batches, normalizing and consulting
    /// the cache per item; only cache misses are sent to the backend.
    pub async fn encode_batch(
        &self,
        texts: &[String],
        batch_size: usize,
    ) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let normalized: Vec<String> = texts.iter().map(|t| normalize(t, &self.normalization)).collect();
        let mut results: Vec<Option<Vec<f32>>> = vec![None; normalized.len()];
        let mut misses: Vec<usize> = Vec::new();

        {
            let mut cache = self.cache.lock().await;
            for (i, text) in normalized.iter().enumerate() {
                if let Some(hit) = cache.get(text) {
                    results[i] = Some(hit);
                } else {
                    misses.push(i);
                }
            }
        }

        let batch_size = batch_size.max(1);
        for chunk in misses.chunks(batch_size) {
            let chunk_texts: Vec<&str> = chunk.iter().map(|&i| normalized[i].as_str()).collect();
            let embeddings = self.embedder.embed_batch(&chunk_texts).await?;

            let mut cache = self.cache.lock().await;
            for (&idx, embedding) in chunk.iter().zip(embeddings.into_iter()) {
                cache.put(&normalized[idx], embedding.clone());
                results[idx] = Some(embedding);
            }
        }

        Ok(results.into_iter().map(|v| v.unwrap_or_default()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingEmbedder {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Embedder for CountingEmbedder {
        async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(texts.iter().map(|t| vec![t.len() as f32]).collect())
        }

        fn dimensions(&self) -> usize {
            1
        }
    }

    #[tokio::test]
    async fn encode_caches_by_normalized_text() {
        let service = EmbeddingService::new(
            Box::new(CountingEmbedder { calls: AtomicUsize::new(0) }),
            NormalizationConfig::default(),
            100,
        );

        let v1 = service.encode("hello   world").await.unwrap();
        let v2 = service.encode("hello world").await.unwrap();
        assert_eq!(v1, v2);
    }

    #[tokio::test]
    async fn encode_batch_only_queries_misses() {
        let embedder = CountingEmbedder { calls: AtomicUsize::new(0) };
        let service = EmbeddingService::new(Box::new(embedder), NormalizationConfig::default(), 100);

        service.encode("alpha").await.unwrap();
        let batch = service
            .encode_batch(&["alpha".to_string(), "beta".to_string()], 10)
            .await
            .unwrap();
        assert_eq!(batch.len(), 2);
    }
}
