use async_trait::async_trait;

use crate::traits::{Embedder, EmbeddingError};

/// Deterministic zero-vector embedder. Strictly for development and tests:
/// every text maps to the same zero vector, so similarity comparisons
/// against it are meaningless but the pipeline does not crash for lack of a
/// real model (SPEC_FULL §4.B).
pub struct ZeroVectorEmbedder {
    dimensions: usize,
}

impl ZeroVectorEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }
}

#[async_trait]
impl Embedder for ZeroVectorEmbedder {
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Ok(texts.iter().map(|_| vec![0.0; self.dimensions]).collect())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn always_returns_zero_vectors() {
        let embedder = ZeroVectorEmbedder::new(4);
        let out = embedder.embed_batch(&["a", "b"]).await.unwrap();
        assert_eq!(out, vec![vec![0.0; 4], vec![0.0; 4]]);
    }
}
