//! Embedder construction (SPEC_FULL §4.B "Loading").
//!
//! Ordered exactly as specified: a local model/server takes precedence, a
//! remote fetch is only attempted if explicitly allowed, and the zero-vector
//! fallback only kicks in if explicitly enabled — never silently.

use std::path::Path;

use tracing::{info, warn};

use crate::fallback::ZeroVectorEmbedder;
use crate::ollama::OllamaEmbedder;
use crate::openai::OpenAiEmbedder;
use crate::traits::{Embedder, EmbeddingError};
use pulse_core::config::EmbeddingsConfig;

pub fn create_embedder(
    cfg: &EmbeddingsConfig,
    api_key: Option<&str>,
    dimensions: usize,
) -> Result<Box<dyn Embedder>, EmbeddingError> {
    if let Some(path) = &cfg.local_path {
        if Path::new(path).exists() {
            info!(local_path = %path, "loading embedder from local path");
            return Ok(Box::new(OllamaEmbedder::new(
                path.clone(),
                cfg.model.clone(),
                dimensions,
            )));
        }
        warn!(local_path = %path, "configured local_path does not exist, falling through");
    }

    if cfg.allow_remote_download {
        let key = api_key
            .ok_or_else(|| EmbeddingError::Api("remote embedding requires an API key".into()))?;
        info!(model = %cfg.model, "loading embedder via remote API");
        return Ok(Box::new(OpenAiEmbedder::new(
            key.to_string(),
            cfg.model.clone(),
            None,
            dimensions,
        )));
    }

    if cfg.enable_fallback {
        warn!("no local model and remote download disabled; using zero-vector fallback embedder");
        return Ok(Box::new(ZeroVectorEmbedder::new(dimensions)));
    }

    Err(EmbeddingError::ModelUnavailable(
        cfg.local_path.clone().unwrap_or_else(|| "<unset>".to_string()),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_cfg() -> EmbeddingsConfig {
        EmbeddingsConfig {
            model: "nomic-embed-text".to_string(),
            local_path: None,
            enable_fallback: false,
            allow_remote_download: false,
            normalization: Default::default(),
        }
    }

    #[test]
    fn errors_when_nothing_is_configured() {
        let cfg = base_cfg();
        let result = create_embedder(&cfg, None, 768);
        assert!(result.is_err());
    }

    #[test]
    fn falls_back_to_zero_vector_when_enabled() {
        let mut cfg = base_cfg();
        cfg.enable_fallback = true;
        let result = create_embedder(&cfg, None, 768);
        assert!(result.is_ok());
    }

    #[test]
    fn remote_requires_api_key() {
        let mut cfg = base_cfg();
        cfg.allow_remote_download = true;
        let result = create_embedder(&cfg, None, 768);
        assert!(result.is_err());
    }
}
