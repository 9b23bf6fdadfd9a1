pub mod claude;
pub mod gemini;
pub mod ollama;
pub mod openai;

use pulse_core::config::{Credentials, LlmSectionConfig};

use crate::provider::{LlmError, LlmProvider};

/// Construct the configured LLM provider. `llm.provider` is restricted by
/// `pulse-config`'s validation to `"generative"` or `"chat"`; within `"chat"`
/// the concrete backend is picked from the model name, same as the teacher's
/// `create_provider` dispatcher generalized from a flat provider-name match.
pub fn create_provider(
    cfg: &LlmSectionConfig,
    credentials: &Credentials,
) -> Result<Box<dyn LlmProvider>, LlmError> {
    match cfg.provider.as_str() {
        "generative" => Ok(Box::new(gemini::GeminiProvider::new(
            credentials.llm_api_key.clone(),
            cfg.model.clone(),
        ))),
        "chat" => {
            let model_lower = cfg.model.to_lowercase();
            if model_lower.starts_with("claude") {
                Ok(Box::new(claude::ClaudeProvider::new(
                    credentials.llm_api_key.clone(),
                    cfg.model.clone(),
                )))
            } else if model_lower.is_empty() || model_lower.starts_with("llama") || model_lower.starts_with("mistral") {
                Ok(Box::new(ollama::OllamaProvider::new(
                    "http://localhost:11434".to_string(),
                    cfg.model.clone(),
                )))
            } else {
                Ok(Box::new(openai::OpenAiProvider::new(
                    credentials.llm_api_key.clone(),
                    cfg.model.clone(),
                    "https://api.openai.com".to_string(),
                )))
            }
        }
        other => Err(LlmError::NotConfigured(format!(
            "unknown LLM provider: '{other}'"
        ))),
    }
}

/// Default chunk size for a provider family when the caller has not
/// overridden `processor`/`llm` config: ~200 for the generative-model
/// provider, 50 for chat-completion providers (SPEC_FULL §4.E).
pub fn default_chunk_size(provider: &str) -> usize {
    match provider {
        "generative" => 200,
        _ => 50,
    }
}
