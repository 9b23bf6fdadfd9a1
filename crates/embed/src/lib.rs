pub mod batcher;
pub mod cache;
pub mod factory;
pub mod fallback;
pub mod normalize;
pub mod ollama;
pub mod openai;
pub mod service;
pub mod similarity;
pub mod traits;

pub use batcher::EmbeddingBatcher;
pub use cache::EmbeddingCache;
pub use factory::create_embedder;
pub use fallback::ZeroVectorEmbedder;
pub use normalize::normalize;
pub use ollama::OllamaEmbedder;
pub use openai::OpenAiEmbedder;
pub use service::EmbeddingService;
pub use similarity::{batch_cosine_similarity, cosine_similarity};
pub use traits::{Embedder, EmbeddingError};
