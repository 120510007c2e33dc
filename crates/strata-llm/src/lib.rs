//! Embedding provider abstraction and backend implementations.

pub mod any;
#[cfg(feature = "candle")]
pub mod candle_provider;
pub mod error;
pub mod fallback;
#[cfg(feature = "mock")]
pub mod mock;
pub mod ollama;
pub mod provider;

pub use any::AnyEmbedder;
pub use error::LlmError;
pub use provider::{EmbeddingProvider, cosine_similarity, l2_normalize};
