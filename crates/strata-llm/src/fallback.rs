use crate::error::LlmError;
use crate::provider::EmbeddingProvider;

/// Provider with no embedding model.
///
/// Selecting it puts chunking in paragraph mode and duplicate detection in
/// fingerprint-only mode.
#[derive(Debug, Clone, Copy, Default)]
pub struct HashOnlyEmbedder;

impl EmbeddingProvider for HashOnlyEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>, LlmError> {
        Err(LlmError::EmbedUnsupported {
            provider: "hash-only",
        })
    }

    fn supports_embeddings(&self) -> bool {
        false
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn model_name(&self) -> &str {
        "none"
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "hash-only"
    }
}
