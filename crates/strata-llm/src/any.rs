#[cfg(feature = "candle")]
use crate::candle_provider::CandleEmbedder;
use crate::error::LlmError;
use crate::fallback::HashOnlyEmbedder;
#[cfg(feature = "mock")]
use crate::mock::MockEmbedder;
use crate::ollama::OllamaEmbedder;
use crate::provider::EmbeddingProvider;

/// Generates a match over all `AnyEmbedder` variants, binding the inner provider
/// and evaluating the given closure for each arm.
macro_rules! delegate_embedder {
    ($self:expr, |$p:ident| $expr:expr) => {
        match $self {
            AnyEmbedder::Ollama($p) => $expr,
            #[cfg(feature = "candle")]
            AnyEmbedder::Candle($p) => $expr,
            AnyEmbedder::HashOnly($p) => $expr,
            #[cfg(feature = "mock")]
            AnyEmbedder::Mock($p) => $expr,
        }
    };
}

#[derive(Debug, Clone)]
pub enum AnyEmbedder {
    Ollama(OllamaEmbedder),
    #[cfg(feature = "candle")]
    Candle(CandleEmbedder),
    HashOnly(HashOnlyEmbedder),
    #[cfg(feature = "mock")]
    Mock(MockEmbedder),
}

impl EmbeddingProvider for AnyEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, LlmError> {
        delegate_embedder!(self, |p| p.embed(text).await)
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, LlmError> {
        delegate_embedder!(self, |p| p.embed_batch(texts).await)
    }

    fn supports_embeddings(&self) -> bool {
        delegate_embedder!(self, |p| p.supports_embeddings())
    }

    fn model_name(&self) -> &str {
        delegate_embedder!(self, |p| p.model_name())
    }

    fn name(&self) -> &str {
        delegate_embedder!(self, |p| p.name())
    }
}

impl From<OllamaEmbedder> for AnyEmbedder {
    fn from(p: OllamaEmbedder) -> Self {
        Self::Ollama(p)
    }
}

impl From<HashOnlyEmbedder> for AnyEmbedder {
    fn from(p: HashOnlyEmbedder) -> Self {
        Self::HashOnly(p)
    }
}

#[cfg(feature = "candle")]
impl From<CandleEmbedder> for AnyEmbedder {
    fn from(p: CandleEmbedder) -> Self {
        Self::Candle(p)
    }
}

#[cfg(feature = "mock")]
impl From<MockEmbedder> for AnyEmbedder {
    fn from(p: MockEmbedder) -> Self {
        Self::Mock(p)
    }
}
