use std::future::Future;

use crate::error::LlmError;

/// Maps text to a fixed-length vector. Deterministic for a fixed model.
///
/// Whether a provider can embed at all is fixed when it is constructed;
/// callers check [`EmbeddingProvider::supports_embeddings`] once and pick a
/// code path instead of probing every call.
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a single text.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend is unreachable, the model fails, or the
    /// provider has no embedding capability.
    fn embed(&self, text: &str) -> impl Future<Output = Result<Vec<f32>, LlmError>> + Send;

    /// Embed several texts, returning one vector per input in order.
    ///
    /// The default implementation calls [`EmbeddingProvider::embed`] in sequence.
    ///
    /// # Errors
    ///
    /// Returns the first error produced by any input.
    fn embed_batch(
        &self,
        texts: &[String],
    ) -> impl Future<Output = Result<Vec<Vec<f32>>, LlmError>> + Send {
        async move {
            let mut out = Vec::with_capacity(texts.len());
            for text in texts {
                out.push(self.embed(text).await?);
            }
            Ok(out)
        }
    }

    fn supports_embeddings(&self) -> bool;

    /// Identifier of the model producing the vectors, persisted next to them.
    fn model_name(&self) -> &str;

    fn name(&self) -> &str;
}

/// Cosine similarity of two vectors. Returns 0.0 on length mismatch or zero norm.
#[must_use]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0_f32;
    let mut norm_a = 0.0_f32;
    let mut norm_b = 0.0_f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom == 0.0 {
        return 0.0;
    }

    dot / denom
}

/// Scale `v` in place to unit length. Zero vectors are left untouched.
pub fn l2_normalize(v: &mut [f32]) {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}
