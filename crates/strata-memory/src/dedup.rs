use std::collections::HashSet;

use strata_llm::{EmbeddingProvider, cosine_similarity};

use crate::document::fingerprint;
use crate::error::MemoryError;
use crate::sqlite::SqliteStore;
use crate::types::ChunkId;

/// Outcome of a duplicate check.
#[derive(Debug, Clone, PartialEq)]
pub struct DuplicateCheck {
    pub is_duplicate: bool,
    /// 1.0 for an exact fingerprint match, otherwise the best cosine
    /// similarity against the corpus (0.0 when nothing was compared).
    pub similarity: f32,
    /// Candidate embedding computed on the similarity path, reusable as the
    /// chunk's `content` facet.
    pub vector: Option<Vec<f32>>,
}

impl DuplicateCheck {
    fn exact() -> Self {
        Self {
            is_duplicate: true,
            similarity: 1.0,
            vector: None,
        }
    }

    fn unique(similarity: f32, vector: Option<Vec<f32>>) -> Self {
        Self {
            is_duplicate: false,
            similarity,
            vector,
        }
    }
}

/// Exact-then-semantic duplicate detection against the stored corpus.
///
/// Exact matches are O(1) through the fingerprint set. When the embedder
/// supports embeddings, non-exact candidates are compared by cosine
/// similarity against every known `content` vector.
pub struct DuplicateDetector {
    fingerprints: HashSet<ChunkId>,
    vectors: Vec<(ChunkId, Vec<f32>)>,
    threshold: f32,
}

impl std::fmt::Debug for DuplicateDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DuplicateDetector")
            .field("fingerprints", &self.fingerprints.len())
            .field("vectors", &self.vectors.len())
            .field("threshold", &self.threshold)
            .finish()
    }
}

impl DuplicateDetector {
    #[must_use]
    pub fn new(threshold: f32) -> Self {
        Self {
            fingerprints: HashSet::new(),
            vectors: Vec::new(),
            threshold,
        }
    }

    /// Seed from every stored fingerprint and `content` vector.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub async fn from_store(store: &SqliteStore, threshold: f32) -> Result<Self, MemoryError> {
        let fingerprints = store.fingerprints().await?.into_iter().collect();
        let vectors = store.content_vectors().await?;
        Ok(Self {
            fingerprints,
            vectors,
            threshold,
        })
    }

    #[must_use]
    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fingerprints.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fingerprints.is_empty()
    }

    #[must_use]
    pub fn contains(&self, id: &ChunkId) -> bool {
        self.fingerprints.contains(id)
    }

    /// Check `content` against the corpus. Never fails: an embedding error
    /// degrades to the exact-match result.
    pub async fn check<E: EmbeddingProvider>(&self, content: &str, embedder: &E) -> DuplicateCheck {
        if self.fingerprints.contains(&fingerprint(content)) {
            return DuplicateCheck::exact();
        }
        if !embedder.supports_embeddings() {
            return DuplicateCheck::unique(0.0, None);
        }

        let vector = match embedder.embed(content).await {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!("embedding failed, duplicate check is exact-match only: {e:#}");
                return DuplicateCheck::unique(0.0, None);
            }
        };

        let best = self
            .vectors
            .iter()
            .map(|(_, v)| cosine_similarity(&vector, v))
            .fold(None, |acc: Option<f32>, s| Some(acc.map_or(s, |a| a.max(s))));

        match best {
            Some(similarity) if similarity > self.threshold => DuplicateCheck {
                is_duplicate: true,
                similarity,
                vector: Some(vector),
            },
            Some(similarity) => DuplicateCheck::unique(similarity, Some(vector)),
            None => DuplicateCheck::unique(0.0, Some(vector)),
        }
    }

    /// Add an accepted chunk so later candidates are checked against it.
    pub fn register(&mut self, id: ChunkId, content_vector: Option<Vec<f32>>) {
        if let Some(v) = content_vector {
            self.vectors.push((id.clone(), v));
        }
        self.fingerprints.insert(id);
    }

    /// Undo [`DuplicateDetector::register`] for a chunk that was never stored.
    pub fn forget(&mut self, id: &ChunkId) {
        self.fingerprints.remove(id);
        self.vectors.retain(|(known, _)| known != id);
    }
}
