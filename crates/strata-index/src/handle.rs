use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use strata_memory::SqliteStore;

use crate::cache::{self, CachedIndex};
use crate::error::{IndexError, Result};
use crate::flat::FlatIndex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RebuildOutcome {
    Built { vectors: usize },
    /// The store holds no `content` vectors; there is no index.
    Empty,
    /// The build failed and the previous index (if any) stays in service.
    Kept { reason: String },
}

/// Owns the current [`FlatIndex`]. Readers take a cheap snapshot; a rebuild
/// constructs a complete new index before swapping it in.
pub struct IndexHandle {
    current: RwLock<Option<Arc<FlatIndex>>>,
    cache_path: Option<PathBuf>,
}

impl std::fmt::Debug for IndexHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexHandle")
            .field("size", &self.size())
            .field("cache_path", &self.cache_path)
            .finish()
    }
}

impl Default for IndexHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl IndexHandle {
    #[must_use]
    pub fn new() -> Self {
        Self {
            current: RwLock::new(None),
            cache_path: None,
        }
    }

    #[must_use]
    pub fn with_cache(mut self, path: Option<PathBuf>) -> Self {
        self.cache_path = path;
        self
    }

    /// Current index, if one has been built.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock is poisoned.
    pub fn snapshot(&self) -> Result<Option<Arc<FlatIndex>>> {
        let guard = self
            .current
            .read()
            .map_err(|e| IndexError::Lock(e.to_string()))?;
        Ok(guard.clone())
    }

    /// Number of indexed vectors; 0 when there is no index.
    #[must_use]
    pub fn size(&self) -> usize {
        self.snapshot().ok().flatten().map_or(0, |i| i.len())
    }

    fn install(&self, index: Option<Arc<FlatIndex>>) -> Result<()> {
        let mut guard = self
            .current
            .write()
            .map_err(|e| IndexError::Lock(e.to_string()))?;
        *guard = index;
        Ok(())
    }

    /// Rebuild from every stored `content` vector and swap the result in.
    /// Failures leave the previous index in place.
    pub async fn rebuild(&self, store: &SqliteStore, model_name: &str) -> RebuildOutcome {
        match self.try_rebuild(store, model_name).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::warn!("index rebuild failed, keeping previous index: {e:#}");
                RebuildOutcome::Kept {
                    reason: e.to_string(),
                }
            }
        }
    }

    async fn try_rebuild(&self, store: &SqliteStore, model_name: &str) -> Result<RebuildOutcome> {
        let vectors = store.content_vectors().await?;
        let source_vectors = u64::try_from(vectors.len()).unwrap_or(u64::MAX);
        let corpus_digest = cache::corpus_digest(vectors.iter().map(|(id, _)| id));

        let index = match FlatIndex::build(vectors) {
            Ok(index) => Arc::new(index),
            Err(IndexError::EmptyCorpus) => {
                self.install(None)?;
                tracing::info!("no content embeddings, index cleared");
                return Ok(RebuildOutcome::Empty);
            }
            Err(e) => return Err(e),
        };

        let count = index.len();
        self.install(Some(Arc::clone(&index)))?;
        tracing::info!(vectors = count, dim = index.dim(), "index rebuilt");

        if let Some(path) = &self.cache_path {
            let cached = CachedIndex {
                model_name: model_name.to_owned(),
                source_vectors,
                corpus_digest,
                index: (*index).clone(),
            };
            if let Err(e) = cache::save(path, &cached).await {
                tracing::warn!(path = %path.display(), "failed to write index cache: {e:#}");
            }
        }

        Ok(RebuildOutcome::Built { vectors: count })
    }

    /// Install the on-disk cache if it matches the store. Returns whether it
    /// was used.
    pub async fn load_cached(&self, store: &SqliteStore, model_name: &str) -> bool {
        let Some(path) = &self.cache_path else {
            return false;
        };
        let cached = match cache::load(path).await {
            Ok(c) => c,
            Err(e) => {
                tracing::debug!(path = %path.display(), "no usable index cache: {e:#}");
                return false;
            }
        };
        let ids = match store.content_ids().await {
            Ok(ids) => ids,
            Err(e) => {
                tracing::warn!("cannot validate index cache: {e:#}");
                return false;
            }
        };
        let stored = u64::try_from(ids.len()).unwrap_or(u64::MAX);
        if !cached.matches(model_name, stored, &cache::corpus_digest(&ids)) {
            tracing::info!(
                cached_model = %cached.model_name,
                cached_vectors = cached.source_vectors,
                stored_vectors = stored,
                "index cache is stale"
            );
            return false;
        }
        let size = cached.index.len();
        if self.install(Some(Arc::new(cached.index))).is_err() {
            return false;
        }
        tracing::info!(vectors = size, "index loaded from cache");
        true
    }

    /// Current index, building it first if none exists. `None` means the
    /// corpus has no content embeddings (or the build failed with no
    /// previous index to fall back on).
    ///
    /// # Errors
    ///
    /// Returns an error if the lock is poisoned.
    pub async fn ensure(
        &self,
        store: &SqliteStore,
        model_name: &str,
    ) -> Result<Option<Arc<FlatIndex>>> {
        if let Some(index) = self.snapshot()? {
            return Ok(Some(index));
        }
        if !self.load_cached(store, model_name).await {
            self.rebuild(store, model_name).await;
        }
        self.snapshot()
    }
}
