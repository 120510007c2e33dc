//! On-disk copy of the last built index. Never authoritative: a cache that
//! does not match the store is ignored and the index is rebuilt.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use strata_memory::ChunkId;

use crate::error::Result;
use crate::flat::FlatIndex;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedIndex {
    pub model_name: String,
    /// Number of `content` vectors in the store when the index was built.
    pub source_vectors: u64,
    /// [`corpus_digest`] of the indexed chunk ids.
    pub corpus_digest: String,
    pub index: FlatIndex,
}

impl CachedIndex {
    /// Whether this cache was built from the store's current state.
    #[must_use]
    pub fn matches(&self, model_name: &str, source_vectors: u64, corpus_digest: &str) -> bool {
        self.model_name == model_name
            && self.source_vectors == source_vectors
            && self.corpus_digest == corpus_digest
    }
}

/// blake3 hex digest over chunk ids in the given order.
#[must_use]
pub fn corpus_digest<'a>(ids: impl IntoIterator<Item = &'a ChunkId>) -> String {
    let mut hasher = blake3::Hasher::new();
    for id in ids {
        hasher.update(id.0.as_bytes());
        hasher.update(b"\n");
    }
    hasher.finalize().to_hex().to_string()
}

/// Default cache location: next to the database file.
#[must_use]
pub fn cache_path_for(sqlite_path: &str) -> Option<PathBuf> {
    (sqlite_path != ":memory:").then(|| PathBuf::from(format!("{sqlite_path}.index.json")))
}

/// Write `cached` to `path` through a temporary file and rename.
///
/// # Errors
///
/// Returns an error if serialization or any file operation fails.
pub async fn save(path: &Path, cached: &CachedIndex) -> Result<()> {
    let bytes = serde_json::to_vec(cached)?;
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, bytes).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

/// # Errors
///
/// Returns an error if the file is missing or cannot be decoded.
pub async fn load(path: &Path) -> Result<CachedIndex> {
    let bytes = tokio::fs::read(path).await?;
    Ok(serde_json::from_slice(&bytes)?)
}
