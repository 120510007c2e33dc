use std::path::Path;

use super::SqliteStore;
use crate::document::fingerprint::file_hash;
use crate::error::MemoryError;

/// Provenance key for a source file: its canonical path when resolvable.
/// Also recorded as the `source_file` of the chunks it produces.
pub async fn provenance_key(path: &Path) -> String {
    tokio::fs::canonicalize(path)
        .await
        .unwrap_or_else(|_| path.to_path_buf())
        .display()
        .to_string()
}

impl SqliteStore {
    /// Whether `path` was already ingested with its current content.
    ///
    /// A missing provenance record, or one with a different content hash,
    /// means the file is unprocessed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or the query fails.
    pub async fn is_file_processed(&self, path: &Path) -> Result<bool, MemoryError> {
        let bytes = tokio::fs::read(path).await?;
        self.is_hash_processed(&provenance_key(path).await, &file_hash(&bytes))
            .await
    }

    /// Whether the provenance record for `key` carries `hash`.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn is_hash_processed(&self, key: &str, hash: &str) -> Result<bool, MemoryError> {
        let stored: Option<String> =
            sqlx::query_scalar("SELECT file_hash FROM processed_files WHERE file_path = ?")
                .bind(key)
                .fetch_optional(&self.pool)
                .await?;
        Ok(stored.as_deref() == Some(hash))
    }

    /// Record that `key` was ingested with content `hash`, producing
    /// `chunk_count` new chunks. Call only after those chunks are committed.
    ///
    /// # Errors
    ///
    /// Returns an error if the upsert fails.
    pub async fn mark_file_processed(
        &self,
        key: &str,
        hash: &str,
        chunk_count: usize,
    ) -> Result<(), MemoryError> {
        sqlx::query(
            "INSERT INTO processed_files (file_path, file_hash, chunk_count) VALUES (?, ?, ?) \
             ON CONFLICT(file_path) DO UPDATE SET \
              file_hash = excluded.file_hash, \
              chunk_count = excluded.chunk_count, \
              processed_at = datetime('now')",
        )
        .bind(key)
        .bind(hash)
        .bind(i64::try_from(chunk_count)?)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Chunk count recorded for `key`, if it was ever processed.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn processed_chunk_count(&self, key: &str) -> Result<Option<usize>, MemoryError> {
        let count: Option<i64> =
            sqlx::query_scalar("SELECT chunk_count FROM processed_files WHERE file_path = ?")
                .bind(key)
                .fetch_optional(&self.pool)
                .await?;
        count.map(usize::try_from).transpose().map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_store() -> SqliteStore {
        SqliteStore::new(":memory:").await.unwrap()
    }

    #[tokio::test]
    async fn unknown_file_is_unprocessed() {
        let store = test_store().await;
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.json");
        std::fs::write(&file, "[]").unwrap();

        assert!(!store.is_file_processed(&file).await.unwrap());
    }

    #[tokio::test]
    async fn marked_file_is_processed_until_changed() {
        let store = test_store().await;
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.json");
        std::fs::write(&file, "[]").unwrap();

        store
            .mark_file_processed(&provenance_key(&file).await, &file_hash(b"[]"), 0)
            .await
            .unwrap();
        assert!(store.is_file_processed(&file).await.unwrap());

        std::fs::write(&file, "[ ]").unwrap();
        assert!(!store.is_file_processed(&file).await.unwrap());
    }

    #[tokio::test]
    async fn remark_updates_hash_and_count() {
        let store = test_store().await;
        store.mark_file_processed("k", "h1", 2).await.unwrap();
        store.mark_file_processed("k", "h2", 5).await.unwrap();

        assert!(store.is_hash_processed("k", "h2").await.unwrap());
        assert!(!store.is_hash_processed("k", "h1").await.unwrap());
        assert_eq!(store.processed_chunk_count("k").await.unwrap(), Some(5));
        assert_eq!(store.stats().await.unwrap().processed_files, 1);
    }

    #[tokio::test]
    async fn missing_file_is_an_error() {
        let store = test_store().await;
        let result = store
            .is_file_processed(Path::new("/nonexistent/kb.json"))
            .await;
        assert!(matches!(result, Err(MemoryError::Io(_))));
    }
}
