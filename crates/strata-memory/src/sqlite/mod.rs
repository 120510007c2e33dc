mod chunks;
mod embeddings;
mod files;

use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::str::FromStr;

use crate::error::MemoryError;
use crate::types::StoreStats;

pub use embeddings::{blob_to_vector, vector_to_blob};
pub use files::provenance_key;

#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (or create) the `SQLite` database and run migrations.
    ///
    /// Enables foreign key constraints at connection level so that deleting a
    /// chunk also removes its embedding records.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or migrations fail.
    pub async fn new(path: &str) -> Result<Self, MemoryError> {
        let url = if path == ":memory:" {
            "sqlite::memory:".to_string()
        } else {
            format!("sqlite:{path}?mode=rwc")
        };

        let opts = SqliteConnectOptions::from_str(&url)?
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(opts)
            .await?;

        sqlx::migrate!("../../migrations").run(&pool).await?;

        Ok(Self { pool })
    }

    /// Expose the underlying pool for shared access by other stores.
    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Chunk, embedding, and provenance counts.
    ///
    /// # Errors
    ///
    /// Returns an error if any count query fails.
    pub async fn stats(&self) -> Result<StoreStats, MemoryError> {
        let (chunks, embeddings, files): (i64, i64, i64) = sqlx::query_as(
            "SELECT (SELECT COUNT(*) FROM chunks), \
             (SELECT COUNT(*) FROM embeddings), \
             (SELECT COUNT(*) FROM processed_files)",
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(StoreStats {
            total_chunks: u64::try_from(chunks)?,
            total_embeddings: u64::try_from(embeddings)?,
            processed_files: u64::try_from(files)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[tokio::test]
    async fn wal_journal_mode_enabled_on_file_db() {
        let file = NamedTempFile::new().expect("tempfile");
        let path = file.path().to_str().expect("valid path");

        let store = SqliteStore::new(path).await.expect("SqliteStore::new");

        let mode: String = sqlx::query_scalar("PRAGMA journal_mode")
            .fetch_one(store.pool())
            .await
            .expect("PRAGMA query");

        assert_eq!(mode, "wal", "expected WAL journal mode, got: {mode}");
    }

    #[tokio::test]
    async fn stats_empty_store() {
        let store = SqliteStore::new(":memory:").await.unwrap();
        assert_eq!(store.stats().await.unwrap(), StoreStats::default());
    }

    #[tokio::test]
    async fn reopening_file_db_keeps_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kb.db");
        let path = path.to_str().unwrap();

        {
            let store = SqliteStore::new(path).await.unwrap();
            store
                .mark_file_processed("/docs/a.json", "hash", 3)
                .await
                .unwrap();
        }

        let store = SqliteStore::new(path).await.unwrap();
        assert_eq!(store.stats().await.unwrap().processed_files, 1);
    }
}
