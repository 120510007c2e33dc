#[derive(Debug, thiserror::Error)]
pub enum MemoryError {
    #[error("database error: {0}")]
    Sqlite(#[from] sqlx::Error),

    #[error("migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("LLM error: {0}")]
    Llm(#[from] strata_llm::LlmError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("integer conversion: {0}")]
    IntConversion(#[from] std::num::TryFromIntError),

    #[error("invalid input: {0}")]
    Input(String),

    #[error("invalid vector blob for chunk {chunk_id}: {len} bytes")]
    InvalidVector { chunk_id: String, len: usize },

    #[error("{0}")]
    Other(String),
}

impl MemoryError {
    /// Whether the failure came from the store rather than the input.
    #[must_use]
    pub fn is_storage(&self) -> bool {
        matches!(
            self,
            Self::Sqlite(_) | Self::Migration(_) | Self::InvalidVector { .. }
        )
    }
}
