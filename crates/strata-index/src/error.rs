#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    #[error("memory error: {0}")]
    Memory(#[from] strata_memory::MemoryError),

    #[error("LLM error: {0}")]
    Llm(#[from] strata_llm::LlmError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("no content embeddings to index")]
    EmptyCorpus,

    #[error("dimension mismatch for {chunk_id}: expected {expected}, got {actual}")]
    DimensionMismatch {
        chunk_id: String,
        expected: usize,
        actual: usize,
    },

    #[error("malformed vector for {chunk_id}: {reason}")]
    MalformedVector { chunk_id: String, reason: String },

    #[error("index lock poisoned: {0}")]
    Lock(String),
}

pub type Result<T> = std::result::Result<T, IndexError>;
