//! Chunk processing, duplicate detection and SQLite-backed persistence.

pub mod dedup;
pub mod document;
pub mod error;
pub mod pipeline;
pub mod sqlite;
pub mod types;

pub use dedup::{DuplicateCheck, DuplicateDetector};
pub use error::MemoryError;
pub use pipeline::{BatchReport, IngestConfig, IngestionPipeline};
pub use sqlite::SqliteStore;
pub use types::{
    Chunk, ChunkId, ChunkRecord, ContentType, Difficulty, EmbeddedChunk, Facet, StoreStats,
};
