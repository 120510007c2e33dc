//! Flat inner-product index over chunk embeddings and semantic retrieval.
//!
//! The index is rebuilt wholesale from the store's `content` vectors and
//! swapped in atomically; searches read a snapshot and join hits back to
//! stored chunks.

pub mod cache;
pub mod context;
pub mod error;
pub mod flat;
pub mod handle;
pub mod retriever;

pub use context::format_context;
pub use error::{IndexError, Result};
pub use flat::FlatIndex;
pub use handle::{IndexHandle, RebuildOutcome};
pub use retriever::{
    SearchConfig, SearchResponse, SearchResult, SearchService, SearchSummary, ServiceStats,
};
