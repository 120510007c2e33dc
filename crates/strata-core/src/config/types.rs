use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub dedup: DedupConfig,
    #[serde(default)]
    pub ingest: IngestSection,
    #[serde(default)]
    pub search: SearchSection,
}

fn default_sqlite_path() -> String {
    "./data/strata.db".into()
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct StoreConfig {
    #[serde(default = "default_sqlite_path")]
    pub sqlite_path: String,
    /// Persist the built index next to the database.
    #[serde(default = "default_true")]
    pub index_cache: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            sqlite_path: default_sqlite_path(),
            index_cache: true,
        }
    }
}

/// Embedding backend selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProviderKind {
    #[default]
    Ollama,
    Candle,
    /// No model: paragraph splitting and fingerprint-only dedup.
    None,
}

impl EmbeddingProviderKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ollama => "ollama",
            Self::Candle => "candle",
            Self::None => "none",
        }
    }
}

impl std::fmt::Display for EmbeddingProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn default_base_url() -> String {
    "http://localhost:11434".into()
}

fn default_embedding_model() -> String {
    "all-minilm".into()
}

fn default_candle_repo() -> String {
    "sentence-transformers/all-MiniLM-L6-v2".into()
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct EmbeddingConfig {
    #[serde(default)]
    pub provider: EmbeddingProviderKind,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_embedding_model")]
    pub model: String,
    #[serde(default = "default_candle_repo")]
    pub candle_repo: String,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingProviderKind::default(),
            base_url: default_base_url(),
            model: default_embedding_model(),
            candle_repo: default_candle_repo(),
        }
    }
}

fn default_max_chunk_size() -> usize {
    400
}

fn default_grouping_threshold() -> f32 {
    0.7
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ChunkingConfig {
    #[serde(default = "default_max_chunk_size")]
    pub max_chunk_size: usize,
    #[serde(default = "default_grouping_threshold")]
    pub grouping_threshold: f32,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_chunk_size: default_max_chunk_size(),
            grouping_threshold: default_grouping_threshold(),
        }
    }
}

fn default_similarity_threshold() -> f32 {
    0.85
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct DedupConfig {
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f32,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: default_similarity_threshold(),
        }
    }
}

fn default_batch_size() -> usize {
    50
}

fn default_max_file_size() -> u64 {
    strata_memory::document::DEFAULT_MAX_FILE_SIZE
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct IngestSection {
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
}

impl Default for IngestSection {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            max_file_size: default_max_file_size(),
        }
    }
}

fn default_top_k() -> usize {
    15
}

fn default_min_score() -> f32 {
    0.2
}

fn default_max_candidates() -> usize {
    50
}

fn default_candidate_multiplier() -> usize {
    3
}

fn default_max_code_examples() -> usize {
    5
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SearchSection {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default = "default_min_score")]
    pub min_score: f32,
    #[serde(default = "default_max_candidates")]
    pub max_candidates: usize,
    #[serde(default = "default_candidate_multiplier")]
    pub candidate_multiplier: usize,
    /// Code examples shown per block in formatted context.
    #[serde(default = "default_max_code_examples")]
    pub max_code_examples: usize,
}

impl Default for SearchSection {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            min_score: default_min_score(),
            max_candidates: default_max_candidates(),
            candidate_multiplier: default_candidate_multiplier(),
            max_code_examples: default_max_code_examples(),
        }
    }
}
