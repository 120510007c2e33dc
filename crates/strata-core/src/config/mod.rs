mod env;
mod types;


pub use types::*;

use std::path::Path;

use anyhow::{Context, bail};
use strata_index::SearchConfig;
use strata_memory::IngestConfig;
use strata_memory::document::SplitterConfig;

impl Config {
    /// Load configuration from a TOML file with env var overrides.
    ///
    /// Falls back to defaults when the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str::<Self>(&content).context("failed to parse config file")?
        } else {
            tracing::debug!(path = %path.display(), "config file not found, using defaults");
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Reject values that would make ingestion or search meaningless.
    ///
    /// # Errors
    ///
    /// Returns an error naming the first invalid setting.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.store.sqlite_path.trim().is_empty() {
            bail!("store.sqlite_path must not be empty");
        }
        if self.chunking.max_chunk_size == 0 {
            bail!("chunking.max_chunk_size must be greater than 0");
        }
        if !(0.0..=1.0).contains(&self.chunking.grouping_threshold) {
            bail!(
                "chunking.grouping_threshold must be within [0, 1], got {}",
                self.chunking.grouping_threshold
            );
        }
        if !(0.0..=1.0).contains(&self.dedup.similarity_threshold) {
            bail!(
                "dedup.similarity_threshold must be within [0, 1], got {}",
                self.dedup.similarity_threshold
            );
        }
        if self.ingest.batch_size == 0 {
            bail!("ingest.batch_size must be greater than 0");
        }
        if self.search.top_k == 0 {
            bail!("search.top_k must be greater than 0");
        }
        if !(-1.0..=1.0).contains(&self.search.min_score) {
            bail!(
                "search.min_score must be within [-1, 1], got {}",
                self.search.min_score
            );
        }
        if self.search.max_candidates == 0 || self.search.candidate_multiplier == 0 {
            bail!("search.max_candidates and search.candidate_multiplier must be greater than 0");
        }
        if self.embedding.provider == EmbeddingProviderKind::Ollama
            && self.embedding.model.trim().is_empty()
        {
            bail!("embedding.model is required for the ollama provider");
        }
        Ok(())
    }

    #[must_use]
    pub fn splitter_config(&self) -> SplitterConfig {
        SplitterConfig {
            max_chunk_size: self.chunking.max_chunk_size,
            grouping_threshold: self.chunking.grouping_threshold,
        }
    }

    #[must_use]
    pub fn ingest_config(&self) -> IngestConfig {
        IngestConfig {
            batch_size: self.ingest.batch_size,
            similarity_threshold: self.dedup.similarity_threshold,
            max_file_size: self.ingest.max_file_size,
        }
    }

    #[must_use]
    pub fn search_config(&self) -> SearchConfig {
        SearchConfig {
            top_k: self.search.top_k,
            min_score: self.search.min_score,
            max_candidates: self.search.max_candidates,
            candidate_multiplier: self.search.candidate_multiplier,
        }
    }
}
