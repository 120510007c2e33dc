//! Application bootstrap: config resolution, embedder/store/index construction.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use strata_index::cache::cache_path_for;
use strata_index::{IndexHandle, RebuildOutcome, SearchService};
use strata_llm::AnyEmbedder;
use strata_llm::EmbeddingProvider;
use strata_llm::fallback::HashOnlyEmbedder;
use strata_llm::ollama::OllamaEmbedder;
use strata_memory::document::{ChunkProcessor, TextSplitter};
use strata_memory::{BatchReport, IngestionPipeline, SqliteStore};

use crate::config::{Config, EmbeddingProviderKind};

/// Priority: `--config` flag > `STRATA_CONFIG` env > `config/default.toml`.
#[must_use]
pub fn resolve_config_path(cli: Option<&Path>) -> PathBuf {
    if let Some(path) = cli {
        return path.to_path_buf();
    }
    if let Ok(path) = std::env::var("STRATA_CONFIG") {
        return PathBuf::from(path);
    }
    PathBuf::from("config/default.toml")
}

/// Construct the embedder named by `[embedding] provider`.
///
/// # Errors
///
/// Returns an error if the candle model cannot be loaded, or candle is
/// selected in a build without the `candle` feature.
pub async fn create_embedder(config: &Config) -> anyhow::Result<AnyEmbedder> {
    let embedder = match config.embedding.provider {
        EmbeddingProviderKind::Ollama => AnyEmbedder::from(OllamaEmbedder::new(
            &config.embedding.base_url,
            config.embedding.model.clone(),
        )),
        #[cfg(feature = "candle")]
        EmbeddingProviderKind::Candle => {
            let repo = config.embedding.candle_repo.clone();
            let embedder = tokio::task::spawn_blocking(move || {
                strata_llm::candle_provider::CandleEmbedder::load(&repo)
            })
            .await
            .context("candle loader task failed")?
            .context("failed to load candle embedding model")?;
            AnyEmbedder::from(embedder)
        }
        #[cfg(not(feature = "candle"))]
        EmbeddingProviderKind::Candle => {
            anyhow::bail!("embedding provider 'candle' requires the `candle` feature")
        }
        EmbeddingProviderKind::None => AnyEmbedder::from(HashOnlyEmbedder),
    };
    tracing::info!(
        provider = embedder.name(),
        model = embedder.model_name(),
        semantic = embedder.supports_embeddings(),
        "embedder ready"
    );
    Ok(embedder)
}

/// Open the store, creating parent directories for file-backed databases.
///
/// # Errors
///
/// Returns an error if the directory cannot be created or the database
/// cannot be opened or migrated.
pub async fn open_store(config: &Config) -> anyhow::Result<SqliteStore> {
    let path = &config.store.sqlite_path;
    if path != ":memory:"
        && let Some(parent) = Path::new(path).parent()
        && !parent.as_os_str().is_empty()
    {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    SqliteStore::new(path)
        .await
        .with_context(|| format!("failed to open store at {path}"))
}

/// Wired components sharing one store, embedder and index handle.
pub struct App {
    config: Config,
    store: SqliteStore,
    embedder: AnyEmbedder,
    index: Arc<IndexHandle>,
}

impl std::fmt::Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("embedder", &self.embedder.name())
            .field("index", &self.index)
            .finish_non_exhaustive()
    }
}

impl App {
    /// Build every component from `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the embedder or the store cannot be created.
    pub async fn build(config: Config) -> anyhow::Result<Self> {
        let embedder = create_embedder(&config).await?;
        let store = open_store(&config).await?;
        Ok(Self::from_parts(config, store, embedder))
    }

    #[must_use]
    pub fn from_parts(config: Config, store: SqliteStore, embedder: AnyEmbedder) -> Self {
        let cache = if config.store.index_cache {
            cache_path_for(&config.store.sqlite_path)
        } else {
            None
        };
        Self {
            config,
            store,
            embedder,
            index: Arc::new(IndexHandle::new().with_cache(cache)),
        }
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    #[must_use]
    pub fn store(&self) -> &SqliteStore {
        &self.store
    }

    #[must_use]
    pub fn pipeline(&self) -> IngestionPipeline<AnyEmbedder> {
        IngestionPipeline::new(
            self.store.clone(),
            self.embedder.clone(),
            ChunkProcessor::new(TextSplitter::new(self.config.splitter_config())),
            self.config.ingest_config(),
        )
    }

    #[must_use]
    pub fn search_service(&self) -> SearchService<AnyEmbedder> {
        SearchService::new(
            self.store.clone(),
            self.embedder.clone(),
            Arc::clone(&self.index),
            self.config.search_config(),
        )
    }

    /// Ingest `paths` and rebuild the index if anything was added.
    ///
    /// # Errors
    ///
    /// Returns an error if the duplicate detector cannot be seeded.
    pub async fn ingest(
        &self,
        paths: &[PathBuf],
    ) -> anyhow::Result<(BatchReport, Option<RebuildOutcome>)> {
        let report = self
            .pipeline()
            .ingest_paths(paths)
            .await
            .context("ingestion failed")?;
        let rebuild = if report.changed() {
            Some(self.rebuild_index().await)
        } else {
            None
        };
        Ok((report, rebuild))
    }

    pub async fn rebuild_index(&self) -> RebuildOutcome {
        self.index
            .rebuild(&self.store, self.embedder.model_name())
            .await
    }

    /// Install the on-disk index cache if it is current. Never rebuilds.
    pub async fn load_cached_index(&self) -> bool {
        self.index
            .load_cached(&self.store, self.embedder.model_name())
            .await
    }
}
