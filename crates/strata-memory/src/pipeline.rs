//! Ingestion driver: load → chunk → dedup → embed → commit.

use std::path::{Path, PathBuf};

use strata_llm::{EmbeddingProvider, LlmError};

use crate::dedup::DuplicateDetector;
use crate::document::{ChunkProcessor, DEFAULT_MAX_FILE_SIZE, load_source};
use crate::error::MemoryError;
use crate::sqlite::{SqliteStore, provenance_key};
use crate::types::{Chunk, EmbeddedChunk, Facet};

#[derive(Debug, Clone)]
pub struct IngestConfig {
    /// Entries processed between commits.
    pub batch_size: usize,
    pub similarity_threshold: f32,
    pub max_file_size: u64,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            batch_size: 50,
            similarity_threshold: 0.85,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }
}

/// Summary of an ingestion run.
#[derive(Debug, Default, Clone, PartialEq, Eq, serde::Serialize)]
pub struct BatchReport {
    pub files_seen: usize,
    pub files_processed: usize,
    /// Files skipped because their content hash is unchanged.
    pub files_skipped: usize,
    pub entries: usize,
    pub chunks_added: usize,
    pub duplicates: usize,
    pub input_errors: usize,
    /// Chunks stored without facet vectors.
    pub embedding_failures: usize,
    pub storage_errors: usize,
    pub errors: Vec<String>,
    pub duration_ms: u64,
}

impl BatchReport {
    /// Whether anything new was committed, i.e. the ANN index is stale.
    #[must_use]
    pub fn changed(&self) -> bool {
        self.chunks_added > 0
    }
}

/// Per-file counters folded into the run report.
#[derive(Debug, Default)]
struct FileTally {
    added: usize,
    storage_errors: usize,
}

pub struct IngestionPipeline<E> {
    store: SqliteStore,
    embedder: E,
    processor: ChunkProcessor,
    config: IngestConfig,
}

impl<E: EmbeddingProvider> IngestionPipeline<E> {
    #[must_use]
    pub fn new(
        store: SqliteStore,
        embedder: E,
        processor: ChunkProcessor,
        config: IngestConfig,
    ) -> Self {
        Self {
            store,
            embedder,
            processor,
            config,
        }
    }

    #[must_use]
    pub fn store(&self) -> &SqliteStore {
        &self.store
    }

    /// Ingest files and directories in order. A directory contributes its
    /// `*.json` files, sorted by name.
    ///
    /// # Errors
    ///
    /// Returns an error only if the duplicate detector cannot be seeded from
    /// the store. Per-file and per-entry failures are counted in the report.
    pub async fn ingest_paths(&self, paths: &[PathBuf]) -> Result<BatchReport, MemoryError> {
        let start = std::time::Instant::now();
        let mut report = BatchReport::default();
        let mut detector =
            DuplicateDetector::from_store(&self.store, self.config.similarity_threshold).await?;

        let files = expand_paths(paths, &mut report);
        let total = files.len();
        tracing::info!(total, "ingestion started");

        for (i, file) in files.iter().enumerate() {
            report.files_seen += 1;
            let key = provenance_key(file).await;
            match self.process_file(file, &key, &mut detector, &mut report).await {
                Ok(Some(tally)) => {
                    report.files_processed += 1;
                    tracing::info!(
                        file = %key,
                        progress = format_args!("{}/{total}", i + 1),
                        added = tally.added,
                        storage_errors = tally.storage_errors,
                    );
                }
                Ok(None) => {
                    report.files_skipped += 1;
                    tracing::debug!(file = %key, "unchanged, skipped");
                }
                Err(e) => {
                    if e.is_storage() {
                        report.storage_errors += 1;
                    } else {
                        report.input_errors += 1;
                    }
                    report.errors.push(format!("{key}: {e:#}"));
                    tracing::warn!(file = %key, "ingestion failed: {e:#}");
                }
            }
        }

        report.duration_ms = start.elapsed().as_millis().try_into().unwrap_or(u64::MAX);
        tracing::info!(
            files = report.files_processed,
            skipped = report.files_skipped,
            added = report.chunks_added,
            duplicates = report.duplicates,
            errors = report.errors.len(),
            duration_ms = report.duration_ms,
            "ingestion complete"
        );
        Ok(report)
    }

    /// Ingest a single file or directory.
    ///
    /// # Errors
    ///
    /// See [`IngestionPipeline::ingest_paths`].
    pub async fn ingest_path(&self, path: &Path) -> Result<BatchReport, MemoryError> {
        self.ingest_paths(&[path.to_path_buf()]).await
    }

    /// `Ok(None)` when the file is unchanged since it was last processed.
    async fn process_file(
        &self,
        path: &Path,
        key: &str,
        detector: &mut DuplicateDetector,
        report: &mut BatchReport,
    ) -> Result<Option<FileTally>, MemoryError> {
        if self.store.is_file_processed(path).await? {
            return Ok(None);
        }
        let source = load_source(path, key, self.config.max_file_size).await?;

        let mut tally = FileTally::default();
        let mut buffer: Vec<EmbeddedChunk> = Vec::new();
        let batch_size = self.config.batch_size.max(1);

        for (n, entry) in source.entries.into_iter().enumerate() {
            report.entries += 1;
            let doc = match entry {
                Ok(doc) => doc,
                Err(e) => {
                    report.input_errors += 1;
                    report.errors.push(format!("{key} entry {n}: {e:#}"));
                    continue;
                }
            };

            for chunk in self.processor.process(&doc, &self.embedder).await {
                let check = detector.check(&chunk.content, &self.embedder).await;
                if check.is_duplicate {
                    report.duplicates += 1;
                    tracing::debug!(
                        id = %chunk.id,
                        similarity = check.similarity,
                        "duplicate skipped"
                    );
                    continue;
                }

                let facets = match self.embed_facets(&chunk, check.vector).await {
                    Ok(facets) => facets,
                    Err(e) => {
                        report.embedding_failures += 1;
                        tracing::warn!(id = %chunk.id, "storing chunk without embeddings: {e:#}");
                        Vec::new()
                    }
                };
                let content_vector = facets
                    .iter()
                    .find(|(f, _)| *f == Facet::Content)
                    .map(|(_, v)| v.clone());
                detector.register(chunk.id.clone(), content_vector);
                buffer.push(EmbeddedChunk { chunk, facets });
            }

            if (n + 1) % batch_size == 0 {
                self.flush(&mut buffer, key, detector, &mut tally, report).await;
            }
        }
        self.flush(&mut buffer, key, detector, &mut tally, report).await;

        report.chunks_added += tally.added;
        if tally.storage_errors == 0 {
            self.store
                .mark_file_processed(key, &source.file_hash, tally.added)
                .await?;
        } else {
            tracing::warn!(
                file = %key,
                failed = tally.storage_errors,
                "file left unmarked so the next run retries it"
            );
        }
        Ok(Some(tally))
    }

    /// Compute every non-empty facet. `content_vector` is reused when the
    /// duplicate check already embedded the content.
    async fn embed_facets(
        &self,
        chunk: &Chunk,
        content_vector: Option<Vec<f32>>,
    ) -> Result<Vec<(Facet, Vec<f32>)>, LlmError> {
        if !self.embedder.supports_embeddings() {
            return Ok(Vec::new());
        }

        let mut pending: Vec<(Facet, String)> = Vec::new();
        if content_vector.is_none() {
            pending.push((Facet::Content, chunk.content.clone()));
        }
        for (facet, text) in facet_texts(chunk) {
            if !text.is_empty() {
                pending.push((facet, text));
            }
        }

        let texts: Vec<String> = pending.iter().map(|(_, t)| t.clone()).collect();
        let vectors = self.embedder.embed_batch(&texts).await?;
        if vectors.len() != texts.len() {
            return Err(LlmError::BatchMismatch {
                sent: texts.len(),
                received: vectors.len(),
            });
        }

        let mut facets: Vec<(Facet, Vec<f32>)> = content_vector
            .map(|v| (Facet::Content, v))
            .into_iter()
            .collect();
        facets.extend(pending.into_iter().map(|(f, _)| f).zip(vectors));
        Ok(facets)
    }

    /// Commit the buffered chunks. A failed transaction is retried one chunk
    /// at a time so only the failing chunks are lost; those are dropped from
    /// `detector` so a later copy is not mistaken for a duplicate.
    async fn flush(
        &self,
        buffer: &mut Vec<EmbeddedChunk>,
        key: &str,
        detector: &mut DuplicateDetector,
        tally: &mut FileTally,
        report: &mut BatchReport,
    ) {
        if buffer.is_empty() {
            return;
        }
        let model = self.embedder.model_name();
        let items = std::mem::take(buffer);

        match self.store.commit_batch(&items, model).await {
            Ok(()) => {
                tally.added += items.len();
                tracing::debug!(file = %key, committed = items.len(), "batch committed");
            }
            Err(e) => {
                tracing::warn!(file = %key, "batch commit failed, retrying per chunk: {e:#}");
                for item in &items {
                    match self.store.commit_batch(std::slice::from_ref(item), model).await {
                        Ok(()) => tally.added += 1,
                        Err(e) => {
                            detector.forget(&item.chunk.id);
                            tally.storage_errors += 1;
                            report.storage_errors += 1;
                            report
                                .errors
                                .push(format!("{key} chunk {}: {e:#}", item.chunk.id));
                        }
                    }
                }
            }
        }
    }
}

/// Text embedded for each non-content facet.
fn facet_texts(chunk: &Chunk) -> [(Facet, String); 3] {
    [
        (Facet::Code, chunk.code_examples.join("\n\n")),
        (Facet::Functions, chunk.functions.join(" ")),
        (Facet::Concepts, chunk.concepts.join(" ").replace('_', " ")),
    ]
}

fn expand_paths(paths: &[PathBuf], report: &mut BatchReport) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            let mut found: Vec<PathBuf> = ignore::WalkBuilder::new(path)
                .max_depth(Some(1))
                .hidden(true)
                .git_ignore(true)
                .build()
                .flatten()
                .filter(|e| e.file_type().is_some_and(|ft| ft.is_file()))
                .map(ignore::DirEntry::into_path)
                .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
                .collect();
            found.sort();
            files.extend(found);
        } else if path.is_file() {
            files.push(path.clone());
        } else {
            report.input_errors += 1;
            report
                .errors
                .push(format!("{}: no such file or directory", path.display()));
        }
    }
    files
}
