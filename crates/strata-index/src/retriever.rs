//! Query-time retrieval over the flat index.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::Serialize;
use strata_llm::EmbeddingProvider;
use strata_memory::{ChunkRecord, SqliteStore, StoreStats};

use crate::error::Result;
use crate::handle::{IndexHandle, RebuildOutcome};

#[derive(Debug, Clone)]
pub struct SearchConfig {
    pub top_k: usize,
    pub min_score: f32,
    /// Hard cap on candidates pulled from the index.
    pub max_candidates: usize,
    /// Candidates fetched per requested result, before filtering.
    pub candidate_multiplier: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            top_k: 15,
            min_score: 0.2,
            max_candidates: 50,
            candidate_multiplier: 3,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    #[serde(flatten)]
    pub record: ChunkRecord,
    pub score: f32,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SearchSummary {
    pub query: String,
    pub count: usize,
    pub avg_score: f32,
    /// `(min, max)` score of the returned results.
    pub score_range: (f32, f32),
    /// Union of function and concept tags, sorted.
    pub tags_found: Vec<String>,
    pub functions_found: Vec<String>,
    pub concepts_found: Vec<String>,
    /// Distinct source locators, sorted.
    pub sources: Vec<String>,
    pub difficulty_levels: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SearchResponse {
    pub results: Vec<SearchResult>,
    pub summary: SearchSummary,
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct ServiceStats {
    #[serde(flatten)]
    pub store: StoreStats,
    pub index_size: usize,
}

/// Embeds queries, searches the current index, and joins hits back to chunks.
pub struct SearchService<E> {
    store: SqliteStore,
    embedder: E,
    index: Arc<IndexHandle>,
    config: SearchConfig,
}

impl<E: EmbeddingProvider> SearchService<E> {
    #[must_use]
    pub fn new(store: SqliteStore, embedder: E, index: Arc<IndexHandle>, config: SearchConfig) -> Self {
        Self {
            store,
            embedder,
            index,
            config,
        }
    }

    #[must_use]
    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Search with the configured `top_k` and `min_score`.
    ///
    /// # Errors
    ///
    /// See [`SearchService::search`].
    pub async fn search_default(&self, query: &str) -> Result<SearchResponse> {
        self.search(query, self.config.top_k, self.config.min_score)
            .await
    }

    /// Up to `top_k` chunks scoring at least `min_score`, best first.
    ///
    /// Builds the index first if none exists; an empty corpus yields an
    /// empty response.
    ///
    /// # Errors
    ///
    /// Returns an error if the query cannot be embedded, its dimension does
    /// not match the index, or a matched chunk cannot be read.
    pub async fn search(&self, query: &str, top_k: usize, min_score: f32) -> Result<SearchResponse> {
        let Some(index) = self
            .index
            .ensure(&self.store, self.embedder.model_name())
            .await?
        else {
            tracing::debug!("search on empty corpus");
            return Ok(empty_response(query));
        };

        let query_vector = self.embedder.embed(query).await?;
        let fetch = top_k
            .saturating_mul(self.config.candidate_multiplier)
            .min(self.config.max_candidates);
        let candidates = index.search(&query_vector, fetch)?;
        let fetched = candidates.len();

        let mut results = Vec::with_capacity(top_k.min(fetched));
        for (id, score) in candidates {
            if score < min_score {
                continue;
            }
            if let Some(record) = self.store.get_chunk(&id).await? {
                results.push(SearchResult { record, score });
            } else {
                tracing::warn!(id = %id, "indexed chunk missing from store");
            }
            if results.len() == top_k {
                break;
            }
        }

        tracing::debug!(fetched, returned = results.len(), "search complete");
        let summary = summarize(query, &results);
        Ok(SearchResponse { results, summary })
    }

    /// Rebuild the index from the store.
    pub async fn rebuild_index(&self) -> RebuildOutcome {
        self.index
            .rebuild(&self.store, self.embedder.model_name())
            .await
    }

    /// # Errors
    ///
    /// Returns an error if the store counts cannot be read.
    pub async fn stats(&self) -> Result<ServiceStats> {
        Ok(ServiceStats {
            store: self.store.stats().await?,
            index_size: self.index.size(),
        })
    }
}

fn empty_response(query: &str) -> SearchResponse {
    SearchResponse {
        results: Vec::new(),
        summary: SearchSummary {
            query: query.to_owned(),
            ..SearchSummary::default()
        },
    }
}

/// Aggregate statistics over a result list.
#[must_use]
pub fn summarize(query: &str, results: &[SearchResult]) -> SearchSummary {
    if results.is_empty() {
        return empty_response(query).summary;
    }

    let scores: Vec<f32> = results.iter().map(|r| r.score).collect();
    let min = scores.iter().copied().fold(f32::INFINITY, f32::min);
    let max = scores.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    #[allow(clippy::cast_precision_loss)]
    let avg = scores.iter().sum::<f32>() / scores.len() as f32;

    let mut functions = BTreeSet::new();
    let mut concepts = BTreeSet::new();
    let mut sources = BTreeSet::new();
    let mut difficulties = BTreeSet::new();
    for r in results {
        let c = &r.record.chunk;
        functions.extend(c.functions.iter().cloned());
        concepts.extend(c.concepts.iter().cloned());
        if !c.source_url.is_empty() {
            sources.insert(c.source_url.clone());
        }
        difficulties.insert(c.difficulty.as_str().to_owned());
    }
    let tags: BTreeSet<String> = functions.union(&concepts).cloned().collect();

    SearchSummary {
        query: query.to_owned(),
        count: results.len(),
        avg_score: (avg * 1000.0).round() / 1000.0,
        score_range: (min, max),
        tags_found: tags.into_iter().collect(),
        functions_found: functions.into_iter().collect(),
        concepts_found: concepts.into_iter().collect(),
        sources: sources.into_iter().collect(),
        difficulty_levels: difficulties.into_iter().collect(),
    }
}

#[cfg(test)]
mod tests {
    use strata_llm::mock::MockEmbedder;
    use strata_memory::document::fingerprint;
    use strata_memory::{Chunk, ContentType, Difficulty, EmbeddedChunk, Facet};

    use super::*;

    fn chunk(content: &str, url: &str) -> Chunk {
        Chunk {
            id: fingerprint(content),
            source_file: "kb.json".into(),
            source_url: url.into(),
            title: "T".into(),
            content: content.into(),
            functions: vec![format!("fn_{content}")],
            concepts: vec!["rhythm_timing".into()],
            code_examples: Vec::new(),
            difficulty: Difficulty::Beginner,
            content_type: ContentType::Text,
            chunk_index: 0,
        }
    }

    async fn service(
        vectors: &[(&str, Vec<f32>)],
        embedder: MockEmbedder,
    ) -> SearchService<MockEmbedder> {
        let store = SqliteStore::new(":memory:").await.unwrap();
        let items: Vec<EmbeddedChunk> = vectors
            .iter()
            .map(|(text, v)| EmbeddedChunk {
                chunk: chunk(text, &format!("https://docs/{text}")),
                facets: vec![(Facet::Content, v.clone())],
            })
            .collect();
        store.commit_batch(&items, "mock-embed").await.unwrap();
        SearchService::new(
            store,
            embedder,
            Arc::new(IndexHandle::new()),
            SearchConfig::default(),
        )
    }

    #[tokio::test]
    async fn empty_corpus_returns_empty_response() {
        let svc = service(&[], MockEmbedder::new()).await;
        let resp = svc.search("anything", 5, 0.0).await.unwrap();
        assert!(resp.results.is_empty());
        assert_eq!(resp.summary.count, 0);
        assert_eq!(resp.summary.query, "anything");
    }

    #[tokio::test]
    async fn stored_vector_query_ranks_its_chunk_first() {
        let embedder = MockEmbedder::new().with_vector("q", vec![0.0, 1.0, 0.0]);
        let svc = service(
            &[
                ("one", vec![1.0, 0.0, 0.0]),
                ("two", vec![0.0, 1.0, 0.0]),
                ("three", vec![0.0, 0.0, 1.0]),
            ],
            embedder,
        )
        .await;

        let resp = svc.search("q", 3, 0.0).await.unwrap();
        assert_eq!(resp.results[0].record.chunk.content, "two");
        assert!((resp.results[0].score - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn min_score_filters_low_candidates() {
        // cos(q, low) = 0.3, cos(q, high) = 0.8
        let embedder = MockEmbedder::new().with_vector("q", vec![1.0, 0.0]);
        let svc = service(
            &[("low", vec![0.3, 0.953_939_2]), ("high", vec![0.8, 0.6])],
            embedder,
        )
        .await;

        let resp = svc.search("q", 10, 0.5).await.unwrap();
        assert_eq!(resp.results.len(), 1);
        assert_eq!(resp.results[0].record.chunk.content, "high");
    }

    #[tokio::test]
    async fn top_k_truncates() {
        let embedder = MockEmbedder::new().with_vector("q", vec![1.0, 0.0]);
        let svc = service(
            &[
                ("a", vec![1.0, 0.1]),
                ("b", vec![1.0, 0.2]),
                ("c", vec![1.0, 0.3]),
            ],
            embedder,
        )
        .await;

        let resp = svc.search("q", 2, 0.0).await.unwrap();
        assert_eq!(resp.results.len(), 2);
        assert_eq!(resp.results[0].record.chunk.content, "a");
        assert_eq!(resp.summary.count, 2);
    }

    #[tokio::test]
    async fn summary_aggregates_results() {
        let embedder = MockEmbedder::new().with_vector("q", vec![1.0, 0.0]);
        let svc = service(
            &[("a", vec![1.0, 0.0]), ("b", vec![0.6, 0.8])],
            embedder,
        )
        .await;

        let s = svc.search("q", 5, 0.0).await.unwrap().summary;
        assert_eq!(s.count, 2);
        assert!((s.avg_score - 0.8).abs() < 1e-6);
        assert!((s.score_range.0 - 0.6).abs() < 1e-5);
        assert!((s.score_range.1 - 1.0).abs() < 1e-5);
        assert_eq!(s.functions_found, vec!["fn_a", "fn_b"]);
        assert_eq!(s.concepts_found, vec!["rhythm_timing"]);
        assert_eq!(s.tags_found, vec!["fn_a", "fn_b", "rhythm_timing"]);
        assert_eq!(s.sources, vec!["https://docs/a", "https://docs/b"]);
        assert_eq!(s.difficulty_levels, vec!["beginner"]);
    }

    #[tokio::test]
    async fn query_embedding_failure_is_an_error() {
        let svc = service(&[("a", vec![1.0, 0.0])], MockEmbedder::failing()).await;
        assert!(svc.search("q", 5, 0.0).await.is_err());
    }

    #[tokio::test]
    async fn stats_include_index_size() {
        let embedder = MockEmbedder::new().with_vector("q", vec![1.0, 0.0]);
        let svc = service(&[("a", vec![1.0, 0.0])], embedder).await;
        assert_eq!(svc.stats().await.unwrap().index_size, 0);

        svc.search("q", 1, 0.0).await.unwrap();
        let stats = svc.stats().await.unwrap();
        assert_eq!(stats.index_size, 1);
        assert_eq!(stats.store.total_chunks, 1);
    }

    #[test]
    fn summarize_empty() {
        let s = summarize("q", &[]);
        assert_eq!(s.count, 0);
        assert!(s.avg_score.abs() < f32::EPSILON);
        assert!(s.sources.is_empty());
    }
}
