use super::Config;

impl Config {
    pub(crate) fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("STRATA_SQLITE_PATH") {
            self.store.sqlite_path = v;
        }
        if let Ok(v) = std::env::var("STRATA_INDEX_CACHE")
            && let Ok(enabled) = v.parse::<bool>()
        {
            self.store.index_cache = enabled;
        }
        if let Ok(v) = std::env::var("STRATA_EMBEDDING_PROVIDER") {
            if let Ok(kind) = serde_json::from_value(serde_json::Value::String(v.clone())) {
                self.embedding.provider = kind;
            } else {
                tracing::warn!("ignoring invalid STRATA_EMBEDDING_PROVIDER value: {v}");
            }
        }
        if let Ok(v) = std::env::var("STRATA_EMBEDDING_BASE_URL") {
            self.embedding.base_url = v;
        }
        if let Ok(v) = std::env::var("STRATA_EMBEDDING_MODEL") {
            self.embedding.model = v;
        }
        if let Ok(v) = std::env::var("STRATA_CANDLE_REPO") {
            self.embedding.candle_repo = v;
        }
        if let Ok(v) = std::env::var("STRATA_MAX_CHUNK_SIZE")
            && let Ok(size) = v.parse::<usize>()
        {
            self.chunking.max_chunk_size = size;
        }
        if let Ok(v) = std::env::var("STRATA_GROUPING_THRESHOLD")
            && let Ok(threshold) = v.parse::<f32>()
        {
            self.chunking.grouping_threshold = threshold;
        }
        if let Ok(v) = std::env::var("STRATA_SIMILARITY_THRESHOLD")
            && let Ok(threshold) = v.parse::<f32>()
        {
            self.dedup.similarity_threshold = threshold;
        }
        if let Ok(v) = std::env::var("STRATA_BATCH_SIZE")
            && let Ok(n) = v.parse::<usize>()
        {
            self.ingest.batch_size = n;
        }
        if let Ok(v) = std::env::var("STRATA_SEARCH_TOP_K")
            && let Ok(n) = v.parse::<usize>()
        {
            self.search.top_k = n;
        }
        if let Ok(v) = std::env::var("STRATA_SEARCH_MIN_SCORE")
            && let Ok(score) = v.parse::<f32>()
        {
            self.search.min_score = score;
        }
    }
}
