//! Test-only mock embedding provider.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use crate::error::LlmError;
use crate::provider::EmbeddingProvider;

#[derive(Debug, Clone)]
pub struct MockEmbedder {
    vectors: HashMap<String, Vec<f32>>,
    fail_on: HashSet<String>,
    calls: Arc<Mutex<usize>>,
    pub default_vector: Vec<f32>,
    pub supports_embeddings: bool,
    pub fail_all: bool,
    pub model: String,
}

impl Default for MockEmbedder {
    fn default() -> Self {
        Self {
            vectors: HashMap::new(),
            fail_on: HashSet::new(),
            calls: Arc::new(Mutex::new(0)),
            default_vector: vec![0.0; 4],
            supports_embeddings: true,
            fail_all: false,
            model: "mock-embed".into(),
        }
    }
}

impl MockEmbedder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Return `vector` whenever exactly `text` is embedded.
    #[must_use]
    pub fn with_vector(mut self, text: impl Into<String>, vector: Vec<f32>) -> Self {
        self.vectors.insert(text.into(), vector);
        self
    }

    #[must_use]
    pub fn with_default(mut self, vector: Vec<f32>) -> Self {
        self.default_vector = vector;
        self
    }

    /// Fail whenever exactly `text` is embedded.
    #[must_use]
    pub fn failing_on(mut self, text: impl Into<String>) -> Self {
        self.fail_on.insert(text.into());
        self
    }

    #[must_use]
    pub fn failing() -> Self {
        Self {
            fail_all: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn without_embeddings() -> Self {
        Self {
            supports_embeddings: false,
            ..Self::default()
        }
    }

    /// Number of texts embedded so far.
    #[must_use]
    pub fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

impl EmbeddingProvider for MockEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, LlmError> {
        *self.calls.lock().unwrap() += 1;
        if !self.supports_embeddings {
            return Err(LlmError::EmbedUnsupported { provider: "mock" });
        }
        if self.fail_all || self.fail_on.contains(text) {
            return Err(LlmError::Other("mock embedding error".into()));
        }
        Ok(self
            .vectors
            .get(text)
            .cloned()
            .unwrap_or_else(|| self.default_vector.clone()))
    }

    fn supports_embeddings(&self) -> bool {
        self.supports_embeddings
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "mock"
    }
}
