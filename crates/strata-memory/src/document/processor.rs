use strata_llm::EmbeddingProvider;

use super::features::{
    classify_difficulty, content_type, extract_concepts, extract_functions, select_code_examples,
    unescape_markup,
};
use super::fingerprint::fingerprint;
use super::splitter::TextSplitter;
use super::types::Document;
use crate::types::Chunk;

/// Turns a [`Document`] into tagged, fingerprinted chunk candidates.
#[derive(Debug, Clone, Default)]
pub struct ChunkProcessor {
    splitter: TextSplitter,
}

impl ChunkProcessor {
    #[must_use]
    pub fn new(splitter: TextSplitter) -> Self {
        Self { splitter }
    }

    /// Chunk `doc` in source order. Pre-chunked documents yield exactly one
    /// chunk and keep whatever tags they already carry.
    pub async fn process<E: EmbeddingProvider>(&self, doc: &Document, embedder: &E) -> Vec<Chunk> {
        let content = unescape_markup(&doc.content);
        let examples: Vec<String> = doc
            .code_examples
            .iter()
            .map(|e| unescape_markup(e))
            .filter(|e| !e.trim().is_empty())
            .collect();

        let pieces = if doc.preset.is_some() {
            let trimmed = content.trim();
            if trimmed.is_empty() {
                Vec::new()
            } else {
                vec![trimmed.to_owned()]
            }
        } else {
            self.splitter.split(&content, embedder).await
        };

        let preset = doc.preset.clone().unwrap_or_default();

        pieces
            .into_iter()
            .enumerate()
            .map(|(chunk_index, text)| {
                let functions = preset
                    .functions
                    .clone()
                    .unwrap_or_else(|| extract_functions(&text));
                let concepts = preset
                    .concepts
                    .clone()
                    .unwrap_or_else(|| extract_concepts(&text));
                let difficulty = preset
                    .difficulty
                    .unwrap_or_else(|| classify_difficulty(&text, functions.len()));

                Chunk {
                    id: fingerprint(&text),
                    source_file: doc.source_file.clone(),
                    source_url: doc.source_url.clone(),
                    title: doc.title.clone(),
                    code_examples: select_code_examples(&examples, &functions),
                    content_type: content_type(&functions),
                    functions,
                    concepts,
                    difficulty,
                    chunk_index,
                    content: text,
                }
            })
            .collect()
    }
}
