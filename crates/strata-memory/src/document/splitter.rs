use strata_llm::{EmbeddingProvider, cosine_similarity};

#[derive(Debug, Clone)]
pub struct SplitterConfig {
    /// Upper bound on chunk length in characters. A single sentence or
    /// paragraph longer than this is kept whole.
    pub max_chunk_size: usize,
    /// A sentence joins the running chunk only if its cosine similarity to the
    /// chunk's mean embedding is strictly above this.
    pub grouping_threshold: f32,
}

impl Default for SplitterConfig {
    fn default() -> Self {
        Self {
            max_chunk_size: 400,
            grouping_threshold: 0.7,
        }
    }
}

/// Splits documents into bounded chunks: by semantic similarity of
/// consecutive sentences when an embedding model is available, by paragraph
/// otherwise.
#[derive(Debug, Clone, Default)]
pub struct TextSplitter {
    config: SplitterConfig,
}

impl TextSplitter {
    #[must_use]
    pub fn new(config: SplitterConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &SplitterConfig {
        &self.config
    }

    /// Split `text` into non-empty chunks.
    pub async fn split<E: EmbeddingProvider>(&self, text: &str, embedder: &E) -> Vec<String> {
        let text = text.trim();
        if text.is_empty() {
            return Vec::new();
        }

        let sentences = split_sentences(text);
        if sentences.len() <= 1 {
            return vec![text.to_owned()];
        }

        if embedder.supports_embeddings() {
            match embedder.embed_batch(&sentences).await {
                Ok(vectors) if vectors.len() == sentences.len() => {
                    return group_by_similarity(
                        &sentences,
                        &vectors,
                        self.config.max_chunk_size,
                        self.config.grouping_threshold,
                    );
                }
                Ok(vectors) => {
                    tracing::warn!(
                        sentences = sentences.len(),
                        vectors = vectors.len(),
                        "sentence embedding count mismatch, falling back to paragraph split"
                    );
                }
                Err(e) => {
                    tracing::warn!("sentence embedding failed, falling back to paragraph split: {e:#}");
                }
            }
        }

        split_paragraphs(text, self.config.max_chunk_size)
    }
}

/// Split on `.`, `!`, `?` followed by whitespace, and on blank lines.
/// Returned sentences are trimmed and non-empty.
#[must_use]
pub fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();

    let chars: Vec<char> = text.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        current.push(chars[i]);

        // Split on paragraph breaks
        if chars[i] == '\n' && i + 1 < chars.len() && chars[i + 1] == '\n' {
            i += 1;
            push_trimmed(&mut sentences, &mut current);
        }
        // Split on sentence endings followed by whitespace
        else if matches!(chars[i], '.' | '?' | '!')
            && i + 1 < chars.len()
            && chars[i + 1].is_whitespace()
        {
            push_trimmed(&mut sentences, &mut current);
        }

        i += 1;
    }

    push_trimmed(&mut sentences, &mut current);
    sentences
}

fn push_trimmed(out: &mut Vec<String>, current: &mut String) {
    let s = current.trim();
    if !s.is_empty() {
        out.push(s.to_owned());
    }
    current.clear();
}

/// Greedily group consecutive sentences while each next sentence stays similar
/// to the running chunk's mean embedding and the joined length fits `max_size`
/// characters.
#[must_use]
pub fn group_by_similarity(
    sentences: &[String],
    vectors: &[Vec<f32>],
    max_size: usize,
    threshold: f32,
) -> Vec<String> {
    let mut chunks = Vec::new();
    let Some((first, rest)) = sentences.split_first() else {
        return chunks;
    };
    if vectors.len() != sentences.len() {
        return sentences.to_vec();
    }

    let mut current = first.clone();
    let mut current_chars = first.chars().count();
    let mut sum = vectors[0].clone();
    let mut members = 1_u16;

    for (sentence, vector) in rest.iter().zip(&vectors[1..]) {
        let mean: Vec<f32> = sum.iter().map(|x| x / f32::from(members)).collect();
        let similar = cosine_similarity(&mean, vector) > threshold;
        let sentence_chars = sentence.chars().count();
        let fits = current_chars + 1 + sentence_chars <= max_size;

        if similar && fits && members < u16::MAX && sum.len() == vector.len() {
            current.push(' ');
            current.push_str(sentence);
            current_chars += 1 + sentence_chars;
            for (acc, x) in sum.iter_mut().zip(vector) {
                *acc += x;
            }
            members += 1;
        } else {
            chunks.push(std::mem::replace(&mut current, sentence.clone()));
            current_chars = sentence_chars;
            sum.clone_from(vector);
            members = 1;
        }
    }

    chunks.push(current);
    chunks
}

/// Accumulate `\n\n`-separated paragraphs while the running chunk plus the
/// next paragraph fits `max_size` characters. An oversized paragraph becomes
/// its own chunk.
#[must_use]
pub fn split_paragraphs(text: &str, max_size: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_chars = 0;

    for para in text.split("\n\n").map(str::trim).filter(|p| !p.is_empty()) {
        let para_chars = para.chars().count();
        if !current.is_empty() && current_chars + 2 + para_chars > max_size {
            chunks.push(std::mem::take(&mut current));
            current_chars = 0;
        }
        if !current.is_empty() {
            current.push_str("\n\n");
            current_chars += 2;
        }
        current.push_str(para);
        current_chars += para_chars;
    }

    if !current.is_empty() {
        chunks.push(current);
    }

    chunks
}

#[cfg(test)]
mod tests {
    use strata_llm::fallback::HashOnlyEmbedder;
    use strata_llm::mock::MockEmbedder;

    use super::*;

    fn splitter(max: usize) -> TextSplitter {
        TextSplitter::new(SplitterConfig {
            max_chunk_size: max,
            grouping_threshold: 0.7,
        })
    }

    #[test]
    fn sentences_split_on_terminators() {
        let s = split_sentences("One. Two! Three? Four");
        assert_eq!(s, vec!["One.", "Two!", "Three?", "Four"]);
    }

    #[test]
    fn sentences_split_on_blank_lines() {
        let s = split_sentences("Heading\n\nBody text");
        assert_eq!(s, vec!["Heading", "Body text"]);
    }

    #[test]
    fn decimal_point_is_not_a_terminator() {
        let s = split_sentences("Set tempo to 0.5 now. Done");
        assert_eq!(s, vec!["Set tempo to 0.5 now.", "Done"]);
    }

    #[test]
    fn paragraphs_accumulate_under_cap() {
        let chunks = split_paragraphs("aa\n\nbb\n\ncc", 6);
        assert_eq!(chunks, vec!["aa\n\nbb", "cc"]);
    }

    #[test]
    fn oversized_paragraph_is_own_chunk() {
        let chunks = split_paragraphs("short\n\nthis paragraph is long\n\nend", 8);
        assert_eq!(chunks, vec!["short", "this paragraph is long", "end"]);
    }

    #[test]
    fn grouping_respects_similarity() {
        let sentences: Vec<String> = vec!["a".into(), "b".into(), "c".into()];
        let vectors = vec![vec![1.0, 0.0], vec![0.9, 0.1], vec![0.0, 1.0]];
        let chunks = group_by_similarity(&sentences, &vectors, 100, 0.7);
        assert_eq!(chunks, vec!["a b", "c"]);
    }

    #[test]
    fn grouping_respects_size() {
        let sentences: Vec<String> = vec!["aaaa".into(), "bbbb".into()];
        let vectors = vec![vec![1.0, 0.0], vec![1.0, 0.0]];
        let chunks = group_by_similarity(&sentences, &vectors, 8, 0.7);
        assert_eq!(chunks, vec!["aaaa", "bbbb"]);
    }

    #[test]
    fn size_cap_counts_characters() {
        let sentences: Vec<String> = vec!["ééééé.".into(), "ééééé.".into()];
        let vectors = vec![vec![1.0, 0.0], vec![1.0, 0.0]];
        assert_eq!(
            group_by_similarity(&sentences, &vectors, 13, 0.7),
            vec!["ééééé. ééééé."]
        );
        assert_eq!(
            split_paragraphs("ééééé\n\nüüüüü", 12),
            vec!["ééééé\n\nüüüüü"]
        );
        assert_eq!(split_paragraphs("ééééé\n\nüüüüü", 11).len(), 2);
    }

    #[tokio::test]
    async fn empty_text_yields_nothing() {
        assert!(splitter(10).split("   ", &HashOnlyEmbedder).await.is_empty());
    }

    #[tokio::test]
    async fn single_sentence_returned_whole() {
        let text = "One very long sentence that exceeds the cap";
        let chunks = splitter(5).split(text, &HashOnlyEmbedder).await;
        assert_eq!(chunks, vec![text]);
    }

    #[tokio::test]
    async fn no_model_short_sentences_single_paragraph() {
        let chunks = splitter(2).split("A. B. C.", &HashOnlyEmbedder).await;
        assert_eq!(chunks, vec!["A. B. C."]);
    }

    #[tokio::test]
    async fn semantic_path_groups_similar_sentences() {
        let embedder = MockEmbedder::new()
            .with_vector("Drums go here.", vec![1.0, 0.0])
            .with_vector("More drums.", vec![0.95, 0.05])
            .with_vector("Now chords.", vec![0.0, 1.0]);
        let chunks = splitter(400)
            .split("Drums go here. More drums. Now chords.", &embedder)
            .await;
        assert_eq!(chunks, vec!["Drums go here. More drums.", "Now chords."]);
    }

    #[tokio::test]
    async fn embedding_failure_falls_back_to_paragraphs() {
        let chunks = splitter(400)
            .split("One. Two.\n\nThree.", &MockEmbedder::failing())
            .await;
        assert_eq!(chunks, vec!["One. Two.\n\nThree."]);
    }

    mod proptest_splitter {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn semantic_chunks_bounded_unless_single_sentence(
                words in proptest::collection::vec("[a-z]{1,12}", 1..40),
                max in 10usize..80,
            ) {
                let sentences: Vec<String> = words.iter().map(|w| format!("{w}.")).collect();
                let vectors = vec![vec![1.0_f32, 0.0]; sentences.len()];
                for chunk in group_by_similarity(&sentences, &vectors, max, 0.7) {
                    prop_assert!(chunk.chars().count() <= max || !chunk.contains(' '));
                }
            }

            #[test]
            fn paragraphs_preserve_all_text(
                paras in proptest::collection::vec("[a-z]{1,20}", 1..10),
                max in 5usize..60,
            ) {
                let text = paras.join("\n\n");
                let joined = split_paragraphs(&text, max).join("\n\n");
                prop_assert_eq!(joined, text);
            }

            #[test]
            fn sentences_never_empty(text in "[a-zA-Z.!? \n]{0,200}") {
                for s in split_sentences(&text) {
                    prop_assert!(!s.trim().is_empty());
                }
            }
        }
    }
}
