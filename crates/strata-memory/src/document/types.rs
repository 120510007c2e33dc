use serde::Deserialize;

use crate::error::MemoryError;
use crate::types::Difficulty;

/// One record as it appears in an input file. Every field is optional here;
/// [`Document::from_entry`] decides what is required.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SourceEntry {
    #[serde(default)]
    pub id: Option<serde_json::Value>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub source_url: Option<String>,
    #[serde(default, alias = "source_title")]
    pub title: Option<String>,
    #[serde(default)]
    pub code_examples: Vec<String>,
    #[serde(default, alias = "strudel_functions")]
    pub functions: Option<Vec<String>>,
    #[serde(default, alias = "music_concepts")]
    pub concepts: Option<Vec<String>>,
    #[serde(default, alias = "difficulty_level")]
    pub difficulty: Option<String>,
}

/// Tags already computed upstream for a pre-chunked record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PresetTags {
    pub functions: Option<Vec<String>>,
    pub concepts: Option<Vec<String>>,
    pub difficulty: Option<Difficulty>,
}

/// A validated input record ready for chunking.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub content: String,
    pub code_examples: Vec<String>,
    pub source_file: String,
    pub source_url: String,
    pub title: String,
    /// Pre-chunked records become exactly one chunk and keep their tags.
    pub preset: Option<PresetTags>,
}

impl Document {
    /// Plain document with no code examples or upstream tags.
    #[must_use]
    pub fn new(content: impl Into<String>, source_file: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            code_examples: Vec::new(),
            source_file: source_file.into(),
            source_url: String::new(),
            title: String::new(),
            preset: None,
        }
    }

    /// Validate a raw entry. `content` must be a non-empty string.
    ///
    /// # Errors
    ///
    /// Returns [`MemoryError::Input`] if `content` is missing or blank.
    pub fn from_entry(
        entry: SourceEntry,
        source_file: &str,
        fallback_url: Option<&str>,
        pre_chunked: bool,
    ) -> Result<Self, MemoryError> {
        let content = entry
            .content
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| MemoryError::Input("entry has no content".into()))?;

        let preset = (pre_chunked || entry.id.is_some()).then(|| PresetTags {
            functions: entry.functions,
            concepts: entry.concepts,
            difficulty: entry.difficulty.and_then(|d| d.parse().ok()),
        });

        Ok(Self {
            content,
            code_examples: entry.code_examples,
            source_file: source_file.to_owned(),
            source_url: entry
                .source_url
                .or_else(|| fallback_url.map(str::to_owned))
                .unwrap_or_default(),
            title: entry.title.unwrap_or_default(),
            preset,
        })
    }
}
