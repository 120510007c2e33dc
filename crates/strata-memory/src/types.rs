use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Content fingerprint of a chunk, used as its primary key.
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, sqlx::Type, Serialize, Deserialize,
)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct ChunkId(pub String);

impl ChunkId {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ChunkId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One independently embedded view of a chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Facet {
    Content,
    Code,
    #[serde(rename = "tags-functions")]
    Functions,
    #[serde(rename = "tags-concepts")]
    Concepts,
}

impl Facet {
    pub const ALL: [Facet; 4] = [Self::Content, Self::Code, Self::Functions, Self::Concepts];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Content => "content",
            Self::Code => "code",
            Self::Functions => "tags-functions",
            Self::Concepts => "tags-concepts",
        }
    }
}

impl FromStr for Facet {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|f| f.as_str() == s)
            .ok_or_else(|| format!("unknown facet: {s}"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Beginner,
    #[default]
    Intermediate,
    Advanced,
}

impl Difficulty {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Beginner => "beginner",
            Self::Intermediate => "intermediate",
            Self::Advanced => "advanced",
        }
    }
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "beginner" => Ok(Self::Beginner),
            "intermediate" => Ok(Self::Intermediate),
            "advanced" => Ok(Self::Advanced),
            other => Err(format!("unknown difficulty: {other}")),
        }
    }
}

impl std::fmt::Display for Difficulty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    #[default]
    Text,
    Code,
}

impl ContentType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Code => "code",
        }
    }
}

impl FromStr for ContentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(Self::Text),
            "code" => Ok(Self::Code),
            other => Err(format!("unknown content type: {other}")),
        }
    }
}

/// A bounded unit of source text with its extracted metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: ChunkId,
    pub source_file: String,
    pub source_url: String,
    pub title: String,
    pub content: String,
    pub functions: Vec<String>,
    pub concepts: Vec<String>,
    pub code_examples: Vec<String>,
    pub difficulty: Difficulty,
    pub content_type: ContentType,
    pub chunk_index: usize,
}

impl Chunk {
    /// Content length in bytes.
    #[must_use]
    pub fn size(&self) -> usize {
        self.content.len()
    }
}

/// A chunk as read back from the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkRecord {
    #[serde(flatten)]
    pub chunk: Chunk,
    pub chunk_size: usize,
    pub created_at: String,
}

/// A chunk staged for commit together with its facet vectors. `facets` may
/// be empty when embedding failed.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddedChunk {
    pub chunk: Chunk,
    pub facets: Vec<(Facet, Vec<f32>)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct StoreStats {
    pub total_chunks: u64,
    pub total_embeddings: u64,
    pub processed_files: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_id_display() {
        let id = ChunkId("abc123".into());
        assert_eq!(format!("{id}"), "abc123");
        assert_eq!(id.as_str(), "abc123");
    }

    #[test]
    fn facet_round_trips_through_str() {
        for facet in Facet::ALL {
            assert_eq!(facet.as_str().parse::<Facet>().unwrap(), facet);
        }
        assert!("summary".parse::<Facet>().is_err());
    }

    #[test]
    fn facet_serde_names_match_storage_names() {
        let json = serde_json::to_string(&Facet::Functions).unwrap();
        assert_eq!(json, "\"tags-functions\"");
    }

    #[test]
    fn difficulty_parse_is_lenient_on_case() {
        assert_eq!("Advanced".parse::<Difficulty>().unwrap(), Difficulty::Advanced);
        assert_eq!(" beginner ".parse::<Difficulty>().unwrap(), Difficulty::Beginner);
        assert!("expert".parse::<Difficulty>().is_err());
    }

    #[test]
    fn difficulty_default_is_intermediate() {
        assert_eq!(Difficulty::default(), Difficulty::Intermediate);
    }

    #[test]
    fn content_type_parse() {
        assert_eq!("code".parse::<ContentType>().unwrap(), ContentType::Code);
        assert!("binary".parse::<ContentType>().is_err());
    }
}
