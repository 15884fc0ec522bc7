//! Knowledge system type definitions.

use serde::{Deserialize, Serialize};

/// A source document known to the index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeSource {
    /// Unique source identifier; cited as the document id
    pub id: String,

    /// File path the source was ingested from
    pub path: Option<String>,

    pub url: Option<String>,

    /// Content type recorded at ingestion ("markdown", "pdf", ...)
    pub content_type: String,

    /// RFC 3339 ingestion timestamp as written by the ingester
    pub learned_at: String,

    pub size_bytes: u64,
}

impl KnowledgeSource {
    /// File name part of the path, if any.
    pub fn file_name(&self) -> Option<&str> {
        self.path
            .as_deref()
            .and_then(|p| p.rsplit(['/', '\\']).next())
            .filter(|name| !name.is_empty())
    }
}

/// A text chunk with embedding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeChunk {
    /// Unique chunk identifier
    pub id: String,

    /// Source document ID
    pub source_id: String,

    /// Position within source
    pub position: u32,

    /// Text content
    pub text: String,

    /// Embedding vector
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,

    /// Metadata (e.g., file path, line numbers)
    #[serde(default)]
    pub metadata: serde_json::Value,
}

/// A chunk paired with its relevance score.
pub type ScoredChunk = (KnowledgeChunk, f32);

/// How a query is matched against the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    Keyword,
    #[default]
    Vector,
}

impl SearchMode {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "keyword" | "text" => Some(Self::Keyword),
            "vector" | "semantic" => Some(Self::Vector),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Keyword => "keyword",
            Self::Vector => "vector",
        }
    }
}

/// One search hit, ready to be shown to a model or a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedChunk {
    /// Chunk id
    pub id: String,

    /// Parent document id; the citation key
    pub document_id: String,

    pub excerpt: String,

    pub relevance_score: f32,

    /// Human-readable location, e.g. "notes.md, lines 10-24"
    pub source_ref: String,
}

/// Index statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexStats {
    pub sources_count: u32,
    pub chunks_count: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_mode_parse() {
        assert_eq!(SearchMode::parse("Keyword"), Some(SearchMode::Keyword));
        assert_eq!(SearchMode::parse("vector"), Some(SearchMode::Vector));
        assert_eq!(SearchMode::parse("fuzzy"), None);
        assert_eq!(SearchMode::default(), SearchMode::Vector);
    }

    #[test]
    fn test_source_file_name() {
        let mut source = KnowledgeSource {
            id: "doc:1".to_string(),
            path: Some("/data/papers/attention.pdf".to_string()),
            url: None,
            content_type: "pdf".to_string(),
            learned_at: "2026-01-01T00:00:00Z".to_string(),
            size_bytes: 10,
        };
        assert_eq!(source.file_name(), Some("attention.pdf"));

        source.path = Some("C:\\notes\\todo.md".to_string());
        assert_eq!(source.file_name(), Some("todo.md"));

        source.path = None;
        assert_eq!(source.file_name(), None);
    }
}
