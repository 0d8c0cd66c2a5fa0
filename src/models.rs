//! Core data models used throughout the indexer.
//!
//! Documents are built fresh for every processing pass, handed once to the
//! index sink and then dropped. The sink owns whatever copy it persists.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::Path;

/// A file converted to searchable text.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FileDocument {
    /// Cleaned absolute path. Unique key in the index and the hash store.
    pub full_path: String,
    pub file_name: String,
    pub mime_type: String,
    /// When the document was built (not when the sink stored it).
    pub index_time: DateTime<Utc>,
    pub text: String,
    pub size: u64,
}

impl FileDocument {
    /// Document shell with everything but `text` filled in.
    pub fn shell(path: &Path, mime_type: &str, size: u64) -> Self {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        Self {
            full_path: path.to_string_lossy().to_string(),
            file_name,
            mime_type: mime_type.to_string(),
            index_time: Utc::now(),
            text: String::new(),
            size,
        }
    }
}

/// Tag fields read from an audio container.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct AudioTags {
    pub artist: String,
    pub album: String,
    pub genre: String,
    pub title: String,
    pub track: u32,
    pub year: u32,
}

/// A file document enriched with audio tags.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AudioDocument {
    #[serde(flatten)]
    pub file: FileDocument,
    #[serde(flatten)]
    pub tags: AudioTags,
}

/// Anything the pipeline hands to an index sink.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum Document {
    File(FileDocument),
    Audio(AudioDocument),
}

impl Document {
    pub fn file(&self) -> &FileDocument {
        match self {
            Document::File(f) => f,
            Document::Audio(a) => &a.file,
        }
    }

    /// Index key.
    pub fn path(&self) -> &str {
        &self.file().full_path
    }

    /// Document kind as stored in the index: `"audio"` for tagged audio,
    /// otherwise the MIME type.
    pub fn doc_type(&self) -> &str {
        match self {
            Document::File(f) => &f.mime_type,
            Document::Audio(_) => "audio",
        }
    }

    pub fn tags(&self) -> Option<&AudioTags> {
        match self {
            Document::File(_) => None,
            Document::Audio(a) => Some(&a.tags),
        }
    }
}

/// A query against the index sink.
#[derive(Debug, Clone)]
pub struct QueryRequest {
    /// Free-text query string (terms joined with spaces).
    pub query: String,
    pub limit: i64,
    pub from: i64,
    pub highlight: Option<Highlight>,
}

impl QueryRequest {
    /// Build a request from command-line terms.
    pub fn from_terms(terms: &[String], limit: i64, from: i64) -> Self {
        Self {
            query: terms.join(" "),
            limit,
            from,
            highlight: None,
        }
    }
}

/// Markers wrapped around matched terms in fragments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Highlight {
    pub open: String,
    pub close: String,
}

impl Highlight {
    /// Bold-red ANSI escapes for terminal output.
    pub fn ansi() -> Self {
        Self {
            open: "\x1b[1;31m".to_string(),
            close: "\x1b[0m".to_string(),
        }
    }

    pub fn html() -> Self {
        Self {
            open: "<mark>".to_string(),
            close: "</mark>".to_string(),
        }
    }
}

/// One ranked match.
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    /// Document path.
    pub id: String,
    pub score: f64,
    /// Highlighted fragments keyed by field name.
    pub fragments: Vec<(String, Vec<String>)>,
    /// Stored fields returned with the hit.
    pub fields: Vec<(String, String)>,
}

/// Ranked results for a [`QueryRequest`].
#[derive(Debug, Clone, Serialize)]
pub struct QueryResponse {
    pub hits: Vec<SearchHit>,
    /// Total number of matches, ignoring limit/offset.
    pub total: i64,
    pub from: i64,
}
