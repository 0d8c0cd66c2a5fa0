//! Error types for the indexing pipeline.
//!
//! Three classes of failure flow through the pipeline:
//!
//! - **Skips** are not errors at all; see [`crate::classify::SkipReason`].
//! - **Per-file errors** are logged by the walker and the run continues
//!   with the next file. The hash record is not written, so the file is
//!   retried next run.
//! - **Fatal errors** abort the whole run. Only failures that make every
//!   remaining file of a type unprocessable are fatal (OCR engine
//!   initialization), plus startup failures (duplicate registration,
//!   index sink cannot be opened).

use std::path::PathBuf;
use thiserror::Error;

/// Text extraction errors.
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("external tool not found: {0}")]
    ToolMissing(String),

    #[error("{tool} exited with status {status}: {stderr}")]
    ToolFailed {
        tool: String,
        status: String,
        stderr: String,
    },

    #[error("{tool} timed out after {secs}s")]
    ToolTimedOut { tool: String, secs: u64 },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("PDF text layer extraction failed: {0}")]
    Pdf(String),

    /// The OCR engine could not start (binary missing, language data
    /// missing). No image or scanned document can be processed after this.
    #[error("OCR engine initialization failed: {0}")]
    OcrInit(String),
}

impl ExtractError {
    /// Returns `true` when the error must abort the whole run.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ExtractError::OcrInit(_))
    }
}

/// Translator registry errors.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum RegistryError {
    #[error("attempt to register already existing mime type translator {0:?}")]
    Duplicate(String),
}

/// Index sink errors.
#[derive(Error, Debug)]
pub enum SinkError {
    #[error("index database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("index is closed")]
    Closed,

    #[error("index rejected document {0}")]
    Rejected(String),
}

/// Audio tag reading errors.
#[derive(Error, Debug)]
pub enum TagError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("no tags found")]
    NoTags,

    #[error("tag parse error: {0}")]
    Parse(String),
}

/// Errors raised while running a single file through the pipeline.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("failed to stat {path}: {source}")]
    Stat {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to hash {path}: {source}")]
    Hash {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to extract text from {path}: {source}")]
    Extract {
        path: PathBuf,
        source: ExtractError,
    },

    #[error("failed to write {path} to the index: {source}")]
    Put { path: PathBuf, source: SinkError },

    #[error("failed to record hash for {path}: {source}")]
    Commit {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl PipelineError {
    pub fn is_fatal(&self) -> bool {
        match self {
            PipelineError::Extract { source, .. } => source.is_fatal(),
            _ => false,
        }
    }
}
