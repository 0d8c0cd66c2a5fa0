//! Text extraction strategies.
//!
//! An [`Extractor`] turns a file on disk into plain UTF-8 text. Strategies
//! are registered per MIME type in the [`TranslatorRegistry`]; the pipeline
//! never calls a strategy for a file it could not classify.
//!
//! | Strategy | Types |
//! |----------|-------|
//! | [`PlainTextExtractor`] | `text/*`, JSON, JavaScript |
//! | [`ImageOcrExtractor`](crate::ocr::ImageOcrExtractor) | `image/*` |
//! | [`PdfExtractor`](crate::pdf::PdfExtractor) | `application/pdf` |
//! | [`AudioStubExtractor`] | `audio/mp3`, `audio/mp4a-latm` |
//!
//! [`TranslatorRegistry`]: crate::registry::TranslatorRegistry

use async_trait::async_trait;
use std::path::Path;

use crate::error::ExtractError;

/// Converts a file into text.
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Short strategy name for logs.
    fn name(&self) -> &str;

    /// Extract the text of the file at `path`.
    async fn extract(&self, path: &Path) -> Result<String, ExtractError>;

    /// Whether documents produced by this strategy are enriched with audio
    /// tags by the pipeline.
    fn reads_audio_tags(&self) -> bool {
        false
    }
}

/// Reads the file as text. Invalid UTF-8 sequences are replaced.
pub struct PlainTextExtractor;

#[async_trait]
impl Extractor for PlainTextExtractor {
    fn name(&self) -> &str {
        "plain-text"
    }

    async fn extract(&self, path: &Path) -> Result<String, ExtractError> {
        let bytes = tokio::fs::read(path).await?;
        Ok(match String::from_utf8(bytes) {
            Ok(s) => s,
            Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
        })
    }
}

/// Audio files carry no body text; their searchable content comes from the
/// tags the pipeline reads afterwards.
pub struct AudioStubExtractor;

#[async_trait]
impl Extractor for AudioStubExtractor {
    fn name(&self) -> &str {
        "audio-tags"
    }

    async fn extract(&self, _path: &Path) -> Result<String, ExtractError> {
        Ok(String::new())
    }

    fn reads_audio_tags(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn plain_text_reads_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("notes.txt");
        std::fs::write(&path, "Kubernetes and Docker").unwrap();

        let text = PlainTextExtractor.extract(&path).await.unwrap();
        assert_eq!(text, "Kubernetes and Docker");
    }

    #[tokio::test]
    async fn plain_text_tolerates_invalid_utf8() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("latin1.txt");
        std::fs::write(&path, b"caf\xe9").unwrap();

        let text = PlainTextExtractor.extract(&path).await.unwrap();
        assert!(text.starts_with("caf"));
    }

    #[tokio::test]
    async fn plain_text_missing_file_is_io_error() {
        let err = PlainTextExtractor
            .extract(Path::new("/nonexistent/fidx/file.txt"))
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractError::Io(_)));
    }

    #[tokio::test]
    async fn audio_stub_defers_to_tags() {
        let stub = AudioStubExtractor;
        assert!(stub.reads_audio_tags());
        assert_eq!(stub.extract(Path::new("song.mp3")).await.unwrap(), "");
        assert!(!PlainTextExtractor.reads_audio_tags());
    }
}
