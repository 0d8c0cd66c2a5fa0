//! Audio tag enrichment.
//!
//! Audio files are indexed by their tags rather than their bytes. A tag
//! read failure downgrades the document to a plain [`FileDocument`]; it
//! never aborts the run.

use lofty::prelude::*;
use std::borrow::Cow;
use std::fs::File;
use std::path::PathBuf;
use std::sync::Arc;

use crate::error::TagError;
use crate::models::{AudioDocument, AudioTags, Document, FileDocument};

/// Reads artist/album/genre/title/track/year from an open audio file.
pub trait TagReader: Send + Sync {
    fn read_tags(&self, file: &mut File) -> Result<AudioTags, TagError>;
}

/// [`TagReader`] backed by `lofty` (ID3v1/v2, MP4 ilst, Vorbis comments, APE).
pub struct LoftyTagReader;

impl TagReader for LoftyTagReader {
    fn read_tags(&self, file: &mut File) -> Result<AudioTags, TagError> {
        let tagged = lofty::read_from(file).map_err(|e| TagError::Parse(e.to_string()))?;
        let tag = tagged
            .primary_tag()
            .or_else(|| tagged.first_tag())
            .ok_or(TagError::NoTags)?;

        Ok(AudioTags {
            artist: owned(tag.artist()),
            album: owned(tag.album()),
            genre: owned(tag.genre()),
            title: owned(tag.title()),
            track: tag.track().unwrap_or(0),
            year: tag.year().unwrap_or(0),
        })
    }
}

fn owned(value: Option<Cow<'_, str>>) -> String {
    value.map(Cow::into_owned).unwrap_or_default()
}

/// Wrap `doc` in an [`AudioDocument`] carrying the file's tags.
///
/// Falls back to a plain file document when the tags cannot be read.
pub async fn enrich(reader: Arc<dyn TagReader>, doc: FileDocument) -> Document {
    let path = PathBuf::from(&doc.full_path);
    let result = tokio::task::spawn_blocking(move || -> Result<AudioTags, TagError> {
        let mut file = File::open(&path)?;
        reader.read_tags(&mut file)
    })
    .await;

    match result {
        Ok(Ok(tags)) => Document::Audio(AudioDocument { file: doc, tags }),
        Ok(Err(e)) => {
            tracing::warn!("could not read audio tags from {}: {}", doc.full_path, e);
            Document::File(doc)
        }
        Err(e) => {
            tracing::warn!("audio tag reader for {} panicked: {}", doc.full_path, e);
            Document::File(doc)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use tempfile::TempDir;

    struct FixedTags(Option<AudioTags>);

    impl TagReader for FixedTags {
        fn read_tags(&self, _file: &mut File) -> Result<AudioTags, TagError> {
            self.0.clone().ok_or(TagError::NoTags)
        }
    }

    fn audio_shell(tmp: &TempDir) -> FileDocument {
        let path = tmp.path().join("track.mp3");
        std::fs::write(&path, b"ID3").unwrap();
        FileDocument::shell(&path, "audio/mp3", 3)
    }

    #[tokio::test]
    async fn tags_produce_audio_document() {
        let tmp = TempDir::new().unwrap();
        let tags = AudioTags {
            artist: "Miles Davis".into(),
            album: "Kind of Blue".into(),
            genre: "Jazz".into(),
            title: "So What".into(),
            track: 1,
            year: 1959,
        };
        let reader = Arc::new(FixedTags(Some(tags.clone())));

        let doc = enrich(reader, audio_shell(&tmp)).await;
        assert_eq!(doc.tags(), Some(&tags));
        assert_eq!(doc.doc_type(), "audio");
    }

    #[tokio::test]
    async fn tag_failure_downgrades_to_file_document() {
        let tmp = TempDir::new().unwrap();
        let doc = enrich(Arc::new(FixedTags(None)), audio_shell(&tmp)).await;
        assert!(matches!(doc, Document::File(_)));
        assert_eq!(doc.doc_type(), "audio/mp3");
    }

    #[tokio::test]
    async fn missing_file_downgrades_to_file_document() {
        let shell = FileDocument::shell(Path::new("/nonexistent/fidx/a.mp3"), "audio/mp3", 0);
        let doc = enrich(Arc::new(FixedTags(Some(AudioTags::default()))), shell).await;
        assert!(matches!(doc, Document::File(_)));
    }

    #[test]
    fn lofty_rejects_non_audio() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("fake.mp3");
        std::fs::write(&path, b"definitely not audio").unwrap();
        let mut file = File::open(&path).unwrap();
        assert!(LoftyTagReader.read_tags(&mut file).is_err());
    }
}
