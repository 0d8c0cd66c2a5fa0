//! Decides whether a file needs (re)processing and with which strategy.
//!
//! The gate runs the cheap checks first (name, MIME type, size) and only
//! hashes the file when all of them pass. The digest it computes is handed
//! back in [`Gate::Process`] so the pipeline can commit it after a
//! successful index write without reading the file twice.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use crate::config::Config;
use crate::error::PipelineError;
use crate::extract::Extractor;
use crate::hash_store::{ContentDigest, HashStore};
use crate::mime::MimeTable;
use crate::registry::TranslatorRegistry;

/// Why a file was not processed. None of these are errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    Hidden,
    /// No MIME type could be derived, or no strategy handles it.
    Unclassified(Option<String>),
    TooLarge { size: u64, max: u64 },
    Unchanged,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::Hidden => write!(f, "hidden"),
            SkipReason::Unclassified(None) => write!(f, "unknown type"),
            SkipReason::Unclassified(Some(mt)) => write!(f, "no translator for {}", mt),
            SkipReason::TooLarge { size, max } => {
                write!(f, "too large ({} bytes, limit {})", size, max)
            }
            SkipReason::Unchanged => write!(f, "unchanged"),
        }
    }
}

/// A file that passed the gate.
pub struct Candidate {
    pub extractor: Arc<dyn Extractor>,
    pub mime_type: String,
    pub size: u64,
    pub digest: ContentDigest,
}

pub enum Gate {
    Process(Candidate),
    Skip(SkipReason),
}

pub struct Classifier {
    registry: TranslatorRegistry,
    mime: MimeTable,
    hashes: HashStore,
    max_file_size: Option<u64>,
    force: bool,
}

impl Classifier {
    pub fn new(config: &Config, registry: TranslatorRegistry) -> Self {
        Self {
            registry,
            mime: MimeTable::with_custom(&config.mime),
            hashes: HashStore::new(&config.storage.hash_dir),
            max_file_size: config.index.max_file_size,
            force: config.index.force,
        }
    }

    pub fn hash_store(&self) -> &HashStore {
        &self.hashes
    }

    /// Resolve the MIME type of `path` and the strategy registered for it.
    pub fn classify(&self, path: &Path) -> Option<(Arc<dyn Extractor>, String)> {
        let mime_type = self.mime.resolve(path)?;
        let extractor = self.registry.resolve(&mime_type)?;
        Some((extractor, mime_type))
    }

    /// Run every check and, when the file should be processed, return its
    /// strategy together with the digest to commit afterwards.
    pub fn check(&self, path: &Path) -> Result<Gate, PipelineError> {
        if is_hidden(path) {
            return Ok(Gate::Skip(SkipReason::Hidden));
        }

        let Some((extractor, mime_type)) = self.classify(path) else {
            return Ok(Gate::Skip(SkipReason::Unclassified(self.mime.resolve(path))));
        };

        let size = std::fs::metadata(path)
            .map_err(|source| PipelineError::Stat {
                path: path.to_path_buf(),
                source,
            })?
            .len();

        if let Some(max) = self.max_file_size {
            if size > max && !self.force {
                return Ok(Gate::Skip(SkipReason::TooLarge { size, max }));
            }
        }

        let digest = self
            .hashes
            .digest(path)
            .map_err(|source| PipelineError::Hash {
                path: path.to_path_buf(),
                source,
            })?;

        if !self.hashes.has_changed(path, &digest) {
            return Ok(Gate::Skip(SkipReason::Unchanged));
        }

        Ok(Gate::Process(Candidate {
            extractor,
            mime_type,
            size,
            digest,
        }))
    }

    /// Boolean form of [`Classifier::check`]. I/O failures count as "no".
    pub fn should_process(&self, path: &Path) -> bool {
        matches!(self.check(path), Ok(Gate::Process(_)))
    }
}

/// Base name starts with a dot.
pub fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .map(|n| n.to_string_lossy().starts_with('.'))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::testing::FakeRunner;
    use tempfile::TempDir;

    fn classifier(tmp: &TempDir, max_file_size: Option<u64>, force: bool) -> Classifier {
        let mut config = Config::default();
        config.storage.hash_dir = tmp.path().join("hashes");
        config.storage.index_path = tmp.path().join("index.sqlite");
        config.index.max_file_size = max_file_size;
        config.index.force = force;
        config.mime.insert("weird".into(), "text/x-weird".into());
        let registry = TranslatorRegistry::with_defaults(&config, Arc::new(FakeRunner::new()));
        Classifier::new(&config, registry)
    }

    fn write(tmp: &TempDir, name: &str, body: &[u8]) -> std::path::PathBuf {
        let path = tmp.path().join(name);
        std::fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn classify_plain_text() {
        let tmp = TempDir::new().unwrap();
        let c = classifier(&tmp, None, false);
        let (extractor, mime_type) = c.classify(Path::new("/docs/notes.txt")).unwrap();
        assert_eq!(mime_type, "text/plain");
        assert_eq!(extractor.name(), "plain-text");
    }

    #[test]
    fn classify_uses_custom_mapping() {
        let tmp = TempDir::new().unwrap();
        let c = classifier(&tmp, None, false);
        let (_, mime_type) = c.classify(Path::new("a.weird")).unwrap();
        assert_eq!(mime_type, "text/x-weird");
    }

    #[test]
    fn classify_unknown_is_none() {
        let tmp = TempDir::new().unwrap();
        let c = classifier(&tmp, None, false);
        assert!(c.classify(Path::new("Makefile")).is_none());
        assert!(c.classify(Path::new("movie.mp4")).is_none());
    }

    #[test]
    fn hidden_file_is_skipped() {
        let tmp = TempDir::new().unwrap();
        let c = classifier(&tmp, None, false);
        let path = write(&tmp, ".secret.txt", b"password");
        assert!(matches!(c.check(&path).unwrap(), Gate::Skip(SkipReason::Hidden)));
    }

    #[test]
    fn unclassified_reports_mime_type() {
        let tmp = TempDir::new().unwrap();
        let c = classifier(&tmp, None, false);
        let path = write(&tmp, "clip.mp4", b"\0\0");
        match c.check(&path).unwrap() {
            Gate::Skip(SkipReason::Unclassified(Some(mt))) => assert_eq!(mt, "video/mp4"),
            _ => panic!("expected unclassified"),
        }
    }

    #[test]
    fn size_limit_and_force() {
        let tmp = TempDir::new().unwrap();
        let path = write(&tmp, "big.txt", &[b'x'; 100]);

        let limited = classifier(&tmp, Some(10), false);
        assert!(matches!(
            limited.check(&path).unwrap(),
            Gate::Skip(SkipReason::TooLarge { size: 100, max: 10 })
        ));

        let forced = classifier(&tmp, Some(10), true);
        assert!(forced.should_process(&path));
    }

    #[test]
    fn force_does_not_bypass_hash_check() {
        let tmp = TempDir::new().unwrap();
        let path = write(&tmp, "big.txt", &[b'x'; 100]);
        let c = classifier(&tmp, Some(10), true);

        let Gate::Process(candidate) = c.check(&path).unwrap() else {
            panic!("expected process");
        };
        c.hash_store().commit(&path, &candidate.digest).unwrap();
        assert!(matches!(c.check(&path).unwrap(), Gate::Skip(SkipReason::Unchanged)));
    }

    #[test]
    fn single_byte_change_is_detected() {
        let tmp = TempDir::new().unwrap();
        let c = classifier(&tmp, None, false);
        let path = write(&tmp, "notes.txt", b"abcdef");

        let Gate::Process(candidate) = c.check(&path).unwrap() else {
            panic!("expected process");
        };
        c.hash_store().commit(&path, &candidate.digest).unwrap();
        assert!(!c.should_process(&path));

        std::fs::write(&path, b"abcdeg").unwrap();
        assert!(c.should_process(&path));
    }

    #[test]
    fn missing_file_is_stat_error() {
        let tmp = TempDir::new().unwrap();
        let c = classifier(&tmp, None, false);
        let err = c.check(&tmp.path().join("gone.txt")).err().unwrap();
        assert!(matches!(err, PipelineError::Stat { .. }));
        assert!(!err.is_fatal());
    }
}
