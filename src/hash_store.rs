//! Content-digest records for change detection.
//!
//! Each indexed file gets one record file under the hash directory holding
//! the raw 32-byte SHA-256 of the file's contents. The record is named by
//! the hex SHA-256 of the file's path, so two different paths never share
//! a record no matter how their directory names are spelled.

use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

/// SHA-256 of a file's bytes.
pub type ContentDigest = [u8; 32];

#[derive(Debug, Clone)]
pub struct HashStore {
    dir: PathBuf,
}

impl HashStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory holding the records.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Stream the file through SHA-256.
    pub fn digest(&self, path: &Path) -> io::Result<ContentDigest> {
        let mut file = File::open(path)?;
        let mut hasher = Sha256::new();
        io::copy(&mut file, &mut hasher)?;
        let mut digest = [0u8; 32];
        digest.copy_from_slice(&hasher.finalize());
        Ok(digest)
    }

    /// Returns `true` unless a stored record exists and matches `digest`
    /// byte for byte. A missing or unreadable record counts as changed.
    pub fn has_changed(&self, path: &Path, digest: &ContentDigest) -> bool {
        let record = self.record_path(path);
        tracing::debug!("Checking for hashfile {}", record.display());
        let mut stored = Vec::with_capacity(digest.len());
        match File::open(&record).and_then(|mut f| f.read_to_end(&mut stored)) {
            Ok(_) => stored.as_slice() != digest.as_slice(),
            Err(e) => {
                if e.kind() != io::ErrorKind::NotFound {
                    tracing::warn!("unreadable hash record {}: {}", record.display(), e);
                }
                true
            }
        }
    }

    /// Write `digest` as the record for `path`, replacing any earlier one.
    ///
    /// Call only after the document has been accepted by the index sink.
    pub fn commit(&self, path: &Path, digest: &ContentDigest) -> io::Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        let record = self.record_path(path);
        // Write-then-rename so a crash never leaves a truncated record.
        let tmp = record.with_extension("tmp");
        std::fs::write(&tmp, digest)?;
        std::fs::rename(&tmp, &record)
    }

    /// Number of records currently stored.
    pub fn record_count(&self) -> io::Result<usize> {
        match std::fs::read_dir(&self.dir) {
            Ok(entries) => Ok(entries
                .filter_map(|e| e.ok())
                .filter(|e| e.path().extension().is_none())
                .count()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(0),
            Err(e) => Err(e),
        }
    }

    /// Location of the record for `path`.
    pub fn record_path(&self, path: &Path) -> PathBuf {
        self.dir.join(record_name(path))
    }
}

fn record_name(path: &Path) -> String {
    let mut hasher = Sha256::new();
    hasher.update(path.as_os_str().as_encoded_bytes());
    hex::encode(hasher.finalize())
}
