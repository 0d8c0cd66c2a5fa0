//! Directory traversal.
//!
//! Walks each root depth-first in file-name order and feeds every file to
//! the [`ExtractionPipeline`]. Hidden directories and the index's own
//! storage (database file and hash directory) are never descended into.
//! Hidden *files* are handed to the pipeline, whose gate skips and counts
//! them.

use anyhow::Result;
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

use crate::classify::is_hidden;
use crate::config::Config;
use crate::error::PipelineError;
use crate::ingest::ExtractionPipeline;
use crate::progress::ProgressEvent;

pub struct Walker {
    reserved: Vec<PathBuf>,
    excludes: GlobSet,
    follow_symlinks: bool,
}

impl Walker {
    pub fn new(config: &Config) -> Result<Self> {
        let index = absolute(&config.storage.index_path);
        let mut reserved = vec![absolute(&config.storage.hash_dir)];
        for suffix in ["-wal", "-shm", "-journal"] {
            let mut sidecar = index.clone().into_os_string();
            sidecar.push(suffix);
            reserved.push(PathBuf::from(sidecar));
        }
        reserved.push(index);

        Ok(Self {
            reserved,
            excludes: build_globset(&config.index.exclude_globs)?,
            follow_symlinks: config.index.follow_symlinks,
        })
    }

    /// Whether `path` is part of the index's own storage.
    pub fn is_reserved(&self, path: &Path) -> bool {
        self.reserved.iter().any(|r| r == path)
    }

    fn descend(&self, entry: &DirEntry) -> bool {
        if self.is_reserved(entry.path()) {
            tracing::debug!("not descending into reserved {}", entry.path().display());
            return false;
        }
        if entry.depth() > 0 && entry.file_type().is_dir() && is_hidden(entry.path()) {
            tracing::debug!("skipping hidden directory {}", entry.path().display());
            return false;
        }
        true
    }

    /// Walk `root` and run every file through `pipeline`.
    ///
    /// Unreadable entries are logged and skipped. Only a fatal pipeline
    /// error stops the walk.
    pub async fn walk(
        &self,
        root: &Path,
        pipeline: &mut ExtractionPipeline,
    ) -> Result<(), PipelineError> {
        let entries = WalkDir::new(root)
            .follow_links(self.follow_symlinks)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| self.descend(e));

        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!("error walking {}: {}", root.display(), e);
                    continue;
                }
            };
            if entry.file_type().is_dir() {
                continue;
            }

            let path = entry.path();
            let relative = path.strip_prefix(root).unwrap_or(path);
            if self.excludes.is_match(relative) {
                tracing::debug!("excluded {}", path.display());
                continue;
            }

            pipeline.handle(path).await?;
        }
        Ok(())
    }
}

/// Index every path: directories are walked, files go straight to the
/// pipeline, and paths that do not exist are skipped with a warning.
pub async fn index_paths(
    pipeline: &mut ExtractionPipeline,
    config: &Config,
    paths: &[PathBuf],
) -> Result<()> {
    let walker = Walker::new(config)?;

    for path in paths {
        let path = match std::fs::canonicalize(path) {
            Ok(p) => p,
            Err(e) => {
                tracing::warn!("skipping {}: {}", path.display(), e);
                continue;
            }
        };

        if path.is_dir() {
            pipeline.report(ProgressEvent::Walking {
                root: path.display().to_string(),
            });
            walker.walk(&path, pipeline).await?;
        } else if walker.is_reserved(&path) {
            tracing::debug!("not indexing reserved {}", path.display());
        } else {
            pipeline.handle(&path).await?;
        }
    }
    Ok(())
}

/// Canonical form of `path` when it exists, otherwise made absolute against
/// the working directory.
fn absolute(path: &Path) -> PathBuf {
    if let Ok(p) = std::fs::canonicalize(path) {
        return p;
    }
    if path.is_absolute() {
        return path.to_path_buf();
    }
    std::env::current_dir()
        .map(|cwd| cwd.join(path))
        .unwrap_or_else(|_| path.to_path_buf())
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}
