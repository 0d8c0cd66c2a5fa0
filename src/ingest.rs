//! Ingestion pipeline orchestration.
//!
//! Every candidate file goes through the same steps, one file at a time:
//!
//! ```text
//! gate (hidden / type / size / digest)
//!   -> document shell -> extract text -> [audio tags] -> sink.put
//!   -> commit digest
//! ```
//!
//! The digest is committed only after `put` succeeds, so a failed or
//! interrupted write leaves the file eligible for the next run. Per-file
//! failures are logged and counted; only OCR engine initialization failures
//! abort the run.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::audio::{self, LoftyTagReader, TagReader};
use crate::classify::{Classifier, Gate, SkipReason};
use crate::config::Config;
use crate::error::PipelineError;
use crate::models::{Document, FileDocument};
use crate::process::{ProcessRunner, SystemRunner};
use crate::progress::{NoProgress, ProgressEvent, ProgressMode, ProgressReporter};
use crate::registry::TranslatorRegistry;
use crate::store::{IndexSink, SqliteSink};
use crate::walker;

/// What happened to one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Indexed { mime_type: String },
    Skipped(SkipReason),
}

/// Counters for one index run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub visited: u64,
    pub indexed: u64,
    pub skipped: u64,
    pub failed: u64,
}

impl RunSummary {
    pub fn print(&self) {
        println!("index");
        println!("  visited: {}", self.visited);
        println!("  indexed: {}", self.indexed);
        println!("  skipped: {}", self.skipped);
        println!("  failed: {}", self.failed);
        println!("ok");
    }
}

pub struct ExtractionPipeline {
    classifier: Classifier,
    sink: Arc<dyn IndexSink>,
    tags: Arc<dyn TagReader>,
    progress: Box<dyn ProgressReporter>,
    summary: RunSummary,
}

impl ExtractionPipeline {
    pub fn new(classifier: Classifier, sink: Arc<dyn IndexSink>, tags: Arc<dyn TagReader>) -> Self {
        Self {
            classifier,
            sink,
            tags,
            progress: Box::new(NoProgress),
            summary: RunSummary::default(),
        }
    }

    /// Pipeline with the default translator set, using `runner` for
    /// external tools.
    pub fn from_config(
        config: &Config,
        runner: Arc<dyn ProcessRunner>,
        sink: Arc<dyn IndexSink>,
        tags: Arc<dyn TagReader>,
    ) -> Self {
        let registry = TranslatorRegistry::with_defaults(config, runner);
        Self::new(Classifier::new(config, registry), sink, tags)
    }

    pub fn with_progress(mut self, progress: Box<dyn ProgressReporter>) -> Self {
        self.progress = progress;
        self
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    pub fn summary(&self) -> &RunSummary {
        &self.summary
    }

    pub(crate) fn report(&self, event: ProgressEvent) {
        self.progress.report(event);
    }

    /// Run one file through the pipeline without touching the counters.
    pub async fn process(&self, path: &Path) -> Result<Outcome, PipelineError> {
        let candidate = match self.classifier.check(path)? {
            Gate::Process(candidate) => candidate,
            Gate::Skip(reason) => {
                tracing::debug!("skipping {}: {}", path.display(), reason);
                return Ok(Outcome::Skipped(reason));
            }
        };

        tracing::debug!(
            "indexing {} as {} with {}",
            path.display(),
            candidate.mime_type,
            candidate.extractor.name()
        );

        let mut shell = FileDocument::shell(path, &candidate.mime_type, candidate.size);
        shell.text = candidate
            .extractor
            .extract(path)
            .await
            .map_err(|source| PipelineError::Extract {
                path: path.to_path_buf(),
                source,
            })?;

        let doc = if candidate.extractor.reads_audio_tags() {
            audio::enrich(self.tags.clone(), shell).await
        } else {
            Document::File(shell)
        };

        self.sink
            .put(&doc)
            .await
            .map_err(|source| PipelineError::Put {
                path: path.to_path_buf(),
                source,
            })?;

        self.classifier
            .hash_store()
            .commit(path, &candidate.digest)
            .map_err(|source| PipelineError::Commit {
                path: path.to_path_buf(),
                source,
            })?;

        Ok(Outcome::Indexed {
            mime_type: candidate.mime_type,
        })
    }

    /// Process one file and count the result.
    ///
    /// Per-file errors are logged and swallowed; the returned error is
    /// always fatal for the run.
    pub async fn handle(&mut self, path: &Path) -> Result<(), PipelineError> {
        self.summary.visited += 1;
        let outcome = match self.process(path).await {
            Ok(Outcome::Indexed { .. }) => {
                self.summary.indexed += 1;
                "indexed"
            }
            Ok(Outcome::Skipped(_)) => {
                self.summary.skipped += 1;
                "skipped"
            }
            Err(e) if e.is_fatal() => {
                self.summary.failed += 1;
                tracing::error!("{}", e);
                return Err(e);
            }
            Err(e) => {
                self.summary.failed += 1;
                tracing::warn!("{}", e);
                "failed"
            }
        };
        self.progress.report(ProgressEvent::File {
            n: self.summary.visited,
            path: path.display().to_string(),
            outcome,
        });
        Ok(())
    }
}

/// Run `fidx index`: open the index, walk every path, print the summary.
pub async fn run_index(config: &Config, paths: &[PathBuf], mode: ProgressMode) -> Result<RunSummary> {
    let sink = Arc::new(
        SqliteSink::open(&config.storage.index_path)
            .await
            .with_context(|| {
                format!(
                    "Failed to open index at {}",
                    config.storage.index_path.display()
                )
            })?,
    );
    let runner = Arc::new(SystemRunner::new(Duration::from_secs(
        config.tools.timeout_secs,
    )));

    let mut pipeline =
        ExtractionPipeline::from_config(config, runner, sink.clone(), Arc::new(LoftyTagReader))
            .with_progress(mode.reporter());

    let result = walker::index_paths(&mut pipeline, config, paths).await;
    sink.close().await?;
    result?;

    let summary = pipeline.summary().clone();
    tracing::info!(
        "indexed {} of {} files ({} skipped, {} failed)",
        summary.indexed,
        summary.visited,
        summary.skipped,
        summary.failed
    );
    summary.print();
    Ok(summary)
}
