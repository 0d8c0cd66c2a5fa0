//! Shared fakes for library-level tests.

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::ffi::OsString;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

use fileindex::audio::TagReader;
use fileindex::config::Config;
use fileindex::error::{ExtractError, TagError};
use fileindex::ingest::ExtractionPipeline;
use fileindex::models::AudioTags;
use fileindex::process::{ProcessRunner, ToolOutput};
use fileindex::store::MemorySink;

pub const OCR_TEXT: &str = "text recognized from a scanned page";

type Handler = Box<dyn Fn(&[OsString]) -> Result<ToolOutput, ExtractError> + Send + Sync>;

/// Records every invocation; tools without a handler are "not installed".
#[derive(Default)]
pub struct FakeRunner {
    handlers: HashMap<String, Handler>,
    calls: Mutex<Vec<(String, Vec<OsString>)>>,
}

impl FakeRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on<F>(mut self, tool: &str, handler: F) -> Self
    where
        F: Fn(&[OsString]) -> Result<ToolOutput, ExtractError> + Send + Sync + 'static,
    {
        self.handlers.insert(tool.to_string(), Box::new(handler));
        self
    }

    /// pdftotext that copies the "PDF" bytes verbatim as its text layer,
    /// convert that writes a placeholder image, and a tesseract with `eng`
    /// installed.
    pub fn pdf_toolchain() -> Self {
        Self::new()
            .on("pdftotext", |args| {
                std::fs::copy(&args[0], &args[1])?;
                Ok(ok(""))
            })
            .on("convert", |args| {
                if let Some(out) = args.last() {
                    std::fs::write(out, b"II*\0")?;
                }
                Ok(ok(""))
            })
            .on("tesseract", |args| {
                if args.iter().any(|a| a == "--list-langs") {
                    Ok(ok("List of available languages (2):\neng\nosd\n"))
                } else {
                    Ok(ok(OCR_TEXT))
                }
            })
    }

    pub fn calls_to(&self, tool: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(t, _)| t == tool)
            .count()
    }

    /// Number of OCR recognitions (excluding the language probe).
    pub fn recognitions(&self) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(t, a)| t == "tesseract" && !a.iter().any(|x| x == "--list-langs"))
            .count()
    }
}

pub fn ok(stdout: &str) -> ToolOutput {
    ToolOutput {
        stdout: stdout.as_bytes().to_vec(),
        stderr: Vec::new(),
        code: Some(0),
    }
}

#[async_trait]
impl ProcessRunner for FakeRunner {
    async fn run(&self, tool: &str, args: &[OsString]) -> Result<ToolOutput, ExtractError> {
        self.calls
            .lock()
            .unwrap()
            .push((tool.to_string(), args.to_vec()));
        match self.handlers.get(tool) {
            Some(handler) => handler(args),
            None => Err(ExtractError::ToolMissing(tool.to_string())),
        }
    }
}

/// Returns fixed tags, or `NoTags` when built with `None`.
pub struct FakeTagReader(pub Option<AudioTags>);

impl TagReader for FakeTagReader {
    fn read_tags(&self, _file: &mut File) -> Result<AudioTags, TagError> {
        self.0.clone().ok_or(TagError::NoTags)
    }
}

/// Scratch layout: `<tmp>/docs` to index, `<tmp>/state` for index + hashes.
pub struct TestEnv {
    pub tmp: TempDir,
    pub config: Config,
    pub runner: Arc<FakeRunner>,
    pub sink: Arc<MemorySink>,
}

impl TestEnv {
    pub fn new(runner: FakeRunner) -> Self {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().canonicalize().unwrap();
        std::fs::create_dir_all(root.join("docs")).unwrap();

        let mut config = Config::default();
        config.storage.index_path = root.join("state").join("index.sqlite");
        config.storage.hash_dir = root.join("state").join("hashes");
        config.ocr.tessdata_prefix = None;

        Self {
            tmp,
            config,
            runner: Arc::new(runner),
            sink: Arc::new(MemorySink::new()),
        }
    }

    pub fn docs(&self) -> PathBuf {
        self.tmp.path().canonicalize().unwrap().join("docs")
    }

    pub fn write(&self, rel: &str, body: impl AsRef<[u8]>) -> PathBuf {
        let path = self.docs().join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, body).unwrap();
        path
    }

    pub fn pipeline(&self) -> ExtractionPipeline {
        self.pipeline_with_tags(FakeTagReader(None))
    }

    pub fn pipeline_with_tags(&self, tags: FakeTagReader) -> ExtractionPipeline {
        ExtractionPipeline::from_config(
            &self.config,
            self.runner.clone(),
            self.sink.clone(),
            Arc::new(tags),
        )
    }

    pub fn text_of(&self, path: &Path) -> String {
        self.sink
            .get(&path.to_string_lossy())
            .map(|d| d.file().text.clone())
            .unwrap_or_default()
    }
}
