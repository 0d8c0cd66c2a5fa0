//! OCR and rasterization collaborators.
//!
//! OCR runs the `tesseract` CLI with automatic page segmentation, a
//! configured language model and a character whitelist. PDFs are first
//! rasterized with ImageMagick `convert` into a flattened 8-bit image.

use async_trait::async_trait;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::OnceCell;

use crate::config::{OcrConfig, PdfConfig};
use crate::error::ExtractError;
use crate::extract::Extractor;
use crate::process::ProcessRunner;

/// Tesseract page segmentation mode 1: automatic with orientation and
/// script detection.
const PSM_AUTO_OSD: &str = "1";

/// OCR engine backed by the tesseract CLI.
///
/// The engine is initialized lazily on first use: the binary must run and
/// the configured language must be installed. An initialization failure is
/// reported as [`ExtractError::OcrInit`], which aborts the run.
pub struct OcrEngine {
    runner: Arc<dyn ProcessRunner>,
    config: OcrConfig,
    /// Resolved `--tessdata-dir`, set once initialization succeeds.
    ready: OnceCell<Option<PathBuf>>,
}

impl OcrEngine {
    pub fn new(runner: Arc<dyn ProcessRunner>, config: &OcrConfig) -> Self {
        Self {
            runner,
            config: config.clone(),
            ready: OnceCell::new(),
        }
    }

    /// The configured prefix is either the tessdata directory itself (the
    /// tesseract 4/5 meaning of `TESSDATA_PREFIX`) or its parent (3.x).
    fn resolve_tessdata_dir(&self, prefix: &Path) -> Result<PathBuf, ExtractError> {
        let model = format!("{}.traineddata", self.config.language);
        let nested = prefix.join("tessdata");
        [prefix.to_path_buf(), nested.clone()]
            .into_iter()
            .find(|dir| dir.join(&model).is_file())
            .ok_or_else(|| {
                ExtractError::OcrInit(format!(
                    "language data not found: neither {} nor {} exists",
                    prefix.join(&model).display(),
                    nested.join(&model).display()
                ))
            })
    }

    fn dir_args(dir: Option<&Path>) -> Vec<OsString> {
        match dir {
            Some(dir) => vec!["--tessdata-dir".into(), dir.as_os_str().to_os_string()],
            None => Vec::new(),
        }
    }

    async fn ensure_ready(&self) -> Result<Option<&Path>, ExtractError> {
        let dir = self.ready.get_or_try_init(|| self.init()).await?;
        Ok(dir.as_deref())
    }

    async fn init(&self) -> Result<Option<PathBuf>, ExtractError> {
        let lang = &self.config.language;

        let dir = match &self.config.tessdata_prefix {
            Some(prefix) => Some(self.resolve_tessdata_dir(prefix)?),
            None => None,
        };

        let mut args = Self::dir_args(dir.as_deref());
        args.push("--list-langs".into());
        let output = self
            .runner
            .run(&self.config.tesseract, &args)
            .await
            .map_err(|e| ExtractError::OcrInit(e.to_string()))?;
        if !output.success() {
            return Err(ExtractError::OcrInit(format!(
                "{} --list-langs failed: {}",
                self.config.tesseract,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        // Older tesseract releases print the list on stderr.
        let listing = format!(
            "{}\n{}",
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );
        let installed = listing
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty() && !l.starts_with("List of"))
            .any(|l| l == lang);
        if !installed {
            return Err(ExtractError::OcrInit(format!(
                "language {:?} is not installed for {}",
                lang, self.config.tesseract
            )));
        }

        tracing::debug!("OCR engine ready (language {})", lang);
        Ok(dir)
    }

    /// Recognize the text in an image file.
    pub async fn recognize(&self, image: &Path) -> Result<String, ExtractError> {
        let dir = self.ensure_ready().await?;

        let mut args = Self::dir_args(dir);
        args.extend([
            image.as_os_str().to_os_string(),
            "stdout".into(),
            "-l".into(),
            self.config.language.clone().into(),
            "--psm".into(),
            PSM_AUTO_OSD.into(),
            "-c".into(),
            format!("tessedit_char_whitelist={}", self.config.whitelist).into(),
        ]);

        tracing::debug!("running OCR on {}", image.display());
        let output = self
            .runner
            .run(&self.config.tesseract, &args)
            .await?
            .check(&self.config.tesseract)?;
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Renders a PDF into a single flattened raster image.
pub struct Rasterizer {
    runner: Arc<dyn ProcessRunner>,
    convert: String,
    density: u32,
}

impl Rasterizer {
    pub fn new(runner: Arc<dyn ProcessRunner>, config: &PdfConfig) -> Self {
        Self {
            runner,
            convert: config.convert.clone(),
            density: config.density,
        }
    }

    /// Write a white-background, alpha-free, 8-bit image of `pdf` to `out`.
    pub async fn rasterize(&self, pdf: &Path, out: &Path) -> Result<(), ExtractError> {
        tracing::debug!("converting {} to {}", pdf.display(), out.display());
        let args: Vec<OsString> = vec![
            "-background".into(),
            "white".into(),
            "-flatten".into(),
            "-alpha".into(),
            "Off".into(),
            "-density".into(),
            self.density.to_string().into(),
            pdf.as_os_str().to_os_string(),
            "-depth".into(),
            "8".into(),
            out.as_os_str().to_os_string(),
        ];
        let output = self.runner.run(&self.convert, &args).await?;
        if !output.success() {
            tracing::debug!("convert output: {:?}", String::from_utf8_lossy(&output.stderr));
        }
        output.check(&self.convert)?;
        Ok(())
    }
}

/// OCRs image files directly, without rasterization.
pub struct ImageOcrExtractor {
    engine: Arc<OcrEngine>,
}

impl ImageOcrExtractor {
    pub fn new(engine: Arc<OcrEngine>) -> Self {
        Self { engine }
    }
}

#[async_trait]
impl Extractor for ImageOcrExtractor {
    fn name(&self) -> &str {
        "image-ocr"
    }

    async fn extract(&self, path: &Path) -> Result<String, ExtractError> {
        self.engine.recognize(path).await
    }
}
