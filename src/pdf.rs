//! PDF text extraction with OCR fallback.
//!
//! The chain, each stage tried only when the previous one is unusable:
//!
//! 1. `pdftotext` into a scratch file (or the in-process `pdf-extract`
//!    text layer reader when `pdftotext` is not installed).
//! 2. If that failed, or produced `min_text_chars` characters or fewer
//!    (an image-only or scanned PDF), rasterize with `convert`.
//! 3. OCR the raster image.
//!
//! Missing `convert` is a per-file error. OCR engine initialization
//! failure is fatal.

use async_trait::async_trait;
use std::ffi::OsString;
use std::path::Path;
use std::sync::Arc;

use crate::config::PdfConfig;
use crate::error::ExtractError;
use crate::extract::Extractor;
use crate::ocr::{OcrEngine, Rasterizer};
use crate::process::ProcessRunner;

pub struct PdfExtractor {
    runner: Arc<dyn ProcessRunner>,
    pdftotext: String,
    min_text_chars: usize,
    builtin_text_layer: bool,
    rasterizer: Rasterizer,
    ocr: Arc<OcrEngine>,
}

impl PdfExtractor {
    pub fn new(runner: Arc<dyn ProcessRunner>, config: &PdfConfig, ocr: Arc<OcrEngine>) -> Self {
        Self {
            rasterizer: Rasterizer::new(runner.clone(), config),
            runner,
            pdftotext: config.pdftotext.clone(),
            min_text_chars: config.min_text_chars,
            builtin_text_layer: config.builtin_text_layer,
            ocr,
        }
    }

    async fn text_layer(&self, pdf: &Path, scratch: &Path) -> Result<String, ExtractError> {
        let out = scratch.join("text.txt");
        let args: Vec<OsString> = vec![pdf.as_os_str().to_os_string(), out.clone().into_os_string()];

        match self.runner.run(&self.pdftotext, &args).await {
            Ok(output) => {
                output.check(&self.pdftotext)?;
                let bytes = tokio::fs::read(&out).await?;
                Ok(String::from_utf8_lossy(&bytes).into_owned())
            }
            Err(ExtractError::ToolMissing(tool)) if self.builtin_text_layer => {
                tracing::debug!("{} not installed, reading text layer in-process", tool);
                builtin_text_layer(pdf).await
            }
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl Extractor for PdfExtractor {
    fn name(&self) -> &str {
        "pdf"
    }

    async fn extract(&self, path: &Path) -> Result<String, ExtractError> {
        let scratch = tempfile::TempDir::new()?;

        match self.text_layer(path, scratch.path()).await {
            Ok(text) => {
                let chars = text.chars().count();
                if chars > self.min_text_chars {
                    tracing::debug!("Found text of length {} in {}", chars, path.display());
                    return Ok(text);
                }
                tracing::debug!(
                    "text layer of {} has only {} characters, falling back to OCR",
                    path.display(),
                    chars
                );
            }
            Err(e) => {
                tracing::debug!("Unable to get text from {}: {}", path.display(), e);
            }
        }

        let image = scratch.path().join("page.tif");
        self.rasterizer.rasterize(path, &image).await?;
        self.ocr.recognize(&image).await
    }
}

async fn builtin_text_layer(pdf: &Path) -> Result<String, ExtractError> {
    let bytes = tokio::fs::read(pdf).await?;
    tokio::task::spawn_blocking(move || {
        pdf_extract::extract_text_from_mem(&bytes).map_err(|e| ExtractError::Pdf(e.to_string()))
    })
    .await
    .map_err(|e| ExtractError::Pdf(format!("text layer task failed: {e}")))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OcrConfig;
    use crate::process::testing::{FakeRunner, Script};
    use tempfile::TempDir;

    const OCR_TEXT: &str = "recognized scan text";

    fn pdftotext_writes(text: &str) -> Script {
        Script::Succeed {
            stdout: String::new(),
            file_contents: Some(text.as_bytes().to_vec()),
        }
    }

    fn convert_ok() -> Script {
        Script::Succeed {
            stdout: String::new(),
            file_contents: Some(b"II*\0".to_vec()),
        }
    }

    fn tesseract_ok() -> Script {
        Script::Succeed {
            stdout: format!("eng\n{}", OCR_TEXT),
            file_contents: None,
        }
    }

    fn extractor(runner: Arc<FakeRunner>) -> PdfExtractor {
        let ocr_config = OcrConfig {
            tessdata_prefix: None,
            ..OcrConfig::default()
        };
        let ocr = Arc::new(OcrEngine::new(runner.clone(), &ocr_config));
        PdfExtractor::new(runner, &PdfConfig::default(), ocr)
    }

    fn sample_pdf(tmp: &TempDir) -> std::path::PathBuf {
        let path = tmp.path().join("doc.pdf");
        std::fs::write(&path, b"%PDF-1.4 not really").unwrap();
        path
    }

    #[tokio::test]
    async fn eighty_characters_triggers_ocr() {
        let tmp = TempDir::new().unwrap();
        let runner = Arc::new(
            FakeRunner::new()
                .script("pdftotext", pdftotext_writes(&"a".repeat(80)))
                .script("convert", convert_ok())
                .script("tesseract", tesseract_ok()),
        );

        let text = extractor(runner.clone())
            .extract(&sample_pdf(&tmp))
            .await
            .unwrap();

        assert!(text.contains(OCR_TEXT));
        assert_eq!(runner.calls_to("convert"), 1);
    }

    #[tokio::test]
    async fn eighty_one_characters_skips_ocr() {
        let tmp = TempDir::new().unwrap();
        let body = "b".repeat(81);
        let runner = Arc::new(
            FakeRunner::new()
                .script("pdftotext", pdftotext_writes(&body))
                .script("convert", convert_ok())
                .script("tesseract", tesseract_ok()),
        );

        let text = extractor(runner.clone())
            .extract(&sample_pdf(&tmp))
            .await
            .unwrap();

        assert_eq!(text, body);
        assert_eq!(runner.calls_to("convert"), 0);
        assert_eq!(runner.calls_to("tesseract"), 0);
    }

    #[tokio::test]
    async fn threshold_counts_characters_not_bytes() {
        let tmp = TempDir::new().unwrap();
        // 41 two-byte characters: 82 bytes but only 41 characters
        let runner = Arc::new(
            FakeRunner::new()
                .script("pdftotext", pdftotext_writes(&"é".repeat(41)))
                .script("convert", convert_ok())
                .script("tesseract", tesseract_ok()),
        );

        extractor(runner.clone())
            .extract(&sample_pdf(&tmp))
            .await
            .unwrap();
        assert_eq!(runner.calls_to("convert"), 1);
    }

    #[tokio::test]
    async fn failing_pdftotext_falls_back_to_ocr() {
        let tmp = TempDir::new().unwrap();
        let runner = Arc::new(
            FakeRunner::new()
                .script("pdftotext", Script::Fail(1, "Syntax Error"))
                .script("convert", convert_ok())
                .script("tesseract", tesseract_ok()),
        );

        let text = extractor(runner.clone())
            .extract(&sample_pdf(&tmp))
            .await
            .unwrap();
        assert!(text.contains(OCR_TEXT));
    }

    #[tokio::test]
    async fn missing_pdftotext_and_unreadable_text_layer_falls_back_to_ocr() {
        let tmp = TempDir::new().unwrap();
        let runner = Arc::new(
            FakeRunner::new()
                .script("convert", convert_ok())
                .script("tesseract", tesseract_ok()),
        );

        let text = extractor(runner.clone())
            .extract(&sample_pdf(&tmp))
            .await
            .unwrap();
        assert!(text.contains(OCR_TEXT));
        assert_eq!(runner.calls_to("pdftotext"), 1);
    }

    #[tokio::test]
    async fn missing_convert_is_per_file_error() {
        let tmp = TempDir::new().unwrap();
        let runner = Arc::new(
            FakeRunner::new()
                .script("pdftotext", pdftotext_writes(""))
                .script("tesseract", tesseract_ok()),
        );

        let err = extractor(runner.clone())
            .extract(&sample_pdf(&tmp))
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractError::ToolMissing(ref t) if t == "convert"));
        assert!(!err.is_fatal());
        assert_eq!(runner.calls_to("tesseract"), 0);
    }

    #[tokio::test]
    async fn missing_tesseract_is_fatal() {
        let tmp = TempDir::new().unwrap();
        let runner = Arc::new(
            FakeRunner::new()
                .script("pdftotext", pdftotext_writes("short"))
                .script("convert", convert_ok()),
        );

        let err = extractor(runner)
            .extract(&sample_pdf(&tmp))
            .await
            .unwrap_err();
        assert!(err.is_fatal());
    }
}
