//! MIME type -> extraction strategy registry.
//!
//! Keys are either full MIME types (`application/pdf`) or top-level
//! categories (`image`). Lookups try the exact type first and then the
//! category, so `image/png` resolves to the `image` strategy unless a more
//! specific one was registered.
//!
//! Registrations are append-only: registering a key twice is an error and
//! leaves the first strategy in place.
//!
//! ```text
//! text                    -> plain-text
//! application/javascript  -> plain-text
//! application/json        -> plain-text
//! image                   -> image-ocr
//! application/pdf         -> pdf (text layer, then rasterize + OCR)
//! audio/mp3               -> audio-tags
//! audio/mp4a-latm         -> audio-tags
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::config::Config;
use crate::error::RegistryError;
use crate::extract::{AudioStubExtractor, Extractor, PlainTextExtractor};
use crate::mime::category;
use crate::ocr::{ImageOcrExtractor, OcrEngine};
use crate::pdf::PdfExtractor;
use crate::process::ProcessRunner;

pub struct TranslatorRegistry {
    translators: BTreeMap<String, Arc<dyn Extractor>>,
}

impl TranslatorRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            translators: BTreeMap::new(),
        }
    }

    /// Create a registry pre-loaded with the built-in strategies.
    ///
    /// The image and PDF strategies share one lazily initialized OCR engine.
    pub fn with_defaults(config: &Config, runner: Arc<dyn ProcessRunner>) -> Self {
        let ocr = Arc::new(OcrEngine::new(runner.clone(), &config.ocr));
        let text: Arc<dyn Extractor> = Arc::new(PlainTextExtractor);
        let audio: Arc<dyn Extractor> = Arc::new(AudioStubExtractor);

        let mut translators: BTreeMap<String, Arc<dyn Extractor>> = BTreeMap::new();
        translators.insert("text".into(), text.clone());
        translators.insert("application/javascript".into(), text.clone());
        translators.insert("application/json".into(), text);
        translators.insert("image".into(), Arc::new(ImageOcrExtractor::new(ocr.clone())));
        translators.insert(
            "application/pdf".into(),
            Arc::new(PdfExtractor::new(runner, &config.pdf, ocr)),
        );
        translators.insert("audio/mp3".into(), audio.clone());
        translators.insert("audio/mp4a-latm".into(), audio);

        Self { translators }
    }

    /// Register a strategy for a MIME type or category.
    pub fn register(
        &mut self,
        mime_type: &str,
        extractor: Arc<dyn Extractor>,
    ) -> Result<(), RegistryError> {
        if self.translators.contains_key(mime_type) {
            return Err(RegistryError::Duplicate(mime_type.to_string()));
        }
        self.translators.insert(mime_type.to_string(), extractor);
        Ok(())
    }

    /// Find the strategy for a MIME type: exact match, then category.
    pub fn resolve(&self, mime_type: &str) -> Option<Arc<dyn Extractor>> {
        self.translators
            .get(mime_type)
            .or_else(|| self.translators.get(category(mime_type)))
            .cloned()
    }

    /// Registered keys, sorted.
    pub fn mime_types(&self) -> impl Iterator<Item = &str> {
        self.translators.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.translators.is_empty()
    }

    pub fn len(&self) -> usize {
        self.translators.len()
    }
}

impl Default for TranslatorRegistry {
    fn default() -> Self {
        Self::new()
    }
}
