//! File extension to MIME type resolution.
//!
//! Lookups go through three layers, most specific first:
//!
//! 1. custom mappings from config / `--mime ext=type`,
//! 2. the built-in overrides below (org-mode, audio containers),
//! 3. the `mime_guess` database.

use std::collections::HashMap;
use std::path::Path;

/// Extensions whose MIME type differs from (or is missing in) `mime_guess`.
const BUILTIN_MAPPINGS: &[(&str, &str)] = &[
    ("org", "text/x-org"),
    ("org_archive", "text/x-org"),
    ("mp3", "audio/mp3"),
    ("m4a", "audio/mp4a-latm"),
];

/// Extension -> MIME type table, built once at startup.
#[derive(Debug, Clone)]
pub struct MimeTable {
    mappings: HashMap<String, String>,
}

impl MimeTable {
    /// Table with only the built-in overrides on top of `mime_guess`.
    pub fn new() -> Self {
        let mappings = BUILTIN_MAPPINGS
            .iter()
            .map(|(ext, mt)| (ext.to_string(), mt.to_string()))
            .collect();
        Self { mappings }
    }

    /// Table with custom `extension -> type` mappings layered on top.
    pub fn with_custom<'a, I>(custom: I) -> Self
    where
        I: IntoIterator<Item = (&'a String, &'a String)>,
    {
        let mut table = Self::new();
        for (ext, mime_type) in custom {
            tracing::info!("Adding mime-type mapping for extension {:?}={:?}", ext, mime_type);
            table.add(ext, mime_type);
        }
        table
    }

    /// Add or replace a mapping. A leading dot on the extension is ignored.
    pub fn add(&mut self, ext: &str, mime_type: &str) {
        let ext = ext.trim_start_matches('.').to_ascii_lowercase();
        self.mappings.insert(ext, mime_type.to_string());
    }

    /// Resolve the raw MIME string for a path from its extension.
    pub fn type_by_extension(&self, path: &Path) -> Option<String> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        if let Some(mt) = self.mappings.get(&ext) {
            return Some(mt.clone());
        }
        mime_guess::from_ext(&ext)
            .first()
            .map(|m| m.essence_str().to_string())
    }

    /// Resolve and normalize the MIME type for a path.
    ///
    /// Returns `None` when the extension is unknown or the mapped value is
    /// not a well-formed `type/subtype`.
    pub fn resolve(&self, path: &Path) -> Option<String> {
        let raw = self.type_by_extension(path)?;
        parse_media_type(&raw)
    }
}

impl Default for MimeTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse a media type string, dropping parameters and lowercasing.
///
/// `"Text/HTML; charset=utf-8"` -> `Some("text/html")`.
pub fn parse_media_type(raw: &str) -> Option<String> {
    let essence = raw.split(';').next()?.trim();
    let (top, sub) = essence.split_once('/')?;
    let valid = |s: &str| {
        !s.is_empty()
            && s.chars()
                .all(|c| c.is_ascii_alphanumeric() || "!#$&-^_.+".contains(c))
    };
    if !valid(top) || !valid(sub) {
        return None;
    }
    Some(format!(
        "{}/{}",
        top.to_ascii_lowercase(),
        sub.to_ascii_lowercase()
    ))
}

/// Top-level category of a MIME type (`"image"` for `"image/png"`).
pub fn category(mime_type: &str) -> &str {
    mime_type.split('/').next().unwrap_or(mime_type)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_overrides_win_over_mime_guess() {
        let table = MimeTable::new();
        assert_eq!(
            table.resolve(Path::new("/music/song.mp3")).as_deref(),
            Some("audio/mp3")
        );
        assert_eq!(
            table.resolve(Path::new("todo.org")).as_deref(),
            Some("text/x-org")
        );
    }

    #[test]
    fn falls_back_to_mime_guess() {
        let table = MimeTable::new();
        assert_eq!(
            table.resolve(Path::new("report.PDF")).as_deref(),
            Some("application/pdf")
        );
        assert_eq!(
            table.resolve(Path::new("notes.txt")).as_deref(),
            Some("text/plain")
        );
        assert_eq!(
            table.resolve(Path::new("scan.png")).as_deref(),
            Some("image/png")
        );
    }

    #[test]
    fn unknown_extension_is_none() {
        let table = MimeTable::new();
        assert!(table.resolve(Path::new("blob.qqqzzz")).is_none());
        assert!(table.resolve(Path::new("Makefile")).is_none());
    }

    #[test]
    fn custom_mapping_overrides() {
        let custom = [("txt".to_string(), "application/x-custom".to_string())];
        let table = MimeTable::with_custom(custom.iter().map(|(k, v)| (k, v)));
        assert_eq!(
            table.resolve(Path::new("a.txt")).as_deref(),
            Some("application/x-custom")
        );
    }

    #[test]
    fn malformed_custom_mapping_does_not_resolve() {
        let mut table = MimeTable::new();
        table.add(".weird", "not a type");
        assert!(table.resolve(Path::new("x.weird")).is_none());
    }

    #[test]
    fn parse_media_type_strips_params() {
        assert_eq!(
            parse_media_type("Text/HTML; charset=utf-8").as_deref(),
            Some("text/html")
        );
        assert!(parse_media_type("text/").is_none());
        assert!(parse_media_type("plain").is_none());
    }

    #[test]
    fn category_is_top_level() {
        assert_eq!(category("image/png"), "image");
        assert_eq!(category("text"), "text");
    }
}
