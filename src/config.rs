use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Characters tesseract is allowed to emit: printable ASCII.
pub const DEFAULT_OCR_WHITELIST: &str = concat!(
    " !\"#$%&'()*+,-./0123456789:;<=>?@",
    "ABCDEFGHIJKLMNOPQRSTUVWXYZ[\\]^_",
    "abcdefghijklmnopqrstuvwxyz{|}~`"
);

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub index: IndexConfig,
    /// Custom extension -> MIME type mappings (`org = "text/x-org"`).
    #[serde(default)]
    pub mime: BTreeMap<String, String>,
    #[serde(default)]
    pub pdf: PdfConfig,
    #[serde(default)]
    pub ocr: OcrConfig,
    #[serde(default)]
    pub tools: ToolsConfig,
    #[serde(default)]
    pub query: QueryConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    #[serde(default = "default_index_path")]
    pub index_path: PathBuf,
    #[serde(default = "default_hash_dir")]
    pub hash_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            index_path: default_index_path(),
            hash_dir: default_hash_dir(),
        }
    }
}

fn data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".fidx")
}

fn default_index_path() -> PathBuf {
    data_dir().join("index.sqlite")
}

fn default_hash_dir() -> PathBuf {
    data_dir().join("hashes")
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct IndexConfig {
    /// Maximum file size in bytes. `None` means unlimited.
    #[serde(default)]
    pub max_file_size: Option<u64>,
    /// Ignore the size limit. Unchanged files are still skipped.
    #[serde(default)]
    pub force: bool,
    #[serde(default)]
    pub exclude_globs: Vec<String>,
    #[serde(default)]
    pub follow_symlinks: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PdfConfig {
    #[serde(default = "default_pdftotext")]
    pub pdftotext: String,
    #[serde(default = "default_convert")]
    pub convert: String,
    #[serde(default = "default_density")]
    pub density: u32,
    #[serde(default = "default_min_text_chars")]
    pub min_text_chars: usize,
    #[serde(default = "default_true")]
    pub builtin_text_layer: bool,
}

impl Default for PdfConfig {
    fn default() -> Self {
        Self {
            pdftotext: default_pdftotext(),
            convert: default_convert(),
            density: default_density(),
            min_text_chars: default_min_text_chars(),
            builtin_text_layer: true,
        }
    }
}

fn default_pdftotext() -> String {
    "pdftotext".to_string()
}
fn default_convert() -> String {
    "convert".to_string()
}
fn default_density() -> u32 {
    300
}
fn default_min_text_chars() -> usize {
    80
}
fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize, Clone)]
pub struct OcrConfig {
    #[serde(default = "default_tesseract")]
    pub tesseract: String,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default = "default_tessdata_prefix")]
    pub tessdata_prefix: Option<PathBuf>,
    #[serde(default = "default_whitelist")]
    pub whitelist: String,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            tesseract: default_tesseract(),
            language: default_language(),
            tessdata_prefix: default_tessdata_prefix(),
            whitelist: default_whitelist(),
        }
    }
}

fn default_tesseract() -> String {
    "tesseract".to_string()
}
fn default_language() -> String {
    "eng".to_string()
}
fn default_tessdata_prefix() -> Option<PathBuf> {
    std::env::var_os("TESSDATA_PREFIX")
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}
fn default_whitelist() -> String {
    DEFAULT_OCR_WHITELIST.to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct ToolsConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    120
}

#[derive(Debug, Deserialize, Clone)]
pub struct QueryConfig {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub from: i64,
    #[serde(default = "default_true")]
    pub highlight: bool,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            limit: default_limit(),
            from: 0,
            highlight: true,
        }
    }
}

fn default_limit() -> i64 {
    10
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:8080".to_string()
}

/// Command-line values that take precedence over the config file.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub force: bool,
    pub max_file_size: Option<u64>,
    pub mime: Vec<(String, String)>,
    pub limit: Option<i64>,
    pub from: Option<i64>,
    pub no_highlight: bool,
}

impl Config {
    /// Fold command-line overrides into the config and re-validate.
    pub fn with_overrides(mut self, overrides: Overrides) -> Result<Self> {
        if overrides.force {
            self.index.force = true;
        }
        if let Some(max) = overrides.max_file_size {
            self.index.max_file_size = Some(max);
        }
        for (ext, mime_type) in overrides.mime {
            self.mime.insert(ext, mime_type);
        }
        if let Some(limit) = overrides.limit {
            self.query.limit = limit;
        }
        if let Some(from) = overrides.from {
            self.query.from = from;
        }
        if overrides.no_highlight {
            self.query.highlight = false;
        }
        validate(&self)?;
        Ok(self)
    }
}

/// Load the config file, falling back to defaults when it does not exist.
pub fn load_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        tracing::debug!("config file {} not found, using defaults", path.display());
        let config = Config::default();
        validate(&config)?;
        return Ok(config);
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let mut config: Config =
        toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    config.storage.index_path = expand_home(&config.storage.index_path);
    config.storage.hash_dir = expand_home(&config.storage.hash_dir);

    validate(&config)?;
    Ok(config)
}

/// `~/x` -> `$HOME/x`. Other paths are returned unchanged.
fn expand_home(path: &Path) -> PathBuf {
    match (path.strip_prefix("~"), dirs::home_dir()) {
        (Ok(rest), Some(home)) => home.join(rest),
        _ => path.to_path_buf(),
    }
}

fn validate(config: &Config) -> Result<()> {
    if config.pdf.density == 0 {
        anyhow::bail!("pdf.density must be > 0");
    }

    if config.query.limit < 1 {
        anyhow::bail!("query.limit must be >= 1");
    }
    if config.query.from < 0 {
        anyhow::bail!("query.from must be >= 0");
    }

    if config.ocr.language.trim().is_empty() {
        anyhow::bail!("ocr.language must not be empty");
    }

    if config.tools.timeout_secs == 0 {
        anyhow::bail!("tools.timeout_secs must be > 0");
    }

    for (ext, mime_type) in &config.mime {
        if crate::mime::parse_media_type(mime_type).is_none() {
            anyhow::bail!("mime.{} = '{}' is not a valid type/subtype", ext, mime_type);
        }
    }

    if config.storage.index_path == config.storage.hash_dir {
        anyhow::bail!("storage.index_path and storage.hash_dir must differ");
    }

    Ok(())
}
