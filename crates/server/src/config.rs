use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const CONFIG_ENV: &str = "SCRIVENER_CONFIG";
pub const BIND_ENV: &str = "SCRIVENER_BIND";
const DEFAULT_CONFIG_FILE: &str = "scrivener.toml";

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub server: ServerSection,
    pub ocr: OcrSection,
    pub logging: LoggingSection,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ServerSection {
    pub bind: String,
    /// Upper bound for request bodies, uploads included.
    pub max_upload_bytes: usize,
    /// Browser origins allowed to call the API; empty disables CORS headers.
    pub allowed_origins: Vec<String>,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8080".to_string(),
            max_upload_bytes: 10 * 1024 * 1024,
            allowed_origins: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct OcrSection {
    /// Run the misread-correction pass before field parsing.
    pub cleaning: bool,
    /// TOML file overriding the built-in cleaning and extraction rules.
    pub rules_path: Option<PathBuf>,
    /// Tesseract `tessdata` directory; the system default when unset.
    pub tessdata_path: Option<String>,
    /// Tesseract language pack, e.g. `eng`.
    pub language: String,
}

impl Default for OcrSection {
    fn default() -> Self {
        Self {
            cleaning: false,
            rules_path: None,
            tessdata_path: None,
            language: "eng".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Bunyan,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingSection {
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self { level: "info".to_string(), format: LogFormat::default() }
    }
}

impl ServerConfig {
    /// Load from `$SCRIVENER_CONFIG` (or `./scrivener.toml`), then apply
    /// `$SCRIVENER_BIND`.
    pub fn load() -> Result<Self> {
        let path = std::env::var_os(CONFIG_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
        let config = Self::load_from(&path)?;
        Ok(config.with_bind_override(std::env::var(BIND_ENV).ok()))
    }

    /// A missing file yields the defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "Config file does not exist; using defaults");
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_toml_str(&raw)
            .with_context(|| format!("Failed to parse config TOML at: {}", path.display()))
    }

    pub fn from_toml_str(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    pub fn with_bind_override(mut self, bind: Option<String>) -> Self {
        if let Some(bind) = bind.filter(|b| !b.trim().is_empty()) {
            self.server.bind = bind;
        }
        self
    }
}
