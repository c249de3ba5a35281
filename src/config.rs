//! Configuration file support
//!
//! Lookup order: an explicit `--config` path, then `./slicebook.toml`, then
//! `<config dir>/slicebook/config.toml`. A missing file means defaults; CLI
//! flags are merged on top.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::fetch::{
    HttpSourceOptions, DEFAULT_POLITENESS_DELAY_MS, DEFAULT_REQUEST_TIMEOUT_SECS,
    DEFAULT_RETRY_DELAY_MS, DEFAULT_USER_AGENT,
};
use crate::pdf_writer::{PdfWriterOptions, DEFAULT_DPI, DEFAULT_JPEG_QUALITY};
use crate::target::DEFAULT_BASE_URL;

/// Local config file name
pub const LOCAL_CONFIG_FILE: &str = "slicebook.toml";

/// Config file name inside the user config directory
const USER_CONFIG_PATH: &str = "slicebook/config.toml";

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// `[fetch]` section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Site origin the reading pages live under
    pub base_url: String,
    /// User-Agent header for page requests
    pub user_agent: String,
    /// Per-request timeout in seconds
    pub request_timeout_secs: u64,
    /// Pause after each saved page in milliseconds
    pub politeness_delay_ms: u64,
    /// Pause before retrying a failed fetch in milliseconds
    pub retry_delay_ms: u64,
    /// Retries per page before giving up; unset retries forever
    pub max_retries: Option<u32>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            politeness_delay_ms: DEFAULT_POLITENESS_DELAY_MS,
            retry_delay_ms: DEFAULT_RETRY_DELAY_MS,
            max_retries: None,
        }
    }
}

/// `[output]` section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory holding slice folders and PDFs
    pub output_dir: PathBuf,
    /// JPEG quality of PDF pages
    pub jpeg_quality: u8,
    /// Pixels per inch used to size PDF pages
    pub dpi: u32,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            dpi: DEFAULT_DPI,
        }
    }
}

/// Complete configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub fetch: FetchConfig,
    pub output: OutputConfig,
}

/// Values set explicitly on the command line
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub base_url: Option<String>,
    pub output_dir: Option<PathBuf>,
    pub max_retries: Option<u32>,
}

impl CliOverrides {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Config {
    /// Parse a TOML string
    pub fn from_toml(content: &str, origin: &Path) -> Result<Self> {
        toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: origin.to_path_buf(),
            source,
        })
    }

    /// Load from a specific file
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content, path)
    }

    /// Load from the first config file found, or defaults
    pub fn load() -> Result<Self> {
        match Self::search_paths().into_iter().find(|p| p.is_file()) {
            Some(path) => Self::load_from_path(&path),
            None => Ok(Self::default()),
        }
    }

    /// Candidate config locations, most specific first
    pub fn search_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from(LOCAL_CONFIG_FILE)];
        if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join(USER_CONFIG_PATH));
        }
        paths
    }

    /// Apply CLI overrides; CLI values win
    pub fn merge_with_cli(mut self, overrides: &CliOverrides) -> Self {
        if let Some(base_url) = &overrides.base_url {
            self.fetch.base_url = base_url.clone();
        }
        if let Some(output_dir) = &overrides.output_dir {
            self.output.output_dir = output_dir.clone();
        }
        if overrides.max_retries.is_some() {
            self.fetch.max_retries = overrides.max_retries;
        }
        self
    }

    /// HTTP client settings
    pub fn http_options(&self) -> HttpSourceOptions {
        HttpSourceOptions {
            base_url: self.fetch.base_url.clone(),
            user_agent: self.fetch.user_agent.clone(),
            timeout: Duration::from_secs(self.fetch.request_timeout_secs),
        }
    }

    /// PDF writer settings
    pub fn pdf_options(&self) -> PdfWriterOptions {
        PdfWriterOptions::builder()
            .jpeg_quality(self.output.jpeg_quality)
            .dpi(self.output.dpi)
            .build()
    }

    pub fn politeness_delay(&self) -> Duration {
        Duration::from_millis(self.fetch.politeness_delay_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.fetch.retry_delay_ms)
    }
}
