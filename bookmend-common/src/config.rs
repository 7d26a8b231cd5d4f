//! Settings loading and config-path resolution
//!
//! Settings live in a TOML file that is re-read on demand: the background
//! worker reloads once per cycle and every triggered operation reads the
//! current file, so edits take effect without a restart.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

/// Environment variable overriding the AI service key from the file.
pub const API_KEY_ENV: &str = "BOOKMEND_API_KEY";

/// Environment variable naming the settings file.
pub const CONFIG_ENV: &str = "BOOKMEND_CONFIG";

/// Service settings.
///
/// Every field has a default so a missing or partial file still yields a
/// usable configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Library roots scanned for author/title folders.
    pub library_paths: Vec<PathBuf>,
    /// Bearer key for the AI service. [`API_KEY_ENV`] overrides the file.
    pub api_key: Option<String>,
    /// Model identifier sent with every correction request.
    pub model: String,
    /// Chat-completions endpoint; any OpenAI-compatible host works.
    pub api_base_url: String,
    /// Hours between background scan cycles.
    pub scan_interval_hours: u64,
    /// Queue entries evaluated per AI request.
    pub batch_size: usize,
    /// Ceiling on AI requests, enforced as a minimum interval between calls.
    pub max_requests_per_hour: u32,
    /// Apply corrections to the filesystem immediately instead of leaving
    /// them for operator approval.
    pub auto_fix: bool,
    /// Master switch for the background worker's scan cycle.
    pub enabled: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            library_paths: Vec::new(),
            api_key: None,
            model: "google/gemma-3n-e4b-it:free".to_string(),
            api_base_url: "https://openrouter.ai/api/v1/chat/completions".to_string(),
            scan_interval_hours: 6,
            batch_size: 3,
            max_requests_per_hour: 30,
            auto_fix: false,
            enabled: true,
        }
    }
}

impl Settings {
    /// Parse settings from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
    }

    /// Sleep between worker cycles.
    pub fn scan_interval(&self) -> Duration {
        Duration::from_secs(self.scan_interval_hours.saturating_mul(3600))
    }

    /// Minimum spacing between AI requests derived from
    /// `max_requests_per_hour`. Zero disables the limiter.
    pub fn min_request_interval(&self) -> Duration {
        if self.max_requests_per_hour == 0 {
            Duration::ZERO
        } else {
            Duration::from_secs(3600 / u64::from(self.max_requests_per_hour).max(1))
        }
    }
}

/// Re-reads the settings file on every call.
#[derive(Debug, Clone)]
pub struct SettingsSource {
    path: PathBuf,
}

impl SettingsSource {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current settings: file contents when readable, defaults otherwise.
    /// A present-but-broken file is a warning, not a fatal error.
    pub fn current(&self) -> Settings {
        let mut settings = if self.path.exists() {
            match Settings::load(&self.path) {
                Ok(settings) => settings,
                Err(e) => {
                    warn!("Error loading settings: {}", e);
                    Settings::default()
                }
            }
        } else {
            Settings::default()
        };

        if let Ok(key) = std::env::var(API_KEY_ENV) {
            if !key.trim().is_empty() {
                settings.api_key = Some(key);
            }
        }

        settings
    }
}

/// Settings file location, by priority:
/// 1. Command-line argument
/// 2. `BOOKMEND_CONFIG` environment variable
/// 3. `<config dir>/bookmend/config.toml`
pub fn resolve_config_path(cli_arg: Option<&Path>) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    if let Ok(path) = std::env::var(CONFIG_ENV) {
        return PathBuf::from(path);
    }

    dirs::config_dir()
        .map(|d| d.join("bookmend").join("config.toml"))
        .unwrap_or_else(|| PathBuf::from("bookmend.toml"))
}

/// Default data directory holding the catalog database.
pub fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("bookmend"))
        .unwrap_or_else(|| PathBuf::from("./bookmend_data"))
}
