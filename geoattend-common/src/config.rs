//! Configuration loading and resolution
//!
//! Bootstrap configuration comes from a TOML file. Every field has a built-in
//! default so a missing or partial file never prevents startup.
//!
//! # Settings Sources Priority
//!
//! 1. Command-line arguments (`--config`, `--api-url`)
//! 2. Environment variables (`GEOATTEND_CONFIG`, `GEOATTEND_API_URL`)
//! 3. TOML configuration file (`~/.config/geoattend/config.toml`)
//! 4. Built-in defaults (code constants)

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_PATH_ENV: &str = "GEOATTEND_CONFIG";

/// Environment variable overriding `api.base_url`
pub const API_URL_ENV: &str = "GEOATTEND_API_URL";

/// Bootstrap configuration loaded from TOML
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TomlConfig {
    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub poll: PollConfig,

    #[serde(default)]
    pub geolocation: GeolocationConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Attendance API connection settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the attendance API (no trailing slash required)
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout in milliseconds
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

/// Attendance status polling policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollConfig {
    /// Delay between status queries while pending
    #[serde(default = "default_poll_interval_ms")]
    pub interval_ms: u64,

    /// Total number of status queries before giving up
    #[serde(default = "default_poll_max_attempts")]
    pub max_attempts: u32,
}

/// Geolocation request options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeolocationConfig {
    #[serde(default = "default_geo_timeout_ms")]
    pub timeout_ms: u64,

    /// Oldest acceptable cached fix
    #[serde(default)]
    pub max_age_ms: u64,
}

/// Client-side key-value store settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Store directory; platform data directory when unset
    #[serde(default)]
    pub dir: Option<PathBuf>,

    /// Lifetime of the one-shot submission result record
    #[serde(default = "default_result_ttl_secs")]
    pub result_ttl_secs: u64,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (optional, logs to stderr if not specified)
    #[serde(default)]
    pub file: Option<PathBuf>,
}

fn default_base_url() -> String {
    "http://127.0.0.1:8000".to_string()
}

fn default_request_timeout_ms() -> u64 {
    30_000
}

fn default_poll_interval_ms() -> u64 {
    3_000
}

fn default_poll_max_attempts() -> u32 {
    10
}

fn default_geo_timeout_ms() -> u64 {
    10_000
}

fn default_result_ttl_secs() -> u64 {
    600
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_poll_interval_ms(),
            max_attempts: default_poll_max_attempts(),
        }
    }
}

impl Default for GeolocationConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_geo_timeout_ms(),
            max_age_ms: 0,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            dir: None,
            result_ttl_secs: default_result_ttl_secs(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

impl ApiConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl PollConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

impl GeolocationConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn max_age(&self) -> Duration {
        Duration::from_millis(self.max_age_ms)
    }
}

impl StorageConfig {
    /// Store directory, falling back to the platform data directory
    pub fn resolved_dir(&self) -> PathBuf {
        self.dir.clone().unwrap_or_else(default_storage_dir)
    }

    pub fn result_ttl(&self) -> Duration {
        Duration::from_secs(self.result_ttl_secs)
    }
}

impl TomlConfig {
    /// Reject values that would make the client unusable
    pub fn validate(&self) -> Result<()> {
        let url = self.api.base_url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(Error::Config(format!(
                "api.base_url must start with http:// or https://, got {:?}",
                self.api.base_url
            )));
        }
        if self.poll.max_attempts == 0 {
            return Err(Error::Config("poll.max_attempts must be at least 1".to_string()));
        }
        if self.poll.interval_ms == 0 {
            return Err(Error::Config("poll.interval_ms must be positive".to_string()));
        }
        Ok(())
    }
}

/// Resolves and loads the bootstrap configuration for one front end
pub struct ConfigResolver {
    module_name: String,
}

impl ConfigResolver {
    pub fn new(module_name: impl Into<String>) -> Self {
        Self {
            module_name: module_name.into(),
        }
    }

    /// Pick the config file path (CLI → ENV → platform default)
    ///
    /// Returns `None` when no candidate file exists.
    pub fn config_path(&self, cli_arg: Option<&Path>) -> Option<PathBuf> {
        // Priority 1: Command-line argument
        if let Some(path) = cli_arg {
            return Some(path.to_path_buf());
        }

        // Priority 2: Environment variable
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            if !path.trim().is_empty() {
                return Some(PathBuf::from(path));
            }
        }

        // Priority 3: Platform config file
        default_config_file().filter(|p| p.exists())
    }

    /// Load configuration with graceful degradation
    ///
    /// An explicitly named file that cannot be read is an error. A missing
    /// platform default only logs a warning and yields built-in defaults.
    pub fn load(&self, cli_config: Option<&Path>, cli_api_url: Option<&str>) -> Result<TomlConfig> {
        let mut config = match self.config_path(cli_config) {
            Some(path) => {
                info!(module = %self.module_name, "Loading config from {}", path.display());
                load_toml_config(&path)?
            }
            None => {
                warn!(
                    module = %self.module_name,
                    "No config file found, using built-in defaults"
                );
                TomlConfig::default()
            }
        };

        if let Some(url) = cli_api_url {
            config.api.base_url = url.to_string();
        } else if let Ok(url) = std::env::var(API_URL_ENV) {
            if !url.trim().is_empty() {
                config.api.base_url = url;
            }
        }

        config.validate()?;
        Ok(config)
    }
}

/// Read and parse a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))
}

/// Write config atomically (temp file + rename)
pub fn write_toml_config(config: &TomlConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Serialize TOML failed: {}", e)))?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let tmp_path = path.with_extension("toml.tmp");
    std::fs::write(&tmp_path, content)?;
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

/// Platform config file location (`<config_dir>/geoattend/config.toml`)
pub fn default_config_file() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("geoattend").join("config.toml"))
}

/// OS-dependent default store directory
fn default_storage_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("geoattend"))
        .unwrap_or_else(|| PathBuf::from("./geoattend_data"))
}
