//! Configuration loading and config file resolution
//!
//! Lumen reads a single bootstrap TOML file. Every field has a built-in
//! default, so a missing file (or a file with only some tables) is valid.
//!
//! # Config file priority
//!
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. Platform config directory (`<config_dir>/lumen/config.toml`), if it exists
//! 4. None: compiled defaults

use crate::time::millis_to_duration;
use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Environment variable naming the config file
pub const CONFIG_ENV_VAR: &str = "LUMEN_CONFIG";

/// Bootstrap configuration loaded from TOML file
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct TomlConfig {
    /// Logging configuration (optional)
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Mindmap result cache settings (optional)
    #[serde(default)]
    pub cache: CacheConfig,

    /// Embedding status endpoint and tracker timing (optional)
    #[serde(default)]
    pub embedding: EmbeddingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Result cache configuration
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct CacheConfig {
    /// Entry time-to-live in seconds
    #[serde(default = "default_cache_ttl_secs")]
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_cache_ttl_secs(),
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

/// Embedding tracker configuration
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct EmbeddingConfig {
    /// Base URL of the embedding service
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// User whose jobs are queried (`user_id` query parameter)
    #[serde(default)]
    pub user_id: Option<String>,

    /// Delay between status polls
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Guard: a job still running after this long is forced to completion
    #[serde(default = "default_max_duration_secs")]
    pub max_duration_secs: u64,

    /// Per-request timeout for the status query
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            user_id: None,
            poll_interval_ms: default_poll_interval_ms(),
            max_duration_secs: default_max_duration_secs(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

impl EmbeddingConfig {
    pub fn poll_interval(&self) -> Duration {
        millis_to_duration(self.poll_interval_ms)
    }

    pub fn max_duration(&self) -> Duration {
        Duration::from_secs(self.max_duration_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        millis_to_duration(self.request_timeout_ms)
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_cache_ttl_secs() -> u64 {
    30 * 60
}

fn default_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_poll_interval_ms() -> u64 {
    2_000
}

fn default_max_duration_secs() -> u64 {
    10 * 60
}

fn default_request_timeout_ms() -> u64 {
    2_000
}

impl TomlConfig {
    /// Parse configuration from TOML text and validate it
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: TomlConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Load configuration, degrading to defaults on any failure
    ///
    /// A missing or broken config file is logged and never aborts startup.
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            info!("No config file found, using built-in defaults");
            return Self::default();
        };

        match Self::load(path) {
            Ok(config) => {
                info!("Loaded config from {}", path.display());
                config
            }
            Err(e) => {
                warn!(
                    "Failed to load config from {} ({}), using built-in defaults",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Reject values that would break the tracker or cache
    pub fn validate(&self) -> Result<()> {
        if self.cache.ttl_secs == 0 {
            return Err(Error::Config("cache.ttl_secs must be greater than 0".to_string()));
        }
        if self.embedding.poll_interval_ms == 0 {
            return Err(Error::Config(
                "embedding.poll_interval_ms must be greater than 0".to_string(),
            ));
        }
        if self.embedding.request_timeout_ms == 0 {
            return Err(Error::Config(
                "embedding.request_timeout_ms must be greater than 0".to_string(),
            ));
        }
        if self.embedding.base_url.trim().is_empty() {
            return Err(Error::Config("embedding.base_url must not be empty".to_string()));
        }
        Ok(())
    }
}

/// Config file resolution following the documented priority order
pub fn resolve_config_path(cli_arg: Option<&Path>, env_var_name: &str) -> Option<PathBuf> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(env_var_name) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    // Priority 3: Platform config directory, only if the file is there
    default_config_file().filter(|path| path.exists())
}

/// Platform config file location: `<config_dir>/lumen/config.toml`
pub fn default_config_file() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("lumen").join("config.toml"))
}
