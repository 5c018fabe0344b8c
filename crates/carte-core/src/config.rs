//! Back-office configuration.
//!
//! Configuration can be loaded from:
//! - a TOML file (path in `CARTE_CONFIG`, or passed explicitly)
//! - environment variables (`CARTE_*` prefixed, `.env` honoured)
//!
//! # Example
//!
//! ```rust,no_run
//! use carte_core::config::CarteConfig;
//!
//! // Load from CARTE_CONFIG or fall back to env vars
//! let config = CarteConfig::load().expect("Failed to load config");
//!
//! // Or explicitly from a file
//! let config = CarteConfig::from_file(std::path::Path::new("carte.toml")).expect("Failed to load");
//! ```

use std::env;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::defaults;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),

    #[error("Validation error: {0}")]
    Validation(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

impl From<ConfigError> for crate::Error {
    fn from(e: ConfigError) -> Self {
        crate::Error::Config(e.to_string())
    }
}

/// What to do when a category update omits the name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MissingNamePolicy {
    /// Write an empty name, as the admin console always has.
    #[default]
    DefaultToEmpty,
    /// Reject the update before it reaches the store.
    Reject,
}

impl FromStr for MissingNamePolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "default_to_empty" | "empty" => Ok(Self::DefaultToEmpty),
            "reject" => Ok(Self::Reject),
            _ => Err(ConfigError::InvalidValue(
                "categories.missing_name_on_update",
                s.to_string(),
            )),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(ConfigError::InvalidValue("logging.format", s.to_string())),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Json => write!(f, "json"),
        }
    }
}

/// Object storage settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Prefix of every resolved download URL.
    pub public_base_url: String,
    /// Root directory for the filesystem backend.
    pub root: Option<PathBuf>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            public_base_url: defaults::STORAGE_PUBLIC_BASE_URL.to_string(),
            root: None,
        }
    }
}

impl StorageConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.public_base_url.is_empty() {
            return Err(ConfigError::Validation(
                "storage public_base_url cannot be empty".to_string(),
            ));
        }

        if !self.public_base_url.starts_with("http://")
            && !self.public_base_url.starts_with("https://")
        {
            return Err(ConfigError::Validation(format!(
                "storage public_base_url must start with http:// or https://, got: {}",
                self.public_base_url
            )));
        }

        Ok(())
    }
}

/// Category management settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct CategoryConfig {
    pub missing_name_on_update: MissingNamePolicy,
}

/// Logging settings. `RUST_LOG` always wins over `filter`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct LoggingConfig {
    pub format: LogFormat,
    /// Log file path; enables daily-rotated file output.
    pub file: Option<PathBuf>,
    /// `EnvFilter` directives, defaulting to [`defaults::LOG_FILTER`].
    pub filter: Option<String>,
    /// Force ANSI colors on or off. Auto-detected on the console, off in files.
    pub ansi: Option<bool>,
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct CarteConfig {
    pub storage: StorageConfig,
    pub categories: CategoryConfig,
    pub logging: LoggingConfig,
}

impl CarteConfig {
    /// Load from the file named by `CARTE_CONFIG`, or from the environment.
    pub fn load() -> ConfigResult<Self> {
        let _ = dotenvy::dotenv();

        match env::var("CARTE_CONFIG") {
            Ok(path) => {
                info!(path = %path, "Loading configuration file");
                Self::from_file(Path::new(&path))
            }
            Err(_) => {
                debug!("CARTE_CONFIG not set, reading configuration from environment");
                Self::from_env()
            }
        }
    }

    /// Parse and validate a TOML file.
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Parse and validate TOML text.
    pub fn from_toml(contents: &str) -> ConfigResult<Self> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Read `CARTE_*` variables from the process environment.
    pub fn from_env() -> ConfigResult<Self> {
        let _ = dotenvy::dotenv();
        Self::from_vars(|key| env::var(key).ok())
    }

    /// Build a configuration from a variable lookup.
    ///
    /// Recognised keys: `CARTE_STORAGE_BASE_URL`, `CARTE_STORAGE_ROOT`,
    /// `CARTE_MISSING_NAME_POLICY`, `CARTE_LOG_FORMAT`, `CARTE_LOG_FILE`,
    /// `CARTE_LOG_FILTER`, `CARTE_LOG_ANSI`.
    pub fn from_vars<F>(lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = lookup("CARTE_STORAGE_BASE_URL") {
            config.storage.public_base_url = url;
        }
        if let Some(root) = lookup("CARTE_STORAGE_ROOT") {
            config.storage.root = Some(PathBuf::from(root));
        }
        if let Some(policy) = lookup("CARTE_MISSING_NAME_POLICY") {
            config.categories.missing_name_on_update = policy.parse()?;
        }
        if let Some(format) = lookup("CARTE_LOG_FORMAT") {
            config.logging.format = format.parse()?;
        }
        if let Some(file) = lookup("CARTE_LOG_FILE") {
            config.logging.file = Some(PathBuf::from(file));
        }
        config.logging.filter = lookup("CARTE_LOG_FILTER");
        config.logging.ansi = lookup("CARTE_LOG_ANSI").map(|v| v == "true" || v == "1");

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        self.storage.validate()
    }
}
