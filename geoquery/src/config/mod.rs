//! Configuration file handling for `~/.geoquery/config.ini`.
//!
//! ```ini
//! [query]
//! max_radius_km = 500
//! exit_on_read_failure = true
//!
//! [logging]
//! directory = ~/.geoquery/logs
//! file = geoquery.log
//! level = info
//! ```
//!
//! A missing file yields defaults. Unknown keys are ignored.

mod parser;

use std::path::{Path, PathBuf};

use ini::Ini;
use thiserror::Error;

use crate::coord::MAX_SUPPORTED_RADIUS_KM;
use crate::query::GeoQueryConfig;

/// Default log level when neither `RUST_LOG` nor the config sets one.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Default log file name.
pub const DEFAULT_LOG_FILE: &str = "geoquery.log";

/// Configuration file errors.
#[derive(Debug, Error)]
pub enum ConfigFileError {
    /// Failed to read config file
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] ini::Error),

    /// Invalid configuration value
    #[error("Invalid configuration: {section}.{key} = '{value}' - {reason}")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
        reason: String,
    },
}

/// `[query]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct QuerySettings {
    pub max_radius_km: f64,
    pub exit_on_read_failure: bool,
}

impl Default for QuerySettings {
    fn default() -> Self {
        Self {
            max_radius_km: MAX_SUPPORTED_RADIUS_KM,
            exit_on_read_failure: true,
        }
    }
}

/// `[logging]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct LoggingSettings {
    /// Directory for the log file; `None` logs to stderr only.
    pub directory: Option<PathBuf>,
    pub file: String,
    /// Filter directive used when `RUST_LOG` is unset.
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            directory: None,
            file: DEFAULT_LOG_FILE.to_string(),
            level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

/// Parsed configuration file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigFile {
    pub query: QuerySettings,
    pub logging: LoggingSettings,
}

impl ConfigFile {
    /// Load configuration from the default path (`~/.geoquery/config.ini`).
    pub fn load() -> Result<Self, ConfigFileError> {
        Self::load_from(&config_file_path())
    }

    /// Load configuration from a specific path.
    ///
    /// If the file doesn't exist, returns defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigFileError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let ini = Ini::load_from_file(path)?;
        parser::parse_ini(&ini)
    }

    /// Query configuration derived from the `[query]` section.
    pub fn query_config(&self) -> GeoQueryConfig {
        GeoQueryConfig::default()
            .with_max_radius_km(self.query.max_radius_km)
            .with_exit_on_read_failure(self.query.exit_on_read_failure)
    }
}

/// Get the path to the config directory (`~/.geoquery`).
pub fn config_directory() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".geoquery")
}

/// Get the path to the config file (`~/.geoquery/config.ini`).
pub fn config_file_path() -> PathBuf {
    config_directory().join("config.ini")
}
