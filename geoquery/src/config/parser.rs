//! INI parsing for [`ConfigFile`].

use std::path::PathBuf;

use ini::Ini;

use super::{ConfigFile, ConfigFileError};
use crate::coord::MAX_SUPPORTED_RADIUS_KM;

/// Parse an `Ini` object into a `ConfigFile`.
///
/// Starts from `ConfigFile::default()` and overlays any values found in the INI.
pub(super) fn parse_ini(ini: &Ini) -> Result<ConfigFile, ConfigFileError> {
    let mut config = ConfigFile::default();

    // [query] section
    if let Some(section) = ini.section(Some("query")) {
        if let Some(v) = section.get("max_radius_km") {
            let radius = v
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|r| r.is_finite() && *r > 0.0 && *r <= MAX_SUPPORTED_RADIUS_KM)
                .ok_or_else(|| ConfigFileError::InvalidValue {
                    section: "query".to_string(),
                    key: "max_radius_km".to_string(),
                    value: v.to_string(),
                    reason: format!("must be a number greater than 0 and at most {}", MAX_SUPPORTED_RADIUS_KM),
                })?;
            config.query.max_radius_km = radius;
        }
        if let Some(v) = section.get("exit_on_read_failure") {
            config.query.exit_on_read_failure =
                parse_bool(v).ok_or_else(|| ConfigFileError::InvalidValue {
                    section: "query".to_string(),
                    key: "exit_on_read_failure".to_string(),
                    value: v.to_string(),
                    reason: "expected true/false, yes/no, on/off or 1/0".to_string(),
                })?;
        }
    }

    // [logging] section
    if let Some(section) = ini.section(Some("logging")) {
        if let Some(v) = section.get("directory") {
            let v = v.trim();
            if !v.is_empty() {
                config.logging.directory = Some(expand_tilde(v));
            }
        }
        if let Some(v) = section.get("file") {
            let v = v.trim();
            if v.is_empty() {
                return Err(ConfigFileError::InvalidValue {
                    section: "logging".to_string(),
                    key: "file".to_string(),
                    value: v.to_string(),
                    reason: "must not be empty".to_string(),
                });
            }
            config.logging.file = v.to_string();
        }
        if let Some(v) = section.get("level") {
            let v = v.trim();
            if !v.is_empty() {
                config.logging.level = v.to_lowercase();
            }
        }
    }

    Ok(config)
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Expand ~ to home directory in paths.
fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}
