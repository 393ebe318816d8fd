//! Logging setup for binaries embedding the query engine.
//!
//! - Always logs to stderr (stdout stays free for command output)
//! - Optionally mirrors to a log file via a non-blocking writer
//! - `RUST_LOG` overrides the configured level

use std::fs;
use std::io;
use std::path::PathBuf;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::config::LoggingSettings;

/// Guard that must be kept alive for the duration of logging.
///
/// Dropping this guard will flush and close the log file writer.
pub struct LoggingGuard {
    _file_guard: Option<WorkerGuard>,
    log_path: Option<PathBuf>,
}

impl LoggingGuard {
    /// Path of the log file, if file logging is enabled.
    pub fn log_path(&self) -> Option<&PathBuf> {
        self.log_path.as_ref()
    }
}

/// Build the filter: `RUST_LOG` if set, otherwise `level`.
pub fn build_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}

/// Initialize the global subscriber.
///
/// When `settings.directory` is set, the directory is created and the log
/// file truncated before logging starts.
///
/// # Errors
///
/// Returns an error if the log directory cannot be created or the log file
/// cannot be cleared.
pub fn init_logging(settings: &LoggingSettings) -> Result<LoggingGuard, io::Error> {
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(io::stderr)
        .with_target(false);

    let registry = tracing_subscriber::registry()
        .with(build_filter(&settings.level))
        .with(stderr_layer);

    let Some(dir) = settings.directory.as_ref() else {
        registry.init();
        return Ok(LoggingGuard {
            _file_guard: None,
            log_path: None,
        });
    };

    fs::create_dir_all(dir)?;
    let log_path = dir.join(&settings.file);
    fs::write(&log_path, "")?;

    let file_appender = tracing_appender::rolling::never(dir, &settings.file);
    let (non_blocking_file, file_guard) = tracing_appender::non_blocking(file_appender);
    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking_file)
        .with_ansi(false);

    registry.with(file_layer).init();

    Ok(LoggingGuard {
        _file_guard: Some(file_guard),
        log_path: Some(log_path),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    // init_logging installs a global subscriber, so only the pieces around it
    // are tested here.

    #[test]
    fn test_build_filter_accepts_level() {
        let filter = build_filter("debug");
        assert!(!filter.to_string().is_empty());
    }

    #[test]
    fn test_default_settings_log_to_stderr_only() {
        let settings = LoggingSettings::default();
        assert!(settings.directory.is_none());
        assert_eq!(settings.level, "info");
    }
}
