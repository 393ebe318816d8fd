//! CLI error handling with user-friendly messages.
//!
//! Centralizes error handling for the CLI, providing consistent formatting
//! and appropriate exit codes.

use std::fmt;
use std::path::PathBuf;
use std::process;

use geoquery::coord::CoordError;
use geoquery::query::QueryError;

/// CLI-specific errors with user-friendly messages.
#[derive(Debug)]
pub enum CliError {
    /// Failed to initialize logging
    LoggingInit(String),
    /// Configuration error
    Config(String),
    /// Latitude or longitude out of range
    Coordinate(CoordError),
    /// Radius is not a positive number
    Radius(f64),
    /// Fixture file could not be read or parsed
    Fixture { path: PathBuf, reason: String },
    /// Failed to start the async runtime
    Runtime(std::io::Error),
    /// The query rejected an operation
    Query(QueryError),
}

impl CliError {
    /// Exit the process with an appropriate error message and code.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        match self {
            CliError::Coordinate(_) => {
                eprintln!();
                eprintln!("Latitude must be within [-90, 90] and longitude within [-180, 180].");
            }
            CliError::Fixture { .. } => {
                eprintln!();
                eprintln!("A fixture is a JSON object like:");
                eprintln!(r#"  {{"documents": [{{"id": "a", "location": [0.0, 0.001]}}],"#);
                eprintln!(r#"   "steps": [{{"op": "delete", "id": "a"}}]}}"#);
            }
            _ => {}
        }

        process::exit(1)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::LoggingInit(msg) => write!(f, "Failed to initialize logging: {}", msg),
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CliError::Coordinate(e) => write!(f, "Invalid coordinate: {}", e),
            CliError::Radius(r) => write!(f, "Invalid radius {} km: must be greater than 0", r),
            CliError::Fixture { path, reason } => {
                write!(f, "Failed to load fixture '{}': {}", path.display(), reason)
            }
            CliError::Runtime(e) => write!(f, "Failed to start runtime: {}", e),
            CliError::Query(e) => write!(f, "Query error: {}", e),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Coordinate(e) => Some(e),
            CliError::Runtime(e) => Some(e),
            CliError::Query(e) => Some(e),
            _ => None,
        }
    }
}

impl From<CoordError> for CliError {
    fn from(e: CoordError) -> Self {
        CliError::Coordinate(e)
    }
}

impl From<QueryError> for CliError {
    fn from(e: QueryError) -> Self {
        CliError::Query(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        assert_eq!(
            CliError::Config("bad".to_string()).to_string(),
            "Configuration error: bad"
        );
        assert!(CliError::Radius(-1.0).to_string().contains("-1"));

        let err = CliError::Fixture {
            path: PathBuf::from("scenario.json"),
            reason: "missing field `id`".to_string(),
        };
        assert!(err.to_string().contains("scenario.json"));
    }

    #[test]
    fn test_from_query_error() {
        let err: CliError = QueryError::DuplicateListener.into();
        assert!(matches!(err, CliError::Query(QueryError::DuplicateListener)));
    }
}
