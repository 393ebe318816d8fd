//! Scenario fixtures for `geoquery watch`.
//!
//! ```json
//! {
//!   "documents": [
//!     { "id": "cafe", "location": [0.0, 0.001], "fields": { "name": "Cafe" } }
//!   ],
//!   "steps": [
//!     { "op": "set", "id": "cafe", "location": [0.0, 0.002] },
//!     { "op": "move_query", "center": [0.0, 0.05], "radius_km": 2.0 },
//!     { "op": "delete", "id": "cafe" }
//!   ]
//! }
//! ```

use std::fmt;
use std::path::Path;

use geoquery::coord::GeoPoint;
use geoquery::store::DocumentSnapshot;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::CliError;

/// A document to place in the store.
#[derive(Debug, Clone, Deserialize)]
pub struct FixtureDocument {
    pub id: String,
    pub location: GeoPoint,
    #[serde(default)]
    pub fields: Map<String, Value>,
}

impl FixtureDocument {
    /// Build the stored snapshot, with geohash and location fields filled in.
    pub fn to_snapshot(&self) -> DocumentSnapshot {
        DocumentSnapshot::located(self.id.as_str(), self.location, self.fields.clone())
    }
}

/// One scripted change.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    /// Insert or replace a document.
    Set(FixtureDocument),
    /// Delete a document.
    Delete { id: String },
    /// Move and/or resize the query circle.
    MoveQuery {
        center: GeoPoint,
        #[serde(default)]
        radius_km: Option<f64>,
    },
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Set(doc) => write!(f, "set {} at {}", doc.id, doc.location),
            Step::Delete { id } => write!(f, "delete {}", id),
            Step::MoveQuery {
                center,
                radius_km: Some(r),
            } => write!(f, "move query to {} radius {} km", center, r),
            Step::MoveQuery { center, radius_km: None } => write!(f, "move query to {}", center),
        }
    }
}

/// A full scenario: initial documents plus scripted steps.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Fixture {
    #[serde(default)]
    pub documents: Vec<FixtureDocument>,
    #[serde(default)]
    pub steps: Vec<Step>,
}

impl Fixture {
    /// Parse a fixture from JSON text.
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Load a fixture from a file.
    pub fn load(path: &Path) -> Result<Self, CliError> {
        let fixture_error = |reason: String| CliError::Fixture {
            path: path.to_path_buf(),
            reason,
        };
        let text = std::fs::read_to_string(path).map_err(|e| fixture_error(e.to_string()))?;
        Self::parse(&text).map_err(|e| fixture_error(e.to_string()))
    }
}
