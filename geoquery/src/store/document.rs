//! Document snapshots and ordered key ranges.

use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::coord::GeoPoint;
use crate::geohash::GeoHash;

/// Field holding the document's ordered geohash key.
pub const GEOHASH_FIELD: &str = "g";

/// Field holding the document's `[latitude, longitude]` pair.
pub const LOCATION_FIELD: &str = "l";

/// An immutable snapshot of a stored document.
///
/// Cloning is cheap: the id and field map are shared, so the same snapshot
/// can be cached by the query and handed to every listener.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentSnapshot {
    id: Arc<str>,
    fields: Arc<Map<String, Value>>,
}

impl DocumentSnapshot {
    /// Wrap a document id and its fields.
    pub fn new(id: impl Into<Arc<str>>, fields: Map<String, Value>) -> Self {
        Self {
            id: id.into(),
            fields: Arc::new(fields),
        }
    }

    /// Build a document located at `location`, with its geohash key and
    /// location fields filled in alongside `fields`.
    pub fn located(id: impl Into<Arc<str>>, location: GeoPoint, fields: Map<String, Value>) -> Self {
        let mut fields = fields;
        fields.insert(
            GEOHASH_FIELD.to_string(),
            Value::String(GeoHash::new(location).to_string()),
        );
        fields.insert(
            LOCATION_FIELD.to_string(),
            Value::Array(vec![location.latitude().into(), location.longitude().into()]),
        );
        Self::new(id, fields)
    }

    /// Document id.
    #[inline]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// A single field by name.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// The ordered geohash key, if the document has one.
    pub fn geohash(&self) -> Option<&str> {
        self.fields.get(GEOHASH_FIELD).and_then(Value::as_str)
    }

    /// The document's location, if the location field is present and valid.
    pub fn location(&self) -> Option<GeoPoint> {
        let pair = self.fields.get(LOCATION_FIELD)?.as_array()?;
        match pair.as_slice() {
            [lat, lon] => GeoPoint::new(lat.as_f64()?, lon.as_f64()?).ok(),
            _ => None,
        }
    }
}

/// Ordered key bounds `[start, end)` handed to the store for a subscription.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyRange {
    start: String,
    end: String,
}

impl KeyRange {
    /// Create a range from its bounds.
    pub fn new(start: impl Into<String>, end: impl Into<String>) -> Self {
        Self {
            start: start.into(),
            end: end.into(),
        }
    }

    /// Inclusive lower bound.
    #[inline]
    pub fn start(&self) -> &str {
        &self.start
    }

    /// Exclusive upper bound.
    #[inline]
    pub fn end(&self) -> &str {
        &self.end
    }

    /// Whether `key` lies in the range.
    pub fn contains(&self, key: &str) -> bool {
        self.start.as_str() <= key && key < self.end.as_str()
    }
}

impl fmt::Display for KeyRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected a JSON object"),
        }
    }

    #[test]
    fn test_located_document_carries_hash_and_location() {
        let location = GeoPoint::new(37.7853889, -122.4056973).unwrap();
        let doc = DocumentSnapshot::located("sf", location, fields(json!({"name": "SF"})));

        assert_eq!(doc.id(), "sf");
        assert_eq!(doc.geohash(), Some("9q8yywdgue"));
        assert_eq!(doc.location(), Some(location));
        assert_eq!(doc.get("name"), Some(&json!("SF")));
    }

    #[test]
    fn test_missing_location() {
        let doc = DocumentSnapshot::new("x", fields(json!({"name": "nowhere"})));
        assert_eq!(doc.location(), None);
        assert_eq!(doc.geohash(), None);
    }

    #[test]
    fn test_malformed_location() {
        let doc = DocumentSnapshot::new("x", fields(json!({"l": [1.0]})));
        assert_eq!(doc.location(), None);

        let doc = DocumentSnapshot::new("x", fields(json!({"l": ["a", "b"]})));
        assert_eq!(doc.location(), None);

        let doc = DocumentSnapshot::new("x", fields(json!({"l": [95.0, 0.0]})));
        assert_eq!(doc.location(), None, "latitude out of range");
    }

    #[test]
    fn test_snapshot_clone_shares_fields() {
        let doc = DocumentSnapshot::new("x", fields(json!({"a": 1})));
        let copy = doc.clone();
        assert!(Arc::ptr_eq(&doc.fields, &copy.fields));
        assert_eq!(doc, copy);
    }

    #[test]
    fn test_key_range_contains() {
        let range = KeyRange::new("9q8y", "9q8z");
        assert!(range.contains("9q8y"));
        assert!(range.contains("9q8yywdgue"));
        assert!(!range.contains("9q8z"));
        assert!(!range.contains("9q8x"));
        assert_eq!(range.to_string(), "[9q8y, 9q8z)");
    }
}
