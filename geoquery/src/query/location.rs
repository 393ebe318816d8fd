//! Per-document location cache and membership classification.
//!
//! Every document seen through an active range gets a [`LocationInfo`]
//! record. Each update replaces the record wholesale and is classified by
//! [`classify`] into the transition listeners should hear about.

use std::collections::HashMap;

use super::circle::QueryCircle;
use super::events::QueryEvent;
use crate::coord::GeoPoint;
use crate::geohash::GeoHash;
use crate::store::DocumentSnapshot;

/// Last known state of one document.
#[derive(Debug, Clone, PartialEq)]
pub struct LocationInfo {
    /// Last known location.
    pub location: GeoPoint,
    /// Whether `location` was inside the circle when last evaluated.
    pub in_query: bool,
    /// Geohash of `location`, used to decide range coverage.
    pub geohash: GeoHash,
    /// Snapshot the location came from.
    pub document: DocumentSnapshot,
}

impl LocationInfo {
    /// Build a record for `document` at `location`.
    pub fn new(document: DocumentSnapshot, location: GeoPoint, in_query: bool) -> Self {
        Self {
            location,
            in_query,
            geohash: GeoHash::new(location),
            document,
        }
    }
}

/// Result of classifying one update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Outside (or unknown) before, inside now.
    Entered,
    /// Inside before and now; `moved` when the location differs.
    Changed { moved: bool },
    /// Inside before, outside now.
    Exited,
    /// Nothing to report.
    Unchanged,
}

impl Transition {
    /// Listener events for this transition, in delivery order.
    pub fn events(self, document: &DocumentSnapshot, location: GeoPoint) -> Vec<QueryEvent> {
        match self {
            Self::Entered => vec![QueryEvent::Entered {
                document: document.clone(),
                location,
            }],
            Self::Changed { moved: true } => vec![
                QueryEvent::Moved {
                    document: document.clone(),
                    location,
                },
                QueryEvent::Changed {
                    document: document.clone(),
                    location,
                },
            ],
            Self::Changed { moved: false } => vec![QueryEvent::Changed {
                document: document.clone(),
                location,
            }],
            Self::Exited => vec![QueryEvent::Exited {
                document: document.clone(),
            }],
            Self::Unchanged => Vec::new(),
        }
    }
}

/// Decide which transition an update represents.
///
/// `previous` is the cached record (if any), `is_in_query` whether the new
/// location is inside the circle.
pub fn classify(previous: Option<&LocationInfo>, is_in_query: bool, location: GeoPoint) -> Transition {
    let was_in_query = previous.is_some_and(|p| p.in_query);

    match previous {
        _ if !was_in_query && is_in_query => Transition::Entered,
        Some(p) if is_in_query => Transition::Changed {
            moved: p.location != location,
        },
        _ if was_in_query => Transition::Exited,
        _ => Transition::Unchanged,
    }
}

/// Location records keyed by document id.
#[derive(Debug, Default)]
pub struct LocationCache {
    records: HashMap<String, LocationInfo>,
}

impl LocationCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Classify an update against `circle`, replace the cached record and
    /// return the events the transition produces.
    pub fn update(
        &mut self,
        document: DocumentSnapshot,
        location: GeoPoint,
        circle: &QueryCircle,
    ) -> Vec<QueryEvent> {
        let is_in_query = circle.contains(location);
        let transition = classify(self.records.get(document.id()), is_in_query, location);
        let events = transition.events(&document, location);

        self.records.insert(
            document.id().to_string(),
            LocationInfo::new(document, location, is_in_query),
        );
        events
    }

    /// Re-run classification for every record against a new circle, using
    /// each record's last known location and snapshot.
    pub fn reclassify(&mut self, circle: &QueryCircle) -> Vec<QueryEvent> {
        let mut events = Vec::new();
        for info in self.records.values_mut() {
            let is_in_query = circle.contains(info.location);
            let transition = classify(Some(info), is_in_query, info.location);
            events.extend(transition.events(&info.document, info.location));
            info.in_query = is_in_query;
        }
        events
    }

    /// Drop every record whose geohash fails `covered`, returning how many
    /// were dropped.
    pub fn retain_covered(&mut self, covered: impl Fn(&GeoHash) -> bool) -> usize {
        let before = self.records.len();
        self.records.retain(|_, info| covered(&info.geohash));
        before - self.records.len()
    }

    /// Cached record for `id`.
    pub fn get(&self, id: &str) -> Option<&LocationInfo> {
        self.records.get(id)
    }

    /// Remove and return the record for `id`.
    pub fn remove(&mut self, id: &str) -> Option<LocationInfo> {
        self.records.remove(id)
    }

    /// Records currently inside the circle.
    pub fn in_query(&self) -> impl Iterator<Item = &LocationInfo> {
        self.records.values().filter(|info| info.in_query)
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coord::MAX_SUPPORTED_RADIUS_KM;
    use serde_json::Map;

    fn point(lat: f64, lon: f64) -> GeoPoint {
        GeoPoint::new(lat, lon).unwrap()
    }

    fn doc(id: &str, location: GeoPoint) -> DocumentSnapshot {
        DocumentSnapshot::located(id, location, Map::new())
    }

    fn circle_km(radius_km: f64) -> QueryCircle {
        QueryCircle::new(point(0.0, 0.0), radius_km, MAX_SUPPORTED_RADIUS_KM)
    }

    fn info(location: GeoPoint, in_query: bool) -> LocationInfo {
        LocationInfo::new(doc("d", location), location, in_query)
    }

    #[test]
    fn test_classify_table() {
        let here = point(0.0, 0.001);
        let there = point(0.0, 0.002);

        assert_eq!(classify(None, true, here), Transition::Entered);
        assert_eq!(classify(None, false, here), Transition::Unchanged);

        let outside = info(here, false);
        assert_eq!(classify(Some(&outside), true, here), Transition::Entered);
        assert_eq!(classify(Some(&outside), false, there), Transition::Unchanged);

        let inside = info(here, true);
        assert_eq!(
            classify(Some(&inside), true, here),
            Transition::Changed { moved: false }
        );
        assert_eq!(
            classify(Some(&inside), true, there),
            Transition::Changed { moved: true }
        );
        assert_eq!(classify(Some(&inside), false, there), Transition::Exited);
    }

    #[test]
    fn test_moved_precedes_changed() {
        let d = doc("d", point(0.0, 0.001));
        let events = Transition::Changed { moved: true }.events(&d, point(0.0, 0.001));
        let names: Vec<_> = events.iter().map(QueryEvent::name).collect();
        assert_eq!(names, vec!["moved", "changed"]);
    }

    #[test]
    fn test_update_replaces_record() {
        let mut cache = LocationCache::new();
        let circle = circle_km(1.0);

        let events = cache.update(doc("d", point(0.0, 0.001)), point(0.0, 0.001), &circle);
        let names: Vec<_> = events.iter().map(QueryEvent::name).collect();
        assert_eq!(names, vec!["entered"]);
        assert!(cache.get("d").unwrap().in_query);

        let events = cache.update(doc("d", point(10.0, 10.0)), point(10.0, 10.0), &circle);
        let names: Vec<_> = events.iter().map(QueryEvent::name).collect();
        assert_eq!(names, vec!["exited"]);
        let record = cache.get("d").unwrap();
        assert!(!record.in_query);
        assert_eq!(record.location, point(10.0, 10.0));
        assert_eq!(cache.in_query().count(), 0);
    }

    #[test]
    fn test_reclassify_on_circle_change() {
        let mut cache = LocationCache::new();
        let near = point(0.0, 0.001);
        let far = point(0.0, 0.05);
        cache.update(doc("near", near), near, &circle_km(1.0));
        cache.update(doc("far", far), far, &circle_km(1.0));
        assert_eq!(cache.in_query().count(), 1);

        let events = cache.reclassify(&circle_km(10.0));
        let mut names: Vec<_> = events
            .iter()
            .map(|e| format!("{}:{}", e.name(), e.document_id().unwrap_or("")))
            .collect();
        names.sort();
        assert_eq!(names, vec!["changed:near", "entered:far"]);
        assert_eq!(cache.in_query().count(), 2);

        let events = cache.reclassify(&circle_km(1.0));
        let exited: Vec<_> = events.iter().filter(|e| e.name() == "exited").collect();
        assert_eq!(exited.len(), 1);
        assert_eq!(exited[0].document_id(), Some("far"));
    }

    #[test]
    fn test_retain_covered() {
        let mut cache = LocationCache::new();
        let circle = circle_km(1.0);
        cache.update(doc("a", point(0.0, 0.001)), point(0.0, 0.001), &circle);
        cache.update(doc("b", point(45.0, 45.0)), point(45.0, 45.0), &circle);

        let near_hash = cache.get("a").unwrap().geohash.clone();
        let dropped = cache.retain_covered(|hash| hash.as_str()[..3] == near_hash.as_str()[..3]);
        assert_eq!(dropped, 1);
        assert!(cache.get("a").is_some());
        assert!(cache.get("b").is_none());
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        fn arb_info() -> impl Strategy<Value = Option<(f64, f64, bool)>> {
            proptest::option::of((-80.0f64..80.0, -170.0f64..170.0, any::<bool>()))
        }

        proptest! {
            #[test]
            fn prop_entering_never_reported_as_change(
                previous in arb_info(),
                lat in -80.0f64..80.0,
                lon in -170.0f64..170.0,
            ) {
                let location = point(lat, lon);
                let previous = previous.map(|(plat, plon, in_q)| info(point(plat, plon), in_q));
                let was_in = previous.as_ref().is_some_and(|p| p.in_query);

                let t = classify(previous.as_ref(), true, location);
                if was_in {
                    let is_change = matches!(t, Transition::Changed { .. });
                    prop_assert!(is_change);
                } else {
                    prop_assert_eq!(t, Transition::Entered);
                }
            }

            #[test]
            fn prop_leaving_is_exit_only(
                previous in arb_info(),
                lat in -80.0f64..80.0,
                lon in -170.0f64..170.0,
            ) {
                let location = point(lat, lon);
                let previous = previous.map(|(plat, plon, in_q)| info(point(plat, plon), in_q));
                let was_in = previous.as_ref().is_some_and(|p| p.in_query);

                let t = classify(previous.as_ref(), false, location);
                if was_in {
                    prop_assert_eq!(t, Transition::Exited);
                } else {
                    prop_assert_eq!(t, Transition::Unchanged);
                }
            }
        }
    }
}
