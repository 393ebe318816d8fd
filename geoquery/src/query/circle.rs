//! The query region.

use crate::coord::{cap_radius_km_to, distance, GeoPoint, METERS_PER_KILOMETER};

/// Center and radius of a query.
///
/// The radius is kept in meters internally; the public unit is kilometers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QueryCircle {
    center: GeoPoint,
    radius_m: f64,
}

impl QueryCircle {
    /// Build a circle, clamping the radius to `max_radius_km`.
    pub fn new(center: GeoPoint, radius_km: f64, max_radius_km: f64) -> Self {
        Self {
            center,
            radius_m: cap_radius_km_to(radius_km, max_radius_km) * METERS_PER_KILOMETER,
        }
    }

    /// Center of the circle.
    pub fn center(&self) -> GeoPoint {
        self.center
    }

    /// Radius in kilometers.
    pub fn radius_km(&self) -> f64 {
        self.radius_m / METERS_PER_KILOMETER
    }

    /// Radius in meters.
    pub fn radius_m(&self) -> f64 {
        self.radius_m
    }

    /// Whether `point` lies inside the circle (boundary included).
    pub fn contains(&self, point: GeoPoint) -> bool {
        distance(point, self.center) <= self.radius_m
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coord::MAX_SUPPORTED_RADIUS_KM;

    fn origin() -> GeoPoint {
        GeoPoint::new(0.0, 0.0).unwrap()
    }

    #[test]
    fn test_radius_units() {
        let circle = QueryCircle::new(origin(), 2.5, MAX_SUPPORTED_RADIUS_KM);
        assert_eq!(circle.radius_km(), 2.5);
        assert_eq!(circle.radius_m(), 2500.0);
    }

    #[test]
    fn test_radius_clamped() {
        let circle = QueryCircle::new(origin(), 10_000.0, MAX_SUPPORTED_RADIUS_KM);
        assert_eq!(circle.radius_km(), MAX_SUPPORTED_RADIUS_KM);

        let circle = QueryCircle::new(origin(), 50.0, 10.0);
        assert_eq!(circle.radius_km(), 10.0);
    }

    #[test]
    fn test_contains() {
        let circle = QueryCircle::new(origin(), 1.0, MAX_SUPPORTED_RADIUS_KM);
        assert!(circle.contains(GeoPoint::new(0.001, 0.0).unwrap()));
        assert!(!circle.contains(GeoPoint::new(0.01, 0.0).unwrap()));
        assert!(!circle.contains(GeoPoint::new(10.0, 10.0).unwrap()));
    }
}
