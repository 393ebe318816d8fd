//! Coordinate and distance helpers.
//!
//! Provides the geographic primitives the query engine is built on: validated
//! points, great-circle distance, and conversions between distances and
//! degrees of latitude/longitude used when sizing geohash coverings.
//!
//! Distances are always in **meters** here. The public query API speaks
//! kilometers and converts at its boundary.

mod types;

pub use types::{CoordError, GeoPoint, MAX_LAT, MAX_LON, MIN_LAT, MIN_LON};

use tracing::warn;

/// Equatorial radius of the Earth (WGS84), in meters.
pub const EARTH_EQ_RADIUS: f64 = 6_378_137.0;

/// Polar radius of the Earth, in meters.
pub const EARTH_POLAR_RADIUS: f64 = 6_357_852.3;

/// Length of a meridian (pole to pole and back), in meters.
pub const EARTH_MERIDIONAL_CIRCUMFERENCE: f64 = 40_007_860.0;

/// Average length of one degree of latitude, in meters.
pub const METERS_PER_DEGREE_LATITUDE: f64 = 110_574.0;

/// Largest query radius that still produces a sensible geohash covering, in kilometers.
pub const MAX_SUPPORTED_RADIUS_KM: f64 = 8587.0;

/// Conversion factor between the public (km) and internal (m) distance units.
pub const METERS_PER_KILOMETER: f64 = 1000.0;

/// Square of the WGS84 eccentricity.
const EARTH_E2: f64 = 0.00669447819799;

const EPSILON: f64 = 1e-12;

/// Great-circle distance between two points, in meters.
///
/// Uses the haversine formula on a sphere whose radius is the mean of the
/// equatorial and polar radii.
pub fn distance(a: GeoPoint, b: GeoPoint) -> f64 {
    let radius = (EARTH_EQ_RADIUS + EARTH_POLAR_RADIUS) / 2.0;
    let lat_delta = (a.latitude() - b.latitude()).to_radians();
    let lon_delta = (a.longitude() - b.longitude()).to_radians();

    let h = (lat_delta / 2.0).sin().powi(2)
        + a.latitude().to_radians().cos()
            * b.latitude().to_radians().cos()
            * (lon_delta / 2.0).sin().powi(2);
    let h = h.min(1.0);

    radius * 2.0 * h.sqrt().atan2((1.0 - h).sqrt())
}

/// Converts a north/south distance in meters to degrees of latitude.
#[inline]
pub fn distance_to_latitude_degrees(meters: f64) -> f64 {
    meters / METERS_PER_DEGREE_LATITUDE
}

/// Converts an east/west distance in meters to degrees of longitude at `latitude`.
///
/// Near the poles a degree of longitude collapses to nothing; any positive
/// distance then spans the whole globe and the result is 360.
pub fn distance_to_longitude_degrees(meters: f64, latitude: f64) -> f64 {
    let radians = latitude.to_radians();
    let numerator = radians.cos() * EARTH_EQ_RADIUS * std::f64::consts::PI / 180.0;
    let denominator = 1.0 / (1.0 - EARTH_E2 * radians.sin() * radians.sin()).sqrt();
    let meters_per_degree = numerator * denominator;

    if meters_per_degree < EPSILON {
        if meters > 0.0 {
            360.0
        } else {
            meters
        }
    } else {
        (meters / meters_per_degree).min(360.0)
    }
}

/// Wraps a longitude into the [-180, 180] range.
pub fn wrap_longitude(longitude: f64) -> f64 {
    if (MIN_LON..=MAX_LON).contains(&longitude) {
        return longitude;
    }
    let adjusted = longitude + 180.0;
    if adjusted > 0.0 {
        (adjusted % 360.0) - 180.0
    } else {
        180.0 - (-adjusted % 360.0)
    }
}

/// Caps a radius (in kilometers) to [`MAX_SUPPORTED_RADIUS_KM`].
pub fn cap_radius_km(radius_km: f64) -> f64 {
    cap_radius_km_to(radius_km, MAX_SUPPORTED_RADIUS_KM)
}

/// Caps a radius (in kilometers) to an explicit maximum.
pub fn cap_radius_km_to(radius_km: f64, max_km: f64) -> f64 {
    if radius_km > max_km {
        warn!(
            requested_km = radius_km,
            max_km, "Query radius exceeds the supported maximum, capping"
        );
        max_km
    } else {
        radius_km
    }
}
