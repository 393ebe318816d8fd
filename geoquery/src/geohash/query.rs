//! Geohash range queries and the circle covering algorithm.

use std::collections::HashSet;
use std::fmt;

use crate::coord::{
    distance_to_latitude_degrees, distance_to_longitude_degrees, wrap_longitude, GeoPoint,
    EARTH_MERIDIONAL_CIRCUMFERENCE, METERS_PER_DEGREE_LATITUDE,
};
use crate::store::KeyRange;

use super::{
    base32_char_to_value, value_to_base32_char, GeoHash, BITS_PER_BASE32_CHAR, MAX_PRECISION_BITS,
};

/// Sorts after every base32 character; `prefix + "~"` bounds a whole prefix.
const END_OF_PREFIX: char = '~';

/// A half-open range `[start, end)` over geohash strings.
///
/// Two queries are equal when their bounds are equal, so coverings computed
/// at different times can be diffed as plain sets.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GeoHashQuery {
    start: String,
    end: String,
}

impl GeoHashQuery {
    /// Create a query from explicit bounds.
    pub fn new(start: impl Into<String>, end: impl Into<String>) -> Self {
        Self {
            start: start.into(),
            end: end.into(),
        }
    }

    /// The range of every geohash sharing the first `bits` bits of `hash`.
    pub fn for_geohash(hash: &GeoHash, bits: u32) -> Self {
        let hash = hash.as_str();
        let precision = bits.div_ceil(BITS_PER_BASE32_CHAR) as usize;
        if precision == 0 {
            return Self::new("", END_OF_PREFIX.to_string());
        }
        if hash.len() < precision {
            return Self::new(hash, format!("{hash}{END_OF_PREFIX}"));
        }

        let hash = &hash[..precision];
        let (base, last) = hash.split_at(hash.len() - 1);
        let last_value = last
            .chars()
            .next()
            .and_then(base32_char_to_value)
            .unwrap_or(0);

        let significant_bits = bits - base.len() as u32 * BITS_PER_BASE32_CHAR;
        let unused_bits = BITS_PER_BASE32_CHAR - significant_bits;

        let start_value = (last_value >> unused_bits) << unused_bits;
        let end_value = start_value as u32 + (1 << unused_bits);

        let start = format!("{base}{}", value_to_base32_char(start_value));
        let end = if end_value > 31 {
            format!("{base}{END_OF_PREFIX}")
        } else {
            format!("{base}{}", value_to_base32_char(end_value as u8))
        };

        Self { start, end }
    }

    /// Computes the set of queries covering a circle.
    ///
    /// The center and the eight compass points at the edge of the circle's
    /// bounding box are hashed at a depth where one cell is at least as large
    /// as the radius; their queries are then merged wherever they touch or
    /// nest. Equal inputs always produce equal sets.
    pub fn queries_at_location(center: GeoPoint, radius_m: f64) -> HashSet<Self> {
        let query_bits = bits_for_bounding_box(center, radius_m).max(1);
        let precision = query_bits.div_ceil(BITS_PER_BASE32_CHAR) as usize;

        let latitude = center.latitude();
        let longitude = center.longitude();
        let latitude_degrees = radius_m / METERS_PER_DEGREE_LATITUDE;
        let latitude_north = (latitude + latitude_degrees).min(90.0);
        let latitude_south = (latitude - latitude_degrees).max(-90.0);
        let longitude_delta = distance_to_longitude_degrees(radius_m, latitude_north)
            .max(distance_to_longitude_degrees(radius_m, latitude_south));
        let longitude_west = wrap_longitude(longitude - longitude_delta);
        let longitude_east = wrap_longitude(longitude + longitude_delta);

        let mut queries = HashSet::new();
        for lat in [latitude, latitude_north, latitude_south] {
            for lon in [longitude, longitude_west, longitude_east] {
                // Every component is clamped or wrapped into range above.
                if let Ok(point) = GeoPoint::new(lat, lon) {
                    let hash = GeoHash(super::encode(point, precision));
                    queries.insert(Self::for_geohash(&hash, query_bits));
                }
            }
        }

        join_all(queries)
    }

    /// Inclusive lower bound.
    #[inline]
    pub fn start_value(&self) -> &str {
        &self.start
    }

    /// Exclusive upper bound.
    #[inline]
    pub fn end_value(&self) -> &str {
        &self.end
    }

    /// The ordered key bounds to subscribe to in the store.
    pub fn key_range(&self) -> KeyRange {
        KeyRange::new(self.start.clone(), self.end.clone())
    }

    /// Whether `hash` falls inside this range.
    pub fn contains_geohash(&self, hash: &GeoHash) -> bool {
        self.contains_key(hash.as_str())
    }

    /// Whether a raw key falls inside this range.
    pub fn contains_key(&self, key: &str) -> bool {
        self.start.as_str() <= key && key < self.end.as_str()
    }

    /// `other` starts before `self` and ends inside it.
    fn is_prefix(&self, other: &Self) -> bool {
        other.end >= self.start && other.start < self.start && other.end < self.end
    }

    /// `other` fully contains `self`.
    fn is_super_query(&self, other: &Self) -> bool {
        other.start <= self.start && other.end >= self.end
    }

    /// Whether the two ranges touch or nest and can be replaced by one.
    pub fn can_join_with(&self, other: &Self) -> bool {
        self.is_prefix(other)
            || other.is_prefix(self)
            || self.is_super_query(other)
            || other.is_super_query(self)
    }

    /// The single range equivalent to `self ∪ other`, if they can be joined.
    pub fn join_with(&self, other: &Self) -> Option<Self> {
        if other.is_prefix(self) {
            Some(Self::new(self.start.clone(), other.end.clone()))
        } else if self.is_prefix(other) {
            Some(Self::new(other.start.clone(), self.end.clone()))
        } else if self.is_super_query(other) {
            Some(other.clone())
        } else if other.is_super_query(self) {
            Some(self.clone())
        } else {
            None
        }
    }
}

impl fmt::Display for GeoHashQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

/// Merges joinable pairs until no two queries in the set can be joined.
fn join_all(mut queries: HashSet<GeoHashQuery>) -> HashSet<GeoHashQuery> {
    loop {
        let pair = queries.iter().find_map(|a| {
            queries
                .iter()
                .find(|b| a != *b && a.can_join_with(b))
                .map(|b| (a.clone(), b.clone()))
        });

        let Some((a, b)) = pair else {
            return queries;
        };

        match a.join_with(&b) {
            Some(joined) => {
                queries.remove(&a);
                queries.remove(&b);
                queries.insert(joined);
            }
            None => return queries,
        }
    }
}

fn bits_latitude(resolution_m: f64) -> f64 {
    (EARTH_MERIDIONAL_CIRCUMFERENCE / 2.0 / resolution_m)
        .log2()
        .min(MAX_PRECISION_BITS as f64)
}

fn bits_longitude(resolution_m: f64, latitude: f64) -> f64 {
    let degrees = distance_to_longitude_degrees(resolution_m, latitude);
    if degrees.abs() > 0.0 {
        (360.0 / degrees).log2().max(1.0)
    } else {
        1.0
    }
}

/// Number of geohash bits whose cells are at least `size_m` wide around `center`.
pub fn bits_for_bounding_box(center: GeoPoint, size_m: f64) -> u32 {
    let latitude_delta = distance_to_latitude_degrees(size_m);
    let latitude_north = (center.latitude() + latitude_delta).min(90.0);
    let latitude_south = (center.latitude() - latitude_delta).max(-90.0);

    let bits_lat = bits_latitude(size_m).floor() as i64 * 2;
    let bits_lon_north = bits_longitude(size_m, latitude_north).floor() as i64 * 2 - 1;
    let bits_lon_south = bits_longitude(size_m, latitude_south).floor() as i64 * 2 - 1;

    bits_lat.min(bits_lon_north).min(bits_lon_south).max(0) as u32
}
