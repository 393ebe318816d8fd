//! Geohash encoding and range coverings.
//!
//! Documents are indexed in the store by a base32 geohash string. Because
//! geohashes of nearby points share prefixes, a circle on the globe can be
//! approximated by a handful of ordered key ranges over that string, which is
//! all an ordered-range document store can subscribe to.
//!
//! # Architecture
//!
//! ```text
//! GeoPoint ──► GeoHash ("9q8yywdgue")
//!
//! (center, radius) ──► RangeProvider ──► {GeoHashQuery [start, end)} ──► KeyRange
//! ```
//!
//! [`GeoHashQuery`] is the value type used to diff coverings between query
//! updates, so it compares and hashes by its bounds only.

mod provider;
mod query;

pub use provider::{GeoHashRangeProvider, RangeProvider};
pub use query::{bits_for_bounding_box, GeoHashQuery};

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::coord::GeoPoint;

/// Number of bits encoded by one base32 character.
pub const BITS_PER_BASE32_CHAR: u32 = 5;

/// Precision used for document hashes.
pub const DEFAULT_PRECISION: usize = 10;

/// Longest supported geohash, in characters.
pub const MAX_PRECISION: usize = 22;

/// Longest supported geohash, in bits.
pub const MAX_PRECISION_BITS: u32 = MAX_PRECISION as u32 * BITS_PER_BASE32_CHAR;

const BASE32_CHARS: &[u8; 32] = b"0123456789bcdefghjkmnpqrstuvwxyz";

/// Errors produced when constructing geohashes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GeoHashError {
    /// Precision outside of `1..=MAX_PRECISION`.
    #[error("Invalid geohash precision: {0} (must be between 1 and 22)")]
    InvalidPrecision(usize),

    /// String contains a character outside the geohash alphabet.
    #[error("Invalid geohash '{0}': not a base32 geohash string")]
    InvalidHash(String),
}

/// Converts a 5-bit value to its base32 geohash character.
#[inline]
pub(crate) fn value_to_base32_char(value: u8) -> char {
    BASE32_CHARS[(value & 0x1f) as usize] as char
}

/// Converts a base32 geohash character back to its 5-bit value.
#[inline]
pub(crate) fn base32_char_to_value(c: char) -> Option<u8> {
    BASE32_CHARS
        .iter()
        .position(|&b| b as char == c)
        .map(|pos| pos as u8)
}

/// A base32 geohash string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GeoHash(String);

impl GeoHash {
    /// Hash a point at [`DEFAULT_PRECISION`].
    pub fn new(point: GeoPoint) -> Self {
        Self(encode(point, DEFAULT_PRECISION))
    }

    /// Hash a point at an explicit precision (in characters).
    pub fn with_precision(point: GeoPoint, precision: usize) -> Result<Self, GeoHashError> {
        if !(1..=MAX_PRECISION).contains(&precision) {
            return Err(GeoHashError::InvalidPrecision(precision));
        }
        Ok(Self(encode(point, precision)))
    }

    /// The hash as a string slice.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Number of characters in the hash.
    #[inline]
    pub fn precision(&self) -> usize {
        self.0.len()
    }
}

impl FromStr for GeoHash {
    type Err = GeoHashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() || s.len() > MAX_PRECISION {
            return Err(GeoHashError::InvalidHash(s.to_string()));
        }
        if s.chars().any(|c| base32_char_to_value(c).is_none()) {
            return Err(GeoHashError::InvalidHash(s.to_string()));
        }
        Ok(Self(s.to_string()))
    }
}

impl fmt::Display for GeoHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for GeoHash {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Interleaves longitude (even bits) and latitude (odd bits) into base32.
fn encode(point: GeoPoint, precision: usize) -> String {
    let mut lon_range = (-180.0_f64, 180.0_f64);
    let mut lat_range = (-90.0_f64, 90.0_f64);
    let mut hash = String::with_capacity(precision);

    for i in 0..precision {
        let mut value: u8 = 0;
        for j in 0..BITS_PER_BASE32_CHAR as usize {
            let even = (i * BITS_PER_BASE32_CHAR as usize + j) % 2 == 0;
            let (coordinate, range) = if even {
                (point.longitude(), &mut lon_range)
            } else {
                (point.latitude(), &mut lat_range)
            };
            let mid = (range.0 + range.1) / 2.0;
            if coordinate > mid {
                value = (value << 1) | 1;
                range.0 = mid;
            } else {
                value <<= 1;
                range.1 = mid;
            }
        }
        hash.push(value_to_base32_char(value));
    }

    hash
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(lat: f64, lon: f64) -> GeoPoint {
        GeoPoint::new(lat, lon).unwrap()
    }

    #[test]
    fn test_hash_known_location() {
        let hash = GeoHash::new(point(37.7853889, -122.4056973));
        assert_eq!(hash.as_str(), "9q8yywdgue");
        assert_eq!(hash.precision(), DEFAULT_PRECISION);
    }

    #[test]
    fn test_hash_corners() {
        assert_eq!(GeoHash::new(point(0.0, 0.0)).as_str(), "7zzzzzzzzz");
        assert_eq!(GeoHash::new(point(-90.0, -180.0)).as_str(), "0000000000");
        assert_eq!(GeoHash::new(point(90.0, 180.0)).as_str(), "zzzzzzzzzz");
    }

    #[test]
    fn test_hash_custom_precision() {
        let p = point(37.7853889, -122.4056973);
        assert_eq!(GeoHash::with_precision(p, 1).unwrap().as_str(), "9");
        assert_eq!(GeoHash::with_precision(p, 5).unwrap().as_str(), "9q8yy");
        assert_eq!(
            GeoHash::with_precision(p, 0),
            Err(GeoHashError::InvalidPrecision(0))
        );
        assert_eq!(
            GeoHash::with_precision(p, MAX_PRECISION + 1),
            Err(GeoHashError::InvalidPrecision(MAX_PRECISION + 1))
        );
    }

    #[test]
    fn test_parse_hash() {
        let hash: GeoHash = "9q8yy".parse().unwrap();
        assert_eq!(hash.to_string(), "9q8yy");

        assert!("".parse::<GeoHash>().is_err());
        assert!("9q8ya".parse::<GeoHash>().is_err(), "'a' is not in the alphabet");
        assert!("0".repeat(MAX_PRECISION + 1).parse::<GeoHash>().is_err());
    }

    #[test]
    fn test_base32_roundtrip() {
        for value in 0..32u8 {
            let c = value_to_base32_char(value);
            assert_eq!(base32_char_to_value(c), Some(value));
        }
        assert_eq!(base32_char_to_value('a'), None);
        assert_eq!(base32_char_to_value('~'), None);
    }

    #[test]
    fn test_shorter_hash_is_prefix() {
        let p = point(48.8566, 2.3522);
        let long = GeoHash::new(p);
        let short = GeoHash::with_precision(p, 4).unwrap();
        assert!(long.as_str().starts_with(short.as_str()));
    }
}
