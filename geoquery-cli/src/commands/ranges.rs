//! `geoquery ranges` - print the covering ranges for a circle.

use clap::Args;
use geoquery::config::ConfigFile;
use geoquery::coord::{cap_radius_km_to, METERS_PER_KILOMETER};
use geoquery::geohash::{GeoHashQuery, GeoHashRangeProvider, RangeProvider};
use serde_json::json;

use super::common::CircleArgs;
use crate::error::CliError;

/// Arguments for the ranges command.
#[derive(Debug, Args)]
pub struct RangesArgs {
    #[command(flatten)]
    pub circle: CircleArgs,

    /// Print JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

/// Covering ranges for the requested circle, sorted by start key.
pub fn covering_ranges(args: &CircleArgs, config: &ConfigFile) -> Result<Vec<GeoHashQuery>, CliError> {
    let center = args.center()?;
    let radius_km = cap_radius_km_to(args.radius_km()?, config.query_config().max_radius_km);

    let mut ranges: Vec<_> = GeoHashRangeProvider::new()
        .covering_ranges(center, radius_km * METERS_PER_KILOMETER)
        .into_iter()
        .collect();
    ranges.sort();
    Ok(ranges)
}

/// Run the ranges command.
pub fn run(args: RangesArgs, config: &ConfigFile) -> Result<(), CliError> {
    let ranges = covering_ranges(&args.circle, config)?;

    if args.json {
        let body: Vec<_> = ranges
            .iter()
            .map(|r| json!({ "start": r.start_value(), "end": r.end_value() }))
            .collect();
        println!("{}", serde_json::Value::Array(body));
        return Ok(());
    }

    println!(
        "Covering ranges for ({}, {}) radius {} km:",
        args.circle.lat, args.circle.lon, args.circle.radius
    );
    for range in &ranges {
        println!("  {}", range);
    }
    println!("{} range(s)", ranges.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_covering_ranges_sorted_and_nonempty() {
        let args = CircleArgs {
            lat: 37.7853889,
            lon: -122.4056973,
            radius: 1.0,
        };
        let ranges = covering_ranges(&args, &ConfigFile::default()).unwrap();
        assert!(!ranges.is_empty());
        assert!(ranges.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_covering_ranges_rejects_bad_radius() {
        let args = CircleArgs {
            lat: 0.0,
            lon: 0.0,
            radius: -1.0,
        };
        assert!(covering_ranges(&args, &ConfigFile::default()).is_err());
    }
}
