//! Common types and utilities shared across CLI commands.

use clap::Args;
use geoquery::coord::GeoPoint;

use crate::error::CliError;

/// Circle selection shared by every command that works on a query region.
#[derive(Debug, Clone, Args)]
pub struct CircleArgs {
    /// Center latitude in decimal degrees
    #[arg(long, allow_hyphen_values = true)]
    pub lat: f64,

    /// Center longitude in decimal degrees
    #[arg(long, allow_hyphen_values = true)]
    pub lon: f64,

    /// Radius in kilometers
    #[arg(long)]
    pub radius: f64,
}

impl CircleArgs {
    /// Validated center point.
    pub fn center(&self) -> Result<GeoPoint, CliError> {
        Ok(GeoPoint::new(self.lat, self.lon)?)
    }

    /// Validated radius in kilometers (not yet clamped).
    pub fn radius_km(&self) -> Result<f64, CliError> {
        if self.radius.is_finite() && self.radius > 0.0 {
            Ok(self.radius)
        } else {
            Err(CliError::Radius(self.radius))
        }
    }
}
