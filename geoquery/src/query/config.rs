//! Query tuning knobs.

use crate::coord::MAX_SUPPORTED_RADIUS_KM;

/// Configuration for a [`GeoQuery`](super::GeoQuery).
#[derive(Debug, Clone, PartialEq)]
pub struct GeoQueryConfig {
    /// Largest radius (km) a query may use; larger requests are clamped.
    pub max_radius_km: f64,

    /// Treat a failed point read during removal handling as "not found".
    ///
    /// When `false` the cached record is kept until a later notification or
    /// circle change settles it.
    pub exit_on_read_failure: bool,
}

impl Default for GeoQueryConfig {
    fn default() -> Self {
        Self {
            max_radius_km: MAX_SUPPORTED_RADIUS_KM,
            exit_on_read_failure: true,
        }
    }
}

impl GeoQueryConfig {
    /// Set the maximum radius, itself capped at [`MAX_SUPPORTED_RADIUS_KM`].
    pub fn with_max_radius_km(mut self, max_radius_km: f64) -> Self {
        self.max_radius_km = max_radius_km.min(MAX_SUPPORTED_RADIUS_KM);
        self
    }

    /// Set the point-read failure policy.
    pub fn with_exit_on_read_failure(mut self, exit: bool) -> Self {
        self.exit_on_read_failure = exit;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = GeoQueryConfig::default();
        assert_eq!(config.max_radius_km, MAX_SUPPORTED_RADIUS_KM);
        assert!(config.exit_on_read_failure);
    }

    #[test]
    fn test_builders() {
        let config = GeoQueryConfig::default()
            .with_max_radius_km(100.0)
            .with_exit_on_read_failure(false);
        assert_eq!(config.max_radius_km, 100.0);
        assert!(!config.exit_on_read_failure);

        let config = GeoQueryConfig::default().with_max_radius_km(20_000.0);
        assert_eq!(config.max_radius_km, MAX_SUPPORTED_RADIUS_KM);
    }
}
