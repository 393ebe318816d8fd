//! Range providers: the seam between a circle and the ranges to subscribe to.

use std::collections::HashSet;

use crate::coord::GeoPoint;

use super::GeoHashQuery;

/// Computes the key ranges covering a circle.
///
/// Implementations must be deterministic: equal inputs yield set-equal
/// outputs, since the coordinator diffs successive coverings to decide which
/// subscriptions to open and close.
pub trait RangeProvider: Send + Sync {
    /// Ranges covering the circle of `radius_m` meters around `center`.
    fn covering_ranges(&self, center: GeoPoint, radius_m: f64) -> HashSet<GeoHashQuery>;
}

/// Closures can stand in for a provider (handy for pinning coverings in tests).
impl<F> RangeProvider for F
where
    F: Fn(GeoPoint, f64) -> HashSet<GeoHashQuery> + Send + Sync,
{
    fn covering_ranges(&self, center: GeoPoint, radius_m: f64) -> HashSet<GeoHashQuery> {
        self(center, radius_m)
    }
}

/// Default provider backed by [`GeoHashQuery::queries_at_location`].
#[derive(Debug, Default, Clone, Copy)]
pub struct GeoHashRangeProvider;

impl GeoHashRangeProvider {
    /// Create the default provider.
    pub fn new() -> Self {
        Self
    }
}

impl RangeProvider for GeoHashRangeProvider {
    fn covering_ranges(&self, center: GeoPoint, radius_m: f64) -> HashSet<GeoHashQuery> {
        GeoHashQuery::queries_at_location(center, radius_m)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_default_provider_matches_covering() {
        let center = GeoPoint::new(40.7128, -74.0060).unwrap();
        let provider = GeoHashRangeProvider::new();
        assert_eq!(
            provider.covering_ranges(center, 3_000.0),
            GeoHashQuery::queries_at_location(center, 3_000.0)
        );
    }

    #[test]
    fn test_closure_provider_through_trait_object() {
        let provider: Arc<dyn RangeProvider> = Arc::new(|_: GeoPoint, _: f64| {
            HashSet::from([GeoHashQuery::new("s0", "s1")])
        });
        let ranges = provider.covering_ranges(GeoPoint::new(0.0, 0.0).unwrap(), 1.0);
        assert_eq!(ranges.len(), 1);
        assert!(ranges.contains(&GeoHashQuery::new("s0", "s1")));
    }
}
