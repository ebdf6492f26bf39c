//! Last-known availability for one route.

use super::digest::AvailabilityDigest;
use super::route::RouteKey;

/// Dates currently on sale for a route, plus their digest.
///
/// ## Invariants
/// - `digest` is always the digest of `dates`; the only constructor hashes
///   the dates it is given, so the two can never drift apart in memory.
///
/// # Examples
/// ```
/// use flightwatch::domain::{AvailabilityDigest, AvailabilitySnapshot, LocationId, RouteKey};
///
/// let route = RouteKey::new(LocationId::new(1), LocationId::new(4));
/// let snapshot = AvailabilitySnapshot::new(route, vec!["2024-05-01".to_owned()]);
/// assert_eq!(snapshot.digest(), &AvailabilityDigest::of_dates(&["2024-05-01"]));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvailabilitySnapshot {
    route: RouteKey,
    dates: Vec<String>,
    digest: AvailabilityDigest,
}

impl AvailabilitySnapshot {
    /// Build a snapshot, hashing `dates` as given.
    pub fn new(route: RouteKey, dates: Vec<String>) -> Self {
        let digest = AvailabilityDigest::of_dates(&dates);
        Self {
            route,
            dates,
            digest,
        }
    }

    /// Route the snapshot belongs to.
    pub fn route(&self) -> RouteKey {
        self.route
    }

    /// Dates in source order.
    pub fn dates(&self) -> &[String] {
        &self.dates
    }

    /// Dates in the same order the digest uses.
    pub fn sorted_dates(&self) -> Vec<&str> {
        let mut sorted = self.dates.iter().map(String::as_str).collect::<Vec<_>>();
        sorted.sort_unstable();
        sorted
    }

    /// Digest of [`Self::dates`].
    pub fn digest(&self) -> &AvailabilityDigest {
        &self.digest
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::LocationId;

    fn route() -> RouteKey {
        RouteKey::new(LocationId::new(1), LocationId::new(5))
    }

    #[test]
    fn snapshot_without_dates_carries_the_empty_digest() {
        let snapshot = AvailabilitySnapshot::new(route(), Vec::new());
        assert_eq!(snapshot.digest(), &AvailabilityDigest::empty());
    }

    #[test]
    fn sorted_dates_do_not_reorder_source_dates() {
        let snapshot = AvailabilitySnapshot::new(
            route(),
            vec!["2024-06-02".to_owned(), "2024-06-01".to_owned()],
        );
        assert_eq!(snapshot.sorted_dates(), ["2024-06-01", "2024-06-02"]);
        assert_eq!(snapshot.dates(), ["2024-06-02", "2024-06-01"]);
    }
}
