//! Route, location, and subscriber identifiers.
//!
//! All identifiers are plain integers on the wire (ticketing ids and Telegram
//! chat ids) and are wrapped here so a route key can never be assembled from
//! the wrong kind of number.

use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

/// Identifier of a location as published by the ticketing site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LocationId(i64);

impl LocationId {
    /// Wrap a raw ticketing identifier.
    pub const fn new(raw: i64) -> Self {
        Self(raw)
    }

    /// Raw identifier as stored and sent over the wire.
    pub const fn as_i64(self) -> i64 {
        self.0
    }
}

impl fmt::Display for LocationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for LocationId {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<i64>().map(Self)
    }
}

/// Directed origin → destination pair being monitored.
///
/// ## Invariants
/// - Immutable once built; used as the join key between fetched
///   availability, stored snapshots, and subscriptions.
///
/// # Examples
/// ```
/// use flightwatch::domain::{LocationId, RouteKey};
///
/// let route = RouteKey::new(LocationId::new(1), LocationId::new(4));
/// assert_eq!(route.to_string(), "1->4");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RouteKey {
    origin: LocationId,
    destination: LocationId,
}

impl RouteKey {
    /// Build a route key from its two endpoints.
    pub const fn new(origin: LocationId, destination: LocationId) -> Self {
        Self {
            origin,
            destination,
        }
    }

    /// Departure location.
    pub const fn origin(self) -> LocationId {
        self.origin
    }

    /// Arrival location.
    pub const fn destination(self) -> LocationId {
        self.destination
    }

    /// Whether both endpoints are the same location.
    pub fn is_loop(self) -> bool {
        self.origin == self.destination
    }
}

impl fmt::Display for RouteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}->{}", self.origin, self.destination)
    }
}

/// Opaque identifier of a notification recipient (a Telegram chat id).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriberId(i64);

impl SubscriberId {
    /// Wrap a raw chat identifier.
    pub const fn new(raw: i64) -> Self {
        Self(raw)
    }

    /// Raw identifier as stored and sent over the wire.
    pub const fn as_i64(self) -> i64 {
        self.0
    }
}

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A subscriber's interest in one route. Unique on `(subscriber, route)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Subscription {
    /// Who receives notifications.
    pub subscriber: SubscriberId,
    /// Which route they watch.
    pub route: RouteKey,
}

impl Subscription {
    /// Pair a subscriber with a route.
    pub const fn new(subscriber: SubscriberId, route: RouteKey) -> Self {
        Self { subscriber, route }
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for identifier parsing and display.

    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("4", Some(4))]
    #[case(" 7 ", Some(7))]
    #[case("batumi", None)]
    #[case("", None)]
    fn parses_location_ids(#[case] raw: &str, #[case] expected: Option<i64>) {
        let parsed = raw.parse::<LocationId>().ok().map(LocationId::as_i64);
        assert_eq!(parsed, expected);
    }

    #[rstest]
    fn loop_routes_are_detected() {
        let id = LocationId::new(5);
        assert!(RouteKey::new(id, id).is_loop());
        assert!(!RouteKey::new(id, LocationId::new(6)).is_loop());
    }
}
