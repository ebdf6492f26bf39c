//! Internal Diesel row structs for database operations.
//!
//! These types are implementation details of the persistence layer and must
//! never be exposed to the domain.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use tracing::warn;

use super::schema::{flights, subscriptions};
use crate::domain::{
    AvailabilityDigest, AvailabilitySnapshot, DigestParseError, LocationId, RouteKey,
    SubscriberId, Subscription,
};

/// Row struct for reading from the flights table.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = flights)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct FlightRow {
    pub from_destination_id: i64,
    pub to_destination_id: i64,
    pub dates: Vec<String>,
    pub hash_of_dates: String,
}

/// Outcome of checking a stored hash against the recomputed digest.
#[derive(Debug, PartialEq, Eq)]
enum StoredHash {
    Matches,
    Drifted(AvailabilityDigest),
    Malformed(DigestParseError),
}

impl StoredHash {
    fn check(stored: &str, recomputed: &AvailabilityDigest) -> Self {
        match AvailabilityDigest::parse(stored) {
            Ok(digest) if &digest == recomputed => Self::Matches,
            Ok(digest) => Self::Drifted(digest),
            Err(error) => Self::Malformed(error),
        }
    }
}

impl FlightRow {
    /// Rebuild the domain snapshot, recomputing the digest from `dates`.
    ///
    /// The stored hash is only compared, never trusted: rows written by older
    /// deployments may carry a digest of an unsorted list.
    pub(crate) fn into_snapshot(self) -> AvailabilitySnapshot {
        let route = RouteKey::new(
            LocationId::new(self.from_destination_id),
            LocationId::new(self.to_destination_id),
        );
        let snapshot = AvailabilitySnapshot::new(route, self.dates);
        match StoredHash::check(&self.hash_of_dates, snapshot.digest()) {
            StoredHash::Matches => {}
            StoredHash::Drifted(stored) => warn!(
                %route,
                %stored,
                recomputed = %snapshot.digest(),
                "stored availability hash does not match its dates"
            ),
            StoredHash::Malformed(error) => {
                warn!(%route, %error, "stored availability hash is malformed");
            }
        }
        snapshot
    }
}

/// Insertable struct for upserting flight availability.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = flights)]
pub(crate) struct NewFlightRow {
    pub from_destination_id: i64,
    pub to_destination_id: i64,
    pub dates: Vec<String>,
    pub hash_of_dates: String,
    pub updated_at: DateTime<Utc>,
}

impl NewFlightRow {
    pub(crate) fn from_snapshot(
        snapshot: &AvailabilitySnapshot,
        observed_at: DateTime<Utc>,
    ) -> Self {
        let route = snapshot.route();
        Self {
            from_destination_id: route.origin().as_i64(),
            to_destination_id: route.destination().as_i64(),
            dates: snapshot.dates().to_vec(),
            hash_of_dates: snapshot.digest().as_str().to_owned(),
            updated_at: observed_at,
        }
    }
}

/// Row struct for reading subscriptions.
#[derive(Debug, Clone, Copy, Queryable, Selectable)]
#[diesel(table_name = subscriptions)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct SubscriptionRow {
    pub chat_id: i64,
    pub from_destination_id: i64,
    pub to_destination_id: i64,
}

impl From<SubscriptionRow> for Subscription {
    fn from(row: SubscriptionRow) -> Self {
        Subscription::new(
            SubscriberId::new(row.chat_id),
            RouteKey::new(
                LocationId::new(row.from_destination_id),
                LocationId::new(row.to_destination_id),
            ),
        )
    }
}

/// Insertable struct for new subscriptions; `created_at` uses the column
/// default.
#[derive(Debug, Clone, Copy, Insertable)]
#[diesel(table_name = subscriptions)]
pub(crate) struct NewSubscriptionRow {
    pub chat_id: i64,
    pub from_destination_id: i64,
    pub to_destination_id: i64,
}

impl From<&Subscription> for NewSubscriptionRow {
    fn from(subscription: &Subscription) -> Self {
        Self {
            chat_id: subscription.subscriber.as_i64(),
            from_destination_id: subscription.route.origin().as_i64(),
            to_destination_id: subscription.route.destination().as_i64(),
        }
    }
}
