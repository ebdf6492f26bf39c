//! Driven port for persisting the last-known availability per route.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::define_port_error;
use crate::domain::{AvailabilitySnapshot, RouteKey};

define_port_error! {
    /// Errors raised while reading or writing snapshots.
    pub enum SnapshotRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } =>
            "snapshot persistence connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } =>
            "snapshot persistence query failed: {message}",
    }
}

/// Port for the one-snapshot-per-route store.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SnapshotRepository: Send + Sync {
    /// Current snapshot for `route`, or `None` before the first successful poll.
    async fn find(
        &self,
        route: RouteKey,
    ) -> Result<Option<AvailabilitySnapshot>, SnapshotRepositoryError>;

    /// Replace the snapshot for its route. Dates and digest are written in one
    /// atomic statement.
    async fn upsert(
        &self,
        snapshot: &AvailabilitySnapshot,
        observed_at: DateTime<Utc>,
    ) -> Result<(), SnapshotRepositoryError>;

    /// Every stored snapshot ordered by route.
    async fn list_all(&self) -> Result<Vec<AvailabilitySnapshot>, SnapshotRepositoryError>;
}
