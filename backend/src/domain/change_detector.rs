//! Change detection for a single route.
//!
//! The detector reads the externally reported dates and the stored snapshot,
//! hashes both through [`AvailabilityDigest`], and reports whether they differ.
//! It never writes: persisting a change is the poll driver's job.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use super::ports::{
    AvailabilitySource, AvailabilitySourceError, SnapshotRepository, SnapshotRepositoryError,
};
use super::{AvailabilityDigest, AvailabilitySnapshot, RouteKey};

/// Why a route (or an origin's destination list) could not be read.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchFailure {
    /// The ticketing site failed or returned a malformed payload.
    #[error(transparent)]
    Source(#[from] AvailabilitySourceError),
    /// The ticketing site did not answer within the fetch timeout.
    #[error("ticketing call exceeded {}ms", timeout.as_millis())]
    TimedOut {
        /// The configured bound that was exceeded.
        timeout: Duration,
    },
    /// The stored snapshot could not be loaded.
    #[error(transparent)]
    Storage(#[from] SnapshotRepositoryError),
}

/// Result of comparing fetched availability against stored state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Detection {
    /// Fetched dates hash to the stored digest.
    Unchanged,
    /// Fetched dates differ; carries the snapshot to persist.
    Changed(AvailabilitySnapshot),
    /// Either side could not be read. Never grounds a write or a notification.
    FetchFailed(FetchFailure),
}

/// Compares one route's live availability with its stored snapshot.
pub struct ChangeDetector {
    source: Arc<dyn AvailabilitySource>,
    snapshots: Arc<dyn SnapshotRepository>,
    fetch_timeout: Duration,
}

impl ChangeDetector {
    /// Build a detector; every source call is bounded by `fetch_timeout`.
    pub fn new(
        source: Arc<dyn AvailabilitySource>,
        snapshots: Arc<dyn SnapshotRepository>,
        fetch_timeout: Duration,
    ) -> Self {
        Self {
            source,
            snapshots,
            fetch_timeout,
        }
    }

    /// Detect whether `route` changed since the last persisted snapshot.
    pub async fn detect(&self, route: RouteKey) -> Detection {
        let (fetched, stored) = tokio::join!(
            bounded(self.fetch_timeout, self.source.fetch_dates(route)),
            self.snapshots.find(route),
        );

        let fetched = match fetched {
            Ok(dates) => AvailabilitySnapshot::new(route, dates),
            Err(failure) => return Detection::FetchFailed(failure),
        };
        let stored_digest = match stored {
            Ok(Some(snapshot)) => snapshot.digest().clone(),
            Ok(None) => AvailabilityDigest::empty(),
            Err(error) => return Detection::FetchFailed(FetchFailure::Storage(error)),
        };

        if fetched.digest() == &stored_digest {
            debug!(%route, digest = %stored_digest, "availability unchanged");
            Detection::Unchanged
        } else {
            debug!(
                %route,
                previous = %stored_digest,
                current = %fetched.digest(),
                "availability changed"
            );
            Detection::Changed(fetched)
        }
    }
}

/// Run a source call under `timeout`, folding both failure modes into
/// [`FetchFailure`].
pub(crate) async fn bounded<T, F>(timeout: Duration, call: F) -> Result<T, FetchFailure>
where
    F: Future<Output = Result<T, AvailabilitySourceError>>,
{
    match tokio::time::timeout(timeout, call).await {
        Ok(result) => result.map_err(FetchFailure::Source),
        Err(_elapsed) => Err(FetchFailure::TimedOut { timeout }),
    }
}
