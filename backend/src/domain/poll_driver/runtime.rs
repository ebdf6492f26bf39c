//! Port bundle and tuning knobs for the poll driver.

use std::sync::Arc;
use std::time::Duration;

use crate::domain::ports::{
    AvailabilitySource, NotificationChannel, SnapshotRepository, SubscriptionRepository,
};

/// Port bundle required by the poll driver.
pub struct PollDriverPorts {
    /// Outbound ticketing adapter.
    pub source: Arc<dyn AvailabilitySource>,
    /// Snapshot persistence adapter.
    pub snapshots: Arc<dyn SnapshotRepository>,
    /// Subscription lookup adapter.
    pub subscriptions: Arc<dyn SubscriptionRepository>,
    /// Chat delivery adapter.
    pub channel: Arc<dyn NotificationChannel>,
}

impl PollDriverPorts {
    /// Build a strongly-typed driver port bundle.
    pub fn new(
        source: Arc<dyn AvailabilitySource>,
        snapshots: Arc<dyn SnapshotRepository>,
        subscriptions: Arc<dyn SubscriptionRepository>,
        channel: Arc<dyn NotificationChannel>,
    ) -> Self {
        Self {
            source,
            snapshots,
            subscriptions,
            channel,
        }
    }
}

/// Driver configuration controlling cadence, timeouts, and fan-out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollDriverConfig {
    /// Time between cycle starts.
    pub poll_interval: Duration,
    /// Upper bound for each ticketing call.
    pub fetch_timeout: Duration,
    /// Concurrent ticketing calls within a cycle.
    pub max_concurrent_fetches: usize,
    /// Concurrent chat deliveries per changed route.
    pub max_concurrent_deliveries: usize,
}

impl Default for PollDriverConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(600),
            fetch_timeout: Duration::from_secs(30),
            max_concurrent_fetches: 4,
            max_concurrent_deliveries: 8,
        }
    }
}
