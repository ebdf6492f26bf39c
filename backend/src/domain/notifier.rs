//! Fan-out of availability changes to a route's subscribers.
//!
//! Every delivery is its own future; they are joined at the end with bounded
//! concurrency and each outcome is collected, so one failing chat never
//! prevents, delays, or rolls back delivery to another. Failed deliveries are
//! logged and not retried.

use std::sync::Arc;

use futures_util::future::join_all;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

use super::ports::{
    NotificationChannel, NotificationChannelError, SubscriptionRepository,
    SubscriptionRepositoryError,
};
use super::{RouteKey, SubscriberId, route_label};

/// Outcome of one delivery attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryOutcome {
    /// Recipient.
    pub subscriber: SubscriberId,
    /// `Ok` when the channel accepted the message.
    pub result: Result<(), NotificationChannelError>,
}

/// Per-subscriber outcomes for one route change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationReport {
    /// Route the notification was about.
    pub route: RouteKey,
    /// One entry per subscriber, in subscriber order.
    pub deliveries: Vec<DeliveryOutcome>,
}

impl NotificationReport {
    /// Number of messages the channel accepted.
    pub fn delivered_count(&self) -> usize {
        self.deliveries
            .iter()
            .filter(|outcome| outcome.result.is_ok())
            .count()
    }

    /// Number of messages the channel refused or failed to carry.
    pub fn failed_count(&self) -> usize {
        self.deliveries.len() - self.delivered_count()
    }
}

/// Raised when the subscriber list itself cannot be read.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("subscriber lookup failed: {0}")]
pub struct NotifierError(#[from] pub SubscriptionRepositoryError);

/// Delivers change messages to every subscriber of a route.
pub struct Notifier {
    subscriptions: Arc<dyn SubscriptionRepository>,
    channel: Arc<dyn NotificationChannel>,
    delivery_permits: Semaphore,
}

impl Notifier {
    /// Build a notifier; at most `max_concurrent_deliveries` sends are in
    /// flight at once (a zero limit is treated as one).
    pub fn new(
        subscriptions: Arc<dyn SubscriptionRepository>,
        channel: Arc<dyn NotificationChannel>,
        max_concurrent_deliveries: usize,
    ) -> Self {
        Self {
            subscriptions,
            channel,
            delivery_permits: Semaphore::new(max_concurrent_deliveries.max(1)),
        }
    }

    /// Tell everyone watching `route` about `dates`.
    ///
    /// A route with no subscribers yields an empty report, not an error.
    pub async fn notify(
        &self,
        route: RouteKey,
        dates: &[String],
    ) -> Result<NotificationReport, NotifierError> {
        let subscribers = self.subscriptions.list_subscribers(route).await?;
        if subscribers.is_empty() {
            debug!(%route, "no subscribers for changed route");
            return Ok(NotificationReport {
                route,
                deliveries: Vec::new(),
            });
        }

        let message = availability_message(route, dates);
        let deliveries = join_all(
            subscribers
                .into_iter()
                .map(|subscriber| self.deliver(route, subscriber, &message)),
        )
        .await;

        Ok(NotificationReport { route, deliveries })
    }

    async fn deliver(
        &self,
        route: RouteKey,
        subscriber: SubscriberId,
        message: &str,
    ) -> DeliveryOutcome {
        let result = match self.delivery_permits.acquire().await {
            Ok(_permit) => self.channel.send(subscriber, message).await,
            Err(_closed) => Err(NotificationChannelError::transport(
                "delivery permits closed",
            )),
        };
        match &result {
            Ok(()) => debug!(%route, %subscriber, "notification delivered"),
            Err(error) => warn!(%route, %subscriber, %error, "notification delivery failed"),
        }
        DeliveryOutcome { subscriber, result }
    }
}

/// Chat message announcing the dates now on sale for `route`.
///
/// # Examples
/// ```
/// use flightwatch::domain::{LocationId, RouteKey, availability_message};
///
/// let route = RouteKey::new(LocationId::new(1), LocationId::new(4));
/// let dates = vec!["2024-05-02".to_owned(), "2024-05-01".to_owned()];
/// assert_eq!(
///     availability_message(route, &dates),
///     "New dates for Tbilisi (1) → Batumi (4):\n2024-05-01, 2024-05-02"
/// );
/// ```
pub fn availability_message(route: RouteKey, dates: &[String]) -> String {
    if dates.is_empty() {
        return format!(
            "No dates are currently available for {}.",
            route_label(route)
        );
    }
    let mut sorted = dates.iter().map(String::as_str).collect::<Vec<_>>();
    sorted.sort_unstable();
    format!("New dates for {}:\n{}", route_label(route), sorted.join(", "))
}

#[cfg(test)]
mod tests;
