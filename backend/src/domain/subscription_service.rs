//! Subscription management exposed to chat commands.
//!
//! Repository failures are folded into [`Error`] so the command adapter only
//! needs to render a code and a message.

use std::sync::Arc;

use tracing::info;

use super::ports::{
    SnapshotRepository, SnapshotRepositoryError, SubscriptionRepository,
    SubscriptionRepositoryError,
};
use super::{
    AvailabilitySnapshot, DomainResult, Error, Location, RouteKey, SubscriberId, Subscription,
    known_locations, location_name, route_label,
};

/// Validates and records which routes each subscriber watches.
#[derive(Clone)]
pub struct SubscriptionService {
    subscriptions: Arc<dyn SubscriptionRepository>,
    snapshots: Arc<dyn SnapshotRepository>,
}

impl SubscriptionService {
    /// Build the service over its two repositories.
    pub fn new(
        subscriptions: Arc<dyn SubscriptionRepository>,
        snapshots: Arc<dyn SnapshotRepository>,
    ) -> Self {
        Self {
            subscriptions,
            snapshots,
        }
    }

    /// Start watching `route`.
    ///
    /// Both ends must be catalogue locations and must differ. Subscribing
    /// twice to the same route is a conflict.
    pub async fn subscribe(
        &self,
        subscriber: SubscriberId,
        route: RouteKey,
    ) -> DomainResult<Subscription> {
        validate_route(route)?;
        let subscription = Subscription::new(subscriber, route);
        self.subscriptions
            .add(&subscription)
            .await
            .map_err(|error| map_subscription_error(error, Some(route)))?;
        info!(%subscriber, %route, "subscription added");
        Ok(subscription)
    }

    /// Stop watching `route`. Fails with not-found when no such
    /// subscription exists.
    pub async fn unsubscribe(
        &self,
        subscriber: SubscriberId,
        route: RouteKey,
    ) -> DomainResult<Subscription> {
        let subscription = Subscription::new(subscriber, route);
        self.subscriptions
            .remove(&subscription)
            .await
            .map_err(|error| map_subscription_error(error, Some(route)))?;
        info!(%subscriber, %route, "subscription removed");
        Ok(subscription)
    }

    /// Every route `subscriber` watches, ordered by route.
    pub async fn subscriptions_for(
        &self,
        subscriber: SubscriberId,
    ) -> DomainResult<Vec<Subscription>> {
        let mut subscriptions = self
            .subscriptions
            .list_for_subscriber(subscriber)
            .await
            .map_err(|error| map_subscription_error(error, None))?;
        subscriptions.sort_unstable();
        Ok(subscriptions)
    }

    /// Every stored availability snapshot, ordered by route.
    pub async fn all_flights(&self) -> DomainResult<Vec<AvailabilitySnapshot>> {
        let mut snapshots = self
            .snapshots
            .list_all()
            .await
            .map_err(map_snapshot_error)?;
        snapshots.sort_unstable_by_key(AvailabilitySnapshot::route);
        Ok(snapshots)
    }

    /// The static location catalogue.
    pub fn catalogue(&self) -> Vec<Location> {
        known_locations().collect()
    }
}

fn validate_route(route: RouteKey) -> DomainResult<()> {
    for id in [route.origin(), route.destination()] {
        if location_name(id).is_none() {
            return Err(Error::invalid_request(format!("unknown location {id}")));
        }
    }
    if route.is_loop() {
        return Err(Error::invalid_request(
            "origin and destination must differ",
        ));
    }
    Ok(())
}

fn map_subscription_error(error: SubscriptionRepositoryError, route: Option<RouteKey>) -> Error {
    let label = |fallback: String| route.map_or(fallback, route_label);
    match error {
        SubscriptionRepositoryError::Duplicate { subscription } => {
            Error::conflict(format!("already subscribed to {}", label(subscription)))
        }
        SubscriptionRepositoryError::NotFound { subscription } => {
            Error::not_found(format!("no subscription for {}", label(subscription)))
        }
        SubscriptionRepositoryError::Connection { message } => {
            Error::service_unavailable(format!("subscription store unavailable: {message}"))
        }
        SubscriptionRepositoryError::Query { message } => {
            Error::internal(format!("subscription store error: {message}"))
        }
    }
}

fn map_snapshot_error(error: SnapshotRepositoryError) -> Error {
    match error {
        SnapshotRepositoryError::Connection { message } => {
            Error::service_unavailable(format!("flight store unavailable: {message}"))
        }
        SnapshotRepositoryError::Query { message } => {
            Error::internal(format!("flight store error: {message}"))
        }
    }
}
