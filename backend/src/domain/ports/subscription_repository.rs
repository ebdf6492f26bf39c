//! Driven port for subscriber ↔ route registrations.

use async_trait::async_trait;

use super::define_port_error;
use crate::domain::{RouteKey, SubscriberId, Subscription};

define_port_error! {
    /// Errors raised while managing subscriptions.
    pub enum SubscriptionRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } =>
            "subscription persistence connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } =>
            "subscription persistence query failed: {message}",
        /// The `(subscriber, route)` pair is already registered.
        Duplicate { subscription: String } =>
            "subscription already exists: {subscription}",
        /// No registration exists for the `(subscriber, route)` pair.
        NotFound { subscription: String } =>
            "subscription not found: {subscription}",
    }
}

/// Port for the subscription store. Rows are unique on `(subscriber, route)`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SubscriptionRepository: Send + Sync {
    /// Everyone watching `route`, ordered by subscriber id.
    async fn list_subscribers(
        &self,
        route: RouteKey,
    ) -> Result<Vec<SubscriberId>, SubscriptionRepositoryError>;

    /// Register a subscription, rejecting duplicates with
    /// [`SubscriptionRepositoryError::Duplicate`].
    async fn add(&self, subscription: &Subscription) -> Result<(), SubscriptionRepositoryError>;

    /// Delete a subscription, failing with
    /// [`SubscriptionRepositoryError::NotFound`] when it does not exist.
    async fn remove(&self, subscription: &Subscription)
    -> Result<(), SubscriptionRepositoryError>;

    /// Every route `subscriber` watches, ordered by route.
    async fn list_for_subscriber(
        &self,
        subscriber: SubscriberId,
    ) -> Result<Vec<Subscription>, SubscriptionRepositoryError>;
}
