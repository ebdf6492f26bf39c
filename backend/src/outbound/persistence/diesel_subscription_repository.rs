//! PostgreSQL-backed `SubscriptionRepository` implementation using Diesel ORM.
//!
//! Uniqueness is enforced by the table's primary key; a collision on insert
//! is reported as a duplicate rather than a query failure.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use super::diesel_helpers::{is_unique_violation, map_diesel_error, map_pool_error};
use super::models::{NewSubscriptionRow, SubscriptionRow};
use super::pool::{DbPool, PoolError};
use super::schema::subscriptions;
use crate::domain::ports::{SubscriptionRepository, SubscriptionRepositoryError};
use crate::domain::{RouteKey, SubscriberId, Subscription};

/// Diesel-backed implementation of the subscription repository port.
#[derive(Clone)]
pub struct DieselSubscriptionRepository {
    pool: DbPool,
}

impl DieselSubscriptionRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn pool_error(error: PoolError) -> SubscriptionRepositoryError {
    map_pool_error(error, SubscriptionRepositoryError::connection)
}

fn diesel_error(error: diesel::result::Error) -> SubscriptionRepositoryError {
    map_diesel_error(
        error,
        SubscriptionRepositoryError::query,
        SubscriptionRepositoryError::connection,
    )
}

fn describe(subscription: &Subscription) -> String {
    format!("{}:{}", subscription.subscriber, subscription.route)
}

#[async_trait]
impl SubscriptionRepository for DieselSubscriptionRepository {
    async fn list_subscribers(
        &self,
        route: RouteKey,
    ) -> Result<Vec<SubscriberId>, SubscriptionRepositoryError> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;

        let chat_ids: Vec<i64> = subscriptions::table
            .filter(subscriptions::from_destination_id.eq(route.origin().as_i64()))
            .filter(subscriptions::to_destination_id.eq(route.destination().as_i64()))
            .select(subscriptions::chat_id)
            .order_by(subscriptions::chat_id)
            .load(&mut conn)
            .await
            .map_err(diesel_error)?;

        Ok(chat_ids.into_iter().map(SubscriberId::new).collect())
    }

    async fn add(&self, subscription: &Subscription) -> Result<(), SubscriptionRepositoryError> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;

        diesel::insert_into(subscriptions::table)
            .values(NewSubscriptionRow::from(subscription))
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(|error| {
                if is_unique_violation(&error) {
                    SubscriptionRepositoryError::duplicate(describe(subscription))
                } else {
                    diesel_error(error)
                }
            })
    }

    async fn remove(&self, subscription: &Subscription) -> Result<(), SubscriptionRepositoryError> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;
        let row = NewSubscriptionRow::from(subscription);

        let deleted = diesel::delete(
            subscriptions::table
                .filter(subscriptions::chat_id.eq(row.chat_id))
                .filter(subscriptions::from_destination_id.eq(row.from_destination_id))
                .filter(subscriptions::to_destination_id.eq(row.to_destination_id)),
        )
        .execute(&mut conn)
        .await
        .map_err(diesel_error)?;

        if deleted == 0 {
            return Err(SubscriptionRepositoryError::not_found(describe(subscription)));
        }
        Ok(())
    }

    async fn list_for_subscriber(
        &self,
        subscriber: SubscriberId,
    ) -> Result<Vec<Subscription>, SubscriptionRepositoryError> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;

        let rows: Vec<SubscriptionRow> = subscriptions::table
            .filter(subscriptions::chat_id.eq(subscriber.as_i64()))
            .select(SubscriptionRow::as_select())
            .order_by((
                subscriptions::from_destination_id,
                subscriptions::to_destination_id,
            ))
            .load(&mut conn)
            .await
            .map_err(diesel_error)?;

        Ok(rows.into_iter().map(Subscription::from).collect())
    }
}
