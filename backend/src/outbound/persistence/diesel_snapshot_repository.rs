//! PostgreSQL-backed `SnapshotRepository` implementation using Diesel ORM.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::upsert::excluded;
use diesel_async::RunQueryDsl;
use tracing::debug;

use super::diesel_helpers::{map_diesel_error, map_pool_error};
use super::models::{FlightRow, NewFlightRow};
use super::pool::DbPool;
use super::schema::flights;
use crate::domain::ports::{SnapshotRepository, SnapshotRepositoryError};
use crate::domain::{AvailabilitySnapshot, RouteKey};

/// Diesel-backed implementation of the snapshot repository port.
#[derive(Clone)]
pub struct DieselSnapshotRepository {
    pool: DbPool,
}

impl DieselSnapshotRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn pool_error(error: super::pool::PoolError) -> SnapshotRepositoryError {
    map_pool_error(error, SnapshotRepositoryError::connection)
}

fn diesel_error(error: diesel::result::Error) -> SnapshotRepositoryError {
    map_diesel_error(
        error,
        SnapshotRepositoryError::query,
        SnapshotRepositoryError::connection,
    )
}

#[async_trait]
impl SnapshotRepository for DieselSnapshotRepository {
    async fn find(
        &self,
        route: RouteKey,
    ) -> Result<Option<AvailabilitySnapshot>, SnapshotRepositoryError> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;

        let row = flights::table
            .filter(flights::from_destination_id.eq(route.origin().as_i64()))
            .filter(flights::to_destination_id.eq(route.destination().as_i64()))
            .select(FlightRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(diesel_error)?;

        Ok(row.map(FlightRow::into_snapshot))
    }

    async fn upsert(
        &self,
        snapshot: &AvailabilitySnapshot,
        observed_at: DateTime<Utc>,
    ) -> Result<(), SnapshotRepositoryError> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;
        let row = NewFlightRow::from_snapshot(snapshot, observed_at);

        diesel::insert_into(flights::table)
            .values(&row)
            .on_conflict((flights::from_destination_id, flights::to_destination_id))
            .do_update()
            .set((
                flights::dates.eq(excluded(flights::dates)),
                flights::hash_of_dates.eq(excluded(flights::hash_of_dates)),
                flights::updated_at.eq(excluded(flights::updated_at)),
            ))
            .execute(&mut conn)
            .await
            .map_err(diesel_error)?;

        debug!(route = %snapshot.route(), "flight availability upserted");
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<AvailabilitySnapshot>, SnapshotRepositoryError> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;

        let rows: Vec<FlightRow> = flights::table
            .select(FlightRow::as_select())
            .order_by((flights::from_destination_id, flights::to_destination_id))
            .load(&mut conn)
            .await
            .map_err(diesel_error)?;

        Ok(rows.into_iter().map(FlightRow::into_snapshot).collect())
    }
}
