//! PostgreSQL persistence adapters using Diesel ORM.
//!
//! Concrete implementations of the snapshot and subscription ports backed by
//! PostgreSQL through `diesel-async` and `bb8` connection pooling.
//!
//! - **Thin adapters**: repositories only translate between Diesel rows and
//!   domain types.
//! - **Internal models**: row structs (`models.rs`) and table definitions
//!   (`schema.rs`) never leave this module.
//! - **Strongly typed errors**: database failures map to the port error
//!   enums.
//!
//! # Example
//!
//! ```ignore
//! use flightwatch::outbound::persistence::{DbPool, DieselSnapshotRepository, PoolConfig};
//!
//! let pool = DbPool::new(PoolConfig::new("postgres://localhost/flightwatch")).await?;
//! let snapshots = DieselSnapshotRepository::new(pool);
//! ```

mod diesel_helpers;
mod diesel_snapshot_repository;
mod diesel_subscription_repository;
mod migrations;
mod models;
mod pool;
mod schema;

pub use diesel_snapshot_repository::DieselSnapshotRepository;
pub use diesel_subscription_repository::DieselSubscriptionRepository;
pub use migrations::{MIGRATIONS, MigrationError, run_pending_migrations};
pub use pool::{DbPool, PoolConfig, PoolError};
