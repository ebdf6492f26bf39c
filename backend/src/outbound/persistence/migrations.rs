//! Embedded schema migrations.
//!
//! Diesel's migration harness is synchronous, so migrations run on a blocking
//! thread over a dedicated `PgConnection` rather than through the async pool.

use diesel::{Connection, PgConnection};
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use tracing::info;

/// Migrations compiled into the binary from `backend/migrations`.
pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Errors raised while applying migrations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MigrationError {
    /// The migration connection could not be established.
    #[error("migration connection failed: {message}")]
    Connection {
        /// Driver message.
        message: String,
    },
    /// A migration failed to apply.
    #[error("migration failed: {message}")]
    Apply {
        /// Harness message.
        message: String,
    },
    /// The blocking migration task panicked or was cancelled.
    #[error("migration task failed: {message}")]
    Task {
        /// Join error message.
        message: String,
    },
}

/// Apply every pending migration and return how many ran.
///
/// # Errors
///
/// Returns a [`MigrationError`] when the database is unreachable or a
/// migration fails.
pub async fn run_pending_migrations(database_url: &str) -> Result<usize, MigrationError> {
    let database_url = database_url.to_owned();
    let applied = tokio::task::spawn_blocking(move || apply_blocking(&database_url))
        .await
        .map_err(|error| MigrationError::Task {
            message: error.to_string(),
        })??;
    info!(applied, "database migrations applied");
    Ok(applied)
}

fn apply_blocking(database_url: &str) -> Result<usize, MigrationError> {
    let mut conn =
        PgConnection::establish(database_url).map_err(|error| MigrationError::Connection {
            message: error.to_string(),
        })?;
    let applied = conn
        .run_pending_migrations(MIGRATIONS)
        .map_err(|error| MigrationError::Apply {
            message: error.to_string(),
        })?;
    Ok(applied.len())
}
