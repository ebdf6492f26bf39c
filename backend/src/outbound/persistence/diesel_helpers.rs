//! Shared error mapping for Diesel repository implementations.
//!
//! Repositories pass their own port-error constructors so every adapter maps
//! pool and Diesel failures the same way.

use diesel::result::{DatabaseErrorKind, Error as DieselError};
use tracing::debug;

use super::pool::PoolError;

/// Map pool errors into a repository-specific connection error.
pub fn map_pool_error<E>(error: PoolError, connection: impl FnOnce(String) -> E) -> E {
    let message = match error {
        PoolError::Checkout { message } | PoolError::Build { message } => message,
    };
    connection(message)
}

/// Map Diesel errors into query or connection errors.
///
/// Driver messages are logged at debug level and replaced by a generic
/// message, so SQL details never reach chat replies.
pub fn map_diesel_error<E>(
    error: DieselError,
    query: impl FnOnce(&'static str) -> E,
    connection: impl FnOnce(&'static str) -> E,
) -> E {
    match &error {
        DieselError::DatabaseError(kind, info) => {
            debug!(?kind, message = info.message(), "diesel operation failed");
        }
        _ => debug!(%error, "diesel operation failed"),
    }

    match error {
        DieselError::NotFound => query("record not found"),
        DieselError::QueryBuilderError(_) => query("database query error"),
        DieselError::DatabaseError(DatabaseErrorKind::ClosedConnection, _) => {
            connection("database connection error")
        }
        _ => query("database error"),
    }
}

/// True when `error` reports a primary-key or unique constraint collision.
pub fn is_unique_violation(error: &DieselError) -> bool {
    matches!(
        error,
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _)
    )
}

#[cfg(test)]
mod tests {
    //! Error mapping coverage.

    use super::*;
    use rstest::rstest;

    #[derive(Debug, PartialEq, Eq)]
    enum Probe {
        Query(&'static str),
        Connection(String),
    }

    #[rstest]
    fn pool_errors_become_connection_errors() {
        let mapped = map_pool_error(PoolError::checkout("timed out"), Probe::Connection);
        assert_eq!(mapped, Probe::Connection("timed out".to_owned()));
    }

    #[rstest]
    #[case(DieselError::NotFound, Probe::Query("record not found"))]
    #[case(DieselError::RollbackTransaction, Probe::Query("database error"))]
    fn diesel_errors_are_mapped_to_generic_messages(
        #[case] error: DieselError,
        #[case] expected: Probe,
    ) {
        let mapped = map_diesel_error(error, Probe::Query, |message| {
            Probe::Connection(message.to_owned())
        });
        assert_eq!(mapped, expected);
    }

    #[rstest]
    fn not_found_is_not_a_unique_violation() {
        assert!(!is_unique_violation(&DieselError::NotFound));
    }
}
