//! Shared helpers for backend integration tests.
//!
//! Integration tests compile as separate crates under `backend/tests/`, so the
//! embedded PostgreSQL bootstrap and skip policy live here rather than being
//! copied into each suite.

pub mod pg_embed;

use pg_embedded_setup_unpriv::TestCluster;
use postgres::{Client, NoTls};

/// Render a `postgres` error with its SQLSTATE and detail.
///
/// The `Display` impl collapses database errors to `db error`, which hides
/// the part CI logs actually need.
pub fn format_postgres_error(error: &postgres::Error) -> String {
    let Some(db_error) = error.as_db_error() else {
        return error.to_string();
    };

    let mut summary = format!(
        "postgres error {:?}: {}",
        db_error.code(),
        db_error.message()
    );
    if let Some(detail) = db_error.detail() {
        summary.push_str("; detail: ");
        summary.push_str(detail);
    }
    summary
}

/// Returns true when `SKIP_TEST_CLUSTER` is "1", "true", or "yes".
pub fn should_skip_test_cluster() -> bool {
    std::env::var("SKIP_TEST_CLUSTER")
        .map(|value| matches!(value.to_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false)
}

/// Skip when the cluster is optional, otherwise fail loudly.
pub fn handle_cluster_setup_failure<T>(reason: impl std::fmt::Display) -> Option<T> {
    if should_skip_test_cluster() {
        eprintln!("SKIP-TEST-CLUSTER: {reason}");
        None
    } else {
        panic!("Test cluster setup failed: {reason}. Set SKIP_TEST_CLUSTER=1 to skip.");
    }
}

/// Drop and recreate `name`, returning its connection URL.
///
/// The statements run separately because `DROP DATABASE` refuses to run
/// inside the implicit transaction of a multi-statement batch.
pub fn reset_database(cluster: &TestCluster, name: &str) -> Result<String, String> {
    let admin_url = cluster.connection().database_url("postgres");
    let mut client =
        Client::connect(&admin_url, NoTls).map_err(|err| format_postgres_error(&err))?;
    client
        .batch_execute(&format!(r#"DROP DATABASE IF EXISTS "{name}" WITH (FORCE)"#))
        .map_err(|err| format_postgres_error(&err))?;
    client
        .batch_execute(&format!(r#"CREATE DATABASE "{name}""#))
        .map_err(|err| format_postgres_error(&err))?;
    Ok(cluster.connection().database_url(name))
}
