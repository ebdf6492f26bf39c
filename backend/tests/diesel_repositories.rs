//! Integration tests for the Diesel snapshot and subscription repositories
//! against embedded PostgreSQL.

use chrono::{DateTime, TimeZone, Utc};
use flightwatch::domain::ports::{
    SnapshotRepository, SubscriptionRepository, SubscriptionRepositoryError,
};
use flightwatch::domain::{
    AvailabilitySnapshot, LocationId, RouteKey, SubscriberId, Subscription,
};
use flightwatch::outbound::persistence::{
    DbPool, DieselSnapshotRepository, DieselSubscriptionRepository, PoolConfig,
    run_pending_migrations,
};
use pg_embedded_setup_unpriv::TestCluster;
use postgres::{Client, NoTls};
use rstest::rstest;
use tokio::runtime::Runtime;

mod support;

use support::pg_embed::test_cluster;
use support::{format_postgres_error, handle_cluster_setup_failure, reset_database};

struct TestContext {
    runtime: Runtime,
    _cluster: TestCluster,
    database_url: String,
    snapshots: DieselSnapshotRepository,
    subscriptions: DieselSubscriptionRepository,
}

fn setup_context(database: &str) -> Result<TestContext, String> {
    let runtime = Runtime::new().map_err(|err| err.to_string())?;
    let cluster = test_cluster()?;
    let database_url = reset_database(&cluster, database)?;
    runtime
        .block_on(run_pending_migrations(&database_url))
        .map_err(|err| err.to_string())?;

    let pool = runtime
        .block_on(DbPool::new(PoolConfig::new(&database_url).with_max_size(2)))
        .map_err(|err| err.to_string())?;

    Ok(TestContext {
        runtime,
        _cluster: cluster,
        database_url,
        snapshots: DieselSnapshotRepository::new(pool.clone()),
        subscriptions: DieselSubscriptionRepository::new(pool),
    })
}

fn context(database: &str) -> Option<TestContext> {
    match setup_context(database) {
        Ok(ctx) => Some(ctx),
        Err(reason) => handle_cluster_setup_failure(reason),
    }
}

fn route(origin: i64, destination: i64) -> RouteKey {
    RouteKey::new(LocationId::new(origin), LocationId::new(destination))
}

fn snapshot(origin: i64, destination: i64, dates: &[&str]) -> AvailabilitySnapshot {
    AvailabilitySnapshot::new(
        route(origin, destination),
        dates.iter().map(|date| (*date).to_owned()).collect(),
    )
}

fn observed_at(hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, hour, 0, 0)
        .single()
        .expect("valid timestamp")
}

fn subscription(chat: i64, origin: i64, destination: i64) -> Subscription {
    Subscription::new(SubscriberId::new(chat), route(origin, destination))
}

#[rstest]
fn snapshots_upsert_and_read_back() {
    let Some(ctx) = context("flightwatch_snapshots") else {
        eprintln!("SKIP-TEST-CLUSTER: snapshots_upsert_and_read_back skipped");
        return;
    };
    let repo = &ctx.snapshots;

    let missing = ctx
        .runtime
        .block_on(repo.find(route(1, 4)))
        .expect("lookup succeeds");
    assert_eq!(missing, None);

    let first = snapshot(1, 4, &["2024-05-02", "2024-05-01"]);
    ctx.runtime
        .block_on(repo.upsert(&first, observed_at(9)))
        .expect("insert succeeds");
    let stored = ctx
        .runtime
        .block_on(repo.find(route(1, 4)))
        .expect("lookup succeeds")
        .expect("row exists");
    assert_eq!(stored.sorted_dates(), vec!["2024-05-01", "2024-05-02"]);
    assert_eq!(stored.digest(), first.digest());

    let second = snapshot(1, 4, &["2024-05-03"]);
    ctx.runtime
        .block_on(repo.upsert(&second, observed_at(10)))
        .expect("update succeeds");
    let updated = ctx
        .runtime
        .block_on(repo.find(route(1, 4)))
        .expect("lookup succeeds")
        .expect("row exists");
    assert_eq!(updated.dates(), second.dates());
}

#[rstest]
fn stored_hash_matches_the_digest_of_the_dates() {
    let Some(ctx) = context("flightwatch_hashes") else {
        eprintln!("SKIP-TEST-CLUSTER: stored_hash_matches_the_digest_of_the_dates skipped");
        return;
    };

    let stored = snapshot(5, 1, &["2024-05-03"]);
    ctx.runtime
        .block_on(ctx.snapshots.upsert(&stored, observed_at(9)))
        .expect("insert succeeds");

    let mut client = Client::connect(&ctx.database_url, NoTls)
        .map_err(|err| format_postgres_error(&err))
        .expect("connect");
    let row = client
        .query_one(
            "SELECT hash_of_dates FROM flights \
             WHERE from_destination_id = 5 AND to_destination_id = 1",
            &[],
        )
        .map_err(|err| format_postgres_error(&err))
        .expect("row exists");
    let hash: String = row.get(0);
    assert_eq!(hash, stored.digest().as_str());
    assert_eq!(
        hash,
        "a3f529690765cff2bfbea22186116dd0f2cd25a02ecc2999e2be4f1b86f10bd4"
    );
}

#[rstest]
fn list_all_orders_by_route() {
    let Some(ctx) = context("flightwatch_listing") else {
        eprintln!("SKIP-TEST-CLUSTER: list_all_orders_by_route skipped");
        return;
    };

    for (origin, destination) in [(5, 1), (1, 4), (1, 2)] {
        ctx.runtime
            .block_on(
                ctx.snapshots
                    .upsert(&snapshot(origin, destination, &[]), observed_at(9)),
            )
            .expect("insert succeeds");
    }

    let routes = ctx
        .runtime
        .block_on(ctx.snapshots.list_all())
        .expect("listing succeeds")
        .iter()
        .map(AvailabilitySnapshot::route)
        .collect::<Vec<_>>();
    assert_eq!(routes, vec![route(1, 2), route(1, 4), route(5, 1)]);
}

#[rstest]
fn subscriptions_follow_their_lifecycle() {
    let Some(ctx) = context("flightwatch_subscriptions") else {
        eprintln!("SKIP-TEST-CLUSTER: subscriptions_follow_their_lifecycle skipped");
        return;
    };
    let repo = &ctx.subscriptions;

    for sub in [subscription(20, 1, 4), subscription(10, 1, 4), subscription(10, 5, 1)] {
        ctx.runtime.block_on(repo.add(&sub)).expect("add succeeds");
    }

    let duplicate = ctx.runtime.block_on(repo.add(&subscription(10, 1, 4)));
    assert!(matches!(
        duplicate,
        Err(SubscriptionRepositoryError::Duplicate { .. })
    ));

    let subscribers = ctx
        .runtime
        .block_on(repo.list_subscribers(route(1, 4)))
        .expect("listing succeeds");
    assert_eq!(subscribers, vec![SubscriberId::new(10), SubscriberId::new(20)]);

    let mine = ctx
        .runtime
        .block_on(repo.list_for_subscriber(SubscriberId::new(10)))
        .expect("listing succeeds");
    assert_eq!(mine.len(), 2);

    ctx.runtime
        .block_on(repo.remove(&subscription(10, 1, 4)))
        .expect("remove succeeds");
    let again = ctx.runtime.block_on(repo.remove(&subscription(10, 1, 4)));
    assert!(matches!(
        again,
        Err(SubscriptionRepositoryError::NotFound { .. })
    ));
    let remaining = ctx
        .runtime
        .block_on(repo.list_subscribers(route(1, 4)))
        .expect("listing succeeds");
    assert_eq!(remaining, vec![SubscriberId::new(20)]);
}

#[rstest]
fn migrations_are_idempotent() {
    let Some(ctx) = context("flightwatch_migrations") else {
        eprintln!("SKIP-TEST-CLUSTER: migrations_are_idempotent skipped");
        return;
    };

    let applied = ctx
        .runtime
        .block_on(run_pending_migrations(&ctx.database_url))
        .expect("second run succeeds");
    assert_eq!(applied, 0);
}
