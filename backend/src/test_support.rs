//! Test utilities for the flightwatch crate.
//!
//! In-memory adapters for every domain port, shared by unit tests in `src/`
//! and integration tests in `tests/`. Compiled for tests and behind the
//! `test-support` feature only.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Local, Utc};
use mockable::Clock;
use tokio::sync::{Notify, mpsc};

use crate::domain::ports::{
    AvailabilitySource, AvailabilitySourceError, NotificationChannel, NotificationChannelError,
    SnapshotRepository, SnapshotRepositoryError, SubscriptionRepository,
    SubscriptionRepositoryError,
};
use crate::domain::{AvailabilitySnapshot, LocationId, RouteKey, SubscriberId, Subscription};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Clock pinned to a single instant.
pub struct FixedClock(Mutex<DateTime<Utc>>);

impl FixedClock {
    /// Start the clock at `now`.
    pub fn new(now: DateTime<Utc>) -> Self {
        Self(Mutex::new(now))
    }
}

impl Clock for FixedClock {
    fn local(&self) -> DateTime<Local> {
        self.utc().with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        *lock(&self.0)
    }
}

/// Availability source answering from scripted tables.
///
/// Unscripted origins have no destinations and unscripted routes have no
/// dates. A source built with [`ScriptedSource::gated`] reports every
/// entered call on a channel and then waits for the shared [`Notify`].
#[derive(Default)]
pub struct ScriptedSource {
    destinations: Mutex<BTreeMap<LocationId, Result<Vec<LocationId>, AvailabilitySourceError>>>,
    dates: Mutex<BTreeMap<RouteKey, Result<Vec<String>, AvailabilitySourceError>>>,
    date_calls: Mutex<Vec<RouteKey>>,
    calls: AtomicUsize,
    active: AtomicUsize,
    max_active: AtomicUsize,
    entered: Option<mpsc::UnboundedSender<usize>>,
    release: Option<Arc<Notify>>,
}

impl ScriptedSource {
    /// Empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Source whose calls block until `release` is notified.
    pub fn gated(entered: mpsc::UnboundedSender<usize>, release: Arc<Notify>) -> Self {
        Self {
            entered: Some(entered),
            release: Some(release),
            ..Self::default()
        }
    }

    /// Script the destination list for `origin`.
    pub fn with_destinations(self, origin: i64, destinations: &[i64]) -> Self {
        lock(&self.destinations).insert(
            LocationId::new(origin),
            Ok(destinations.iter().copied().map(LocationId::new).collect()),
        );
        self
    }

    /// Script a failing destination lookup for `origin`.
    pub fn with_destination_error(self, origin: i64, error: AvailabilitySourceError) -> Self {
        lock(&self.destinations).insert(LocationId::new(origin), Err(error));
        self
    }

    /// Script the dates reported for a route.
    pub fn with_dates(self, origin: i64, destination: i64, dates: &[&str]) -> Self {
        self.set_dates(
            route(origin, destination),
            dates.iter().map(|date| (*date).to_owned()).collect(),
        );
        self
    }

    /// Script a failing date lookup for a route.
    pub fn with_dates_error(
        self,
        origin: i64,
        destination: i64,
        error: AvailabilitySourceError,
    ) -> Self {
        lock(&self.dates).insert(route(origin, destination), Err(error));
        self
    }

    /// Replace the dates reported for `route` between cycles.
    pub fn set_dates(&self, route: RouteKey, dates: Vec<String>) {
        lock(&self.dates).insert(route, Ok(dates));
    }

    /// Total calls across both operations.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Highest number of calls observed in flight at once.
    pub fn max_active(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }

    /// Routes whose dates were requested, in call order.
    pub fn date_calls(&self) -> Vec<RouteKey> {
        lock(&self.date_calls).clone()
    }

    async fn enter(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let active_now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(active_now, Ordering::SeqCst);
        if let Some(entered) = &self.entered {
            let _ = entered.send(active_now);
        }
        if let Some(release) = &self.release {
            release.notified().await;
        } else {
            tokio::task::yield_now().await;
        }
        self.active.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl AvailabilitySource for ScriptedSource {
    async fn fetch_destinations(
        &self,
        origin: LocationId,
    ) -> Result<Vec<LocationId>, AvailabilitySourceError> {
        self.enter().await;
        lock(&self.destinations)
            .get(&origin)
            .cloned()
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn fetch_dates(&self, route: RouteKey) -> Result<Vec<String>, AvailabilitySourceError> {
        lock(&self.date_calls).push(route);
        self.enter().await;
        lock(&self.dates)
            .get(&route)
            .cloned()
            .unwrap_or_else(|| Ok(Vec::new()))
    }
}

/// Snapshot store backed by a map, with switchable write failures.
#[derive(Default)]
pub struct InMemorySnapshots {
    rows: Mutex<BTreeMap<RouteKey, (AvailabilitySnapshot, DateTime<Utc>)>>,
    fail_writes: Mutex<Option<SnapshotRepositoryError>>,
    fail_reads: Mutex<Option<SnapshotRepositoryError>>,
    upserts: AtomicUsize,
}

impl InMemorySnapshots {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with `dates` for a route.
    pub fn with_row(self, origin: i64, destination: i64, dates: &[&str]) -> Self {
        let route = route(origin, destination);
        let snapshot = AvailabilitySnapshot::new(
            route,
            dates.iter().map(|date| (*date).to_owned()).collect(),
        );
        lock(&self.rows).insert(route, (snapshot, DateTime::<Utc>::UNIX_EPOCH));
        self
    }

    /// Make every subsequent upsert fail with `error` (or succeed on `None`).
    pub fn fail_writes(&self, error: Option<SnapshotRepositoryError>) {
        *lock(&self.fail_writes) = error;
    }

    /// Make every subsequent read fail with `error` (or succeed on `None`).
    pub fn fail_reads(&self, error: Option<SnapshotRepositoryError>) {
        *lock(&self.fail_reads) = error;
    }

    /// Successful upserts so far.
    pub fn upserts(&self) -> usize {
        self.upserts.load(Ordering::SeqCst)
    }

    /// Stored snapshot and its `updated_at` for a route.
    pub fn row(&self, route: RouteKey) -> Option<(AvailabilitySnapshot, DateTime<Utc>)> {
        lock(&self.rows).get(&route).cloned()
    }
}

#[async_trait]
impl SnapshotRepository for InMemorySnapshots {
    async fn find(
        &self,
        route: RouteKey,
    ) -> Result<Option<AvailabilitySnapshot>, SnapshotRepositoryError> {
        if let Some(error) = lock(&self.fail_reads).clone() {
            return Err(error);
        }
        Ok(lock(&self.rows).get(&route).map(|(snapshot, _)| snapshot.clone()))
    }

    async fn upsert(
        &self,
        snapshot: &AvailabilitySnapshot,
        observed_at: DateTime<Utc>,
    ) -> Result<(), SnapshotRepositoryError> {
        if let Some(error) = lock(&self.fail_writes).clone() {
            return Err(error);
        }
        lock(&self.rows).insert(snapshot.route(), (snapshot.clone(), observed_at));
        self.upserts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<AvailabilitySnapshot>, SnapshotRepositoryError> {
        if let Some(error) = lock(&self.fail_reads).clone() {
            return Err(error);
        }
        Ok(lock(&self.rows)
            .values()
            .map(|(snapshot, _)| snapshot.clone())
            .collect())
    }
}

/// Subscription store enforcing `(subscriber, route)` uniqueness.
#[derive(Default)]
pub struct InMemorySubscriptions {
    rows: Mutex<BTreeSet<Subscription>>,
    fail_reads: Mutex<Option<SubscriptionRepositoryError>>,
}

impl InMemorySubscriptions {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with one subscription.
    pub fn with(self, subscriber: i64, origin: i64, destination: i64) -> Self {
        lock(&self.rows).insert(Subscription::new(
            SubscriberId::new(subscriber),
            route(origin, destination),
        ));
        self
    }

    /// Make every subsequent read fail with `error` (or succeed on `None`).
    pub fn fail_reads(&self, error: Option<SubscriptionRepositoryError>) {
        *lock(&self.fail_reads) = error;
    }

    fn check_reads(&self) -> Result<(), SubscriptionRepositoryError> {
        lock(&self.fail_reads).clone().map_or(Ok(()), Err)
    }
}

#[async_trait]
impl SubscriptionRepository for InMemorySubscriptions {
    async fn list_subscribers(
        &self,
        route: RouteKey,
    ) -> Result<Vec<SubscriberId>, SubscriptionRepositoryError> {
        self.check_reads()?;
        Ok(lock(&self.rows)
            .iter()
            .filter(|subscription| subscription.route == route)
            .map(|subscription| subscription.subscriber)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect())
    }

    async fn add(&self, subscription: &Subscription) -> Result<(), SubscriptionRepositoryError> {
        if lock(&self.rows).insert(*subscription) {
            Ok(())
        } else {
            Err(SubscriptionRepositoryError::duplicate(describe(subscription)))
        }
    }

    async fn remove(&self, subscription: &Subscription) -> Result<(), SubscriptionRepositoryError> {
        if lock(&self.rows).remove(subscription) {
            Ok(())
        } else {
            Err(SubscriptionRepositoryError::not_found(describe(subscription)))
        }
    }

    async fn list_for_subscriber(
        &self,
        subscriber: SubscriberId,
    ) -> Result<Vec<Subscription>, SubscriptionRepositoryError> {
        self.check_reads()?;
        Ok(lock(&self.rows)
            .iter()
            .filter(|subscription| subscription.subscriber == subscriber)
            .copied()
            .collect())
    }
}

/// Chat channel that records every message and fails for chosen chats.
#[derive(Default)]
pub struct RecordingChannel {
    failing: HashSet<SubscriberId>,
    sent: Mutex<Vec<(SubscriberId, String)>>,
    attempts: AtomicUsize,
}

impl RecordingChannel {
    /// Channel accepting every message.
    pub fn new() -> Self {
        Self::default()
    }

    /// Channel rejecting messages for the given chat ids.
    pub fn failing_for(ids: &[i64]) -> Self {
        Self {
            failing: ids.iter().copied().map(SubscriberId::new).collect(),
            ..Self::default()
        }
    }

    /// Messages accepted so far, in delivery order.
    pub fn sent(&self) -> Vec<(SubscriberId, String)> {
        lock(&self.sent).clone()
    }

    /// Delivery attempts so far, including failures.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NotificationChannel for RecordingChannel {
    async fn send(
        &self,
        subscriber: SubscriberId,
        message: &str,
    ) -> Result<(), NotificationChannelError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.failing.contains(&subscriber) {
            return Err(NotificationChannelError::rejected(format!(
                "chat {subscriber} blocked the bot"
            )));
        }
        lock(&self.sent).push((subscriber, message.to_owned()));
        Ok(())
    }
}

/// Shorthand for building a route from raw ids.
pub fn route(origin: i64, destination: i64) -> RouteKey {
    RouteKey::new(LocationId::new(origin), LocationId::new(destination))
}

fn describe(subscription: &Subscription) -> String {
    format!("{}:{}", subscription.subscriber, subscription.route)
}
