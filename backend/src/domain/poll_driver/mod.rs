//! Periodic poll-diff-notify loop.
//!
//! Each cycle fetches the destination list for every polled origin, runs the
//! change detector for each resulting route, persists changed snapshots, and
//! notifies subscribers only after the write succeeded. All ticketing calls
//! share one concurrency bound and one timeout. A cycle never overlaps the
//! previous one: a tick that arrives while a cycle is still running is
//! skipped.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use futures_util::future::join_all;
use mockable::Clock;
use tokio::sync::{Mutex, Semaphore};
use tokio::task::{JoinError, JoinSet};
use tokio::time::{MissedTickBehavior, interval};
use tracing::{Instrument, debug, error, info, info_span, warn};

use super::change_detector::{ChangeDetector, Detection, FetchFailure, bounded};
use super::notifier::Notifier;
use super::ports::{AvailabilitySource, AvailabilitySourceError, SnapshotRepository};
use super::{AvailabilitySnapshot, LocationId, RouteKey};

mod runtime;

pub use runtime::{PollDriverConfig, PollDriverPorts};

/// What happened to one route during a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteOutcome {
    /// Fetched dates matched the stored snapshot.
    Unchanged,
    /// Snapshot replaced and subscribers notified.
    Updated {
        /// Deliveries the channel accepted.
        delivered: usize,
        /// Deliveries that failed.
        failed: usize,
    },
    /// Live or stored availability could not be read; nothing was written.
    FetchFailed,
    /// The new snapshot could not be written; nobody was notified.
    PersistFailed,
    /// The snapshot was written but the subscriber list could not be read.
    NotifyFailed,
}

/// Counters describing one completed cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    /// When the cycle started.
    pub started_at: DateTime<Utc>,
    /// When the cycle finished.
    pub finished_at: DateTime<Utc>,
    /// Origins polled.
    pub origins: usize,
    /// Origins whose destination list could not be fetched.
    pub origin_failures: usize,
    /// Routes checked.
    pub routes: usize,
    /// Routes whose availability was unchanged.
    pub unchanged: usize,
    /// Routes whose snapshot was replaced.
    pub updated: usize,
    /// Routes skipped because a fetch failed.
    pub fetch_failures: usize,
    /// Routes whose new snapshot could not be written.
    pub persist_failures: usize,
    /// Routes whose subscriber list could not be read.
    pub notify_failures: usize,
    /// Messages accepted by the channel.
    pub deliveries_sent: usize,
    /// Messages the channel refused or failed to carry.
    pub deliveries_failed: usize,
}

impl CycleReport {
    fn new(started_at: DateTime<Utc>, origins: usize) -> Self {
        Self {
            started_at,
            finished_at: started_at,
            origins,
            origin_failures: 0,
            routes: 0,
            unchanged: 0,
            updated: 0,
            fetch_failures: 0,
            persist_failures: 0,
            notify_failures: 0,
            deliveries_sent: 0,
            deliveries_failed: 0,
        }
    }

    fn record(&mut self, outcome: RouteOutcome) {
        self.routes += 1;
        match outcome {
            RouteOutcome::Unchanged => self.unchanged += 1,
            RouteOutcome::Updated { delivered, failed } => {
                self.updated += 1;
                self.deliveries_sent += delivered;
                self.deliveries_failed += failed;
            }
            RouteOutcome::FetchFailed => self.fetch_failures += 1,
            RouteOutcome::PersistFailed => self.persist_failures += 1,
            RouteOutcome::NotifyFailed => self.notify_failures += 1,
        }
    }
}

/// Result of asking the driver to run a cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleRun {
    /// The cycle ran to completion.
    Completed(CycleReport),
    /// A previous cycle was still running, so this one did not start.
    Skipped,
}

/// Domain-owned periodic poll driver.
pub struct PollCycleDriver {
    origins: Vec<LocationId>,
    source: Arc<dyn AvailabilitySource>,
    snapshots: Arc<dyn SnapshotRepository>,
    detector: ChangeDetector,
    notifier: Notifier,
    clock: Arc<dyn Clock>,
    config: PollDriverConfig,
    fetch_permits: Semaphore,
    cycle_guard: Mutex<()>,
    cycles: AtomicU64,
}

impl PollCycleDriver {
    /// Build a driver polling `origins` through `ports`.
    pub fn new(
        ports: PollDriverPorts,
        origins: Vec<LocationId>,
        clock: Arc<dyn Clock>,
        config: PollDriverConfig,
    ) -> Self {
        let PollDriverPorts {
            source,
            snapshots,
            subscriptions,
            channel,
        } = ports;

        Self {
            origins,
            detector: ChangeDetector::new(
                Arc::clone(&source),
                Arc::clone(&snapshots),
                config.fetch_timeout,
            ),
            notifier: Notifier::new(subscriptions, channel, config.max_concurrent_deliveries),
            source,
            snapshots,
            clock,
            fetch_permits: Semaphore::new(config.max_concurrent_fetches.max(1)),
            config,
            cycle_guard: Mutex::new(()),
            cycles: AtomicU64::new(0),
        }
    }

    /// Tick forever until `shutdown` resolves.
    ///
    /// The first cycle starts immediately. Each cycle runs on its own task, so
    /// a slow cycle never delays the timer; ticks missed while the runtime was
    /// busy are skipped rather than bursted. After shutdown, in-flight cycles
    /// are awaited so a persisted change is never left unannounced.
    pub async fn run(self: Arc<Self>, shutdown: impl Future<Output = ()>) {
        let period = self.config.poll_interval.max(std::time::Duration::from_secs(1));
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut in_flight = JoinSet::new();
        tokio::pin!(shutdown);

        info!(
            period_secs = period.as_secs(),
            origins = self.origins.len(),
            "poll driver started"
        );
        loop {
            tokio::select! {
                () = &mut shutdown => {
                    info!(in_flight = in_flight.len(), "poll driver stopping");
                    break;
                }
                _ = ticker.tick() => {
                    let driver = Arc::clone(&self);
                    in_flight.spawn(async move { driver.run_cycle().await });
                }
                Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                    log_cycle_exit(joined);
                }
            }
        }

        while let Some(joined) = in_flight.join_next().await {
            log_cycle_exit(joined);
        }
        info!("poll driver stopped");
    }

    /// Run one cycle unless another is still in progress.
    pub async fn run_cycle(&self) -> CycleRun {
        let Ok(_guard) = self.cycle_guard.try_lock() else {
            warn!("previous poll cycle still running; skipping tick");
            return CycleRun::Skipped;
        };

        let cycle = self.cycles.fetch_add(1, Ordering::Relaxed) + 1;
        let report = self
            .execute_cycle()
            .instrument(info_span!("poll_cycle", cycle))
            .await;
        CycleRun::Completed(report)
    }

    async fn execute_cycle(&self) -> CycleReport {
        let mut report = CycleReport::new(self.clock.utc(), self.origins.len());

        let destination_lists = join_all(
            self.origins
                .iter()
                .map(|origin| self.fetch_destinations(*origin)),
        )
        .await;

        let mut routes = Vec::new();
        for (origin, result) in self.origins.iter().copied().zip(destination_lists) {
            match result {
                Ok(destinations) => routes.extend(
                    destinations
                        .into_iter()
                        .map(|destination| RouteKey::new(origin, destination))
                        .filter(|route| !route.is_loop()),
                ),
                Err(failure) => {
                    warn!(%origin, error = %failure, "destination lookup failed; skipping origin");
                    report.origin_failures += 1;
                }
            }
        }
        // One task per route keeps writes for a route serialised within a cycle.
        routes.sort_unstable();
        routes.dedup();

        let outcomes = join_all(routes.into_iter().map(|route| self.process_route(route))).await;
        for outcome in outcomes {
            report.record(outcome);
        }

        report.finished_at = self.clock.utc();
        info!(
            origins = report.origins,
            origin_failures = report.origin_failures,
            routes = report.routes,
            unchanged = report.unchanged,
            updated = report.updated,
            fetch_failures = report.fetch_failures,
            persist_failures = report.persist_failures,
            notify_failures = report.notify_failures,
            deliveries_sent = report.deliveries_sent,
            deliveries_failed = report.deliveries_failed,
            "poll cycle finished"
        );
        report
    }

    async fn fetch_destinations(
        &self,
        origin: LocationId,
    ) -> Result<Vec<LocationId>, FetchFailure> {
        let Ok(_permit) = self.fetch_permits.acquire().await else {
            return Err(AvailabilitySourceError::transport("fetch permits closed").into());
        };
        bounded(self.config.fetch_timeout, self.source.fetch_destinations(origin)).await
    }

    /// Detect, persist, and notify for one route.
    ///
    /// Only detection holds a fetch permit; persistence and delivery run
    /// outside the ticketing bound.
    pub async fn process_route(&self, route: RouteKey) -> RouteOutcome {
        let detection = match self.fetch_permits.acquire().await {
            Ok(_permit) => self.detector.detect(route).await,
            Err(_closed) => Detection::FetchFailed(
                AvailabilitySourceError::transport("fetch permits closed").into(),
            ),
        };
        match detection {
            Detection::Unchanged => RouteOutcome::Unchanged,
            Detection::FetchFailed(failure) => {
                warn!(%route, error = %failure, "availability fetch failed; skipping route");
                RouteOutcome::FetchFailed
            }
            Detection::Changed(snapshot) => self.persist_and_notify(snapshot).await,
        }
    }

    async fn persist_and_notify(&self, snapshot: AvailabilitySnapshot) -> RouteOutcome {
        let route = snapshot.route();
        if let Err(error) = self.snapshots.upsert(&snapshot, self.clock.utc()).await {
            error!(%route, %error, "snapshot write failed; not notifying");
            return RouteOutcome::PersistFailed;
        }
        info!(
            %route,
            dates = snapshot.dates().len(),
            digest = %snapshot.digest(),
            "availability changed"
        );

        match self.notifier.notify(route, snapshot.dates()).await {
            Ok(report) => {
                debug!(
                    %route,
                    delivered = report.delivered_count(),
                    failed = report.failed_count(),
                    "subscribers notified"
                );
                RouteOutcome::Updated {
                    delivered: report.delivered_count(),
                    failed: report.failed_count(),
                }
            }
            Err(error) => {
                warn!(%route, %error, "could not notify subscribers");
                RouteOutcome::NotifyFailed
            }
        }
    }
}

fn log_cycle_exit(joined: Result<CycleRun, JoinError>) {
    if let Err(error) = joined {
        error!(%error, "poll cycle task aborted");
    }
}
