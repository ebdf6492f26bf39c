//! Unit tests for subscriber fan-out.

use std::collections::BTreeSet;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use mockall::predicate::eq;
use rstest::{fixture, rstest};

use super::*;
use crate::domain::LocationId;
use crate::domain::ports::MockSubscriptionRepository;

#[derive(Default)]
struct RecordingChannel {
    failing: BTreeSet<SubscriberId>,
    sent: Mutex<Vec<(SubscriberId, String)>>,
    active: AtomicUsize,
    max_active: AtomicUsize,
}

impl RecordingChannel {
    fn failing_for(failing: impl IntoIterator<Item = i64>) -> Self {
        Self {
            failing: failing.into_iter().map(SubscriberId::new).collect(),
            ..Self::default()
        }
    }

    fn sent_to(&self) -> BTreeSet<SubscriberId> {
        self.sent
            .lock()
            .expect("sent mutex")
            .iter()
            .map(|(subscriber, _)| *subscriber)
            .collect()
    }
}

#[async_trait]
impl NotificationChannel for RecordingChannel {
    async fn send(
        &self,
        subscriber: SubscriberId,
        message: &str,
    ) -> Result<(), NotificationChannelError> {
        let active_now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(active_now, Ordering::SeqCst);
        tokio::task::yield_now().await;
        self.active.fetch_sub(1, Ordering::SeqCst);

        if self.failing.contains(&subscriber) {
            return Err(NotificationChannelError::rejected("bot was blocked by the user"));
        }
        self.sent
            .lock()
            .expect("sent mutex")
            .push((subscriber, message.to_owned()));
        Ok(())
    }
}

#[fixture]
fn route() -> RouteKey {
    RouteKey::new(LocationId::new(1), LocationId::new(4))
}

fn subscriptions_for(route: RouteKey, subscribers: &[i64]) -> MockSubscriptionRepository {
    let subscribers = subscribers
        .iter()
        .copied()
        .map(SubscriberId::new)
        .collect::<Vec<_>>();
    let mut repository = MockSubscriptionRepository::new();
    repository
        .expect_list_subscribers()
        .with(eq(route))
        .times(1)
        .return_once(move |_| Ok(subscribers));
    repository
}

fn new_dates() -> Vec<String> {
    vec!["2024-05-03".to_owned()]
}

#[rstest]
#[tokio::test]
async fn one_failing_subscriber_does_not_block_the_rest(route: RouteKey) {
    let channel = Arc::new(RecordingChannel::failing_for([20]));
    let notifier = Notifier::new(
        Arc::new(subscriptions_for(route, &[10, 20, 30, 40])),
        channel.clone(),
        2,
    );

    let report = notifier
        .notify(route, &new_dates())
        .await
        .expect("lookup succeeds");

    assert_eq!(report.deliveries.len(), 4);
    assert_eq!(report.delivered_count(), 3);
    assert_eq!(report.failed_count(), 1);
    assert_eq!(
        channel.sent_to(),
        [10, 30, 40].into_iter().map(SubscriberId::new).collect()
    );
    let failed = report
        .deliveries
        .iter()
        .find(|outcome| outcome.result.is_err())
        .expect("one failure recorded");
    assert_eq!(failed.subscriber, SubscriberId::new(20));
}

#[rstest]
#[tokio::test]
async fn every_subscriber_receives_the_formatted_message(route: RouteKey) {
    let channel = Arc::new(RecordingChannel::default());
    let notifier = Notifier::new(Arc::new(subscriptions_for(route, &[7])), channel.clone(), 4);

    notifier
        .notify(route, &new_dates())
        .await
        .expect("lookup succeeds");

    let sent = channel.sent.lock().expect("sent mutex");
    assert_eq!(
        sent.as_slice(),
        [(
            SubscriberId::new(7),
            "New dates for Tbilisi (1) → Batumi (4):\n2024-05-03".to_owned()
        )]
    );
}

#[rstest]
#[tokio::test]
async fn no_subscribers_is_an_empty_success(route: RouteKey) {
    let channel = Arc::new(RecordingChannel::default());
    let notifier = Notifier::new(Arc::new(subscriptions_for(route, &[])), channel.clone(), 4);

    let report = notifier
        .notify(route, &new_dates())
        .await
        .expect("lookup succeeds");

    assert!(report.deliveries.is_empty());
    assert!(channel.sent_to().is_empty());
}

#[rstest]
#[tokio::test]
async fn deliveries_respect_the_concurrency_bound(route: RouteKey) {
    let channel = Arc::new(RecordingChannel::default());
    let subscribers = (1..=12).collect::<Vec<i64>>();
    let notifier = Notifier::new(
        Arc::new(subscriptions_for(route, &subscribers)),
        channel.clone(),
        3,
    );

    let report = notifier
        .notify(route, &new_dates())
        .await
        .expect("lookup succeeds");

    assert_eq!(report.delivered_count(), 12);
    assert!(channel.max_active.load(Ordering::SeqCst) <= 3);
}

#[rstest]
#[tokio::test]
async fn lookup_failure_surfaces_without_sending(route: RouteKey) {
    let mut repository = MockSubscriptionRepository::new();
    repository
        .expect_list_subscribers()
        .return_once(|_| Err(SubscriptionRepositoryError::connection("refused")));
    let channel = Arc::new(RecordingChannel::default());
    let notifier = Notifier::new(Arc::new(repository), channel.clone(), 4);

    let error = notifier
        .notify(route, &new_dates())
        .await
        .expect_err("lookup fails");

    assert_eq!(
        error,
        NotifierError(SubscriptionRepositoryError::connection("refused"))
    );
    assert!(channel.sent_to().is_empty());
}

#[rstest]
fn empty_date_lists_get_their_own_wording(route: RouteKey) {
    assert_eq!(
        availability_message(route, &[]),
        "No dates are currently available for Tbilisi (1) → Batumi (4)."
    );
}
