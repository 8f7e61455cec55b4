//! Stream supervisor: fan-in of the two subscriptions and re-subscription
//! after closure. Runs on a paused clock, so backoff sleeps cost nothing.

use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use snooytbust_common::ItemId;
use snooytbust_moderator::retry::RetryPolicy;
use snooytbust_moderator::stream::StreamSupervisor;
use snooytbust_moderator::testing::{
    comment, mock_deps, post, MockBlacklist, MockMetadata, MockSource, RecordingBackend, Script,
};
use snooytbust_moderator::traits::{SubscriptionEvent, SubscriptionKind};

const RETRY: Duration = Duration::from_secs(60);

fn item_event(item: snooytbust_common::DiscussionItem) -> SubscriptionEvent {
    SubscriptionEvent::Item(item)
}

async fn connect(source: &MockSource, retry: RetryPolicy) -> (StreamSupervisor, CancellationToken) {
    let mut deps = mock_deps(
        source,
        &MockMetadata::new(),
        &MockBlacklist::new(),
        &RecordingBackend::new(),
        RETRY,
    );
    deps.retry = retry;
    let cancel = CancellationToken::new();
    let supervisor = StreamSupervisor::connect(&deps, &cancel)
        .await
        .expect("initial subscriptions");
    (supervisor, cancel)
}

#[tokio::test(start_paused = true)]
async fn surfaces_items_from_both_subscriptions() {
    let source = MockSource::new()
        .script(
            SubscriptionKind::Submissions,
            vec![Script::Open(vec![item_event(post("p1", "a"))])],
        )
        .script(
            SubscriptionKind::Comments,
            vec![Script::Open(vec![
                item_event(comment("c1", "b")),
                item_event(comment("c2", "c")),
            ])],
        );
    let (mut supervisor, _cancel) = connect(&source, RetryPolicy::forever(RETRY)).await;

    let mut ids = Vec::new();
    for _ in 0..3 {
        ids.push(supervisor.next().await.expect("item").id);
    }

    assert!(ids.contains(&ItemId::post("p1")));
    // Per-subscription order is preserved
    let c1 = ids.iter().position(|id| *id == ItemId::comment("c1")).unwrap();
    let c2 = ids.iter().position(|id| *id == ItemId::comment("c2")).unwrap();
    assert!(c1 < c2);
}

#[tokio::test(start_paused = true)]
async fn closed_subscription_is_recreated_with_backoff_while_other_keeps_flowing() {
    let source = MockSource::new()
        .script(
            SubscriptionKind::Submissions,
            vec![
                Script::Open(vec![SubscriptionEvent::Closed]),
                Script::Fail,
                Script::Fail,
                Script::Open(vec![item_event(post("p1", "after outage"))]),
            ],
        )
        .script(
            SubscriptionKind::Comments,
            vec![Script::Open(vec![
                item_event(comment("c1", "one")),
                item_event(comment("c2", "two")),
            ])],
        );
    let start = Instant::now();
    let (mut supervisor, _cancel) = connect(&source, RetryPolicy::forever(RETRY)).await;

    // Comments arrive while submissions is still in its retry loop
    let first = supervisor.next().await.unwrap();
    let second = supervisor.next().await.unwrap();
    assert_eq!(first.id, ItemId::comment("c1"));
    assert_eq!(second.id, ItemId::comment("c2"));
    assert!(start.elapsed() < RETRY);

    // The post only shows up once the fourth subscribe call succeeds
    let third = supervisor.next().await.unwrap();
    assert_eq!(third.id, ItemId::post("p1"));
    assert!(start.elapsed() >= RETRY * 2);

    let attempts = source.attempts(SubscriptionKind::Submissions);
    assert_eq!(attempts.len(), 4);
    assert!(attempts[2] - attempts[1] >= RETRY);
    assert!(attempts[3] - attempts[2] >= RETRY);
    assert_eq!(source.attempts(SubscriptionKind::Comments).len(), 1);
}

#[tokio::test(start_paused = true)]
async fn credential_failures_are_still_retried() {
    let source = MockSource::new()
        .script(
            SubscriptionKind::Submissions,
            vec![
                Script::Open(vec![SubscriptionEvent::Closed]),
                Script::FailCredentials,
                Script::FailCredentials,
                Script::Open(vec![item_event(post("p1", "back"))]),
            ],
        )
        .script(SubscriptionKind::Comments, vec![Script::Open(vec![])]);
    let (mut supervisor, _cancel) = connect(&source, RetryPolicy::forever(RETRY)).await;

    let item = supervisor.next().await.unwrap();

    assert_eq!(item.id, ItemId::post("p1"));
    assert_eq!(source.attempts(SubscriptionKind::Submissions).len(), 4);
}

#[tokio::test(start_paused = true)]
async fn cancellation_ends_the_sequence_during_backoff() {
    let source = MockSource::new()
        .script(
            SubscriptionKind::Submissions,
            vec![Script::Open(vec![SubscriptionEvent::Closed])],
        )
        .script(SubscriptionKind::Comments, vec![Script::Open(vec![])]);
    let (mut supervisor, cancel) = connect(&source, RetryPolicy::forever(RETRY)).await;

    let canceller = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(RETRY * 3 + Duration::from_secs(1)).await;
        canceller.cancel();
    });

    assert!(supervisor.next().await.is_none());
    // Initial subscribe plus one retry per elapsed interval, then nothing
    let attempts = source.attempts(SubscriptionKind::Submissions).len();
    assert!((3..=5).contains(&attempts), "attempts = {attempts}");
}

#[tokio::test(start_paused = true)]
async fn bounded_policy_ends_once_both_workers_give_up() {
    let source = MockSource::new()
        .script(
            SubscriptionKind::Submissions,
            vec![Script::Open(vec![SubscriptionEvent::Closed])],
        )
        .script(
            SubscriptionKind::Comments,
            vec![Script::Open(vec![
                item_event(comment("c1", "last words")),
                SubscriptionEvent::Closed,
            ])],
        );
    let policy = RetryPolicy::forever(RETRY).with_max_attempts(2);
    let (mut supervisor, _cancel) = connect(&source, policy).await;

    assert_eq!(supervisor.next().await.unwrap().id, ItemId::comment("c1"));
    assert!(supervisor.next().await.is_none());

    // Initial subscribe + two failed re-subscribes each
    assert_eq!(source.attempts(SubscriptionKind::Submissions).len(), 3);
    assert_eq!(source.attempts(SubscriptionKind::Comments).len(), 3);
}

#[tokio::test(start_paused = true)]
async fn initial_subscription_failure_is_fatal() {
    let source = MockSource::new()
        .script(SubscriptionKind::Submissions, vec![Script::Fail])
        .script(SubscriptionKind::Comments, vec![Script::Open(vec![])]);
    let deps = mock_deps(
        &source,
        &MockMetadata::new(),
        &MockBlacklist::new(),
        &RecordingBackend::new(),
        RETRY,
    );

    let result = StreamSupervisor::connect(&deps, &CancellationToken::new()).await;

    assert!(result.is_err());
    assert_eq!(source.attempts(SubscriptionKind::Submissions).len(), 1);
}
