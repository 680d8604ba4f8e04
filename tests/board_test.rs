use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use order_board::lifecycle::mock::{RecordingNotifier, RecordingStatus};
use order_board::lifecycle::{NotificationPolicy, OrderBoard, RunOutcome};
use order_board::model::{LineItem, Order, OrderId, Snapshot};
use order_board::render::mock::{RecordingRenderer, RenderCall};
use order_board::source::mock::{ScriptedFeed, ScriptedSource};
use order_board::source::{SnapshotFeed, SnapshotSource, TransportError};
use serde_json::json;
use std::time::Duration;
use tokio::sync::oneshot;

fn order_at(minute: u32) -> Order {
    Order::new(
        Utc.with_ymd_and_hms(2024, 3, 1, 18, minute, 0).unwrap(),
        vec![LineItem::new("Bo Bun", 2, 19.8)],
        19.8,
    )
}

fn snapshot(ids: &[(&str, u32)]) -> Snapshot {
    let mut snapshot = Snapshot::new();
    for (id, minute) in ids {
        snapshot.insert_order(*id, &order_at(*minute));
    }
    snapshot
}

fn ids(raw: &[&str]) -> Vec<OrderId> {
    raw.iter().map(|id| OrderId::from(*id)).collect()
}

struct Harness {
    board: OrderBoard<RecordingRenderer>,
    renderer: RecordingRenderer,
    notifier: RecordingNotifier,
    status: RecordingStatus,
}

fn harness(policy: NotificationPolicy) -> Harness {
    let renderer = RecordingRenderer::new();
    let notifier = RecordingNotifier::new();
    let status = RecordingStatus::new();
    let board = OrderBoard::new(renderer.clone())
        .with_notifier(notifier.clone())
        .with_status(status.clone())
        .with_policy(policy);
    Harness {
        board,
        renderer,
        notifier,
        status,
    }
}

/// Source that never answers within a reasonable time.
struct StalledSource;

#[async_trait]
impl SnapshotSource for StalledSource {
    async fn fetch_snapshot(&self) -> Result<Snapshot, TransportError> {
        tokio::time::sleep(Duration::from_secs(60)).await;
        Ok(Snapshot::new())
    }
}

/// Existing orders on start-up stay quiet; later arrivals ring once.
#[test]
fn test_first_pass_is_silent_then_new_orders_ring() {
    let mut h = harness(NotificationPolicy::default());

    h.board.apply(&snapshot(&[("a", 1), ("b", 2)]));
    assert!(h.notifier.cues().is_empty(), "first pass must not ring");

    h.board.apply(&snapshot(&[("a", 1), ("b", 2), ("c", 3), ("d", 4)]));
    assert_eq!(h.notifier.cues(), vec![ids(&["d", "c"])]);

    h.board.apply(&snapshot(&[("a", 1), ("b", 2), ("c", 3), ("d", 4)]));
    assert_eq!(h.notifier.cues().len(), 1, "unchanged snapshot must not ring again");
}

/// Removals and updates never ring.
#[test]
fn test_only_insertions_ring() {
    let mut h = harness(NotificationPolicy::default());
    h.board.apply(&snapshot(&[("a", 1), ("b", 2)]));

    let mut s = snapshot(&[("a", 1)]);
    let mut changed = order_at(1);
    changed.total = 25.0;
    s.insert_order("a", &changed);
    h.board.apply(&s);

    assert!(h.notifier.cues().is_empty());
}

/// The grace period silences passes after the first one too.
#[test]
fn test_grace_period_silences_cue() {
    let mut h = harness(NotificationPolicy {
        suppress_first_pass: false,
        grace_period: Duration::from_secs(3600),
    });

    h.board.apply(&snapshot(&[("a", 1)]));
    h.board.apply(&snapshot(&[("a", 1), ("b", 2)]));

    assert!(h.notifier.cues().is_empty());
    assert_eq!(h.board.rendered_count(), 2);
}

/// Without any bootstrap window even the first pass rings.
#[test]
fn test_no_bootstrap_window_rings_first_pass() {
    let mut h = harness(NotificationPolicy {
        suppress_first_pass: false,
        grace_period: Duration::ZERO,
    });

    h.board.apply(&snapshot(&[("a", 1)]));

    assert_eq!(h.notifier.cues(), vec![ids(&["a"])]);
}

/// A failed fetch reports the error and leaves every card untouched.
#[tokio::test]
async fn test_transport_error_keeps_board() {
    let mut h = harness(NotificationPolicy::default());
    let source = ScriptedSource::new();
    source.push_ok(snapshot(&[("a", 1), ("b", 2)]));
    source.push_err(TransportError::Status {
        status: 503,
        body: "unavailable".to_string(),
    });

    assert!(h.board.poll_once(&source, Duration::from_secs(1)).await.is_some());
    h.renderer.take_calls();

    let skipped = h.board.poll_once(&source, Duration::from_secs(1)).await;

    assert!(skipped.is_none());
    assert!(h.renderer.calls().is_empty(), "no render call on a failed fetch");
    assert_eq!(h.renderer.cards(), ids(&["b", "a"]));
    assert_eq!(h.status.transport_errors().len(), 1);
    assert_eq!(h.status.synced_counts(), vec![2]);
    assert_eq!(h.board.reconciler().passes(), 1);
}

/// A fetch that outlives its timeout counts as a timeout error.
#[tokio::test]
async fn test_poll_once_times_out() {
    let mut h = harness(NotificationPolicy::default());

    let result = h.board.poll_once(&StalledSource, Duration::from_millis(50)).await;

    assert!(result.is_none());
    assert_eq!(h.status.transport_errors(), vec![TransportError::Timeout]);
    assert_eq!(h.board.reconciler().passes(), 0);
}

/// Malformed entries reach the status indicator; the rest is synced.
#[test]
fn test_malformed_entries_are_reported() {
    let mut h = harness(NotificationPolicy::default());
    let mut s = snapshot(&[("a", 1)]);
    s.insert("bad", json!({ "status": "pending" }));

    let result = h.board.apply(&s);

    assert_eq!(result.errors.len(), 1);
    assert_eq!(h.status.malformed_orders().len(), 1);
    assert_eq!(h.status.malformed_orders()[0].order_id().as_str(), "bad");
    assert_eq!(h.status.synced_counts(), vec![1]);
}

/// The poll loop fetches immediately, keeps going on errors, and stops on shutdown.
#[tokio::test]
async fn test_run_polling_until_shutdown() {
    let mut h = harness(NotificationPolicy::default());
    let source = ScriptedSource::new();
    source.push_ok(snapshot(&[("a", 1)]));
    source.push_err(TransportError::Timeout);
    source.push_ok(snapshot(&[("a", 1), ("b", 2)]));

    let (stop, stopped) = oneshot::channel::<()>();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(350)).await;
        let _ = stop.send(());
    });

    let outcome = h
        .board
        .run_polling(&source, Duration::from_millis(100), Duration::from_millis(50), async {
            let _ = stopped.await;
        })
        .await;

    assert_eq!(outcome, RunOutcome::Shutdown);
    assert!(source.fetch_count() >= 3, "fetched {} times", source.fetch_count());
    assert_eq!(source.remaining(), 0);
    assert_eq!(h.renderer.cards(), ids(&["b", "a"]));
    assert_eq!(h.status.transport_errors(), vec![TransportError::Timeout]);
    assert_eq!(h.notifier.cues(), vec![ids(&["b"])]);
}

/// Snapshots queued during a pass collapse into the latest one.
#[tokio::test]
async fn test_run_feed_coalesces_and_ends() {
    let mut h = harness(NotificationPolicy::default());
    let (feed, sender) = ScriptedFeed::new(8);
    let subscription = feed.subscribe().await.expect("first subscribe succeeds");
    assert_eq!(feed.subscribe().await.err(), Some(TransportError::Closed));

    sender.send(Ok(snapshot(&[("a", 1)]))).await.unwrap();
    sender.send(Ok(snapshot(&[("a", 1), ("b", 2)]))).await.unwrap();
    sender.send(Ok(snapshot(&[("b", 2), ("c", 3)]))).await.unwrap();
    drop(sender);

    let outcome = h.board.run_feed(subscription, std::future::pending()).await;

    assert_eq!(outcome, RunOutcome::FeedEnded);
    assert_eq!(h.board.reconciler().passes(), 1);
    assert_eq!(h.renderer.cards(), ids(&["c", "b"]));
    assert!(h.renderer.removed().is_empty(), "intermediate snapshots must be skipped");
}

/// Feed errors are reported and later snapshots still apply.
#[tokio::test]
async fn test_run_feed_reports_errors() {
    let mut h = harness(NotificationPolicy::default());
    let (feed, sender) = ScriptedFeed::new(8);
    let subscription = feed.subscribe().await.unwrap();

    let driver = tokio::spawn(async move {
        sender.send(Ok(snapshot(&[("a", 1)]))).await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        sender
            .send(Err(TransportError::Decode("bad event".to_string())))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        sender.send(Ok(snapshot(&[("a", 1), ("b", 2)]))).await.unwrap();
    });

    let outcome = h.board.run_feed(subscription, std::future::pending()).await;
    driver.await.unwrap();

    assert_eq!(outcome, RunOutcome::FeedEnded);
    assert_eq!(
        h.status.transport_errors(),
        vec![TransportError::Decode("bad event".to_string())]
    );
    assert_eq!(h.renderer.cards(), ids(&["b", "a"]));
    assert_eq!(h.notifier.cues(), vec![ids(&["b"])]);
}

/// Shutdown wins over a feed that stays open.
#[tokio::test]
async fn test_run_feed_shutdown() {
    let mut h = harness(NotificationPolicy::default());
    let (feed, _sender) = ScriptedFeed::new(1);
    let subscription = feed.subscribe().await.unwrap();

    let outcome = h.board.run_feed(subscription, async {}).await;

    assert_eq!(outcome, RunOutcome::Shutdown);
    assert_eq!(h.board.reconciler().passes(), 0);
}

/// Marking an order ready goes to the backend and leaves the board alone.
#[tokio::test]
async fn test_mark_ready() {
    let mut h = harness(NotificationPolicy::default());
    let source = ScriptedSource::new();
    h.board.apply(&snapshot(&[("a", 1)]));
    h.renderer.take_calls();

    h.board.mark_ready(&source, &"a".into()).await.expect("mark ready");
    assert_eq!(source.marked_ready(), ids(&["a"]));
    assert!(h.renderer.calls().is_empty());

    source.fail_mark_ready(TransportError::AuthRevoked);
    let failed = h.board.mark_ready(&source, &"a".into()).await;
    assert_eq!(failed, Err(TransportError::AuthRevoked));
    assert_eq!(h.status.transport_errors(), vec![TransportError::AuthRevoked]);
    assert_eq!(h.renderer.calls(), Vec::<RenderCall>::new());
}
