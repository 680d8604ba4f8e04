use crate::lifecycle::{LogNotifier, LogStatus, Notifier, StatusIndicator};
use crate::model::{OrderId, Snapshot};
use crate::reconciler::{OrderReconciler, ReconcileResult};
use crate::render::CardRenderer;
use crate::source::{OrderActions, SnapshotSource, Subscription, TransportError};
use std::future::Future;
use std::time::{Duration, Instant};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, instrument, warn};

/// When new orders must *not* trigger the cue.
///
/// On start-up every existing order looks new; without a bootstrap window the
/// board would ring once per open order.
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationPolicy {
    /// Stay silent for the first reconciliation pass.
    pub suppress_first_pass: bool,
    /// Stay silent for this long after the board was built.
    pub grace_period: Duration,
}

impl Default for NotificationPolicy {
    fn default() -> Self {
        Self {
            suppress_first_pass: true,
            grace_period: Duration::ZERO,
        }
    }
}

/// Why a driving loop returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// The shutdown future completed.
    Shutdown,
    /// The push feed ended (stream closed, cancelled, or revoked).
    FeedEnded,
}

/// The driving context of a board: owns the reconciler and its side channels.
///
/// `OrderBoard` is responsible for:
/// - **Serialising passes**: one snapshot at a time, from a poll loop or a feed
/// - **Failure policy**: transport errors are reported and the board is left as is
/// - **Notification policy**: new orders ring the cue outside the bootstrap window
///
/// # Example
///
/// ```ignore
/// let source = RestSource::new(url, "orders", Duration::from_secs(10))?;
/// let mut board = OrderBoard::new(TerminalRenderer::stdout());
///
/// board
///     .run_polling(&source, Duration::from_secs(3), Duration::from_secs(10), shutdown)
///     .await;
/// ```
pub struct OrderBoard<R: CardRenderer> {
    reconciler: OrderReconciler<R>,
    notifier: Box<dyn Notifier>,
    status: Box<dyn StatusIndicator>,
    policy: NotificationPolicy,
    started_at: Instant,
}

impl<R: CardRenderer> OrderBoard<R> {
    /// Creates a board logging its cues and status.
    pub fn new(renderer: R) -> Self {
        Self {
            reconciler: OrderReconciler::new(renderer),
            notifier: Box::new(LogNotifier::new()),
            status: Box::new(LogStatus::new()),
            policy: NotificationPolicy::default(),
            started_at: Instant::now(),
        }
    }

    pub fn with_notifier(mut self, notifier: impl Notifier + 'static) -> Self {
        self.notifier = Box::new(notifier);
        self
    }

    pub fn with_status(mut self, status: impl StatusIndicator + 'static) -> Self {
        self.status = Box::new(status);
        self
    }

    pub fn with_policy(mut self, policy: NotificationPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn reconciler(&self) -> &OrderReconciler<R> {
        &self.reconciler
    }

    pub fn rendered_count(&self) -> usize {
        self.reconciler.rendered_count()
    }

    /// Whether a pass flagged `first_pass` falls inside the bootstrap window.
    pub fn in_bootstrap_window(&self, first_pass: bool) -> bool {
        (self.policy.suppress_first_pass && first_pass)
            || self.started_at.elapsed() < self.policy.grace_period
    }

    // =========================================================================
    // ONE PASS
    // =========================================================================

    /// Reconciles `snapshot` and fires the side channels.
    pub fn apply(&mut self, snapshot: &Snapshot) -> ReconcileResult {
        let result = self.reconciler.reconcile(snapshot);

        for error in &result.errors {
            self.status.malformed(error);
        }
        self.status.synced(self.reconciler.rendered_count());

        if !result.inserted.is_empty() {
            if self.in_bootstrap_window(result.first_pass) {
                debug!(count = result.inserted.len(), "New orders during bootstrap, cue suppressed");
            } else {
                let fresh: Vec<OrderId> = self
                    .reconciler
                    .rendered_ids()
                    .iter()
                    .filter(|id| result.inserted.contains(*id))
                    .cloned()
                    .collect();
                self.notifier.new_orders(&fresh);
            }
        }
        result
    }

    /// Applies a fetch outcome. A failed fetch skips the pass entirely.
    pub fn handle(&mut self, fetched: Result<Snapshot, TransportError>) -> Option<ReconcileResult> {
        match fetched {
            Ok(snapshot) => Some(self.apply(&snapshot)),
            Err(e) => {
                debug!(error = %e, "Pass skipped");
                self.status.transport_error(&e);
                None
            }
        }
    }

    /// Fetches once, bounded by `timeout`, and applies the result.
    pub async fn poll_once<S>(&mut self, source: &S, timeout: Duration) -> Option<ReconcileResult>
    where
        S: SnapshotSource + ?Sized,
    {
        let fetched = tokio::time::timeout(timeout, source.fetch_snapshot())
            .await
            .unwrap_or(Err(TransportError::Timeout));
        self.handle(fetched)
    }

    /// Asks the backend to mark `id` ready.
    ///
    /// The board itself does not change: the update comes back with the next
    /// snapshot.
    #[instrument(skip(self, actions))]
    pub async fn mark_ready<A>(&mut self, actions: &A, id: &OrderId) -> Result<(), TransportError>
    where
        A: OrderActions + ?Sized,
    {
        let outcome = actions.mark_ready(id).await;
        if let Err(e) = &outcome {
            warn!(order_id = %id, error = %e, "Mark ready failed");
            self.status.transport_error(e);
        }
        outcome
    }

    // =========================================================================
    // DRIVING LOOPS
    // =========================================================================

    /// Polls `source` every `interval` until `shutdown` completes.
    ///
    /// The first fetch happens immediately. A slow fetch delays the next tick
    /// instead of overlapping it; failed fetches are simply retried on the next
    /// tick.
    #[instrument(skip_all, fields(interval_ms = interval.as_millis() as u64))]
    pub async fn run_polling<S, F>(
        &mut self,
        source: &S,
        interval: Duration,
        fetch_timeout: Duration,
        shutdown: F,
    ) -> RunOutcome
    where
        S: SnapshotSource + ?Sized,
        F: Future<Output = ()>,
    {
        info!("Polling started");
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = ticker.tick() => {
                    self.poll_once(source, fetch_timeout).await;
                }
            }
        }

        info!(passes = self.reconciler.passes(), "Polling stopped");
        RunOutcome::Shutdown
    }

    /// Applies snapshots from `subscription` until it ends or `shutdown` completes.
    ///
    /// Snapshots that queue up while a pass runs are coalesced: only the latest
    /// one is reconciled.
    #[instrument(skip_all)]
    pub async fn run_feed<F>(&mut self, mut subscription: Subscription, shutdown: F) -> RunOutcome
    where
        F: Future<Output = ()>,
    {
        info!("Following order feed");
        tokio::pin!(shutdown);

        let outcome = loop {
            tokio::select! {
                _ = &mut shutdown => break RunOutcome::Shutdown,
                next = subscription.next_latest() => match next {
                    Some(fetched) => {
                        self.handle(fetched);
                    }
                    None => break RunOutcome::FeedEnded,
                },
            }
        };

        info!(passes = self.reconciler.passes(), ?outcome, "Feed stopped");
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::mock::RecordingRenderer;

    #[test]
    fn test_bootstrap_window() {
        let board = OrderBoard::new(RecordingRenderer::new());
        assert!(board.in_bootstrap_window(true));
        assert!(!board.in_bootstrap_window(false));

        let board = OrderBoard::new(RecordingRenderer::new()).with_policy(NotificationPolicy {
            suppress_first_pass: false,
            grace_period: Duration::from_secs(3600),
        });
        assert!(board.in_bootstrap_window(false));

        let board = OrderBoard::new(RecordingRenderer::new()).with_policy(NotificationPolicy {
            suppress_first_pass: false,
            grace_period: Duration::ZERO,
        });
        assert!(!board.in_bootstrap_window(true));
    }
}
