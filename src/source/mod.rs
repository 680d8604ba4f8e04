//! Data-source collaborators: where snapshots come from and where actions go.
//!
//! # Main Components
//!
//! - [`SnapshotSource`] - pull mode, one `fetch_snapshot` per poll tick
//! - [`SnapshotFeed`] / [`Subscription`] - push mode, a stream of whole snapshots
//! - [`OrderActions`] - the "order ready" button
//! - [`RestSource`] - all three over a Firebase-style REST API
//! - [`stream`] - folding per-record events into whole snapshots
//!
//! # Testing
//!
//! See [`mock`] for scripted sources and feeds.

pub mod error;
pub mod mock;
pub mod rest;
pub mod stream;

pub use error::*;
pub use rest::*;

use crate::model::{OrderId, Snapshot};
use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;
use tokio::task::JoinHandle;
use tracing::debug;

/// Pull-mode source: returns the whole collection on demand.
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    async fn fetch_snapshot(&self) -> Result<Snapshot, TransportError>;
}

/// Push-mode source: delivers a new whole snapshot whenever the collection changes.
#[async_trait]
pub trait SnapshotFeed: Send + Sync {
    async fn subscribe(&self) -> Result<Subscription, TransportError>;
}

/// Actions the board can request on an order.
///
/// Success has no direct effect on the display: the change comes back through
/// the next snapshot.
#[async_trait]
pub trait OrderActions: Send + Sync {
    async fn mark_ready(&self, id: &OrderId) -> Result<(), TransportError>;
}

/// A live push subscription.
///
/// Dropping it unsubscribes: the background reader task, if any, is aborted.
pub struct Subscription {
    receiver: mpsc::Receiver<Result<Snapshot, TransportError>>,
    reader: Option<JoinHandle<()>>,
}

impl Subscription {
    /// Wraps a channel fed by `reader`.
    pub fn new(
        receiver: mpsc::Receiver<Result<Snapshot, TransportError>>,
        reader: JoinHandle<()>,
    ) -> Self {
        Self {
            receiver,
            reader: Some(reader),
        }
    }

    /// Wraps a channel fed by someone else.
    pub fn from_receiver(receiver: mpsc::Receiver<Result<Snapshot, TransportError>>) -> Self {
        Self {
            receiver,
            reader: None,
        }
    }

    /// Next delivered item, `None` once the feed has ended.
    pub async fn next(&mut self) -> Option<Result<Snapshot, TransportError>> {
        self.receiver.recv().await
    }

    /// Waits for the next item, then drains everything already queued behind it.
    ///
    /// Returns the most recent snapshot among the drained items, or the most
    /// recent error when none of them was a snapshot. Intermediate snapshots are
    /// superseded and dropped.
    pub async fn next_latest(&mut self) -> Option<Result<Snapshot, TransportError>> {
        let first = self.receiver.recv().await?;
        let mut latest_snapshot = None;
        let mut latest_error = None;
        let mut drained = 1usize;

        let mut keep = |item: Result<Snapshot, TransportError>| match item {
            Ok(snapshot) => latest_snapshot = Some(snapshot),
            Err(e) => latest_error = Some(e),
        };
        keep(first);
        loop {
            match self.receiver.try_recv() {
                Ok(item) => {
                    drained += 1;
                    keep(item);
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        if drained > 1 {
            debug!(drained, "Coalesced queued snapshots");
        }

        match (latest_snapshot, latest_error) {
            (Some(snapshot), _) => Some(Ok(snapshot)),
            (None, Some(e)) => Some(Err(e)),
            (None, None) => None,
        }
    }

    /// Ends the subscription and aborts its reader task.
    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(reader) = self.reader.take() {
            reader.abort();
        }
    }
}
