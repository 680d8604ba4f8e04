//! # Scripted Sources
//!
//! In-memory stand-ins for the backend, for tests and demos.
//!
//! | Type | Plays the role of |
//! |------|-------------------|
//! | [`ScriptedSource`] | [`SnapshotSource`] + [`OrderActions`] |
//! | [`ScriptedFeed`] | [`SnapshotFeed`] driven from the test through a sender |
//!
//! ```rust
//! use order_board::source::mock::ScriptedSource;
//! use order_board::source::{SnapshotSource, TransportError};
//! use order_board::model::Snapshot;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let source = ScriptedSource::new();
//! source.push_err(TransportError::Timeout);
//! source.push_ok(Snapshot::new());
//!
//! assert!(source.fetch_snapshot().await.is_err());
//! assert!(source.fetch_snapshot().await.unwrap().is_empty());
//! assert_eq!(source.fetch_count(), 2);
//! # }
//! ```

use crate::model::{OrderId, Snapshot};
use crate::source::{OrderActions, SnapshotFeed, SnapshotSource, Subscription, TransportError};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

#[derive(Debug, Default)]
struct Script {
    responses: VecDeque<Result<Snapshot, TransportError>>,
    /// Replayed once the script runs out.
    last_snapshot: Snapshot,
    fetches: usize,
    marked_ready: Vec<OrderId>,
    ready_failure: Option<TransportError>,
}

/// Pull source answering from a queue of scripted responses.
///
/// When the queue is empty it keeps returning the last scripted snapshot, the
/// way an idle backend keeps returning the same collection.
#[derive(Debug, Clone, Default)]
pub struct ScriptedSource {
    script: Arc<Mutex<Script>>,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_ok(&self, snapshot: Snapshot) {
        self.script.lock().unwrap().responses.push_back(Ok(snapshot));
    }

    pub fn push_err(&self, error: TransportError) {
        self.script.lock().unwrap().responses.push_back(Err(error));
    }

    /// Makes every following `mark_ready` fail with `error`.
    pub fn fail_mark_ready(&self, error: TransportError) {
        self.script.lock().unwrap().ready_failure = Some(error);
    }

    pub fn fetch_count(&self) -> usize {
        self.script.lock().unwrap().fetches
    }

    pub fn remaining(&self) -> usize {
        self.script.lock().unwrap().responses.len()
    }

    pub fn marked_ready(&self) -> Vec<OrderId> {
        self.script.lock().unwrap().marked_ready.clone()
    }
}

#[async_trait]
impl SnapshotSource for ScriptedSource {
    async fn fetch_snapshot(&self) -> Result<Snapshot, TransportError> {
        let mut script = self.script.lock().unwrap();
        script.fetches += 1;
        match script.responses.pop_front() {
            Some(Ok(snapshot)) => {
                script.last_snapshot = snapshot.clone();
                Ok(snapshot)
            }
            Some(Err(e)) => Err(e),
            None => Ok(script.last_snapshot.clone()),
        }
    }
}

#[async_trait]
impl OrderActions for ScriptedSource {
    async fn mark_ready(&self, id: &OrderId) -> Result<(), TransportError> {
        let mut script = self.script.lock().unwrap();
        if let Some(e) = script.ready_failure.clone() {
            return Err(e);
        }
        script.marked_ready.push(id.clone());
        Ok(())
    }
}

/// Push feed whose items are sent by the test.
///
/// `subscribe` hands out the receiving end once; later calls fail with
/// [`TransportError::Closed`].
pub struct ScriptedFeed {
    receiver: Mutex<Option<mpsc::Receiver<Result<Snapshot, TransportError>>>>,
}

impl ScriptedFeed {
    /// Returns the feed and the sender that drives it.
    pub fn new(buffer: usize) -> (Self, mpsc::Sender<Result<Snapshot, TransportError>>) {
        let (sender, receiver) = mpsc::channel(buffer);
        let feed = Self {
            receiver: Mutex::new(Some(receiver)),
        };
        (feed, sender)
    }
}

#[async_trait]
impl SnapshotFeed for ScriptedFeed {
    async fn subscribe(&self) -> Result<Subscription, TransportError> {
        let receiver = self.receiver.lock().unwrap().take();
        receiver
            .map(Subscription::from_receiver)
            .ok_or(TransportError::Closed)
    }
}
