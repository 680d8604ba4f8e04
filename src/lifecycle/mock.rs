//! Recording doubles for [`Notifier`] and [`StatusIndicator`].
//!
//! Both are `Clone` with shared state, like
//! [`RecordingRenderer`](crate::render::mock::RecordingRenderer).

use crate::lifecycle::{Notifier, StatusIndicator};
use crate::model::OrderId;
use crate::reconciler::MalformedOrderError;
use crate::source::TransportError;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier {
    cues: Arc<Mutex<Vec<Vec<OrderId>>>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// One entry per cue, each holding the ids it announced.
    pub fn cues(&self) -> Vec<Vec<OrderId>> {
        self.cues.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn new_orders(&mut self, ids: &[OrderId]) {
        self.cues.lock().unwrap().push(ids.to_vec());
    }
}

#[derive(Debug, Default)]
struct StatusLog {
    synced: Vec<usize>,
    transport_errors: Vec<TransportError>,
    malformed: Vec<MalformedOrderError>,
}

#[derive(Debug, Clone, Default)]
pub struct RecordingStatus {
    log: Arc<Mutex<StatusLog>>,
}

impl RecordingStatus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rendered counts reported after each successful pass.
    pub fn synced_counts(&self) -> Vec<usize> {
        self.log.lock().unwrap().synced.clone()
    }

    pub fn transport_errors(&self) -> Vec<TransportError> {
        self.log.lock().unwrap().transport_errors.clone()
    }

    pub fn malformed_orders(&self) -> Vec<MalformedOrderError> {
        self.log.lock().unwrap().malformed.clone()
    }
}

impl StatusIndicator for RecordingStatus {
    fn synced(&mut self, rendered: usize) {
        self.log.lock().unwrap().synced.push(rendered);
    }

    fn transport_error(&mut self, error: &TransportError) {
        self.log.lock().unwrap().transport_errors.push(error.clone());
    }

    fn malformed(&mut self, error: &MalformedOrderError) {
        self.log.lock().unwrap().malformed.push(error.clone());
    }
}
