//! Side channels of the board: the new-order cue and the connection status.

use crate::model::OrderId;
use crate::reconciler::MalformedOrderError;
use crate::source::TransportError;
use std::io::Write;
use tracing::{info, warn};

/// Plays the "new order" cue (sound, vibration, bell...).
pub trait Notifier: Send {
    /// `ids` are the newly inserted orders, in display order.
    fn new_orders(&mut self, ids: &[OrderId]);
}

/// Error surface of the board (status light, banner...).
pub trait StatusIndicator: Send {
    /// A snapshot was reconciled; `rendered` cards are on screen.
    fn synced(&mut self, rendered: usize);

    fn transport_error(&mut self, error: &TransportError);

    fn malformed(&mut self, error: &MalformedOrderError);
}

/// Logs new orders and optionally rings the terminal bell.
#[derive(Debug, Default)]
pub struct LogNotifier {
    bell: bool,
}

impl LogNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bell(mut self, bell: bool) -> Self {
        self.bell = bell;
        self
    }
}

impl Notifier for LogNotifier {
    fn new_orders(&mut self, ids: &[OrderId]) {
        info!(count = ids.len(), ids = ?ids, "New orders");
        if self.bell {
            let mut out = std::io::stdout();
            let _ = out.write_all(b"\x07").and_then(|_| out.flush());
        }
    }
}

/// Logs status transitions rather than every poll.
#[derive(Debug, Default)]
pub struct LogStatus {
    healthy: Option<bool>,
}

impl LogStatus {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StatusIndicator for LogStatus {
    fn synced(&mut self, rendered: usize) {
        match self.healthy {
            Some(true) => {}
            Some(false) => info!(rendered, "Connection restored"),
            None => info!(rendered, "Connected"),
        }
        self.healthy = Some(true);
    }

    fn transport_error(&mut self, error: &TransportError) {
        if self.healthy != Some(false) {
            warn!(error = %error, "Connection lost, keeping last board");
        }
        self.healthy = Some(false);
    }

    fn malformed(&mut self, error: &MalformedOrderError) {
        warn!(order_id = %error.order_id(), error = %error, "Malformed order");
    }
}
