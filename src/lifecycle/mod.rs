//! # Board Lifecycle
//!
//! Everything around the reconciler that runs over time:
//!
//! - [`OrderBoard`] - owns the reconciler and drives it from a poll loop or a push feed
//! - [`NotificationPolicy`] - the bootstrap window that keeps start-up quiet
//! - [`Notifier`] / [`StatusIndicator`] - the cue and the error surface
//! - [`setup_tracing`] - logging initialisation for the binary
//!
//! ## Serial passes
//!
//! The reconciler is never called concurrently with itself. Both loops await a
//! whole pass before looking at the next snapshot: the poll loop delays late
//! ticks, the feed loop coalesces queued snapshots into the latest one.

pub mod board;
pub mod mock;
pub mod signals;
pub mod tracing;

pub use board::*;
pub use signals::*;
pub use self::tracing::setup_tracing;
