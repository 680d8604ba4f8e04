//! Order records and snapshots as delivered by the realtime backend.

pub mod order;
pub mod snapshot;

pub use order::*;
pub use snapshot::*;
