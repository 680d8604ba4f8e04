//! # Observability & Tracing
//!
//! Structured logging for the board, built on `tracing`.
//!
//! ## Configuration
//!
//! Compact format without the module prefix (`with_target(false)`); verbosity
//! comes from `RUST_LOG`, defaulting to `info`.
//!
//! ```bash
//! # Status transitions, reconciled passes, new orders
//! RUST_LOG=info order-board --url https://my-db.firebaseio.com
//!
//! # Every insert / replace / remove decision
//! RUST_LOG=order_board::reconciler=debug order-board --url ...
//! ```
//!
//! ## What Gets Traced
//!
//! - **Passes**: `Reconciled inserted=1 updated=0 removed=0 malformed=0 rendered=4`
//! - **Decisions** (debug): `Insert order_id="-Nx" after=Some(..)`, `Replace`, `Remove`
//! - **Source**: fetch spans with the collection name, stream subscribe / end
//! - **Status**: `Connected`, `Connection lost, keeping last board`, `Connection restored`
//! - **Errors**: malformed orders with their id and reason
//!
//! The terminal renderer draws on stdout, so logs go to stderr.
use tracing_subscriber::EnvFilter;

pub fn setup_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}
