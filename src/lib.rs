//! # Order Board
//!
//! > **A live order display for a food-service counter.**
//!
//! The board keeps a list of order cards in sync with an `orders` collection in
//! a realtime database, most recent first, and rings a cue when orders arrive.
//!
//! ## 🏗️ Design Philosophy
//!
//! ### One reconciliation algorithm, whatever the transport
//!
//! Whether orders are polled every few seconds or pushed as stream events,
//! the board only ever reconciles **whole snapshots**. Event-based sources fold
//! their events into a snapshot first (see [`source::stream`]).
//!
//! ### Minimal motion
//!
//! Kitchen staff read the board from a distance. A card that did not change is
//! never touched; a card that changed is redrawn in place; only new cards are
//! placed, according to their timestamp.
//!
//! ### Injected collaborators
//!
//! The reconciler owns no I/O. Drawing, fetching, notifying and status
//! reporting sit behind small traits, so the core is tested with recording
//! doubles and no network or terminal.
//!
//! ## 🗺️ Module Tour
//!
//! ### 1. The Core ([`reconciler`])
//! - **Role**: Diff the previous rendered set against a new snapshot and apply
//!   inserts, in-place replacements and removals.
//! - **Key items**: [`OrderReconciler`](reconciler::OrderReconciler),
//!   [`ReconcileResult`](reconciler::ReconcileResult).
//!
//! ### 2. The Data ([`model`])
//! - **Role**: Wire records, validated orders, ordered snapshots.
//! - **Key items**: [`Order`](model::Order), [`Snapshot`](model::Snapshot).
//!
//! ### 3. The Edges ([`render`], [`source`])
//! - **Role**: Rendering primitives and data-source traits, with a terminal
//!   renderer and a Firebase-style REST client.
//! - **Key items**: [`CardRenderer`](render::CardRenderer),
//!   [`SnapshotSource`](source::SnapshotSource), [`RestSource`](source::RestSource).
//!
//! ### 4. The Driver ([`lifecycle`])
//! - **Role**: Poll or follow a feed, one pass at a time; decide when to ring.
//! - **Key items**: [`OrderBoard`](lifecycle::OrderBoard),
//!   [`NotificationPolicy`](lifecycle::NotificationPolicy).
//!
//! ## 🚀 Quick Start
//!
//! ```bash
//! RUST_LOG=info cargo run -- --url https://my-db.firebaseio.com
//! ```
//!
//! ### Running Tests
//!
//! ```bash
//! cargo test
//! ```

pub mod config;
pub mod lifecycle;
pub mod model;
pub mod reconciler;
pub mod render;
pub mod source;
