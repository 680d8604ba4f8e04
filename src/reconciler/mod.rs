//! # Order Reconciler
//!
//! Keeps a rendered list of order cards in sync with successive [`Snapshot`]s.
//!
//! Each call to [`OrderReconciler::reconcile`] is one *reconciliation pass*:
//!
//! 1. An empty snapshot clears every card in bulk and shows the empty state.
//! 2. Records are decoded; malformed ones are reported and skipped.
//! 3. Valid orders are sorted by timestamp, most recent first (stable for ties).
//! 4. Cards whose id left the snapshot are removed first.
//! 5. New ids are inserted right after the previously processed id, changed
//!    orders are replaced in place (never moved), equal orders are left alone.
//!
//! The reconciler never talks to the backend and never fails: everything it
//! needs arrives in the snapshot, everything it decides leaves through the
//! [`CardRenderer`] and the returned [`ReconcileResult`].

pub mod error;

pub use error::*;

use crate::model::{Order, OrderId, Snapshot};
use crate::render::CardRenderer;
use std::collections::{BTreeSet, HashMap};
use tracing::{debug, info, warn};

/// Outcome of one reconciliation pass.
///
/// `inserted`, `updated` and `removed` are pairwise disjoint. Every valid id of
/// the snapshot is either in `inserted`, in `updated`, or unchanged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReconcileResult {
    pub inserted: BTreeSet<OrderId>,
    pub updated: BTreeSet<OrderId>,
    pub removed: BTreeSet<OrderId>,
    /// Cards dropped by the bulk clear of an empty snapshot.
    pub cleared: BTreeSet<OrderId>,
    pub errors: Vec<MalformedOrderError>,
    /// True for the first pass since the reconciler was constructed.
    pub first_pass: bool,
}

impl ReconcileResult {
    /// True when the pass changed nothing on screen.
    pub fn is_noop(&self) -> bool {
        self.inserted.is_empty()
            && self.updated.is_empty()
            && self.removed.is_empty()
            && self.cleared.is_empty()
    }

    pub fn bulk_cleared(&self) -> bool {
        !self.cleared.is_empty()
    }
}

/// Owner of the rendered order set.
///
/// Not `Sync`-shared: one driving context owns it and calls
/// [`reconcile`](Self::reconcile) serially.
pub struct OrderReconciler<R: CardRenderer> {
    renderer: R,
    /// Last successfully rendered value of each displayed order.
    previous: HashMap<OrderId, Order>,
    /// Display order of the cards, head first.
    rendered: Vec<OrderId>,
    passes: u64,
    /// `None` until the first pass decides.
    empty_state: Option<bool>,
}

impl<R: CardRenderer> OrderReconciler<R> {
    pub fn new(renderer: R) -> Self {
        Self {
            renderer,
            previous: HashMap::new(),
            rendered: Vec::new(),
            passes: 0,
            empty_state: None,
        }
    }

    /// True until the first pass has run.
    pub fn is_first_pass(&self) -> bool {
        self.passes == 0
    }

    pub fn passes(&self) -> u64 {
        self.passes
    }

    /// Ids of the rendered cards in display order.
    pub fn rendered_ids(&self) -> &[OrderId] {
        &self.rendered
    }

    pub fn rendered_count(&self) -> usize {
        self.rendered.len()
    }

    /// The order value currently drawn for `id`.
    pub fn order(&self, id: &OrderId) -> Option<&Order> {
        self.previous.get(id)
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }

    pub fn into_renderer(self) -> R {
        self.renderer
    }

    /// Brings the rendered cards in line with `snapshot`.
    pub fn reconcile(&mut self, snapshot: &Snapshot) -> ReconcileResult {
        let mut result = ReconcileResult {
            first_pass: self.is_first_pass(),
            ..Default::default()
        };
        self.passes += 1;

        if snapshot.is_empty() {
            self.clear_all(&mut result);
            self.renderer.commit();
            return result;
        }

        // =====================================================================
        // 1. Decode and sort
        // =====================================================================

        let mut valid: Vec<(OrderId, Order)> = Vec::with_capacity(snapshot.len());
        for (id, record) in snapshot.iter() {
            match Order::from_record(id, record) {
                Ok(order) => valid.push((id.clone(), order)),
                Err(e) => {
                    warn!(order_id = %id, error = %e, "Skipping malformed order");
                    result.errors.push(e);
                }
            }
        }
        // `sort_by` is stable: equal timestamps keep snapshot order.
        valid.sort_by(|(_, a), (_, b)| b.timestamp.cmp(&a.timestamp));

        // =====================================================================
        // 2. Removals first, so insert anchors never point at a dying card
        // =====================================================================

        let removed: Vec<OrderId> = self
            .rendered
            .iter()
            .filter(|id| !snapshot.contains(id))
            .cloned()
            .collect();
        for id in &removed {
            debug!(order_id = %id, "Remove");
            self.renderer.remove_card(id);
            self.previous.remove(id);
        }
        self.rendered.retain(|id| snapshot.contains(id));
        result.removed.extend(removed);

        if !valid.is_empty() || !self.rendered.is_empty() {
            self.set_empty_state(false);
        }

        // =====================================================================
        // 3. Inserts and in-place updates, in display order
        // =====================================================================

        let mut anchor: Option<OrderId> = None;
        for (id, order) in valid {
            match self.previous.get(&id) {
                None => {
                    debug!(order_id = %id, after = ?anchor, "Insert");
                    self.renderer.insert_card_at(&id, &order, anchor.as_ref());
                    let slot = anchor
                        .as_ref()
                        .and_then(|a| self.rendered.iter().position(|r| r == a))
                        .map_or(0, |p| p + 1);
                    self.rendered.insert(slot, id.clone());
                    result.inserted.insert(id.clone());
                }
                Some(drawn) if *drawn == order => {}
                Some(_) => {
                    debug!(order_id = %id, "Replace");
                    self.renderer.replace_card(&id, &order);
                    result.updated.insert(id.clone());
                }
            }
            self.previous.insert(id.clone(), order);
            anchor = Some(id);
        }

        if self.rendered.is_empty() {
            self.set_empty_state(true);
        }
        self.renderer.commit();

        if !result.is_noop() || !result.errors.is_empty() {
            info!(
                inserted = result.inserted.len(),
                updated = result.updated.len(),
                removed = result.removed.len(),
                malformed = result.errors.len(),
                rendered = self.rendered.len(),
                "Reconciled"
            );
        }
        result
    }

    fn clear_all(&mut self, result: &mut ReconcileResult) {
        let cleared = std::mem::take(&mut self.rendered);
        if !cleared.is_empty() {
            info!(cleared = cleared.len(), "Snapshot empty, clearing board");
            self.renderer.clear_cards(&cleared);
        }
        self.previous.clear();
        self.set_empty_state(true);
        result.cleared.extend(cleared);
    }

    fn set_empty_state(&mut self, empty: bool) {
        if self.empty_state == Some(empty) {
            return;
        }
        if empty {
            self.renderer.show_empty_state();
        } else {
            self.renderer.hide_empty_state();
        }
        self.empty_state = Some(empty);
    }
}
