//! # Recording Renderer
//!
//! A [`CardRenderer`] that draws nothing and remembers everything.
//!
//! The recorder is `Clone` and shares its state: hand one clone to the
//! reconciler (or a spawned board) and keep another in the test to inspect.
//!
//! ```rust
//! use order_board::render::mock::{RecordingRenderer, RenderCall};
//! use order_board::reconciler::OrderReconciler;
//! use order_board::model::Snapshot;
//!
//! let recorder = RecordingRenderer::new();
//! let mut reconciler = OrderReconciler::new(recorder.clone());
//!
//! reconciler.reconcile(&Snapshot::new());
//! assert!(recorder.empty_state_shown());
//! assert!(recorder.calls().contains(&RenderCall::ShowEmpty));
//! ```

use crate::model::{Order, OrderId};
use crate::render::CardRenderer;
use std::sync::{Arc, Mutex};

/// One recorded renderer call.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderCall {
    Insert { id: OrderId, after: Option<OrderId> },
    Replace { id: OrderId },
    Remove { id: OrderId },
    Clear { ids: Vec<OrderId> },
    ShowEmpty,
    HideEmpty,
    Commit,
}

#[derive(Debug, Default)]
struct Recorded {
    calls: Vec<RenderCall>,
    /// Card ids in display order, maintained from the calls.
    cards: Vec<OrderId>,
    /// Last order drawn per card.
    drawn: Vec<(OrderId, Order)>,
    empty_shown: bool,
}

#[derive(Debug, Clone, Default)]
pub struct RecordingRenderer {
    state: Arc<Mutex<Recorded>>,
}

impl RecordingRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call since construction or the last [`take_calls`](Self::take_calls).
    pub fn calls(&self) -> Vec<RenderCall> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Returns and forgets the recorded calls; the card list is kept.
    pub fn take_calls(&self) -> Vec<RenderCall> {
        std::mem::take(&mut self.state.lock().unwrap().calls)
    }

    /// Card ids as they would appear on screen, head first.
    pub fn cards(&self) -> Vec<OrderId> {
        self.state.lock().unwrap().cards.clone()
    }

    /// The order value last drawn for `id`.
    pub fn drawn(&self, id: &OrderId) -> Option<Order> {
        let state = self.state.lock().unwrap();
        state
            .drawn
            .iter()
            .find(|(drawn_id, _)| drawn_id == id)
            .map(|(_, order)| order.clone())
    }

    pub fn empty_state_shown(&self) -> bool {
        self.state.lock().unwrap().empty_shown
    }

    pub fn replaced(&self) -> Vec<OrderId> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                RenderCall::Replace { id } => Some(id),
                _ => None,
            })
            .collect()
    }

    pub fn removed(&self) -> Vec<OrderId> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                RenderCall::Remove { id } => Some(id),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: RenderCall) {
        self.state.lock().unwrap().calls.push(call);
    }

    fn draw(&self, id: &OrderId, order: &Order) {
        let mut state = self.state.lock().unwrap();
        state.drawn.retain(|(drawn_id, _)| drawn_id != id);
        state.drawn.push((id.clone(), order.clone()));
    }

    fn forget(&self, id: &OrderId) {
        let mut state = self.state.lock().unwrap();
        state.cards.retain(|card| card != id);
        state.drawn.retain(|(drawn_id, _)| drawn_id != id);
    }
}

impl CardRenderer for RecordingRenderer {
    fn insert_card_at(&mut self, id: &OrderId, order: &Order, after: Option<&OrderId>) {
        self.record(RenderCall::Insert {
            id: id.clone(),
            after: after.cloned(),
        });
        {
            let mut state = self.state.lock().unwrap();
            let slot = after
                .and_then(|a| state.cards.iter().position(|card| card == a))
                .map_or(0, |p| p + 1);
            state.cards.insert(slot, id.clone());
        }
        self.draw(id, order);
    }

    fn replace_card(&mut self, id: &OrderId, order: &Order) {
        self.record(RenderCall::Replace { id: id.clone() });
        self.draw(id, order);
    }

    fn remove_card(&mut self, id: &OrderId) {
        self.record(RenderCall::Remove { id: id.clone() });
        self.forget(id);
    }

    fn show_empty_state(&mut self) {
        self.record(RenderCall::ShowEmpty);
        self.state.lock().unwrap().empty_shown = true;
    }

    fn hide_empty_state(&mut self) {
        self.record(RenderCall::HideEmpty);
        self.state.lock().unwrap().empty_shown = false;
    }

    fn clear_cards(&mut self, ids: &[OrderId]) {
        self.record(RenderCall::Clear { ids: ids.to_vec() });
        for id in ids {
            self.forget(id);
        }
    }

    fn commit(&mut self) {
        self.record(RenderCall::Commit);
    }
}
