//! Rendering primitives driven by the [`OrderReconciler`](crate::reconciler::OrderReconciler).
//!
//! The reconciler decides *what* changes; a [`CardRenderer`] decides *how* a
//! card is drawn. Two implementations ship with the crate:
//!
//! - [`TerminalRenderer`] - draws the board as text on any `Write`.
//! - [`mock::RecordingRenderer`] - records every call for tests.

pub mod mock;
pub mod terminal;

pub use terminal::*;

use crate::model::{Order, OrderId};

/// Presentation collaborator of the reconciler.
///
/// Calls are infallible from the reconciler's point of view: a renderer that
/// can fail (I/O) logs and carries on, the rendered model stays authoritative.
pub trait CardRenderer {
    /// Inserts a card directly after `after`, or at the head when `None`.
    fn insert_card_at(&mut self, id: &OrderId, order: &Order, after: Option<&OrderId>);

    /// Redraws an existing card in place.
    fn replace_card(&mut self, id: &OrderId, order: &Order);

    fn remove_card(&mut self, id: &OrderId);

    fn show_empty_state(&mut self);

    fn hide_empty_state(&mut self);

    /// Removes every listed card in one go.
    fn clear_cards(&mut self, ids: &[OrderId]) {
        for id in ids {
            self.remove_card(id);
        }
    }

    /// Called once at the end of every reconciliation pass.
    fn commit(&mut self) {}
}

impl<R: CardRenderer + ?Sized> CardRenderer for Box<R> {
    fn insert_card_at(&mut self, id: &OrderId, order: &Order, after: Option<&OrderId>) {
        (**self).insert_card_at(id, order, after)
    }

    fn replace_card(&mut self, id: &OrderId, order: &Order) {
        (**self).replace_card(id, order)
    }

    fn remove_card(&mut self, id: &OrderId) {
        (**self).remove_card(id)
    }

    fn show_empty_state(&mut self) {
        (**self).show_empty_state()
    }

    fn hide_empty_state(&mut self) {
        (**self).hide_empty_state()
    }

    fn clear_cards(&mut self, ids: &[OrderId]) {
        (**self).clear_cards(ids)
    }

    fn commit(&mut self) {
        (**self).commit()
    }
}
