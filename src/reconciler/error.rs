//! Error types for the reconciler.

use crate::model::OrderId;
use thiserror::Error;

/// A single snapshot entry that could not be turned into an [`Order`](crate::model::Order).
///
/// Non-fatal: the entry is skipped for the pass and the rest of the snapshot
/// is reconciled normally.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum MalformedOrderError {
    /// The record is not a JSON object.
    #[error("Order {id}: record is not an object")]
    NotAnObject { id: OrderId },

    /// A required field is missing or has the wrong type.
    #[error("Order {id}: {reason}")]
    Decode { id: OrderId, reason: String },

    /// The record decoded but a value is out of range.
    #[error("Order {id}: field `{field}` {problem}")]
    InvalidField {
        id: OrderId,
        field: &'static str,
        problem: String,
    },
}

impl MalformedOrderError {
    pub fn order_id(&self) -> &OrderId {
        match self {
            MalformedOrderError::NotAnObject { id }
            | MalformedOrderError::Decode { id, .. }
            | MalformedOrderError::InvalidField { id, .. } => id,
        }
    }
}
