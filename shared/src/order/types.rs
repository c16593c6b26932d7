//! Shared types for the order lifecycle

use serde::{Deserialize, Serialize};
use validator::Validate;

// ============================================================================
// Order Status
// ============================================================================

/// Order status
///
/// Closed state machine:
///
/// ```text
/// IN_PREPARATION ──► READY      (pickup time required)
///        │
///        └─────────► CANCELLED
/// ```
///
/// `READY` and `CANCELLED` are terminal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    #[default]
    InPreparation,
    Ready,
    Cancelled,
}

impl OrderStatus {
    /// Terminal statuses admit no further transition
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Ready | OrderStatus::Cancelled)
    }

    /// Whether `self -> target` is a legal transition
    ///
    /// Self-transitions are illegal, as is any move out of a terminal
    /// state.
    pub fn can_transition_to(&self, target: OrderStatus) -> bool {
        matches!(
            (self, target),
            (OrderStatus::InPreparation, OrderStatus::Ready)
                | (OrderStatus::InPreparation, OrderStatus::Cancelled)
        )
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderStatus::InPreparation => write!(f, "IN_PREPARATION"),
            OrderStatus::Ready => write!(f, "READY"),
            OrderStatus::Cancelled => write!(f, "CANCELLED"),
        }
    }
}

// ============================================================================
// Cart Input
// ============================================================================

/// One cart line as submitted by the shopper
///
/// Carries only the product reference and the requested quantity; prices
/// and names are snapshotted server-side from the catalog at commit time
/// and are never trusted from the client.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub product_id: u64,
    #[validate(range(min = 1, message = "quantity must be at least 1"))]
    pub quantity: i32,
}

impl CartLine {
    pub fn new(product_id: u64, quantity: i32) -> Self {
        Self {
            product_id,
            quantity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_states_admit_no_transition() {
        for terminal in [OrderStatus::Ready, OrderStatus::Cancelled] {
            for target in [
                OrderStatus::InPreparation,
                OrderStatus::Ready,
                OrderStatus::Cancelled,
            ] {
                assert!(!terminal.can_transition_to(target));
            }
        }
    }

    #[test]
    fn in_preparation_transitions() {
        let s = OrderStatus::InPreparation;
        assert!(s.can_transition_to(OrderStatus::Ready));
        assert!(s.can_transition_to(OrderStatus::Cancelled));
        assert!(!s.can_transition_to(OrderStatus::InPreparation));
    }

    #[test]
    fn status_wire_format() {
        let json = serde_json::to_string(&OrderStatus::InPreparation).unwrap();
        assert_eq!(json, "\"IN_PREPARATION\"");
    }
}
