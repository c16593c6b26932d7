//! Order lifecycle events
//!
//! Transient pub/sub messages announcing an order's creation or status
//! change. Events are not persisted; they exist only on the wire between
//! publish and delivery. Surfaces that miss events during an outage are
//! expected to reconcile via their periodic full-refresh poll.

use super::Order;
use serde::{Deserialize, Serialize};

/// Event kind, doubling as the channel topic name
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum OrderEventKind {
    /// A new order was committed
    NewOrder,
    /// An order moved to CANCELLED
    OrderCancelled,
    /// An order changed status without being cancelled (e.g. READY)
    OrderUpdated,
}

impl OrderEventKind {
    /// Topic name as published on the wire (`/topic/{name}`)
    pub fn topic(&self) -> &'static str {
        match self {
            OrderEventKind::NewOrder => "new-order",
            OrderEventKind::OrderCancelled => "order-cancelled",
            OrderEventKind::OrderUpdated => "order-updated",
        }
    }
}

impl std::fmt::Display for OrderEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.topic())
    }
}

/// Order event - `{ "event": "...", "order": { ... } }` on the wire
///
/// Carries a full snapshot of the affected order so receivers can merge
/// it without a follow-up fetch.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderEvent {
    pub event: OrderEventKind,
    pub order: Order,
}

impl OrderEvent {
    pub fn new_order(order: Order) -> Self {
        Self {
            event: OrderEventKind::NewOrder,
            order,
        }
    }

    pub fn cancelled(order: Order) -> Self {
        Self {
            event: OrderEventKind::OrderCancelled,
            order,
        }
    }

    pub fn updated(order: Order) -> Self {
        Self {
            event: OrderEventKind::OrderUpdated,
            order,
        }
    }

    /// Topic this event is published on
    pub fn topic(&self) -> &'static str {
        self.event.topic()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_kind_wire_names() {
        assert_eq!(
            serde_json::to_string(&OrderEventKind::NewOrder).unwrap(),
            "\"new-order\""
        );
        assert_eq!(
            serde_json::to_string(&OrderEventKind::OrderCancelled).unwrap(),
            "\"order-cancelled\""
        );
        assert_eq!(OrderEventKind::OrderUpdated.topic(), "order-updated");
    }
}
