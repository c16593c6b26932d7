//! Order board state for admin surfaces
//!
//! One merge path serves both input sources: events pushed over the
//! channel and full snapshots from the periodic poll. Because every
//! mutation funnels through the same function, replaying an event the
//! poll already applied (or vice versa) cannot corrupt the view.

use shared::order::{Order, OrderEvent, OrderEventKind, OrderStatus};

/// The live view of active orders, newest first
#[derive(Debug, Default, Clone)]
pub struct OrderBoard {
    orders: Vec<Order>,
}

impl OrderBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Active orders, newest first
    pub fn orders(&self) -> &[Order] {
        &self.orders
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    /// Merge one pushed event
    pub fn apply(&mut self, event: &OrderEvent) {
        self.merge(event.event, &event.order);
    }

    /// Merge a poll snapshot through the same path as pushed events
    ///
    /// Cancelled rows in the snapshot remove; anything else replaces or
    /// prepends. Snapshots arrive newest first, so the iteration is
    /// reversed to keep prepends in newest-first order.
    pub fn refresh<I>(&mut self, orders: I)
    where
        I: IntoIterator<Item = Order>,
    {
        let snapshot: Vec<Order> = orders.into_iter().collect();
        for order in snapshot.iter().rev() {
            let kind = if order.status == OrderStatus::Cancelled {
                OrderEventKind::OrderCancelled
            } else {
                OrderEventKind::OrderUpdated
            };
            self.merge(kind, order);
        }
    }

    /// The single merge function
    ///
    /// `new-order` and `order-updated` replace in place by id, or
    /// prepend when the order is unknown; `order-cancelled` removes.
    /// Replays are idempotent.
    fn merge(&mut self, kind: OrderEventKind, order: &Order) {
        match kind {
            OrderEventKind::NewOrder | OrderEventKind::OrderUpdated => {
                if let Some(slot) = self.orders.iter_mut().find(|o| o.id == order.id) {
                    *slot = order.clone();
                } else {
                    self.orders.insert(0, order.clone());
                }
            }
            OrderEventKind::OrderCancelled => {
                self.orders.retain(|o| o.id != order.id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal::Decimal;

    fn order(id: u64, status: OrderStatus) -> Order {
        Order {
            id,
            order_number: format!("PED20260825{:04}", id),
            customer_id: 1,
            products: Vec::new(),
            total_price: Decimal::new(300, 2),
            order_date: Utc::now(),
            status,
            pickup_time: None,
            payment_intent_id: format!("pi_{}", id),
            review_id: None,
            deleted: false,
        }
    }

    #[test]
    fn test_new_order_prepends() {
        let mut board = OrderBoard::new();
        board.apply(&OrderEvent::new_order(order(1, OrderStatus::InPreparation)));
        board.apply(&OrderEvent::new_order(order(2, OrderStatus::InPreparation)));

        let ids: Vec<u64> = board.orders().iter().map(|o| o.id).collect();
        assert_eq!(ids, vec![2, 1]);
    }

    #[test]
    fn test_update_replaces_in_place() {
        let mut board = OrderBoard::new();
        board.apply(&OrderEvent::new_order(order(1, OrderStatus::InPreparation)));
        board.apply(&OrderEvent::new_order(order(2, OrderStatus::InPreparation)));

        board.apply(&OrderEvent::updated(order(1, OrderStatus::Ready)));

        // Position preserved, status refreshed
        let ids: Vec<u64> = board.orders().iter().map(|o| o.id).collect();
        assert_eq!(ids, vec![2, 1]);
        assert_eq!(board.orders()[1].status, OrderStatus::Ready);
    }

    #[test]
    fn test_update_for_unknown_order_prepends() {
        let mut board = OrderBoard::new();
        // An update can arrive first when the new-order event was missed
        board.apply(&OrderEvent::updated(order(5, OrderStatus::Ready)));
        assert_eq!(board.len(), 1);
        assert_eq!(board.orders()[0].id, 5);
    }

    #[test]
    fn test_cancel_removes() {
        let mut board = OrderBoard::new();
        board.apply(&OrderEvent::new_order(order(1, OrderStatus::InPreparation)));
        board.apply(&OrderEvent::cancelled(order(1, OrderStatus::Cancelled)));
        assert!(board.is_empty());

        // Cancelling an unknown order is a no-op
        board.apply(&OrderEvent::cancelled(order(9, OrderStatus::Cancelled)));
        assert!(board.is_empty());
    }

    #[test]
    fn test_replay_is_idempotent() {
        let mut board = OrderBoard::new();
        let event = OrderEvent::new_order(order(1, OrderStatus::InPreparation));

        board.apply(&event);
        board.apply(&event);
        board.apply(&event);

        assert_eq!(board.len(), 1);
    }

    #[test]
    fn test_refresh_converges_with_push() {
        // Same end state whether orders arrive as events or as a poll
        // snapshot
        let mut pushed = OrderBoard::new();
        pushed.apply(&OrderEvent::new_order(order(1, OrderStatus::InPreparation)));
        pushed.apply(&OrderEvent::new_order(order(2, OrderStatus::InPreparation)));
        pushed.apply(&OrderEvent::updated(order(1, OrderStatus::Ready)));
        pushed.apply(&OrderEvent::cancelled(order(2, OrderStatus::Cancelled)));

        let mut polled = OrderBoard::new();
        // Snapshot newest first, as the server returns it
        polled.refresh(vec![
            order(2, OrderStatus::Cancelled),
            order(1, OrderStatus::Ready),
        ]);

        let pushed_ids: Vec<u64> = pushed.orders().iter().map(|o| o.id).collect();
        let polled_ids: Vec<u64> = polled.orders().iter().map(|o| o.id).collect();
        assert_eq!(pushed_ids, polled_ids);
        assert_eq!(pushed.orders()[0].status, polled.orders()[0].status);
    }

    #[test]
    fn test_refresh_after_missed_events() {
        let mut board = OrderBoard::new();
        board.apply(&OrderEvent::new_order(order(1, OrderStatus::InPreparation)));

        // Events for orders 2 and 3 were missed during a channel outage;
        // the poll snapshot reconciles
        board.refresh(vec![
            order(3, OrderStatus::InPreparation),
            order(2, OrderStatus::Ready),
            order(1, OrderStatus::InPreparation),
        ]);

        let ids: Vec<u64> = board.orders().iter().map(|o| o.id).collect();
        assert_eq!(ids, vec![3, 2, 1]);
    }
}
