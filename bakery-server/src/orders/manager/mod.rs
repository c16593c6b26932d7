//! OrdersManager - the sole authority over order state
//!
//! Orders are created only through [`OrdersManager::commit_order`] and
//! change status only through [`OrdersManager::transition_status`]. Every
//! mutation runs inside one redb write transaction and, on success,
//! broadcasts an [`OrderEvent`] for the event channel to fan out.
//!
//! # Commit Flow
//!
//! ```text
//! commit_order(cart, payment_ref, customer)
//!     ├─ 1. Cart sanity (non-empty, qty >= 1)
//!     ├─ 2. Begin write transaction
//!     ├─ 3. Duplicate-payment guard (consumed_payments)
//!     ├─ 4. Re-validate stock against the catalog rows
//!     ├─ 5. Snapshot prices/names, derive total
//!     ├─ 6. Decrement stock + insert order + bind payment
//!     ├─ 7. Commit transaction
//!     ├─ 8. Broadcast new-order event
//!     └─ 9. Send ticket email (best-effort)
//! ```
//!
//! A failure between a successful charge and step 7 queues a
//! reconciliation entry; see `storage::PendingReconciliation`.

mod error;
pub use error::*;

#[cfg(test)]
mod tests;

use super::storage::{OrderStorage, PendingReconciliation, StorageError};
use crate::notify::TicketSender;
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use shared::order::{CartLine, Order, OrderEvent, OrderLine, OrderStatus};
use std::sync::Arc;
use tokio::sync::broadcast;

/// Event broadcast channel capacity
const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// OrdersManager for lifecycle operations
pub struct OrdersManager {
    storage: OrderStorage,
    event_tx: broadcast::Sender<OrderEvent>,
    ticket_sender: Arc<dyn TicketSender>,
}

impl std::fmt::Debug for OrdersManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrdersManager")
            .field("storage", &"<OrderStorage>")
            .field("event_tx", &"<broadcast::Sender>")
            .finish()
    }
}

impl OrdersManager {
    /// Create a manager over existing storage
    pub fn new(storage: OrderStorage, ticket_sender: Arc<dyn TicketSender>) -> Self {
        Self::with_capacity(storage, ticket_sender, EVENT_CHANNEL_CAPACITY)
    }

    /// Create a manager with a custom broadcast capacity
    pub fn with_capacity(
        storage: OrderStorage,
        ticket_sender: Arc<dyn TicketSender>,
        capacity: usize,
    ) -> Self {
        let (event_tx, _) = broadcast::channel(capacity);
        Self {
            storage,
            event_tx,
            ticket_sender,
        }
    }

    /// Subscribe to lifecycle event broadcasts
    pub fn subscribe(&self) -> broadcast::Receiver<OrderEvent> {
        self.event_tx.subscribe()
    }

    /// Get the underlying storage
    pub fn storage(&self) -> &OrderStorage {
        &self.storage
    }

    // ========================================================================
    // ValidateStock
    // ========================================================================

    /// Check every cart line against current stock
    ///
    /// Pure precondition check with no side effects. Stock can change
    /// between this call and the commit, so [`commit_order`] re-runs the
    /// same rule inside its transaction.
    ///
    /// [`commit_order`]: OrdersManager::commit_order
    pub fn validate_stock(&self, lines: &[CartLine]) -> ManagerResult<()> {
        check_cart_shape(lines)?;

        let mut shortages = Vec::new();
        for line in lines {
            let product = self
                .storage
                .get_product(line.product_id)?
                .ok_or(ManagerError::ProductNotFound(line.product_id))?;
            if line.quantity > product.stock {
                shortages.push(StockShortage {
                    product_id: product.id,
                    product_name: product.name,
                    requested: line.quantity,
                    available: product.stock,
                });
            }
        }

        if shortages.is_empty() {
            Ok(())
        } else {
            Err(ManagerError::InsufficientStock(shortages))
        }
    }

    // ========================================================================
    // CommitOrder
    // ========================================================================

    /// Commit a paid cart as a new order
    ///
    /// The payment reference must come from a confirmed charge. Stock
    /// decrement, order insert and payment binding are one atomic unit:
    /// either the whole order commits or nothing does.
    pub async fn commit_order(
        &self,
        lines: &[CartLine],
        payment_intent_id: &str,
        customer_id: u64,
    ) -> ManagerResult<Order> {
        check_cart_shape(lines)?;

        let order = match self.commit_order_txn(lines, payment_intent_id, customer_id) {
            Ok(order) => order,
            Err(err) => {
                self.queue_reconciliation(payment_intent_id, customer_id, &err);
                return Err(err);
            }
        };

        tracing::info!(
            order_id = order.id,
            order_number = %order.order_number,
            total = %order.total_price,
            "Order committed"
        );

        if self.event_tx.send(OrderEvent::new_order(order.clone())).is_err() {
            tracing::debug!("Event broadcast failed: no active receivers");
        }

        // Ticket email is best-effort; the order stands either way
        if let Err(e) = self.ticket_sender.send(&order).await {
            tracing::warn!(order_id = order.id, error = %e, "Ticket send failed after commit");
        }

        Ok(order)
    }

    /// The transactional part of the commit
    fn commit_order_txn(
        &self,
        lines: &[CartLine],
        payment_intent_id: &str,
        customer_id: u64,
    ) -> ManagerResult<Order> {
        let txn = self.storage.begin_write()?;

        // At-most-once payment binding: protects against double-submit
        // and blind retries after an unknown-outcome timeout
        if let Some(order_id) = self
            .storage
            .is_payment_consumed_txn(&txn, payment_intent_id)?
        {
            return Err(ManagerError::DuplicatePayment {
                payment_intent_id: payment_intent_id.to_string(),
                order_id,
            });
        }

        // Re-validate stock inside the transaction. The write transaction
        // is the serialization point: a racing commit either ran before us
        // (we see its decrement) or waits for us.
        let mut shortages = Vec::new();
        let mut products = Vec::new();
        for line in lines {
            let product = self
                .storage
                .get_product_txn(&txn, line.product_id)?
                .ok_or(ManagerError::ProductNotFound(line.product_id))?;
            if line.quantity > product.stock {
                shortages.push(StockShortage {
                    product_id: product.id,
                    product_name: product.name.clone(),
                    requested: line.quantity,
                    available: product.stock,
                });
            }
            products.push((product, line.quantity));
        }
        if !shortages.is_empty() {
            return Err(ManagerError::InsufficientStock(shortages));
        }

        // Snapshot prices and names; total is re-derived, never trusted
        let mut order_lines = Vec::with_capacity(products.len());
        let mut total = Decimal::ZERO;
        for (product, quantity) in &products {
            total += product.price * Decimal::from(*quantity);
            order_lines.push(OrderLine {
                product_id: product.id,
                product_name: product.name.clone(),
                quantity: *quantity,
                unit_price: product.price,
            });
        }

        // Decrement stock
        for (product, quantity) in &mut products {
            product.stock -= *quantity;
            self.storage.put_product_txn(&txn, product)?;
        }

        let id = self.storage.next_order_id_txn(&txn)?;
        let count = self.storage.next_order_count_txn(&txn)?;
        let now = Utc::now();
        let order = Order {
            id,
            order_number: format!("PED{}{}", now.format("%Y%m%d"), 10000 + count),
            customer_id,
            products: order_lines,
            total_price: total,
            order_date: now,
            status: OrderStatus::InPreparation,
            pickup_time: None,
            payment_intent_id: payment_intent_id.to_string(),
            review_id: None,
            deleted: false,
        };

        self.storage.put_order_txn(&txn, &order)?;
        self.storage.bind_payment_txn(&txn, payment_intent_id, id)?;
        txn.commit().map_err(StorageError::from)?;

        Ok(order)
    }

    /// Queue a reconciliation entry for a charge without an order
    ///
    /// Duplicate payments are excluded: the charge is already bound to an
    /// existing order, so no money is orphaned.
    fn queue_reconciliation(
        &self,
        payment_intent_id: &str,
        customer_id: u64,
        err: &ManagerError,
    ) {
        if matches!(err, ManagerError::DuplicatePayment { .. }) {
            return;
        }

        tracing::error!(
            payment_intent = payment_intent_id,
            customer_id,
            error = %err,
            "Commit failed after charge; queueing reconciliation"
        );

        let entry = PendingReconciliation {
            payment_intent_id: payment_intent_id.to_string(),
            customer_id,
            reason: err.to_string(),
            created_at: Utc::now().timestamp_millis(),
        };
        if let Err(e) = self.storage.push_reconciliation(&entry) {
            // Nothing left to fall back to but the log line above
            tracing::error!(payment_intent = payment_intent_id, error = %e, "Failed to queue reconciliation entry");
        }
    }

    // ========================================================================
    // TransitionStatus
    // ========================================================================

    /// Transition an order to a new status
    ///
    /// Legality is checked against the status read inside the write
    /// transaction, so of two racing transitions exactly one wins and the
    /// other observes `IllegalTransition`.
    ///
    /// Returns the updated order and, when the customer notification
    /// failed, a warning message. Notification failure never rolls back
    /// the transition.
    pub async fn transition_status(
        &self,
        order_id: u64,
        target: OrderStatus,
        pickup_time: Option<String>,
    ) -> ManagerResult<(Order, Option<String>)> {
        if target == OrderStatus::Ready && pickup_time.is_none() {
            return Err(ManagerError::PickupTimeRequired);
        }

        let order = {
            let txn = self.storage.begin_write()?;
            let mut order = self
                .storage
                .get_order_txn(&txn, order_id)?
                .ok_or(ManagerError::OrderNotFound(order_id))?;

            if !order.status.can_transition_to(target) {
                return Err(ManagerError::IllegalTransition {
                    from: order.status,
                    to: target,
                });
            }

            order.status = target;
            if target == OrderStatus::Ready {
                order.pickup_time = pickup_time;
            }
            self.storage.put_order_txn(&txn, &order)?;
            txn.commit().map_err(StorageError::from)?;
            order
        };

        tracing::info!(order_id, status = %order.status, "Order status updated");

        let event = match target {
            OrderStatus::Cancelled => OrderEvent::cancelled(order.clone()),
            _ => OrderEvent::updated(order.clone()),
        };
        if self.event_tx.send(event).is_err() {
            tracing::debug!("Event broadcast failed: no active receivers");
        }

        let warning = match self.ticket_sender.send(&order).await {
            Ok(()) => None,
            Err(e) => {
                tracing::warn!(order_id, error = %e, "Customer notification failed");
                Some(format!("Customer notification failed: {}", e))
            }
        };

        Ok((order, warning))
    }

    // ========================================================================
    // DeleteOrder
    // ========================================================================

    /// Remove a cancelled order from its owner's visible history
    ///
    /// Soft delete: the authoritative row is kept, only hidden. Cannot be
    /// undone through any public operation.
    pub fn delete_order(&self, order_id: u64, requesting_customer_id: u64) -> ManagerResult<()> {
        let txn = self.storage.begin_write()?;
        let mut order = self
            .storage
            .get_order_txn(&txn, order_id)?
            .ok_or(ManagerError::OrderNotFound(order_id))?;

        if order.customer_id != requesting_customer_id {
            return Err(ManagerError::NotPermitted(
                "Only the owning customer may delete an order".to_string(),
            ));
        }
        if order.status != OrderStatus::Cancelled {
            return Err(ManagerError::NotPermitted(
                "Only cancelled orders can be deleted".to_string(),
            ));
        }

        order.deleted = true;
        self.storage.put_order_txn(&txn, &order)?;
        txn.commit().map_err(StorageError::from)?;

        tracing::info!(order_id, "Order hidden from customer history");
        Ok(())
    }

    // ========================================================================
    // Ticket Resend
    // ========================================================================

    /// Re-send the ticket email for an existing order
    pub async fn resend_ticket(&self, order_id: u64) -> ManagerResult<()> {
        let order = self
            .storage
            .get_order(order_id)?
            .ok_or(ManagerError::OrderNotFound(order_id))?;
        self.ticket_sender
            .send(&order)
            .await
            .map_err(|e| ManagerError::Notification(e.to_string()))
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Fetch one order by id
    pub fn get_order(&self, order_id: u64) -> ManagerResult<Order> {
        self.storage
            .get_order(order_id)?
            .ok_or(ManagerError::OrderNotFound(order_id))
    }

    /// A customer's visible order history, newest first
    pub fn orders_for_customer(&self, customer_id: u64) -> ManagerResult<Vec<Order>> {
        Ok(self
            .storage
            .find_orders(|o| o.customer_id == customer_id && !o.deleted)?)
    }

    /// All orders placed on a given date (admin view)
    pub fn orders_for_date(&self, date: NaiveDate) -> ManagerResult<Vec<Order>> {
        Ok(self
            .storage
            .find_orders(|o| o.order_date.date_naive() == date)?)
    }

    /// Pending reconciliation entries (admin view)
    pub fn pending_reconciliations(
        &self,
    ) -> ManagerResult<Vec<PendingReconciliation>> {
        Ok(self.storage.list_reconciliations()?)
    }
}

/// Structural cart checks shared by validate and commit
fn check_cart_shape(lines: &[CartLine]) -> ManagerResult<()> {
    if lines.is_empty() {
        return Err(ManagerError::InvalidCart("Cart is empty".to_string()));
    }
    if let Some(line) = lines.iter().find(|l| l.quantity < 1) {
        return Err(ManagerError::InvalidCart(format!(
            "Quantity for product {} must be at least 1",
            line.product_id
        )));
    }
    Ok(())
}
