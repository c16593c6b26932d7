//! Customer notification (order ticket emails)
//!
//! The lifecycle manager treats the sender as fire-and-forget: a send
//! failure is reported upward as a warning but never rolls back the
//! state change that triggered it.

use async_trait::async_trait;
use shared::order::Order;
use thiserror::Error;

/// Notification errors
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Delivery failed: {0}")]
    Delivery(String),
}

/// Sends order tickets (confirmation emails) to customers
#[async_trait]
pub trait TicketSender: Send + Sync {
    async fn send(&self, order: &Order) -> Result<(), NotifyError>;
}

/// Log-only sender
///
/// Stands in where no mail transport is configured (development, tests).
#[derive(Debug, Default)]
pub struct LogTicketSender;

#[async_trait]
impl TicketSender for LogTicketSender {
    async fn send(&self, order: &Order) -> Result<(), NotifyError> {
        tracing::info!(
            order_id = order.id,
            order_number = %order.order_number,
            status = %order.status,
            "Ticket notification (log only)"
        );
        Ok(())
    }
}
