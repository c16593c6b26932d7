use super::super::storage::StorageError;
use crate::utils::AppError;
use serde::{Deserialize, Serialize};
use shared::error::ErrorCode;
use shared::order::OrderStatus;
use thiserror::Error;

/// One product the shopper asked more of than the shelf holds
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StockShortage {
    pub product_id: u64,
    pub product_name: String,
    pub requested: i32,
    pub available: i32,
}

/// Lifecycle manager errors
#[derive(Debug, Error)]
pub enum ManagerError {
    #[error("Insufficient stock for {} product(s)", .0.len())]
    InsufficientStock(Vec<StockShortage>),

    #[error("Payment {payment_intent_id} already consumed by order {order_id}")]
    DuplicatePayment {
        payment_intent_id: String,
        order_id: u64,
    },

    #[error("Illegal transition: {from} -> {to}")]
    IllegalTransition { from: OrderStatus, to: OrderStatus },

    #[error("Pickup time is required to mark an order ready")]
    PickupTimeRequired,

    #[error("Not permitted: {0}")]
    NotPermitted(String),

    #[error("Order not found: {0}")]
    OrderNotFound(u64),

    #[error("Product not found: {0}")]
    ProductNotFound(u64),

    #[error("Invalid cart: {0}")]
    InvalidCart(String),

    /// The charge succeeded but the commit could not be persisted.
    /// A reconciliation entry has been queued; money moved with no order.
    #[error("Order commit failed after charge {payment_intent_id}: {source}")]
    Reconciliation {
        payment_intent_id: String,
        source: StorageError,
    },

    #[error("Notification failed: {0}")]
    Notification(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

pub type ManagerResult<T> = Result<T, ManagerError>;

impl From<ManagerError> for AppError {
    fn from(err: ManagerError) -> Self {
        match err {
            ManagerError::InsufficientStock(shortages) => {
                let names: Vec<&str> = shortages
                    .iter()
                    .map(|s| s.product_name.as_str())
                    .collect();
                let message = format!("Insufficient stock: {}", names.join(", "));
                let data = serde_json::to_value(&shortages).unwrap_or_default();
                AppError::business_with_data(ErrorCode::InsufficientStock, message, data)
            }
            ManagerError::DuplicatePayment {
                payment_intent_id, ..
            } => AppError::business(
                ErrorCode::DuplicatePayment,
                format!("Payment {} already consumed", payment_intent_id),
            ),
            ManagerError::IllegalTransition { from, to } => AppError::business(
                ErrorCode::IllegalTransition,
                format!("Illegal transition: {} -> {}", from, to),
            ),
            ManagerError::PickupTimeRequired => AppError::business(
                ErrorCode::ValidationFailed,
                "Pickup time is required to mark an order ready",
            ),
            ManagerError::NotPermitted(msg) => {
                AppError::business(ErrorCode::NotPermitted, msg)
            }
            ManagerError::OrderNotFound(id) => AppError::business(
                ErrorCode::OrderNotFound,
                format!("Order not found: {}", id),
            ),
            ManagerError::ProductNotFound(id) => AppError::business(
                ErrorCode::ProductNotFound,
                format!("Product not found: {}", id),
            ),
            ManagerError::InvalidCart(msg) => AppError::validation(msg),
            ManagerError::Reconciliation {
                payment_intent_id,
                source,
            } => AppError::business(
                ErrorCode::ReconciliationRequired,
                format!(
                    "Order commit failed after charge {}: {}",
                    payment_intent_id, source
                ),
            ),
            ManagerError::Notification(msg) => AppError::internal(msg),
            ManagerError::Storage(e) => AppError::Storage(e.to_string()),
        }
    }
}
