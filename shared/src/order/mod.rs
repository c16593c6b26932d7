//! Order data model
//!
//! An [`Order`] is created exclusively by the lifecycle manager's commit
//! operation and mutated exclusively by its status-transition operation.
//! Line items are price snapshots: once committed they never change, even
//! if the catalog price does.

mod event;
pub mod types;

pub use event::{OrderEvent, OrderEventKind};
pub use types::{CartLine, OrderStatus};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One product/quantity/price-snapshot entry within an order
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    pub product_id: u64,
    /// Product name at commit time
    pub product_name: String,
    pub quantity: i32,
    /// Unit price at commit time
    pub unit_price: Decimal,
}

impl OrderLine {
    /// Line subtotal (quantity × unit price)
    pub fn subtotal(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

/// A committed, paid customer purchase
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: u64,
    /// Human-facing order number, e.g. `PED202608250042`
    pub order_number: String,
    pub customer_id: u64,
    pub products: Vec<OrderLine>,
    /// Re-derived from line items at commit; never client-supplied
    pub total_price: Decimal,
    pub order_date: DateTime<Utc>,
    pub status: OrderStatus,
    /// Set when transitioning to READY
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pickup_time: Option<String>,
    /// The payment reference consumed by this order (at-most-once binding)
    pub payment_intent_id: String,
    /// Reference to the customer's review of this order, once one exists
    #[serde(skip_serializing_if = "Option::is_none")]
    pub review_id: Option<u64>,
    /// Soft-delete flag: hidden from the owning customer's history
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub deleted: bool,
}

impl Order {
    /// Sum of line subtotals
    pub fn computed_total(&self) -> Decimal {
        self.products.iter().map(|l| l.subtotal()).sum()
    }
}
