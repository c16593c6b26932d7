//! Product Model

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Product entity
///
/// `stock` is the authoritative unit count consulted by stock validation
/// and decremented on order commit. `price` is the current catalog price;
/// orders snapshot it into their line items at commit time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: u64,
    pub name: String,
    /// Unit price in major currency units
    pub price: Decimal,
    /// Units available for sale
    pub stock: i32,
    /// Category reference
    pub category: String,
    pub image: Option<String>,
    pub is_active: bool,
}
