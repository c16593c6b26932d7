//! Wire error codes
//!
//! Stable string codes shared by server responses and client-side
//! matching. The server maps its internal error enums onto these codes;
//! the client maps them back without parsing human-readable messages.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Error code carried in the `code` field of API error envelopes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Requested quantity exceeds available stock for one or more products
    InsufficientStock,
    /// Charge amount below the processor minimum (50 minor units)
    AmountTooSmall,
    /// Payment reference already consumed by an existing order
    DuplicatePayment,
    /// Requested status transition is not legal from the current status
    IllegalTransition,
    /// Caller does not own the resource or lacks the required role
    NotPermitted,
    /// Order does not exist (or is hidden from the caller)
    OrderNotFound,
    /// Product does not exist
    ProductNotFound,
    /// Charge succeeded but the order commit failed; manual follow-up needed
    ReconciliationRequired,
    /// Storage-layer failure
    PersistenceFailure,
    /// Request payload failed validation
    ValidationFailed,
    /// Missing or invalid credentials
    Unauthorized,
    /// Anything without a more specific classification
    InternalError,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorCode::InsufficientStock => "INSUFFICIENT_STOCK",
            ErrorCode::AmountTooSmall => "AMOUNT_TOO_SMALL",
            ErrorCode::DuplicatePayment => "DUPLICATE_PAYMENT",
            ErrorCode::IllegalTransition => "ILLEGAL_TRANSITION",
            ErrorCode::NotPermitted => "NOT_PERMITTED",
            ErrorCode::OrderNotFound => "ORDER_NOT_FOUND",
            ErrorCode::ProductNotFound => "PRODUCT_NOT_FOUND",
            ErrorCode::ReconciliationRequired => "RECONCILIATION_REQUIRED",
            ErrorCode::PersistenceFailure => "PERSISTENCE_FAILURE",
            ErrorCode::ValidationFailed => "VALIDATION_FAILED",
            ErrorCode::Unauthorized => "UNAUTHORIZED",
            ErrorCode::InternalError => "INTERNAL_ERROR",
        };
        write!(f, "{}", s)
    }
}

/// API error envelope body
///
/// ```json
/// { "code": "INSUFFICIENT_STOCK", "message": "..." }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: ErrorCode,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_matches_serde_rename() {
        for code in [
            ErrorCode::InsufficientStock,
            ErrorCode::DuplicatePayment,
            ErrorCode::ReconciliationRequired,
        ] {
            let json = serde_json::to_string(&code).unwrap();
            assert_eq!(json, format!("\"{}\"", code));
        }
    }
}
