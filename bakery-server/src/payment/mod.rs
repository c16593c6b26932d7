//! Payment processor boundary
//!
//! The processor is an external collaborator; this module defines the
//! trait seam, the minimum-amount guard that runs before the processor
//! is ever contacted, and an HTTP client for a Stripe-style API.

mod stripe;

pub use stripe::StripeClient;

use async_trait::async_trait;
use thiserror::Error;

use crate::utils::AppError;
use shared::error::ErrorCode;

/// Smallest chargeable amount in minor currency units (€0.50)
///
/// Observed processor minimum; amounts below this are rejected locally.
pub const MIN_CHARGE_MINOR_UNITS: i64 = 50;

/// Terminal outcome of a charge confirmation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChargeStatus {
    Succeeded,
    /// Terminal failure with the processor's reason
    Failed(String),
}

/// A confirmed charge attempt
#[derive(Debug, Clone)]
pub struct ChargeOutcome {
    pub status: ChargeStatus,
    /// Opaque payment reference, bound at most once to an order
    pub payment_reference: String,
}

/// Payment errors
#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("Amount {amount} below processor minimum of {MIN_CHARGE_MINOR_UNITS} minor units")]
    AmountTooSmall { amount: i64 },

    #[error("Processor rejected the request: {0}")]
    Rejected(String),

    #[error("Processor request failed: {0}")]
    Http(#[from] reqwest::Error),
}

impl From<PaymentError> for AppError {
    fn from(err: PaymentError) -> Self {
        match err {
            PaymentError::AmountTooSmall { amount } => AppError::business(
                ErrorCode::AmountTooSmall,
                format!(
                    "Minimum order amount is {} minor units (got {})",
                    MIN_CHARGE_MINOR_UNITS, amount
                ),
            ),
            PaymentError::Rejected(msg) => AppError::internal(msg),
            PaymentError::Http(e) => AppError::internal(format!("Payment processor: {}", e)),
        }
    }
}

/// External payment processor client
#[async_trait]
pub trait PaymentProcessor: Send + Sync {
    /// Create a payment intent; returns the client secret the payment
    /// collection UI needs to confirm the charge
    async fn create_intent(
        &self,
        amount_minor_units: i64,
        currency: &str,
        receipt_email: &str,
    ) -> Result<String, PaymentError>;

    /// Confirm a charge; must report a terminal status
    async fn confirm_charge(
        &self,
        client_secret: &str,
        payment_method: &str,
    ) -> Result<ChargeOutcome, PaymentError>;
}

/// Guarded entry point used by the API layer
///
/// Applies the minimum-amount rule before delegating, so under-minimum
/// requests never reach the processor.
#[derive(Clone)]
pub struct PaymentService {
    processor: std::sync::Arc<dyn PaymentProcessor>,
    currency: String,
}

impl PaymentService {
    pub fn new(processor: std::sync::Arc<dyn PaymentProcessor>, currency: impl Into<String>) -> Self {
        Self {
            processor,
            currency: currency.into(),
        }
    }

    /// Create a payment intent for the given amount
    ///
    /// `currency` falls back to the configured default when omitted.
    pub async fn create_intent(
        &self,
        amount_minor_units: i64,
        receipt_email: &str,
        currency: Option<&str>,
    ) -> Result<String, PaymentError> {
        if amount_minor_units < MIN_CHARGE_MINOR_UNITS {
            return Err(PaymentError::AmountTooSmall {
                amount: amount_minor_units,
            });
        }
        let currency = currency.unwrap_or(&self.currency);
        self.processor
            .create_intent(amount_minor_units, currency, receipt_email)
            .await
    }
}

impl std::fmt::Debug for PaymentService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaymentService")
            .field("currency", &self.currency)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Records how many times the processor was contacted
    struct CountingProcessor {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl PaymentProcessor for CountingProcessor {
        async fn create_intent(
            &self,
            _amount: i64,
            _currency: &str,
            _email: &str,
        ) -> Result<String, PaymentError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok("cs_test_secret".to_string())
        }

        async fn confirm_charge(
            &self,
            _client_secret: &str,
            _payment_method: &str,
        ) -> Result<ChargeOutcome, PaymentError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(ChargeOutcome {
                status: ChargeStatus::Succeeded,
                payment_reference: "pi_test".to_string(),
            })
        }
    }

    #[tokio::test]
    async fn below_minimum_never_reaches_processor() {
        let processor = Arc::new(CountingProcessor {
            calls: AtomicUsize::new(0),
        });
        let service = PaymentService::new(processor.clone(), "eur");

        let err = service.create_intent(40, "a@b.com", None).await.unwrap_err();
        assert!(matches!(err, PaymentError::AmountTooSmall { amount: 40 }));
        assert_eq!(processor.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn at_minimum_is_forwarded() {
        let processor = Arc::new(CountingProcessor {
            calls: AtomicUsize::new(0),
        });
        let service = PaymentService::new(processor.clone(), "eur");

        let secret = service.create_intent(50, "a@b.com", None).await.unwrap();
        assert_eq!(secret, "cs_test_secret");
        assert_eq!(processor.calls.load(Ordering::SeqCst), 1);
    }
}
