//! Payment API handlers

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::auth::AuthUser;
use crate::core::ServerState;
use crate::utils::{AppError, AppResult};

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateIntentRequest {
    /// Amount in minor currency units (cents)
    pub amount: i64,
    /// Optional currency override (ISO code, lowercase)
    pub currency: Option<String>,
    #[validate(email(message = "receipt email must be a valid address"))]
    pub receipt_email: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateIntentResponse {
    pub client_secret: String,
}

/// Create a payment intent for checkout
///
/// The under-minimum guard fires inside the payment service, before the
/// processor is contacted.
pub async fn create_payment_intent(
    State(state): State<ServerState>,
    _user: AuthUser,
    Json(payload): Json<CreateIntentRequest>,
) -> AppResult<Json<CreateIntentResponse>> {
    payload
        .validate()
        .map_err(|e| AppError::validation(e.to_string()))?;

    let client_secret = state
        .payment
        .create_intent(
            payload.amount,
            &payload.receipt_email,
            payload.currency.as_deref(),
        )
        .await?;
    Ok(Json(CreateIntentResponse { client_secret }))
}
