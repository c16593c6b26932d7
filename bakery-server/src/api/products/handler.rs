//! Product API handlers

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::ServerState;
use crate::utils::{AppError, AppResult};
use shared::models::Product;
use shared::order::CartLine;

/// Catalog listing, storefront and poll refresh
pub async fn list(State(state): State<ServerState>) -> AppResult<Json<Vec<Product>>> {
    let products = state
        .manager
        .storage()
        .list_products()
        .map_err(|e| AppError::Storage(e.to_string()))?;
    Ok(Json(products))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ValidateStockRequest {
    #[validate(length(min = 1, message = "cart must not be empty"))]
    #[validate(nested)]
    pub products: Vec<CartLine>,
}

#[derive(Debug, Serialize)]
pub struct ValidateStockResponse {
    pub valid: bool,
}

/// Pre-checkout stock check
///
/// Advisory only; the commit re-validates inside its transaction.
pub async fn validate_stock(
    State(state): State<ServerState>,
    Json(payload): Json<ValidateStockRequest>,
) -> AppResult<Json<ValidateStockResponse>> {
    payload
        .validate()
        .map_err(|e| AppError::validation(e.to_string()))?;

    state.manager.validate_stock(&payload.products)?;
    Ok(Json(ValidateStockResponse { valid: true }))
}
