//! Order API handlers

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::auth::{AdminUser, AuthUser};
use crate::core::ServerState;
use crate::utils::{AppError, AppResult};
use shared::order::{CartLine, Order, OrderStatus};

/// Commit request: the paid cart and its payment reference
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CommitOrderRequest {
    #[validate(length(min = 1, message = "cart must not be empty"))]
    #[validate(nested)]
    pub products: Vec<CartLine>,
    #[validate(length(min = 1, message = "payment reference is required"))]
    pub payment_intent_id: String,
}

/// Commit a paid cart as a new order
pub async fn commit_order(
    State(state): State<ServerState>,
    user: AuthUser,
    Json(payload): Json<CommitOrderRequest>,
) -> AppResult<Json<Order>> {
    payload
        .validate()
        .map_err(|e| AppError::validation(e.to_string()))?;

    let order = state
        .manager
        .commit_order(&payload.products, &payload.payment_intent_id, user.id)
        .await?;
    Ok(Json(order))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusQuery {
    pub status: OrderStatus,
    pub pickup_time: Option<String>,
}

/// Transition response; `warning` is set when the customer notification
/// failed but the transition itself went through
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub order: Order,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

/// Transition an order's status (admin)
pub async fn update_status(
    State(state): State<ServerState>,
    _admin: AdminUser,
    Path(id): Path<u64>,
    Query(query): Query<StatusQuery>,
) -> AppResult<Json<StatusResponse>> {
    let (order, warning) = state
        .manager
        .transition_status(id, query.status, query.pickup_time)
        .await?;
    Ok(Json(StatusResponse { order, warning }))
}

/// Today's orders (admin board seed)
pub async fn list_today(
    State(state): State<ServerState>,
    _admin: AdminUser,
) -> AppResult<Json<Vec<Order>>> {
    let today = chrono::Utc::now().date_naive();
    let orders = state.manager.orders_for_date(today)?;
    Ok(Json(orders))
}

/// Caller's visible order history
pub async fn list_my_orders(
    State(state): State<ServerState>,
    user: AuthUser,
) -> AppResult<Json<Vec<Order>>> {
    let orders = state.manager.orders_for_customer(user.id)?;
    Ok(Json(orders))
}

/// Fetch one order; customers only see their own
pub async fn get_by_id(
    State(state): State<ServerState>,
    user: AuthUser,
    Path(id): Path<u64>,
) -> AppResult<Json<Order>> {
    let order = state.manager.get_order(id)?;
    if !user.is_admin() && order.customer_id != user.id {
        return Err(AppError::forbidden("Not your order"));
    }
    Ok(Json(order))
}

/// Hide a cancelled order from the caller's history
pub async fn delete_order(
    State(state): State<ServerState>,
    user: AuthUser,
    Path(id): Path<u64>,
) -> AppResult<Json<serde_json::Value>> {
    state.manager.delete_order(id, user.id)?;
    Ok(Json(serde_json::json!({ "deleted": true })))
}

/// Re-send the ticket email (admin)
pub async fn resend_ticket(
    State(state): State<ServerState>,
    _admin: AdminUser,
    Path(id): Path<u64>,
) -> AppResult<Json<serde_json::Value>> {
    state.manager.resend_ticket(id).await?;
    Ok(Json(serde_json::json!({ "sent": true })))
}
