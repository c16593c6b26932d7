//! Order API module
//!
//! All mutations go through the OrdersManager; handlers only translate
//! between HTTP and lifecycle operations.

mod handler;

use axum::{
    Router,
    routing::{delete, get, post, put},
};

use crate::core::ServerState;

/// Order router
pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/orders", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        // Commit a paid cart (the only way orders are created)
        .route("/payment", post(handler::commit_order))
        // Today's orders (admin board)
        .route("/today", get(handler::list_today))
        // Caller's order history
        .route("/my", get(handler::list_my_orders))
        .route("/{id}", get(handler::get_by_id))
        .route("/{id}", delete(handler::delete_order))
        .route("/{id}/status", put(handler::update_status))
        .route("/{id}/resend-ticket", post(handler::resend_ticket))
}
