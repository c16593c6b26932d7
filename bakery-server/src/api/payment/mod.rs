//! Payment API module

mod handler;

use axum::{Router, routing::post};

use crate::core::ServerState;

/// Payment router
pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/payment", routes())
}

fn routes() -> Router<ServerState> {
    Router::new().route("/create-payment-intent", post(handler::create_payment_intent))
}
