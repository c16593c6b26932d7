//! Admin API module

mod handler;

use axum::{Router, routing::get};

use crate::core::ServerState;

/// Admin router
pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/admin", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route("/reconciliation", get(handler::list_reconciliations))
        .route("/channel-clients", get(handler::list_channel_clients))
}
