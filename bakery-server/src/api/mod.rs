//! API route modules
//!
//! # Structure
//!
//! - [`health`] - health check
//! - [`products`] - catalog listing and stock validation
//! - [`payment`] - payment intent creation
//! - [`orders`] - order lifecycle endpoints
//! - [`admin`] - reconciliation queue and channel introspection

pub mod admin;
pub mod health;
pub mod orders;
pub mod payment;
pub mod products;

use axum::Router;

use crate::core::ServerState;

/// Full API router
pub fn router() -> Router<ServerState> {
    Router::new()
        .merge(health::router())
        .merge(products::router())
        .merge(payment::router())
        .merge(orders::router())
        .merge(admin::router())
}
