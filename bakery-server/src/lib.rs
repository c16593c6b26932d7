//! Bakery order server
//!
//! Authoritative owner of the order lifecycle: stock validation, payment
//! intent creation, atomic order commit, status transitions, and the
//! event channel that pushes lifecycle events to admin surfaces.

pub mod api;
pub mod auth;
pub mod core;
pub mod message;
pub mod notify;
pub mod orders;
pub mod payment;
pub mod utils;

pub use crate::core::{Config, Server, ServerState};
pub use crate::utils::{AppError, AppResult, init_logger};

/// Environment setup at process start: dotenv, then logging
pub fn setup_environment() {
    dotenv::dotenv().ok();

    let log_level = std::env::var("LOG_LEVEL").ok();
    let log_dir = std::env::var("LOG_DIR").ok();
    utils::logger::init_logger_with_file(log_level.as_deref(), log_dir.as_deref());
}
