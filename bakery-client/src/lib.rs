//! Bakery Client - typed access to the bakery server
//!
//! Two surfaces: [`HttpClient`] wraps the REST API, [`EventChannel`]
//! subscribes to the order event stream. [`OrderBoard`] merges both into
//! one consistent view for admin surfaces.

pub mod board;
pub mod channel;
pub mod config;
pub mod error;
pub mod http;

pub use board::OrderBoard;
pub use channel::{ChannelError, ChannelState, EventChannel, SubscriptionGuard};
pub use config::ClientConfig;
pub use error::{ClientError, ClientResult};
pub use http::{ChannelClient, HttpClient, PendingReconciliation, StatusUpdate};

// Re-export shared types for convenience
pub use shared::error::ErrorCode;
pub use shared::models::Product;
pub use shared::order::{CartLine, Order, OrderEvent, OrderEventKind, OrderStatus};
