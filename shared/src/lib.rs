//! Shared types for the bakery ordering platform
//!
//! Common types used by both the server and the client crates:
//! the catalog/order data model, order lifecycle events, wire error
//! codes, and the message framing used by the event channel.

pub mod error;
pub mod message;
pub mod models;
pub mod order;

// Re-exports
pub use serde::{Deserialize, Serialize};

// Message bus re-exports (for convenient access)
pub use message::{BusMessage, MessageType};

// Order re-exports
pub use order::{Order, OrderEvent, OrderEventKind, OrderLine, OrderStatus};
