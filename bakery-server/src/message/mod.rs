//! Order event channel (server side)
//!
//! The lifecycle manager broadcasts [`shared::order::OrderEvent`]s; this
//! module carries them to subscribers over pluggable transports.

mod bus;
mod tcp_server;
pub mod transport;

pub use bus::{ConnectedClient, EventBus, TransportConfig};
