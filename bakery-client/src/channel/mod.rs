//! Client side of the order event channel
//!
//! Connects to the server's TCP event bus, performs the protocol
//! handshake, and fans incoming order events out to topic subscribers.
//! A dropped connection is retried with a fixed delay up to a configured
//! bound; when the bound is exhausted the channel parks in
//! [`ChannelState::Exhausted`] and surfaces fall back to polling.

mod client;
mod transport;

pub use client::{EventChannel, SubscriptionGuard};
pub use transport::{read_message, write_message};

use thiserror::Error;

/// Event channel errors
#[derive(Debug, Error)]
pub enum ChannelError {
    /// Underlying socket error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Could not establish a connection
    #[error("Connection error: {0}")]
    Connection(String),

    /// Malformed frame on the wire
    #[error("Invalid frame: {0}")]
    InvalidFrame(String),

    /// Server refused the handshake
    #[error("Handshake rejected: {0}")]
    HandshakeRejected(String),

    /// Server closed the connection
    #[error("Connection closed by server")]
    Disconnected,
}

/// Connection state, observable through [`EventChannel::state`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    /// Not connected; `connect()` has not run or `close()` was called
    Disconnected,
    /// Connected and receiving events
    Connected,
    /// Connection lost; reconnect attempts in progress
    Reconnecting,
    /// Reconnect bound exhausted; no further automatic attempts
    Exhausted,
}
