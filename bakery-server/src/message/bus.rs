//! Event bus core
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │                  EventBus                   │
//! │  ┌───────────────────────────────────────┐  │
//! │  │  broadcast::Sender<BusMessage>        │  │
//! │  └───────────────────────────────────────┘  │
//! └────────────────────┬────────────────────────┘
//!                      │
//!           ┌──────────┴──────────┐
//!           │   Transport Trait   │
//!           └──────────┬──────────┘
//!                      │
//!           ┌──────────┴──────────┐
//!           ▼                     ▼
//!      TcpTransport         MemoryTransport
//!      (admin boards)       (same process)
//! ```
//!
//! The bus is publish-only from the server's point of view: order events
//! fan out to every connected subscriber; clients never publish.

use std::sync::Arc;

use dashmap::DashMap;
use shared::message::BusMessage;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use super::transport::{MemoryTransport, Transport};

/// Transport layer configuration
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub tcp_listen_addr: String,
    /// Capacity of the broadcast channel
    pub channel_capacity: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            tcp_listen_addr: "0.0.0.0:8081".to_string(),
            channel_capacity: 1024,
        }
    }
}

/// A connected event channel subscriber
#[derive(Debug, Clone)]
pub struct ConnectedClient {
    pub id: String,
    pub addr: Option<String>,
}

/// Event bus, the server side of the order event channel
#[derive(Debug, Clone)]
pub struct EventBus {
    /// Server-to-subscriber broadcast channel
    server_tx: broadcast::Sender<BusMessage>,
    pub(crate) config: TransportConfig,
    shutdown_token: CancellationToken,
    /// Connected subscribers (client id -> transport)
    pub(crate) clients: Arc<DashMap<String, Arc<dyn Transport>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::from_config(TransportConfig::default())
    }

    pub fn from_config(config: TransportConfig) -> Self {
        let (server_tx, _) = broadcast::channel(config.channel_capacity);
        Self {
            server_tx,
            config,
            shutdown_token: CancellationToken::new(),
            clients: Arc::new(DashMap::new()),
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self::from_config(TransportConfig {
            channel_capacity: capacity,
            ..Default::default()
        })
    }

    /// Publish a message to every subscriber
    ///
    /// A send error only means there are no subscribers right now; the
    /// event is dropped without failing the caller's operation.
    pub fn publish(&self, msg: BusMessage) {
        if let Err(e) = self.server_tx.send(msg) {
            tracing::trace!("No event channel subscribers: {}", e);
        }
    }

    /// Subscribe to the broadcast stream
    pub fn subscribe(&self) -> broadcast::Receiver<BusMessage> {
        self.server_tx.subscribe()
    }

    /// In-process transport for same-process subscribers
    pub fn memory_transport(&self) -> MemoryTransport {
        MemoryTransport::new(&self.server_tx)
    }

    /// Broadcast sender, for connection handlers
    pub fn sender(&self) -> &broadcast::Sender<BusMessage> {
        &self.server_tx
    }

    pub fn shutdown_token(&self) -> &CancellationToken {
        &self.shutdown_token
    }

    /// Currently connected TCP subscribers
    pub fn connected_clients(&self) -> Vec<ConnectedClient> {
        self.clients
            .iter()
            .map(|entry| ConnectedClient {
                id: entry.key().clone(),
                addr: entry.value().peer_addr(),
            })
            .collect()
    }

    /// Cancel the accept loop and every per-client task
    pub fn shutdown(&self) {
        tracing::info!("Shutting down event bus");
        self.shutdown_token.cancel();
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
