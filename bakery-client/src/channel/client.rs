//! Event channel client
//!
//! One background read task per channel. Incoming `Event` frames are
//! decoded and dispatched synchronously to topic subscribers in
//! subscription order, so handlers observe events in arrival order. A
//! panicking handler is contained; the other handlers and the read loop
//! keep running.

use super::{ChannelError, ChannelState, transport};
use crate::ClientConfig;
use parking_lot::Mutex;
use shared::message::{BusMessage, HandshakeAckPayload, HandshakePayload, MessageType, PROTOCOL_VERSION};
use shared::order::OrderEvent;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

type Handler = Box<dyn Fn(&OrderEvent) + Send + Sync + 'static>;

struct Subscription {
    id: u64,
    topic: String,
    handler: Handler,
}

/// Topic subscriber registry
#[derive(Default)]
struct SubscriberSet {
    subs: Mutex<Vec<Arc<Subscription>>>,
    next_id: AtomicU64,
}

impl SubscriberSet {
    fn add(&self, topic: String, handler: Handler) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.subs.lock().push(Arc::new(Subscription {
            id,
            topic,
            handler,
        }));
        id
    }

    fn remove(&self, id: u64) {
        self.subs.lock().retain(|s| s.id != id);
    }

    /// Deliver one event to every handler subscribed to its topic, in
    /// subscription order. The registry lock is not held during handler
    /// calls, so a handler may subscribe or drop guards.
    fn dispatch(&self, event: &OrderEvent) {
        let snapshot: Vec<Arc<Subscription>> = self.subs.lock().clone();
        let topic = event.topic();
        for sub in snapshot.iter().filter(|s| s.topic == topic) {
            if catch_unwind(AssertUnwindSafe(|| (sub.handler)(event))).is_err() {
                tracing::error!(topic = %sub.topic, sub_id = sub.id, "Event handler panicked");
            }
        }
    }
}

struct ChannelInner {
    addr: String,
    client_name: String,
    reconnect_attempts: u32,
    reconnect_delay: Duration,
    subscribers: SubscriberSet,
    state_tx: watch::Sender<ChannelState>,
    running: AtomicBool,
    shutdown: CancellationToken,
}

/// Client end of the order event channel
///
/// Cheap to clone; all clones share the connection and subscriber
/// registry.
#[derive(Clone)]
pub struct EventChannel {
    inner: Arc<ChannelInner>,
}

impl EventChannel {
    /// Create a channel for the given TCP address
    pub fn new(addr: impl Into<String>) -> Self {
        Self::with_options(
            addr,
            "bakery-client",
            5,
            Duration::from_secs(5),
        )
    }

    /// Create a channel from a [`ClientConfig`]
    ///
    /// Fails when the config carries no event channel address.
    pub fn from_config(config: &ClientConfig) -> Result<Self, ChannelError> {
        let addr = config
            .event_addr
            .as_ref()
            .ok_or_else(|| ChannelError::Connection("No event channel address configured".to_string()))?;
        Ok(Self::with_options(
            addr.clone(),
            config.client_name.clone(),
            config.reconnect_attempts,
            config.reconnect_delay,
        ))
    }

    fn with_options(
        addr: impl Into<String>,
        client_name: impl Into<String>,
        reconnect_attempts: u32,
        reconnect_delay: Duration,
    ) -> Self {
        let (state_tx, _) = watch::channel(ChannelState::Disconnected);
        Self {
            inner: Arc::new(ChannelInner {
                addr: addr.into(),
                client_name: client_name.into(),
                reconnect_attempts,
                reconnect_delay,
                subscribers: SubscriberSet::default(),
                state_tx,
                running: AtomicBool::new(false),
                shutdown: CancellationToken::new(),
            }),
        }
    }

    /// Connect and start the background read loop
    ///
    /// Idempotent: a no-op while the channel is connected or
    /// reconnecting. After `Exhausted`, calling this again starts a
    /// fresh connection attempt.
    pub async fn connect(&self) -> Result<(), ChannelError> {
        if self.inner.running.swap(true, Ordering::SeqCst) {
            tracing::debug!("Channel already running; connect is a no-op");
            return Ok(());
        }

        let stream = match establish(&self.inner).await {
            Ok(stream) => stream,
            Err(e) => {
                self.inner.running.store(false, Ordering::SeqCst);
                return Err(e);
            }
        };

        self.inner.state_tx.send_replace(ChannelState::Connected);
        tracing::info!(addr = %self.inner.addr, "Event channel connected");

        let inner = self.inner.clone();
        tokio::spawn(read_loop(inner, stream));
        Ok(())
    }

    /// Subscribe a handler to one topic
    ///
    /// The returned guard unsubscribes on drop.
    pub fn subscribe<F>(&self, topic: impl Into<String>, handler: F) -> SubscriptionGuard
    where
        F: Fn(&OrderEvent) + Send + Sync + 'static,
    {
        let id = self
            .inner
            .subscribers
            .add(topic.into(), Box::new(handler));
        SubscriptionGuard {
            id,
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Watch the connection state
    ///
    /// Surfaces watch for [`ChannelState::Exhausted`] to fall back to
    /// polling.
    pub fn state(&self) -> watch::Receiver<ChannelState> {
        self.inner.state_tx.subscribe()
    }

    /// Whether the channel is currently connected
    pub fn is_connected(&self) -> bool {
        *self.inner.state_tx.borrow() == ChannelState::Connected
    }

    /// Stop the read loop and drop the connection
    pub fn close(&self) {
        self.inner.shutdown.cancel();
    }
}

impl std::fmt::Debug for EventChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventChannel")
            .field("addr", &self.inner.addr)
            .field("state", &*self.inner.state_tx.borrow())
            .finish()
    }
}

/// Unsubscribes its handler when dropped
#[must_use = "dropping the guard unsubscribes the handler"]
pub struct SubscriptionGuard {
    id: u64,
    inner: Weak<ChannelInner>,
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        if let Some(inner) = self.inner.upgrade() {
            inner.subscribers.remove(self.id);
        }
    }
}

/// Open a TCP connection and run the protocol handshake
async fn establish(inner: &ChannelInner) -> Result<TcpStream, ChannelError> {
    let mut stream = TcpStream::connect(&inner.addr)
        .await
        .map_err(|e| ChannelError::Connection(format!("Connect to {} failed: {}", inner.addr, e)))?;

    let payload = HandshakePayload {
        version: PROTOCOL_VERSION,
        client_name: Some(inner.client_name.clone()),
        client_version: Some(env!("CARGO_PKG_VERSION").to_string()),
    };
    transport::write_message(&mut stream, &BusMessage::handshake(&payload)).await?;

    let reply = transport::read_message(&mut stream).await?;
    if reply.message_type != MessageType::HandshakeAck {
        return Err(ChannelError::InvalidFrame(format!(
            "Expected handshake ack, got {}",
            reply.message_type
        )));
    }
    let ack: HandshakeAckPayload = reply
        .decode()
        .map_err(|e| ChannelError::InvalidFrame(format!("Bad handshake ack: {}", e)))?;
    if !ack.accepted {
        return Err(ChannelError::HandshakeRejected(
            ack.message.unwrap_or_else(|| "no reason given".to_string()),
        ));
    }

    Ok(stream)
}

async fn read_loop(inner: Arc<ChannelInner>, mut stream: TcpStream) {
    loop {
        tokio::select! {
            _ = inner.shutdown.cancelled() => {
                inner.running.store(false, Ordering::SeqCst);
                inner.state_tx.send_replace(ChannelState::Disconnected);
                tracing::info!("Event channel closed");
                return;
            }
            msg = transport::read_message(&mut stream) => match msg {
                Ok(msg) if msg.message_type == MessageType::Event => {
                    match msg.decode::<OrderEvent>() {
                        Ok(event) => {
                            tracing::trace!(topic = %event.topic(), order_id = event.order.id, "Event received");
                            inner.subscribers.dispatch(&event);
                        }
                        Err(e) => {
                            tracing::warn!("Undecodable event payload: {}", e);
                        }
                    }
                }
                Ok(other) => {
                    tracing::trace!("Ignoring {} frame", other.message_type);
                }
                Err(e) => {
                    tracing::warn!("Event channel connection lost: {}", e);
                    match reconnect(&inner).await {
                        Some(new_stream) => stream = new_stream,
                        None => return,
                    }
                }
            }
        }
    }
}

/// Fixed-delay reconnect, bounded by the configured attempt count
///
/// Returns the fresh stream, or `None` when the bound is exhausted or
/// the channel was closed while waiting.
async fn reconnect(inner: &Arc<ChannelInner>) -> Option<TcpStream> {
    inner.state_tx.send_replace(ChannelState::Reconnecting);

    for attempt in 1..=inner.reconnect_attempts {
        tokio::select! {
            _ = inner.shutdown.cancelled() => {
                inner.running.store(false, Ordering::SeqCst);
                inner.state_tx.send_replace(ChannelState::Disconnected);
                return None;
            }
            _ = tokio::time::sleep(inner.reconnect_delay) => {}
        }

        match establish(inner).await {
            Ok(stream) => {
                tracing::info!(attempt, "Event channel reconnected");
                inner.state_tx.send_replace(ChannelState::Connected);
                return Some(stream);
            }
            Err(e) => {
                tracing::warn!(
                    attempt,
                    max = inner.reconnect_attempts,
                    "Reconnect attempt failed: {}",
                    e
                );
            }
        }
    }

    tracing::error!(
        attempts = inner.reconnect_attempts,
        "Reconnect bound exhausted; falling back to polling"
    );
    inner.running.store(false, Ordering::SeqCst);
    inner.state_tx.send_replace(ChannelState::Exhausted);
    None
}
