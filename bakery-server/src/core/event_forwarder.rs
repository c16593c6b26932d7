//! Event forwarder
//!
//! Bridges the lifecycle manager's broadcast channel onto the event bus:
//!
//! ```text
//! OrdersManager (broadcast<OrderEvent>)
//!        │
//!        └── EventForwarder ──► EventBus ──► subscribers
//! ```
//!
//! Delivery is best-effort. A lagged forwarder means subscribers missed
//! events; they recover by polling the REST surface, which feeds the
//! same merge path on their side.

use shared::message::BusMessage;
use shared::order::OrderEvent;
use tokio::sync::broadcast;

use crate::message::EventBus;

pub struct EventForwarder {
    bus: EventBus,
}

impl EventForwarder {
    pub fn new(bus: EventBus) -> Self {
        Self { bus }
    }

    /// Run until the source channel closes
    pub async fn run(self, mut source: broadcast::Receiver<OrderEvent>) {
        tracing::info!("Event forwarder started");

        loop {
            match source.recv().await {
                Ok(event) => {
                    tracing::debug!(
                        event = %event.event,
                        order_id = event.order.id,
                        "Forwarding order event"
                    );
                    self.bus.publish(BusMessage::event(&event));
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "Event forwarder lagged, events skipped");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("Source channel closed, event forwarder stopping");
                    break;
                }
            }
        }
    }
}
