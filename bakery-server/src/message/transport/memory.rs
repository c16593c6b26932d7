//! In-process transport

use std::sync::Arc;

use async_trait::async_trait;
use shared::message::BusMessage;
use tokio::sync::Mutex;
use tokio::sync::broadcast;

use super::Transport;
use crate::utils::AppError;

/// Same-process transport backed by the bus broadcast channel
///
/// Used by tests and by in-process admin surfaces that do not need the
/// TCP hop.
#[derive(Debug, Clone)]
pub struct MemoryTransport {
    rx: Arc<Mutex<broadcast::Receiver<BusMessage>>>,
}

impl MemoryTransport {
    pub fn new(tx: &broadcast::Sender<BusMessage>) -> Self {
        Self {
            rx: Arc::new(Mutex::new(tx.subscribe())),
        }
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn read_message(&self) -> Result<BusMessage, AppError> {
        let mut rx = self.rx.lock().await;
        loop {
            match rx.recv().await {
                Ok(msg) => return Ok(msg),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(dropped = n, "Memory transport lagged, continuing");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    return Err(AppError::ClientDisconnected);
                }
            }
        }
    }

    async fn write_message(&self, _msg: &BusMessage) -> Result<(), AppError> {
        // Receive-only; the publish side goes through the bus
        Ok(())
    }

    async fn close(&self) -> Result<(), AppError> {
        Ok(())
    }
}
