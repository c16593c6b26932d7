//! Event channel TCP server
//!
//! Accepts subscriber connections, performs the protocol handshake and
//! forwards order events to each subscriber until it disconnects.

use std::net::SocketAddr;
use std::sync::Arc;

use dashmap::DashMap;
use shared::message::{
    BusMessage, HandshakeAckPayload, HandshakePayload, MessageType, PROTOCOL_VERSION,
};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::bus::EventBus;
use super::transport::{TcpTransport, Transport};
use crate::utils::AppError;

impl EventBus {
    /// Start the TCP server
    ///
    /// 1. Accepts connections
    /// 2. Validates the protocol handshake
    /// 3. Forwards broadcast events to each connected subscriber
    /// 4. Shuts down on cancellation
    pub async fn start_tcp_server(&self) -> Result<(), AppError> {
        let listener = TcpListener::bind(&self.config.tcp_listen_addr)
            .await
            .map_err(|e| AppError::internal(format!("Failed to bind: {}", e)))?;

        tracing::info!(
            "Event channel TCP server listening on {}",
            self.config.tcp_listen_addr
        );

        self.accept_loop(listener).await
    }

    async fn accept_loop(&self, listener: TcpListener) -> Result<(), AppError> {
        loop {
            tokio::select! {
                _ = self.shutdown_token().cancelled() => {
                    tracing::info!("Event channel TCP server shutting down");
                    break;
                }

                result = listener.accept() => {
                    match result {
                        Ok((stream, addr)) => {
                            tracing::debug!("Subscriber connected: {}", addr);
                            self.spawn_client_handler(stream, addr);
                        }
                        Err(e) => {
                            tracing::error!("Failed to accept connection: {}", e);
                        }
                    }
                }
            }
        }

        Ok(())
    }

    fn spawn_client_handler(&self, stream: TcpStream, addr: SocketAddr) {
        let server_tx = self.sender().clone();
        let shutdown_token = self.shutdown_token().clone();
        let clients = self.clients.clone();

        tokio::spawn(async move {
            if let Err(e) =
                handle_client_connection(stream, addr, server_tx, shutdown_token, clients).await
            {
                tracing::debug!("Subscriber {} handler finished: {}", addr, e);
            }
        });
    }
}

async fn handle_client_connection(
    stream: TcpStream,
    addr: SocketAddr,
    server_tx: broadcast::Sender<BusMessage>,
    shutdown_token: CancellationToken,
    clients: Arc<DashMap<String, Arc<dyn Transport>>>,
) -> Result<(), AppError> {
    let transport: Arc<dyn Transport> = Arc::new(TcpTransport::from_stream(stream));

    let client_id = perform_handshake(&transport, addr).await?;

    clients.insert(client_id.clone(), transport.clone());
    tracing::debug!("Subscriber registered: {}", client_id);

    // Shared disconnect signal between the read and forward halves
    let disconnect_token = CancellationToken::new();

    let forward_handle = spawn_event_forwarder(
        transport.clone(),
        server_tx.subscribe(),
        shutdown_token.clone(),
        client_id.clone(),
        disconnect_token.clone(),
    );

    watch_for_disconnect(&transport, &shutdown_token, &client_id, disconnect_token).await;

    drop(forward_handle);
    let _ = transport.close().await;
    clients.remove(&client_id);
    tracing::debug!(client_id = %client_id, "Subscriber removed from registry");

    Ok(())
}

/// Validate the handshake and acknowledge it
async fn perform_handshake(
    transport: &Arc<dyn Transport>,
    addr: SocketAddr,
) -> Result<String, AppError> {
    tracing::debug!("Waiting for handshake from {}", addr);

    let msg = transport.read_message().await.map_err(|e| {
        tracing::warn!("Subscriber {} handshake error: {}", addr, e);
        e
    })?;

    if msg.message_type != MessageType::Handshake {
        tracing::warn!(
            "Subscriber {} failed to handshake: expected handshake, got {}",
            addr,
            msg.message_type
        );
        return Err(AppError::invalid("Expected handshake message"));
    }

    let payload: HandshakePayload = msg.decode().map_err(|e| {
        tracing::warn!("Subscriber {} sent invalid handshake payload: {}", addr, e);
        AppError::invalid(format!("Invalid handshake payload: {}", e))
    })?;

    if payload.version != PROTOCOL_VERSION {
        tracing::warn!(
            "Subscriber {} protocol version mismatch: expected {}, got {}",
            addr,
            PROTOCOL_VERSION,
            payload.version
        );

        send_handshake_rejection(
            transport,
            &msg,
            format!(
                "Protocol version mismatch: server={}, client={}",
                PROTOCOL_VERSION, payload.version
            ),
        )
        .await;

        return Err(AppError::invalid("Protocol version mismatch"));
    }

    let client_id = payload
        .client_name
        .clone()
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    tracing::debug!(
        "Subscriber {} handshake success (v{}, id: {})",
        addr,
        payload.version,
        client_id
    );

    let ack = BusMessage::handshake_ack(
        &HandshakeAckPayload {
            accepted: true,
            server_version: PROTOCOL_VERSION,
            message: None,
        },
        msg.request_id,
    );
    if let Err(e) = transport.write_message(&ack).await {
        tracing::warn!("Failed to send handshake ack: {}", e);
    }

    Ok(client_id)
}

/// Delay before closing so the client can read the rejection
const HANDSHAKE_ERROR_DELAY_MS: u64 = 100;

async fn send_handshake_rejection(transport: &Arc<dyn Transport>, msg: &BusMessage, reason: String) {
    let ack = BusMessage::handshake_ack(
        &HandshakeAckPayload {
            accepted: false,
            server_version: PROTOCOL_VERSION,
            message: Some(reason),
        },
        msg.request_id,
    );

    if let Err(e) = transport.write_message(&ack).await {
        tracing::error!("Failed to send handshake rejection: {}", e);
    }

    tokio::time::sleep(tokio::time::Duration::from_millis(HANDSHAKE_ERROR_DELAY_MS)).await;
}

/// Forward broadcast events to one subscriber
fn spawn_event_forwarder(
    transport: Arc<dyn Transport>,
    mut rx: broadcast::Receiver<BusMessage>,
    shutdown_token: CancellationToken,
    client_id: String,
    disconnect_token: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = shutdown_token.cancelled() => {
                    tracing::debug!("Subscriber {} forwarder shutting down", client_id);
                    break;
                }
                _ = disconnect_token.cancelled() => {
                    tracing::debug!(client_id = %client_id, "Subscriber disconnected, forwarder stopping");
                    break;
                }
                msg_result = rx.recv() => {
                    match msg_result {
                        Ok(msg) => {
                            if let Err(e) = transport.write_message(&msg).await {
                                tracing::debug!(client_id = %client_id, "Subscriber write failed: {}", e);
                                break;
                            }
                        }
                        Err(broadcast::error::RecvError::Lagged(n)) => {
                            // Slow subscriber; it catches up by polling the
                            // REST surface through the same merge path
                            tracing::warn!(
                                client_id = %client_id,
                                dropped_messages = n,
                                "Subscriber lagged, events dropped"
                            );
                        }
                        Err(broadcast::error::RecvError::Closed) => {
                            tracing::debug!(client_id = %client_id, "Broadcast channel closed");
                            break;
                        }
                    }
                }
            }
        }

        tracing::debug!(client_id = %client_id, "Subscriber forwarder stopped");
    })
}

/// Drain the read half until the subscriber hangs up
///
/// Subscribers have nothing to say after the handshake; any payload is
/// dropped, and a read error marks the connection dead.
async fn watch_for_disconnect(
    transport: &Arc<dyn Transport>,
    shutdown_token: &CancellationToken,
    client_id: &str,
    disconnect_token: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = shutdown_token.cancelled() => {
                break;
            }

            read_result = transport.read_message() => {
                match read_result {
                    Ok(msg) => {
                        tracing::debug!(
                            client_id = %client_id,
                            message_type = %msg.message_type,
                            "Ignoring unexpected subscriber message"
                        );
                    }
                    Err(e) => {
                        if e.is_disconnect() {
                            tracing::debug!(client_id = %client_id, "Subscriber disconnected");
                        } else {
                            tracing::debug!(client_id = %client_id, "Subscriber read error: {}", e);
                        }
                        disconnect_token.cancel();
                        break;
                    }
                }
            }
        }
    }
}
