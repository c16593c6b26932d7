//! Event channel message types
//!
//! These types are shared between the server and clients and travel over
//! both in-process (memory) and network (TCP) transports.
//!
//! Wire framing (implemented by each side's transport layer):
//!
//! ```text
//! ┌──────────┬─────────────┬────────────────┬──────────┬─────────┐
//! │ type (1) │ req id (16) │ corr id (16)   │ len (4)  │ payload │
//! └──────────┴─────────────┴────────────────┴──────────┴─────────┘
//! ```

pub mod payload;
pub use payload::*;

use serde::de::DeserializeOwned;
use serde::Serialize;
use uuid::Uuid;

use crate::order::OrderEvent;

/// Protocol version, checked at handshake
pub const PROTOCOL_VERSION: u16 = 1;

/// Upper bound on a frame's payload length
///
/// An order snapshot is a few KiB; readers reject anything above this
/// before allocating, so a corrupt length field cannot ask for 4 GiB.
pub const MAX_PAYLOAD_BYTES: usize = 1024 * 1024;

/// Message type discriminant (first byte on the wire)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    /// Connection handshake (client -> server)
    Handshake = 0,
    /// Topic publish carrying an [`OrderEvent`] (server -> client)
    Event = 1,
    /// Handshake acknowledgement (server -> client)
    HandshakeAck = 2,
}

impl TryFrom<u8> for MessageType {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(MessageType::Handshake),
            1 => Ok(MessageType::Event),
            2 => Ok(MessageType::HandshakeAck),
            _ => Err(()),
        }
    }
}

impl std::fmt::Display for MessageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MessageType::Handshake => write!(f, "handshake"),
            MessageType::Event => write!(f, "event"),
            MessageType::HandshakeAck => write!(f, "handshake_ack"),
        }
    }
}

/// Framed channel message
#[derive(Debug, Clone)]
pub struct BusMessage {
    pub message_type: MessageType,
    /// Message id, for tracing
    pub request_id: Uuid,
    /// Set on replies (handshake ack)
    pub correlation_id: Option<Uuid>,
    /// JSON-encoded payload
    pub payload: Vec<u8>,
}

impl BusMessage {
    pub fn new(message_type: MessageType, payload: Vec<u8>) -> Self {
        Self {
            message_type,
            request_id: Uuid::new_v4(),
            correlation_id: None,
            payload,
        }
    }

    /// Build a handshake message
    pub fn handshake(payload: &HandshakePayload) -> Self {
        Self::new(MessageType::Handshake, encode(payload))
    }

    /// Build a handshake acknowledgement correlated to the request
    pub fn handshake_ack(payload: &HandshakeAckPayload, request_id: Uuid) -> Self {
        let mut msg = Self::new(MessageType::HandshakeAck, encode(payload));
        msg.correlation_id = Some(request_id);
        msg
    }

    /// Build a topic publish for an order event
    ///
    /// The payload is the `{ "event": ..., "order": ... }` JSON object.
    pub fn event(event: &OrderEvent) -> Self {
        Self::new(MessageType::Event, encode(event))
    }

    /// Decode the JSON payload into the expected type
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.payload)
    }
}

fn encode<T: Serialize>(value: &T) -> Vec<u8> {
    // Payload types are plain data structs; serialization cannot fail
    serde_json::to_vec(value).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_type_roundtrip() {
        for t in [
            MessageType::Handshake,
            MessageType::Event,
            MessageType::HandshakeAck,
        ] {
            assert_eq!(MessageType::try_from(t as u8), Ok(t));
        }
        assert!(MessageType::try_from(99).is_err());
    }

    #[test]
    fn handshake_ack_carries_correlation() {
        let hs = BusMessage::handshake(&HandshakePayload {
            version: PROTOCOL_VERSION,
            client_name: Some("test".to_string()),
            client_version: None,
        });
        let ack = BusMessage::handshake_ack(
            &HandshakeAckPayload {
                accepted: true,
                server_version: PROTOCOL_VERSION,
                message: None,
            },
            hs.request_id,
        );
        assert_eq!(ack.correlation_id, Some(hs.request_id));
    }
}
