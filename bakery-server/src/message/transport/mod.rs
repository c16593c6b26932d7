//! Transport abstraction for the event channel
//!
//! ```text
//!         ┌────────────────────┐
//!         │   Transport Trait  │
//!         └────────┬───────────┘
//!                  │
//!          ┌───────┴────────┐
//!          ▼                ▼
//!    TcpTransport     MemoryTransport
//!    (network)        (same process)
//! ```

mod memory;
mod tcp;

pub use memory::MemoryTransport;
pub use tcp::TcpTransport;

use async_trait::async_trait;
use shared::message::BusMessage;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use uuid::Uuid;

use crate::utils::AppError;

/// One end of an event channel connection
#[async_trait]
pub trait Transport: Send + Sync + std::fmt::Debug {
    /// Read one message
    async fn read_message(&self) -> Result<BusMessage, AppError>;

    /// Write one message
    async fn write_message(&self, msg: &BusMessage) -> Result<(), AppError>;

    /// Close the connection
    async fn close(&self) -> Result<(), AppError>;

    /// Peer address, when the transport has one
    fn peer_addr(&self) -> Option<String> {
        None
    }
}

// ========== Framing helpers ==========

/// Read a framed [`BusMessage`] from an async stream
pub(crate) async fn read_from_stream<R: AsyncReadExt + Unpin>(
    reader: &mut R,
) -> Result<BusMessage, AppError> {
    use shared::message::MessageType;

    // Message type (1 byte)
    let mut type_buf = [0u8; 1];
    match reader.read_exact(&mut type_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            return Err(AppError::ClientDisconnected);
        }
        Err(e) => {
            return Err(AppError::internal(format!("Read type failed: {}", e)));
        }
    }

    let message_type = MessageType::try_from(type_buf[0])
        .map_err(|_| AppError::invalid("Invalid message type"))?;

    // Request ID (16 bytes)
    let mut uuid_buf = [0u8; 16];
    reader
        .read_exact(&mut uuid_buf)
        .await
        .map_err(|e| AppError::internal(format!("Read request id failed: {}", e)))?;
    let request_id = Uuid::from_bytes(uuid_buf);

    // Correlation ID (16 bytes, nil means none)
    let mut correlation_buf = [0u8; 16];
    reader
        .read_exact(&mut correlation_buf)
        .await
        .map_err(|e| AppError::internal(format!("Read correlation id failed: {}", e)))?;
    let correlation_id_raw = Uuid::from_bytes(correlation_buf);
    let correlation_id = if correlation_id_raw.is_nil() {
        None
    } else {
        Some(correlation_id_raw)
    };

    // Payload length (4 bytes)
    let mut len_buf = [0u8; 4];
    reader
        .read_exact(&mut len_buf)
        .await
        .map_err(|e| AppError::internal(format!("Read len failed: {}", e)))?;
    let len = u32::from_le_bytes(len_buf) as usize;
    if len > shared::message::MAX_PAYLOAD_BYTES {
        return Err(AppError::invalid(format!(
            "Payload length {} exceeds the {} byte limit",
            len,
            shared::message::MAX_PAYLOAD_BYTES
        )));
    }

    // Payload
    let mut payload = vec![0u8; len];
    reader
        .read_exact(&mut payload)
        .await
        .map_err(|e| AppError::internal(format!("Read payload failed: {}", e)))?;

    Ok(BusMessage {
        message_type,
        request_id,
        correlation_id,
        payload,
    })
}

/// Write a framed [`BusMessage`] to an async stream
pub(crate) async fn write_to_stream<W: AsyncWriteExt + Unpin>(
    writer: &mut W,
    msg: &BusMessage,
) -> Result<(), AppError> {
    let mut data = Vec::new();
    data.push(msg.message_type as u8);
    data.extend_from_slice(msg.request_id.as_bytes());

    // Nil UUID stands for no correlation
    let correlation_bytes = msg.correlation_id.unwrap_or(Uuid::nil()).into_bytes();
    data.extend_from_slice(&correlation_bytes);

    data.extend_from_slice(&(msg.payload.len() as u32).to_le_bytes());
    data.extend_from_slice(&msg.payload);

    writer
        .write_all(&data)
        .await
        .map_err(|e| AppError::internal(format!("Write failed: {}", e)))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::message::MessageType;

    #[tokio::test]
    async fn framing_roundtrip() {
        let (mut a, mut b) = tokio::io::duplex(1024);

        let msg = BusMessage::new(MessageType::Event, b"{}".to_vec());
        write_to_stream(&mut a, &msg).await.unwrap();

        let read = read_from_stream(&mut b).await.unwrap();
        assert_eq!(read.message_type, MessageType::Event);
        assert_eq!(read.request_id, msg.request_id);
        assert_eq!(read.payload, msg.payload);
    }

    #[tokio::test]
    async fn oversized_length_is_rejected_before_allocation() {
        let (mut a, mut b) = tokio::io::duplex(1024);

        // Header claiming a 4 GiB payload: type, ids, length
        let mut header = vec![MessageType::Event as u8];
        header.extend_from_slice(&[0u8; 32]);
        header.extend_from_slice(&u32::MAX.to_le_bytes());
        a.write_all(&header).await.unwrap();

        let err = read_from_stream(&mut b).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }
}
