//! Wire framing for the event channel
//!
//! ```text
//! ┌──────────┬─────────────┬────────────────┬──────────┬─────────┐
//! │ type (1) │ req id (16) │ corr id (16)   │ len (4)  │ payload │
//! └──────────┴─────────────┴────────────────┴──────────┴─────────┘
//! ```
//!
//! The correlation id is nil (all zeroes) when absent. Payload length is
//! little-endian.

use super::ChannelError;
use shared::message::{BusMessage, MAX_PAYLOAD_BYTES, MessageType};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use uuid::Uuid;

/// Read one framed [`BusMessage`] from an async stream
pub async fn read_message<R: AsyncReadExt + Unpin>(
    reader: &mut R,
) -> Result<BusMessage, ChannelError> {
    // Message type (1 byte)
    let mut type_buf = [0u8; 1];
    match reader.read_exact(&mut type_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            return Err(ChannelError::Disconnected);
        }
        Err(e) => return Err(ChannelError::Io(e)),
    }

    let message_type = MessageType::try_from(type_buf[0])
        .map_err(|_| ChannelError::InvalidFrame(format!("Unknown message type {}", type_buf[0])))?;

    // Request ID (16 bytes)
    let mut uuid_buf = [0u8; 16];
    read_all(reader, &mut uuid_buf).await?;
    let request_id = Uuid::from_bytes(uuid_buf);

    // Correlation ID (16 bytes, nil means none)
    let mut correlation_buf = [0u8; 16];
    read_all(reader, &mut correlation_buf).await?;
    let correlation_id_raw = Uuid::from_bytes(correlation_buf);
    let correlation_id = if correlation_id_raw.is_nil() {
        None
    } else {
        Some(correlation_id_raw)
    };

    // Payload length (4 bytes)
    let mut len_buf = [0u8; 4];
    read_all(reader, &mut len_buf).await?;
    let len = u32::from_le_bytes(len_buf) as usize;
    if len > MAX_PAYLOAD_BYTES {
        return Err(ChannelError::InvalidFrame(format!(
            "Payload length {} exceeds the {} byte limit",
            len, MAX_PAYLOAD_BYTES
        )));
    }

    // Payload
    let mut payload = vec![0u8; len];
    read_all(reader, &mut payload).await?;

    Ok(BusMessage {
        message_type,
        request_id,
        correlation_id,
        payload,
    })
}

/// Write one framed [`BusMessage`] to an async stream
pub async fn write_message<W: AsyncWriteExt + Unpin>(
    writer: &mut W,
    msg: &BusMessage,
) -> Result<(), ChannelError> {
    let mut data = Vec::with_capacity(37 + msg.payload.len());
    data.push(msg.message_type as u8);
    data.extend_from_slice(msg.request_id.as_bytes());

    // Nil UUID stands for no correlation
    let correlation_bytes = msg.correlation_id.unwrap_or(Uuid::nil()).into_bytes();
    data.extend_from_slice(&correlation_bytes);

    data.extend_from_slice(&(msg.payload.len() as u32).to_le_bytes());
    data.extend_from_slice(&msg.payload);

    writer.write_all(&data).await?;
    writer.flush().await?;
    Ok(())
}

/// EOF in the middle of a frame means the peer went away
async fn read_all<R: AsyncReadExt + Unpin>(
    reader: &mut R,
    buf: &mut [u8],
) -> Result<(), ChannelError> {
    match reader.read_exact(buf).await {
        Ok(_) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Err(ChannelError::Disconnected),
        Err(e) => Err(ChannelError::Io(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::message::{HandshakePayload, PROTOCOL_VERSION};

    #[tokio::test]
    async fn test_frame_roundtrip() {
        let (mut a, mut b) = tokio::io::duplex(1024);

        let msg = BusMessage::handshake(&HandshakePayload {
            version: PROTOCOL_VERSION,
            client_name: Some("test".to_string()),
            client_version: None,
        });

        write_message(&mut a, &msg).await.unwrap();
        let read = read_message(&mut b).await.unwrap();

        assert_eq!(read.message_type, MessageType::Handshake);
        assert_eq!(read.request_id, msg.request_id);
        assert_eq!(read.correlation_id, None);
        assert_eq!(read.payload, msg.payload);
    }

    #[tokio::test]
    async fn test_oversized_length_is_rejected_before_allocation() {
        let (mut a, mut b) = tokio::io::duplex(1024);

        // Header claiming a 4 GiB payload: type, ids, length
        let mut header = vec![MessageType::Event as u8];
        header.extend_from_slice(&[0u8; 32]);
        header.extend_from_slice(&u32::MAX.to_le_bytes());
        a.write_all(&header).await.unwrap();

        let err = read_message(&mut b).await.unwrap_err();
        assert!(matches!(err, ChannelError::InvalidFrame(_)));
    }

    #[tokio::test]
    async fn test_peer_close_is_disconnect() {
        let (a, mut b) = tokio::io::duplex(1024);
        drop(a);

        let err = read_message(&mut b).await.unwrap_err();
        assert!(matches!(err, ChannelError::Disconnected));
    }
}
