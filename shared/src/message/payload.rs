use serde::{Deserialize, Serialize};

/// Handshake payload (client -> server)
///
/// Carries the client's protocol version so the server can reject
/// incompatible clients before any events flow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandshakePayload {
    /// Protocol version
    pub version: u16,
    /// Client name/identifier
    pub client_name: Option<String>,
    /// Client version
    pub client_version: Option<String>,
}

/// Handshake acknowledgement (server -> client)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandshakeAckPayload {
    pub accepted: bool,
    pub server_version: u16,
    /// Rejection reason when `accepted` is false
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}
