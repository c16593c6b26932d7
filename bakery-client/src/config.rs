//! Client configuration

use std::time::Duration;

/// Configuration for connecting to the bakery server
///
/// Covers both surfaces: the REST API (`base_url`) and the event channel
/// (`event_addr`). Builder-style `with_*` methods override the defaults.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Server base URL (e.g., "http://localhost:3000")
    pub base_url: String,

    /// Event channel TCP address (e.g., "127.0.0.1:8081")
    pub event_addr: Option<String>,

    /// JWT token for authentication
    pub token: Option<String>,

    /// Request timeout in seconds
    pub timeout: u64,

    /// Name announced during the event channel handshake
    pub client_name: String,

    /// Reconnect attempts after a dropped channel connection before
    /// giving up
    pub reconnect_attempts: u32,

    /// Fixed delay between reconnect attempts
    pub reconnect_delay: Duration,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            event_addr: None,
            token: None,
            timeout: 30,
            client_name: "bakery-client".to_string(),
            reconnect_attempts: 5,
            reconnect_delay: Duration::from_secs(5),
        }
    }

    /// Set the event channel TCP address
    pub fn with_event_addr(mut self, addr: impl Into<String>) -> Self {
        self.event_addr = Some(addr.into());
        self
    }

    /// Set the JWT token
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Set the request timeout
    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.timeout = seconds;
        self
    }

    /// Set the handshake client name
    pub fn with_client_name(mut self, name: impl Into<String>) -> Self {
        self.client_name = name.into();
        self
    }

    /// Set the reconnect bound (attempts after a drop)
    pub fn with_reconnect_attempts(mut self, attempts: u32) -> Self {
        self.reconnect_attempts = attempts;
        self
    }

    /// Set the delay between reconnect attempts
    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    /// Create an HTTP client from this configuration
    pub fn build_http_client(&self) -> super::HttpClient {
        super::HttpClient::new(self)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new("http://localhost:3000")
    }
}
