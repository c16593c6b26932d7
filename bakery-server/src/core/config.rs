use crate::auth::JwtConfig;

/// Server configuration
///
/// # Environment variables
///
/// Every field can be overridden through the environment:
///
/// | Variable | Default | Meaning |
/// |----------|---------|---------|
/// | WORK_DIR | /var/lib/bakery | Work directory (database, logs) |
/// | HTTP_PORT | 3000 | HTTP API port |
/// | EVENT_TCP_PORT | 8081 | Event channel TCP port |
/// | EVENT_CHANNEL_CAPACITY | 1024 | Broadcast channel capacity |
/// | PAYMENT_API_BASE | https://api.stripe.com | Payment processor base URL |
/// | PAYMENT_SECRET_KEY | (empty) | Payment processor secret key |
/// | PAYMENT_CURRENCY | eur | Charge currency |
/// | REQUEST_TIMEOUT_MS | 30000 | Outbound HTTP timeout (ms) |
/// | ENVIRONMENT | development | Runtime environment |
///
/// # Example
///
/// ```ignore
/// WORK_DIR=/data/bakery HTTP_PORT=8080 cargo run
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// Work directory for the database and log files
    pub work_dir: String,
    /// HTTP API port
    pub http_port: u16,
    /// Event channel TCP port (admin surfaces connect here)
    pub event_tcp_port: u16,
    /// Capacity of the event broadcast channel
    pub event_channel_capacity: usize,
    /// JWT configuration
    pub jwt: JwtConfig,
    /// Payment processor base URL
    pub payment_api_base: String,
    /// Payment processor secret key
    pub payment_secret_key: String,
    /// Charge currency (ISO code, lowercase)
    pub payment_currency: String,
    /// Outbound request timeout (milliseconds)
    pub request_timeout_ms: u64,
    /// Runtime environment: development | staging | production
    pub environment: String,
}

impl Config {
    /// Load configuration from the environment, falling back to defaults
    pub fn from_env() -> Self {
        Self {
            work_dir: std::env::var("WORK_DIR").unwrap_or_else(|_| "/var/lib/bakery".into()),
            http_port: std::env::var("HTTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
            event_tcp_port: std::env::var("EVENT_TCP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8081),
            event_channel_capacity: std::env::var("EVENT_CHANNEL_CAPACITY")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(1024),
            jwt: JwtConfig::default(),
            payment_api_base: std::env::var("PAYMENT_API_BASE")
                .unwrap_or_else(|_| "https://api.stripe.com".into()),
            payment_secret_key: std::env::var("PAYMENT_SECRET_KEY").unwrap_or_default(),
            payment_currency: std::env::var("PAYMENT_CURRENCY").unwrap_or_else(|_| "eur".into()),
            request_timeout_ms: std::env::var("REQUEST_TIMEOUT_MS")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(30000),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into()),
        }
    }

    /// Database file path under the work directory
    pub fn database_path(&self) -> std::path::PathBuf {
        std::path::Path::new(&self.work_dir).join("bakery.redb")
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
