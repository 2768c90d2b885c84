//! Service configuration.

/// Service configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Address to listen on (default: "127.0.0.1:8000").
    pub listen_addr: String,

    /// Path to the `RocksDB` data directory (default: "/data/pointmart").
    pub data_dir: String,

    /// Base URL of the accrual system (default:
    /// "http://localhost:8081").
    pub accrual_address: String,

    /// Capacity of the order dispatch queue (default: 256).
    pub queue_capacity: usize,

    /// Secret key used to sign auth tokens.
    pub secret_key: String,

    /// CORS allowed origins.
    pub cors_origins: Vec<String>,

    /// Maximum request body size in bytes.
    pub max_body_bytes: usize,

    /// Request timeout in seconds.
    pub request_timeout_seconds: u64,
}

impl ServiceConfig {
    /// Load configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            listen_addr: std::env::var("RUN_ADDRESS").unwrap_or(defaults.listen_addr),
            data_dir: std::env::var("DATA_DIR").unwrap_or(defaults.data_dir),
            accrual_address: std::env::var("ACCRUAL_SYSTEM_ADDRESS")
                .unwrap_or(defaults.accrual_address),
            queue_capacity: std::env::var("ACCRUAL_QUEUE_SIZE")
                .ok()
                .and_then(|value| value.parse().ok())
                .unwrap_or(defaults.queue_capacity),
            secret_key: std::env::var("SECRET_KEY").unwrap_or(defaults.secret_key),
            cors_origins: std::env::var("CORS_ORIGINS")
                .map(|value| value.split(',').map(|s| s.trim().to_string()).collect())
                .unwrap_or(defaults.cors_origins),
            max_body_bytes: std::env::var("MAX_BODY_BYTES")
                .ok()
                .and_then(|value| value.parse().ok())
                .unwrap_or(defaults.max_body_bytes),
            request_timeout_seconds: std::env::var("REQUEST_TIMEOUT_SECONDS")
                .ok()
                .and_then(|value| value.parse().ok())
                .unwrap_or(defaults.request_timeout_seconds),
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:8000".into(),
            data_dir: "/data/pointmart".into(),
            accrual_address: "http://localhost:8081".into(),
            queue_capacity: 256,
            secret_key: "insecure-development-key".into(),
            cors_origins: vec!["*".into()],
            max_body_bytes: 64 * 1024,
            request_timeout_seconds: 30,
        }
    }
}
