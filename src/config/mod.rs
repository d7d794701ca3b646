use std::env;
use std::net::SocketAddr;
use std::time::Duration;

pub mod cors;
pub mod security;

pub use cors::create_cors_layer;
pub use security::create_security_headers_layer;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3001";
const DEFAULT_STORE_TIMEOUT_MS: u64 = 5_000;

pub struct Config {
    pub database_url: String,
    pub bind_addr: SocketAddr,
    /// Upper bound on any single store read/write; a timed-out call is a
    /// retryable failure, never treated as success.
    pub store_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Self {
        Self::build(
            env::var("DATABASE_URL").ok(),
            env::var("BIND_ADDR").ok(),
            env::var("STORE_TIMEOUT_MS").ok(),
        )
    }

    fn build(
        database_url: Option<String>,
        bind_addr: Option<String>,
        store_timeout_ms: Option<String>,
    ) -> Self {
        let bind_addr = bind_addr
            .and_then(|addr| addr.parse().ok())
            .unwrap_or_else(|| {
                DEFAULT_BIND_ADDR
                    .parse()
                    .unwrap_or_else(|_| SocketAddr::from(([0, 0, 0, 0], 3001)))
            });

        let store_timeout_ms = store_timeout_ms
            .and_then(|ms| ms.parse().ok())
            .unwrap_or(DEFAULT_STORE_TIMEOUT_MS);

        Self {
            database_url: database_url
                .unwrap_or_else(|| "postgres://localhost/entrada".to_string()),
            bind_addr,
            store_timeout: Duration::from_millis(store_timeout_ms),
        }
    }
}
