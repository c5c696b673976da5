//! Environment-driven configuration.
//!
//! Values are read from the process environment (optionally seeded from a
//! `.env` file by the binaries). Malformed numbers fall back to defaults.

use std::env;
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_WINDOW_SIZE: usize = 100;
pub const DEFAULT_QUERY_LIMIT_MAX: usize = 1000;
pub const DEFAULT_VIEWER_QUEUE_CAPACITY: usize = 256;
pub const DEFAULT_MAX_PAYLOAD_BYTES: usize = 64 * 1024;

/// Deployment environment name (`production`, `sandbox`, ...)
pub fn get_environment() -> String {
    env::var("ENVIRONMENT").unwrap_or_else(|_| "sandbox".to_string())
}

/// PostgreSQL connection string, if one is configured
pub fn get_database_url() -> Option<String> {
    env::var("DATABASE_URL")
        .ok()
        .map(|url| url.trim().to_string())
        .filter(|url| !url.is_empty())
}

fn parse_env<T: FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => match raw.trim().parse::<T>() {
            Ok(value) => value,
            Err(_) => {
                warn!(key = key, value = %raw, "Invalid value in environment, using default");
                default
            }
        },
        Err(_) => default,
    }
}

/// Tunables for the HTTP server, the store and the realtime channel
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub bind_address: String,
    pub port: u16,
    pub database_url: Option<String>,
    pub db_connect_retries: usize,
    /// N: the viewer window size and default query limit
    pub window_size: usize,
    pub query_limit_max: usize,
    pub viewer_queue_capacity: usize,
    pub viewer_ping_interval: Duration,
    pub viewer_idle_timeout: Duration,
    pub max_payload_bytes: usize,
    pub dashboard_token: Option<String>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            database_url: None,
            db_connect_retries: 5,
            window_size: DEFAULT_WINDOW_SIZE,
            query_limit_max: DEFAULT_QUERY_LIMIT_MAX,
            viewer_queue_capacity: DEFAULT_VIEWER_QUEUE_CAPACITY,
            viewer_ping_interval: Duration::from_secs(30),
            viewer_idle_timeout: Duration::from_secs(90),
            max_payload_bytes: DEFAULT_MAX_PAYLOAD_BYTES,
            dashboard_token: None,
        }
    }
}

impl ServiceConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let window_size = parse_env("SIGNAL_WINDOW_SIZE", defaults.window_size).max(1);
        let query_limit_max = parse_env("QUERY_LIMIT_MAX", defaults.query_limit_max).max(window_size);

        Self {
            bind_address: env::var("BIND_ADDRESS").unwrap_or(defaults.bind_address),
            port: parse_env("PORT", defaults.port),
            database_url: get_database_url(),
            db_connect_retries: parse_env("DB_CONNECT_RETRIES", defaults.db_connect_retries),
            window_size,
            query_limit_max,
            viewer_queue_capacity: parse_env("VIEWER_QUEUE_CAPACITY", defaults.viewer_queue_capacity)
                .max(1),
            viewer_ping_interval: Duration::from_secs(
                parse_env("VIEWER_PING_INTERVAL_SECONDS", 30u64).max(1),
            ),
            viewer_idle_timeout: Duration::from_secs(
                parse_env("VIEWER_IDLE_TIMEOUT_SECONDS", 90u64).max(1),
            ),
            max_payload_bytes: parse_env("MAX_PAYLOAD_BYTES", defaults.max_payload_bytes),
            dashboard_token: env::var("DASHBOARD_TOKEN")
                .ok()
                .filter(|token| !token.trim().is_empty()),
        }
    }

    pub fn listen_address(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }
}
