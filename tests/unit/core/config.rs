//! Unit tests for service configuration defaults

use signalfeed::config::{ServiceConfig, DEFAULT_WINDOW_SIZE};
use std::time::Duration;

#[test]
fn test_service_config_default() {
    let config = ServiceConfig::default();
    assert_eq!(config.port, 8080);
    assert_eq!(config.window_size, DEFAULT_WINDOW_SIZE);
    assert_eq!(config.window_size, 100);
    assert!(config.query_limit_max >= config.window_size);
    assert!(config.database_url.is_none());
    assert!(config.dashboard_token.is_none());
    assert_eq!(config.viewer_ping_interval, Duration::from_secs(30));
    assert_eq!(config.listen_address(), "0.0.0.0:8080");
}

#[test]
fn test_production_log_format_selection() {
    assert!(signalfeed::logging::is_production("production"));
    assert!(signalfeed::logging::is_production("prod"));
    assert!(!signalfeed::logging::is_production("sandbox"));
}
