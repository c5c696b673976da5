//! Test utilities for API server integration tests

use axum_test::TestServer;
use serde_json::{json, Value};
use signalfeed::config::ServiceConfig;
use signalfeed::core::http::{create_router, AppState};
use signalfeed::db::MemorySignalStore;
use signalfeed::metrics::Metrics;
use std::sync::Arc;

/// Test helper for API server integration tests
#[allow(dead_code)]
pub struct TestApiServer {
    pub server: TestServer,
    pub metrics: Arc<Metrics>,
    pub store: Arc<MemorySignalStore>,
    pub state: AppState,
}

impl TestApiServer {
    pub async fn new() -> Self {
        Self::with_config(ServiceConfig::default()).await
    }

    pub async fn with_config(config: ServiceConfig) -> Self {
        let metrics = Arc::new(Metrics::new().expect("metrics initialization"));
        let store = Arc::new(MemorySignalStore::new());
        let state = AppState::new(config, store.clone(), metrics.clone());

        let app = create_router(state.clone());
        let server = TestServer::new(app).expect("start test server");

        Self {
            server,
            metrics,
            store,
            state,
        }
    }
}

/// The canonical TradingView alert body
pub fn alert(symbol: &str, signal: &str) -> Value {
    json!({
        "symbol": symbol,
        "time": "2024-01-01T00:00:00Z",
        "signal": signal,
        "entry": 42000,
        "stoploss": 41000,
        "target1": 44000
    })
}
