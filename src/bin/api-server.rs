//! Signalfeed API Server
//!
//! Accepts webhook alerts, serves the recent-signals query and streams live
//! inserts to connected dashboards over WebSocket.

use dotenvy::dotenv;
use signalfeed::config::ServiceConfig;
use signalfeed::core::http::start_server;
use signalfeed::logging;
use tokio::signal;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables from .env if present
    dotenv().ok();

    logging::init_logging();

    let config = ServiceConfig::from_env();
    let env = signalfeed::config::get_environment();
    info!("Starting Signalfeed API Server");
    info!(environment = %env, "Environment");
    info!(address = %config.listen_address(), "HTTP Server: http://{}", config.listen_address());
    info!(
        window_size = config.window_size,
        viewer_queue_capacity = config.viewer_queue_capacity,
        dashboard_token = config.dashboard_token.is_some(),
        "Fanout settings"
    );

    let server_handle = tokio::spawn(async move {
        if let Err(e) = start_server(config).await {
            error!(error = %e, "HTTP server error");
        }
    });

    info!("API server started, waiting for shutdown signal...");
    tokio::select! {
        _ = signal::ctrl_c() => {
            info!("Shutting down API server...");
            info!("API server stopped");
        }
        _ = server_handle => {
            error!("HTTP server stopped");
        }
    }

    Ok(())
}
