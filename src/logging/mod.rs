//! Process-wide `tracing` subscriber.
//!
//! Ingestion events carry `signal_id`, `symbol` and `signal_type`; viewer
//! sessions carry `viewer_id` and, on exit, the disconnect `reason`. In
//! production those fields land as top-level JSON keys so log queries can
//! follow one signal from webhook to every viewer it reached.

use crate::config::get_environment;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Whether the given environment name should emit JSON logs
pub fn is_production(env: &str) -> bool {
    matches!(env, "production" | "prod")
}

/// Install the subscriber once per process
///
/// `RUST_LOG` controls filtering and defaults to `info`. Per-request HTTP
/// spans are emitted at `debug`, so `RUST_LOG=signalfeed=debug,tower_http=debug`
/// shows every webhook and snapshot query.
pub fn init_logging() {
    let env = get_environment();
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if is_production(&env) {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .json()
                    .flatten_event(true)
                    .with_target(true)
                    .with_file(true)
                    .with_line_number(true)
                    .with_writer(std::io::stdout),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_file(true)
                    .with_line_number(true)
                    .with_ansi(true)
                    .with_writer(std::io::stdout),
            )
            .init();
    }
}
