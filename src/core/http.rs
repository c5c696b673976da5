//! HTTP endpoint server using Axum

use axum::{
    body::Bytes,
    extract::{ws::WebSocketUpgrade, DefaultBodyLimit, Query, Request, State},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;
use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{info, warn, Level};

use crate::auth::{policy_from_token, AccessPolicy};
use crate::config::ServiceConfig;
use crate::db::{MemorySignalStore, PostgresSignalStore, SignalStore};
use crate::error::{IngestError, StoreError, ValidationError};
use crate::ingest::SignalPipeline;
use crate::metrics::Metrics;
use crate::models::signal::Signal;
use crate::services::notifier::ChangeNotifier;
use crate::services::websocket::{run_viewer_session, ViewerSettings};

#[derive(Clone)]
pub struct AppState {
    pub health: Arc<RwLock<HealthStatus>>,
    pub metrics: Arc<Metrics>,
    pub start_time: Arc<Instant>,
    pub pipeline: SignalPipeline,
    pub access: Arc<dyn AccessPolicy>,
    pub config: Arc<ServiceConfig>,
}

impl AppState {
    /// Wire a pipeline around `store` using the limits in `config`
    pub fn new(config: ServiceConfig, store: Arc<dyn SignalStore>, metrics: Arc<Metrics>) -> Self {
        let notifier = ChangeNotifier::new(config.viewer_queue_capacity);
        let pipeline = SignalPipeline::new(store, notifier).with_metrics(metrics.clone());
        let access: Arc<dyn AccessPolicy> = Arc::from(policy_from_token(config.dashboard_token.clone()));

        Self {
            health: Arc::new(RwLock::new(HealthStatus::default())),
            metrics,
            start_time: Arc::new(Instant::now()),
            pipeline,
            access,
            config: Arc::new(config),
        }
    }

    fn viewer_settings(&self) -> ViewerSettings {
        ViewerSettings {
            window_size: self.config.window_size,
            ping_interval: self.config.viewer_ping_interval,
            idle_timeout: self.config.viewer_idle_timeout,
        }
    }
}

#[derive(Clone, Debug)]
pub struct HealthStatus {
    pub status: String,
}

impl Default for HealthStatus {
    fn default() -> Self {
        Self {
            status: "healthy".to_string(),
        }
    }
}

impl IntoResponse for IngestError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            IngestError::Validation(e) => {
                let body = match &e {
                    ValidationError::MalformedPayload(detail) => {
                        json!({ "ok": false, "error": e.kind(), "detail": detail })
                    }
                    ValidationError::MissingFields(missing) => {
                        json!({ "ok": false, "error": e.kind(), "missing": missing })
                    }
                    ValidationError::InvalidNumericField(field) => {
                        json!({ "ok": false, "error": e.kind(), "field": field })
                    }
                    ValidationError::InvalidField { field, reason } => {
                        json!({ "ok": false, "error": e.kind(), "field": field, "detail": reason })
                    }
                };
                (StatusCode::BAD_REQUEST, body)
            }
            IngestError::Persistence(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "ok": false, "error": "db_insert_failed", "detail": e.to_string() }),
            ),
        };

        (status, Json(body)).into_response()
    }
}

/// Failures of the read-side endpoints
#[derive(Debug)]
pub enum ApiError {
    Unauthorized,
    Store(StoreError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "ok": false, "error": "unauthorized" })),
            )
                .into_response(),
            ApiError::Store(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "ok": false, "error": "db_query_failed", "detail": e.to_string() })),
            )
                .into_response(),
        }
    }
}

pub async fn health_check(State(state): State<AppState>) -> Result<Json<Value>, StatusCode> {
    let health = state.health.read().await;
    let uptime_seconds = state.start_time.elapsed().as_secs();
    let store = state.pipeline.store();
    let store_available = store.is_available().await;
    state
        .metrics
        .database_connected
        .set(if store_available { 1.0 } else { 0.0 });

    Ok(Json(json!({
        "status": health.status,
        "uptime_seconds": uptime_seconds,
        "service": "signalfeed",
        "store": store.backend(),
        "store_available": store_available,
        "viewers": state.pipeline.notifier().subscriber_count(),
    })))
}

pub async fn metrics_handler(State(state): State<AppState>) -> Result<String, StatusCode> {
    state
        .metrics
        .export()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
}

/// Middleware to track HTTP request metrics
async fn metrics_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    state.metrics.http_requests_in_flight.inc();
    let response = next.run(request).await;
    let status = response.status();
    let duration = start.elapsed();
    state.metrics.http_requests_in_flight.dec();

    state.metrics.http_requests_total.inc();
    state
        .metrics
        .http_request_duration_seconds
        .observe(duration.as_secs_f64());

    if status.is_server_error() {
        tracing::error!(
            method = %method,
            path = %path,
            status = %status,
            duration_ms = duration.as_millis(),
            "HTTP request error"
        );
    }

    response
}

/// Accept a webhook alert
async fn ingest_signal(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<Signal>, IngestError> {
    let signal = state.pipeline.ingest(&body).await?;
    Ok(Json(signal))
}

#[derive(Debug, Deserialize)]
struct SignalQuery {
    limit: Option<usize>,
    access_token: Option<String>,
}

/// Most recent signals, newest first
async fn list_signals(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<SignalQuery>,
) -> Result<Json<Vec<Signal>>, ApiError> {
    if !state
        .access
        .is_authorized(&headers, params.access_token.as_deref())
    {
        return Err(ApiError::Unauthorized);
    }

    let limit = params
        .limit
        .unwrap_or(state.config.window_size)
        .min(state.config.query_limit_max);
    let signals = state.pipeline.recent(limit).await.map_err(ApiError::Store)?;

    Ok(Json(signals))
}

#[derive(Debug, Deserialize)]
struct StreamQuery {
    access_token: Option<String>,
}

/// Upgrade to the realtime signal stream
async fn stream_signals(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<StreamQuery>,
) -> Result<Response, ApiError> {
    if !state
        .access
        .is_authorized(&headers, params.access_token.as_deref())
    {
        return Err(ApiError::Unauthorized);
    }

    let pipeline = state.pipeline.clone();
    let settings = state.viewer_settings();
    let metrics = Some(state.metrics.clone());

    Ok(ws.on_upgrade(move |socket| run_viewer_session(socket, pipeline, settings, metrics)))
}

pub fn create_router(state: AppState) -> Router {
    let max_payload_bytes = state.config.max_payload_bytes;

    Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(metrics_handler))
        .route("/api/webhook", post(ingest_signal))
        .route("/api/signals", get(list_signals))
        .route("/ws", get(stream_signals))
        .layer(DefaultBodyLimit::max(max_payload_bytes))
        .layer(
            ServiceBuilder::new()
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(DefaultMakeSpan::new().level(Level::DEBUG))
                        .on_request(DefaultOnRequest::new().level(Level::DEBUG))
                        .on_response(DefaultOnResponse::new().level(Level::DEBUG)),
                )
                .layer(axum::middleware::from_fn_with_state(
                    state.clone(),
                    metrics_middleware,
                ))
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

/// Open the configured store: PostgreSQL when `DATABASE_URL` is set, memory otherwise
pub async fn open_store(
    config: &ServiceConfig,
) -> Result<Arc<dyn SignalStore>, Box<dyn std::error::Error + Send + Sync>> {
    match &config.database_url {
        Some(url) => {
            let store = PostgresSignalStore::connect(url, config.db_connect_retries).await?;
            info!("PostgreSQL connected for signal store");
            Ok(Arc::new(store))
        }
        None => {
            warn!("DATABASE_URL not set - signals are kept in memory and lost on restart");
            Ok(Arc::new(MemorySignalStore::new()))
        }
    }
}

pub async fn start_server(config: ServiceConfig) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let metrics = Arc::new(Metrics::new().map_err(|e| format!("Failed to register metrics: {}", e))?);
    let store = open_store(&config).await?;
    metrics.database_connected.set(1.0);

    let address = config.listen_address();
    let state = AppState::new(config, store, metrics);
    let app = create_router(state);
    let listener = tokio::net::TcpListener::bind(address.as_str()).await?;

    info!(address = %address, "HTTP server listening on {}", address);
    info!("Webhook endpoint available at http://{}/api/webhook", address);
    info!("Realtime channel available at ws://{}/ws", address);
    axum::serve(listener, app).await?;

    Ok(())
}
