//! Prometheus metrics for the HTTP surface, ingestion and fanout.

use prometheus::{
    Encoder, Gauge, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts,
    Registry, TextEncoder,
};

pub struct Metrics {
    registry: Registry,
    pub http_requests_total: IntCounter,
    pub http_request_duration_seconds: Histogram,
    pub http_requests_in_flight: IntGauge,
    pub signals_ingested_total: IntCounter,
    pub signals_rejected_total: IntCounterVec,
    pub signal_store_errors_total: IntCounter,
    pub viewers_connected: IntGauge,
    pub viewer_evictions_total: IntCounter,
    pub database_connected: Gauge,
}

impl Metrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let http_requests_total =
            IntCounter::new("http_requests_total", "Total number of HTTP requests")?;
        let http_request_duration_seconds = Histogram::with_opts(HistogramOpts::new(
            "http_request_duration_seconds",
            "HTTP request latency in seconds",
        ))?;
        let http_requests_in_flight =
            IntGauge::new("http_requests_in_flight", "HTTP requests currently being served")?;
        let signals_ingested_total =
            IntCounter::new("signals_ingested_total", "Signals accepted and persisted")?;
        let signals_rejected_total = IntCounterVec::new(
            Opts::new("signals_rejected_total", "Webhook payloads rejected by validation"),
            &["reason"],
        )?;
        let signal_store_errors_total =
            IntCounter::new("signal_store_errors_total", "Failed store operations")?;
        let viewers_connected =
            IntGauge::new("viewers_connected", "Realtime viewers currently connected")?;
        let viewer_evictions_total = IntCounter::new(
            "viewer_evictions_total",
            "Viewers dropped by the change notifier",
        )?;
        let database_connected =
            Gauge::new("database_connected", "1 when the durable store is reachable")?;

        registry.register(Box::new(http_requests_total.clone()))?;
        registry.register(Box::new(http_request_duration_seconds.clone()))?;
        registry.register(Box::new(http_requests_in_flight.clone()))?;
        registry.register(Box::new(signals_ingested_total.clone()))?;
        registry.register(Box::new(signals_rejected_total.clone()))?;
        registry.register(Box::new(signal_store_errors_total.clone()))?;
        registry.register(Box::new(viewers_connected.clone()))?;
        registry.register(Box::new(viewer_evictions_total.clone()))?;
        registry.register(Box::new(database_connected.clone()))?;

        Ok(Self {
            registry,
            http_requests_total,
            http_request_duration_seconds,
            http_requests_in_flight,
            signals_ingested_total,
            signals_rejected_total,
            signal_store_errors_total,
            viewers_connected,
            viewer_evictions_total,
            database_connected,
        })
    }

    /// Render all registered metrics in the Prometheus text format
    pub fn export(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}
