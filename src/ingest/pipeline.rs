//! Validate, persist and announce inbound signals.

use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::db::SignalStore;
use crate::error::{IngestError, StoreError};
use crate::ingest::validator;
use crate::metrics::Metrics;
use crate::models::signal::{NewSignal, Signal};
use crate::services::fanout::{ClientWindow, Merge};
use crate::services::notifier::{ChangeNotifier, Subscription};

/// Glue between the validator, the store and the change notifier
#[derive(Clone)]
pub struct SignalPipeline {
    store: Arc<dyn SignalStore>,
    notifier: ChangeNotifier,
    // Held across insert + publish so notifications leave in id order
    commit_lock: Arc<Mutex<()>>,
    metrics: Option<Arc<Metrics>>,
}

impl SignalPipeline {
    pub fn new(store: Arc<dyn SignalStore>, notifier: ChangeNotifier) -> Self {
        Self {
            store,
            notifier,
            commit_lock: Arc::new(Mutex::new(())),
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn store(&self) -> &Arc<dyn SignalStore> {
        &self.store
    }

    pub fn notifier(&self) -> &ChangeNotifier {
        &self.notifier
    }

    /// Ingest one raw webhook body
    ///
    /// Validation failures are terminal for the request and never touch the
    /// store. Storage failures are returned to the caller without retry.
    pub async fn ingest(&self, body: &[u8]) -> Result<Signal, IngestError> {
        let draft = validator::validate(body).map_err(|e| {
            warn!(reason = e.kind(), error = %e, "Rejected webhook payload");
            if let Some(metrics) = &self.metrics {
                metrics.signals_rejected_total.with_label_values(&[e.kind()]).inc();
            }
            e
        })?;

        Ok(self.commit(draft).await?)
    }

    /// Insert and publish a validated signal
    ///
    /// Runs on its own task: once started, an insert completes even if the
    /// requesting connection goes away.
    pub async fn commit(&self, draft: NewSignal) -> Result<Signal, StoreError> {
        let pipeline = self.clone();
        let symbol = draft.symbol.clone();

        let result = tokio::spawn(async move {
            let _guard = pipeline.commit_lock.lock().await;
            let signal = pipeline.store.insert(draft).await?;
            let report = pipeline.notifier.publish(&signal);

            if let Some(metrics) = &pipeline.metrics {
                metrics.signals_ingested_total.inc();
                metrics
                    .viewer_evictions_total
                    .inc_by(report.evicted.len() as u64);
            }
            Ok::<_, StoreError>((signal, report.delivered))
        })
        .await
        .map_err(|e| StoreError::Persistence(format!("insert task failed: {}", e)))?;

        match result {
            Ok((signal, delivered)) => {
                info!(
                    signal_id = signal.id,
                    symbol = %signal.symbol,
                    signal_type = %signal.signal_type,
                    subscribers = delivered,
                    "Signal stored"
                );
                Ok(signal)
            }
            Err(e) => {
                error!(symbol = %symbol, error = %e, "Failed to store signal");
                if let Some(metrics) = &self.metrics {
                    metrics.signal_store_errors_total.inc();
                }
                Err(e)
            }
        }
    }

    /// The `limit` most recent signals, newest first
    pub async fn recent(&self, limit: usize) -> Result<Vec<Signal>, StoreError> {
        self.store.query_recent(limit).await.map_err(|e| {
            error!(limit = limit, error = %e, "Failed to query recent signals");
            if let Some(metrics) = &self.metrics {
                metrics.signal_store_errors_total.inc();
            }
            e
        })
    }

    /// Viewer connect sequence: subscribe, read the snapshot, seed the window
    ///
    /// Subscribing first means an insert racing the connect is delivered at
    /// least once; any overlap with the snapshot is removed by id. Queued
    /// notifications are folded into the window before it is returned. If
    /// the snapshot read fails the subscription is released.
    pub async fn connect_viewer(
        &self,
        window_size: usize,
    ) -> Result<(Subscription, ClientWindow), StoreError> {
        let mut subscription = self.notifier.subscribe();
        let snapshot = self.recent(window_size).await?;

        let mut window = ClientWindow::new(window_size);
        window.seed(snapshot);

        while let Ok(Some(signal)) = subscription.try_recv() {
            if window.apply((*signal).clone()) == Merge::Duplicate {
                tracing::debug!(
                    signal_id = signal.id,
                    "Live signal already present in snapshot"
                );
            }
        }

        Ok((subscription, window))
    }
}
