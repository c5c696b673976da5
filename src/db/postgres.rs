//! PostgreSQL signal storage

use async_trait::async_trait;
use backon::{ExponentialBuilder, Retryable};
use chrono::{DateTime, SubsecRound, Utc};
use serde_json::Value;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio_postgres::{Client, NoTls, Row};
use tracing::{error, info, warn};

use super::store::{ReceivedClock, SignalStore};
use crate::error::StoreError;
use crate::models::signal::{NewSignal, Signal, SignalType};

const SELECT_COLUMNS: &str =
    "id, symbol, signal_type, signal_time, received_at, entry, stoploss, target1, raw";

/// Signals table backed by PostgreSQL
///
/// Ids come from a `BIGSERIAL` sequence. Inserts from this process are
/// serialized, so ids are committed in increasing order. A failed insert can
/// still burn a sequence value; such gaps are never reused.
pub struct PostgresSignalStore {
    client: Client,
    insert_lock: Mutex<ReceivedClock>,
}

impl PostgresSignalStore {
    /// Connect, retrying with exponential backoff, and create the schema
    pub async fn connect(database_url: &str, max_retries: usize) -> Result<Self, StoreError> {
        let (client, connection) = (|| tokio_postgres::connect(database_url, NoTls))
            .retry(ExponentialBuilder::default().with_max_times(max_retries))
            .notify(|e: &tokio_postgres::Error, backoff: Duration| {
                warn!(error = %e, backoff_ms = backoff.as_millis() as u64, "PostgreSQL connection failed, retrying");
            })
            .await
            .map_err(|e| StoreError::Unavailable(format!("Failed to connect to PostgreSQL: {}", e)))?;

        tokio::spawn(async move {
            if let Err(e) = connection.await {
                error!(error = %e, "PostgreSQL connection error");
            }
        });

        let store = Self {
            client,
            insert_lock: Mutex::new(ReceivedClock::new()),
        };
        store.init_schema().await?;
        info!("PostgreSQL signal store ready");

        Ok(store)
    }

    async fn init_schema(&self) -> Result<(), StoreError> {
        self.client
            .batch_execute(
                "CREATE TABLE IF NOT EXISTS signals (
                    id BIGSERIAL PRIMARY KEY,
                    symbol TEXT NOT NULL,
                    received_at TIMESTAMPTZ NOT NULL,
                    signal_time TEXT,
                    signal_type TEXT,
                    entry DOUBLE PRECISION,
                    stoploss DOUBLE PRECISION,
                    target1 DOUBLE PRECISION,
                    raw JSONB
                );
                CREATE INDEX IF NOT EXISTS signals_received_at_idx ON signals (received_at DESC);",
            )
            .await
            .map_err(|e| StoreError::Persistence(format!("Failed to create signals table: {}", e)))
    }

    fn row_to_signal(row: &Row) -> Result<Signal, StoreError> {
        let signal_type: String = row.try_get(2)?;
        let signal_type = signal_type
            .parse::<SignalType>()
            .map_err(|e| StoreError::Persistence(format!("Corrupt signal row: {}", e)))?;
        let signal_time: Option<String> = row.try_get(3)?;
        let received_at: DateTime<Utc> = row.try_get(4)?;
        let raw: Option<Value> = row.try_get(8)?;

        Ok(Signal {
            id: row.try_get(0)?,
            symbol: row.try_get(1)?,
            signal_type,
            signal_time: signal_time.unwrap_or_default(),
            received_at,
            entry: row.try_get(5)?,
            stoploss: row.try_get(6)?,
            target1: row.try_get(7)?,
            raw: raw.unwrap_or(Value::Null),
        })
    }
}

#[async_trait]
impl SignalStore for PostgresSignalStore {
    async fn insert(&self, signal: NewSignal) -> Result<Signal, StoreError> {
        let mut clock = self.insert_lock.lock().await;
        // TIMESTAMPTZ keeps microseconds
        let received_at = clock.stamp().trunc_subsecs(6);

        let row = self
            .client
            .query_one(
                "INSERT INTO signals (symbol, received_at, signal_time, signal_type, entry, stoploss, target1, raw)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                 RETURNING id",
                &[
                    &signal.symbol,
                    &received_at,
                    &signal.signal_time,
                    &signal.signal_type.as_str(),
                    &signal.entry,
                    &signal.stoploss,
                    &signal.target1,
                    &signal.raw,
                ],
            )
            .await?;
        let id: i64 = row.try_get(0)?;

        Ok(signal.into_signal(id, received_at))
    }

    async fn query_recent(&self, limit: usize) -> Result<Vec<Signal>, StoreError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let query = format!(
            "SELECT {} FROM signals ORDER BY id DESC LIMIT $1",
            SELECT_COLUMNS
        );
        let rows = self.client.query(query.as_str(), &[&limit]).await?;
        rows.iter().map(Self::row_to_signal).collect()
    }

    async fn is_available(&self) -> bool {
        !self.client.is_closed()
    }

    fn backend(&self) -> &'static str {
        "postgres"
    }
}
