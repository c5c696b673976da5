//! Storage interface shared by the PostgreSQL and in-memory backends.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::StoreError;
use crate::models::signal::{NewSignal, Signal};

/// Append-only, insertion-ordered collection of signals
///
/// Implementations serialize `id` assignment: concurrent inserts always
/// receive distinct, strictly increasing ids. There is no update or delete.
#[async_trait]
pub trait SignalStore: Send + Sync {
    /// Assign the next id, stamp `received_at` and persist atomically
    async fn insert(&self, signal: NewSignal) -> Result<Signal, StoreError>;

    /// The `limit` most recent signals, newest (highest id) first
    async fn query_recent(&self, limit: usize) -> Result<Vec<Signal>, StoreError>;

    /// Whether the backing engine is currently reachable
    async fn is_available(&self) -> bool;

    /// Backend name reported by the health endpoint
    fn backend(&self) -> &'static str;
}

/// Hands out non-decreasing `received_at` stamps even if the wall clock steps back
#[derive(Debug, Default)]
pub struct ReceivedClock {
    last: Option<DateTime<Utc>>,
}

impl ReceivedClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stamp(&mut self) -> DateTime<Utc> {
        self.stamp_at(Utc::now())
    }

    pub fn stamp_at(&mut self, now: DateTime<Utc>) -> DateTime<Utc> {
        let stamped = match self.last {
            Some(last) if last > now => last,
            _ => now,
        };
        self.last = Some(stamped);
        stamped
    }
}
