//! In-memory signal log, used without a configured database and in tests

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;

use super::store::{ReceivedClock, SignalStore};
use crate::error::StoreError;
use crate::models::signal::{NewSignal, Signal};

#[derive(Default)]
struct MemoryLog {
    signals: Vec<Signal>,
    next_id: i64,
    clock: ReceivedClock,
}

/// Gapless append-only log held in process memory
///
/// Ids start at 1 and are assigned under the write lock, so a failed insert
/// never consumes one.
pub struct MemorySignalStore {
    log: RwLock<MemoryLog>,
    outage: AtomicBool,
}

impl MemorySignalStore {
    pub fn new() -> Self {
        Self {
            log: RwLock::new(MemoryLog {
                next_id: 1,
                ..MemoryLog::default()
            }),
            outage: AtomicBool::new(false),
        }
    }

    /// Simulate the storage engine going away (or coming back)
    pub fn set_outage(&self, down: bool) {
        self.outage.store(down, Ordering::SeqCst);
    }

    pub async fn len(&self) -> usize {
        self.log.read().await.signals.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.outage.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(
                "in-memory store is in outage mode".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for MemorySignalStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SignalStore for MemorySignalStore {
    async fn insert(&self, signal: NewSignal) -> Result<Signal, StoreError> {
        let mut log = self.log.write().await;
        self.check_available()?;

        let id = log.next_id;
        let received_at = log.clock.stamp();
        let stored = signal.into_signal(id, received_at);

        log.signals.push(stored.clone());
        log.next_id += 1;
        Ok(stored)
    }

    async fn query_recent(&self, limit: usize) -> Result<Vec<Signal>, StoreError> {
        self.check_available()?;
        let log = self.log.read().await;
        Ok(log.signals.iter().rev().take(limit).cloned().collect())
    }

    async fn is_available(&self) -> bool {
        !self.outage.load(Ordering::SeqCst)
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}
