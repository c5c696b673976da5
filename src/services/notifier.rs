//! Change notifier: one event per committed insert, fanned out to subscribers.
//!
//! Each subscriber owns an independent bounded queue. Publishing never waits
//! on a subscriber: a full or closed queue gets the subscriber evicted
//! (drop-and-disconnect) while everyone else keeps receiving.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, warn};

use crate::error::{EvictionReason, SubscriptionDeliveryFailure};
use crate::models::signal::Signal;

struct SubscriberSlot {
    sender: mpsc::Sender<Arc<Signal>>,
    eviction: Arc<Mutex<Option<EvictionReason>>>,
}

struct NotifierInner {
    subscribers: Mutex<HashMap<u64, SubscriberSlot>>,
    next_id: AtomicU64,
    queue_capacity: usize,
}

/// Per-insert broadcast with isolated delivery paths
#[derive(Clone)]
pub struct ChangeNotifier {
    inner: Arc<NotifierInner>,
}

/// Result of one [`ChangeNotifier::publish`] call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublishReport {
    pub delivered: usize,
    pub evicted: Vec<(u64, EvictionReason)>,
}

impl ChangeNotifier {
    pub fn new(queue_capacity: usize) -> Self {
        Self {
            inner: Arc::new(NotifierInner {
                subscribers: Mutex::new(HashMap::new()),
                next_id: AtomicU64::new(1),
                queue_capacity: queue_capacity.max(1),
            }),
        }
    }

    /// Register a subscriber for inserts published from now on (no replay)
    pub fn subscribe(&self) -> Subscription {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let (sender, receiver) = mpsc::channel(self.inner.queue_capacity);
        let eviction = Arc::new(Mutex::new(None));

        self.inner.subscribers.lock().insert(
            id,
            SubscriberSlot {
                sender,
                eviction: eviction.clone(),
            },
        );
        debug!(subscriber_id = id, "Subscriber registered");

        Subscription {
            id,
            receiver,
            eviction,
            notifier: Arc::downgrade(&self.inner),
        }
    }

    /// Deliver a committed signal to every current subscriber
    ///
    /// Callers publish in commit order; each subscriber's queue is FIFO, so
    /// a subscriber observes ids in increasing order.
    pub fn publish(&self, signal: &Signal) -> PublishReport {
        let signal = Arc::new(signal.clone());
        let mut report = PublishReport::default();
        let mut subscribers = self.inner.subscribers.lock();

        subscribers.retain(|id, slot| match slot.sender.try_send(signal.clone()) {
            Ok(()) => {
                report.delivered += 1;
                true
            }
            Err(e) => {
                let reason = match e {
                    TrySendError::Full(_) => EvictionReason::Lagged,
                    TrySendError::Closed(_) => EvictionReason::Disconnected,
                };
                *slot.eviction.lock() = Some(reason);
                report.evicted.push((*id, reason));
                false
            }
        });
        drop(subscribers);

        for (id, reason) in &report.evicted {
            warn!(
                subscriber_id = id,
                signal_id = signal.id,
                reason = %reason,
                "Subscriber evicted from change notifier"
            );
        }

        report
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.lock().len()
    }
}

/// Handle to a live notification stream
///
/// Dropping the handle unsubscribes; [`Subscription::unsubscribe`] makes the
/// release explicit.
pub struct Subscription {
    id: u64,
    receiver: mpsc::Receiver<Arc<Signal>>,
    eviction: Arc<Mutex<Option<EvictionReason>>>,
    notifier: Weak<NotifierInner>,
}

impl Subscription {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Next notification, in insert order
    ///
    /// Once the notifier has evicted this subscriber, pending notifications
    /// are discarded and the eviction is reported instead.
    pub async fn recv(&mut self) -> Result<Arc<Signal>, SubscriptionDeliveryFailure> {
        if let Some(reason) = self.evicted() {
            return Err(SubscriptionDeliveryFailure::Evicted(reason));
        }

        match self.receiver.recv().await {
            Some(signal) => match self.evicted() {
                Some(reason) => Err(SubscriptionDeliveryFailure::Evicted(reason)),
                None => Ok(signal),
            },
            None => Err(self
                .evicted()
                .map(SubscriptionDeliveryFailure::Evicted)
                .unwrap_or(SubscriptionDeliveryFailure::Closed)),
        }
    }

    /// Non-blocking variant of [`Subscription::recv`]; `Ok(None)` when nothing is queued
    pub fn try_recv(&mut self) -> Result<Option<Arc<Signal>>, SubscriptionDeliveryFailure> {
        if let Some(reason) = self.evicted() {
            return Err(SubscriptionDeliveryFailure::Evicted(reason));
        }

        match self.receiver.try_recv() {
            Ok(signal) => Ok(Some(signal)),
            Err(mpsc::error::TryRecvError::Empty) => Ok(None),
            Err(mpsc::error::TryRecvError::Disconnected) => Err(self
                .evicted()
                .map(SubscriptionDeliveryFailure::Evicted)
                .unwrap_or(SubscriptionDeliveryFailure::Closed)),
        }
    }

    pub fn evicted(&self) -> Option<EvictionReason> {
        *self.eviction.lock()
    }

    pub fn unsubscribe(self) {
        // Drop does the work
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(inner) = self.notifier.upgrade() {
            if inner.subscribers.lock().remove(&self.id).is_some() {
                debug!(subscriber_id = self.id, "Subscriber released");
            }
        }
    }
}
