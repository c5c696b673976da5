//! Per-viewer bounded window merging a snapshot with the live stream.

use std::collections::{HashSet, VecDeque};

use crate::models::signal::Signal;

/// What [`ClientWindow::apply`] did with a live signal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Merge {
    /// Prepended as the newest entry
    Prepended,
    /// Already in the window (snapshot/subscription overlap)
    Duplicate,
    /// Not newer than the window's newest entry and not present
    Stale,
}

/// Most-recent-first window of at most `capacity` signals, unique by id
///
/// Owned by exactly one viewer connection; never shared between viewers.
#[derive(Debug, Clone)]
pub struct ClientWindow {
    capacity: usize,
    entries: VecDeque<Signal>,
    ids: HashSet<i64>,
}

impl ClientWindow {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            entries: VecDeque::with_capacity(capacity + 1),
            ids: HashSet::with_capacity(capacity + 1),
        }
    }

    /// Replace the contents with a snapshot from the store
    ///
    /// The snapshot is re-sorted newest first and de-duplicated before
    /// being cut down to capacity.
    pub fn seed(&mut self, mut snapshot: Vec<Signal>) {
        snapshot.sort_by(|a, b| b.id.cmp(&a.id));
        snapshot.dedup_by_key(|signal| signal.id);
        snapshot.truncate(self.capacity);

        self.ids = snapshot.iter().map(|signal| signal.id).collect();
        self.entries = snapshot.into();
    }

    /// Merge one live signal: de-duplicate by id, prepend, truncate to capacity
    pub fn apply(&mut self, signal: Signal) -> Merge {
        if self.ids.contains(&signal.id) {
            return Merge::Duplicate;
        }
        if self.newest_id().is_some_and(|newest| signal.id <= newest) {
            return Merge::Stale;
        }

        self.ids.insert(signal.id);
        self.entries.push_front(signal);
        while self.entries.len() > self.capacity {
            if let Some(oldest) = self.entries.pop_back() {
                self.ids.remove(&oldest.id);
            }
        }

        Merge::Prepended
    }

    pub fn newest_id(&self) -> Option<i64> {
        self.entries.front().map(|signal| signal.id)
    }

    pub fn contains(&self, id: i64) -> bool {
        self.ids.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Newest first
    pub fn iter(&self) -> impl Iterator<Item = &Signal> {
        self.entries.iter()
    }

    pub fn to_vec(&self) -> Vec<Signal> {
        self.entries.iter().cloned().collect()
    }
}
