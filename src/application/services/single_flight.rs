//! Per-key population guard.
//!
//! Serializes cache-miss handling for one key so that a burst of concurrent
//! readers produces a single replica query. Different keys never contend.

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Table of per-key async locks.
///
/// An entry exists only while some caller holds or waits on it.
#[derive(Default)]
pub struct SingleFlight {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

/// Exclusive claim on one key, released on drop.
pub struct FlightGuard<'a> {
    table: &'a SingleFlight,
    key: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl SingleFlight {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits until no other caller holds `key`, then claims it.
    ///
    /// Cancel-safe: a caller dropped while waiting still prunes the entry.
    pub async fn acquire(&self, key: &str) -> FlightGuard<'_> {
        // The shard lock is released at the end of this statement, before awaiting.
        let lock = self
            .locks
            .entry(key.to_owned())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();

        // Built before awaiting so that its drop runs even if we never get the lock.
        let mut flight = FlightGuard {
            table: self,
            key: key.to_owned(),
            guard: None,
        };
        flight.guard = Some(lock.lock_owned().await);
        flight
    }

    /// Number of keys currently claimed or awaited.
    pub fn in_flight(&self) -> usize {
        self.locks.len()
    }
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        // Only the table's own reference left means nobody holds or waits.
        self.table
            .locks
            .remove_if(&self.key, |_, lock| Arc::strong_count(lock) == 1);
    }
}
