//! Per-key cache of the last successfully fetched dataset value.
//!
//! Staleness never implies emptiness: a stale value is still served until a
//! refetch replaces it. Only `put` and `clear` mutate entries; readers get
//! clones and must treat them as snapshots.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use serde::Serialize;
use vconnect_core_types::{DatasetKey, DatasetValue};
use vconnect_event_bus::NotificationBus;

use crate::events::DatasetEvent;

/// Cache time-to-live; entries older than this are eligible for refetch.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(5 * 60);

struct CacheEntry {
    value: DatasetValue,
    fetched_at: Option<Instant>,
}

pub struct DatasetStore {
    ttl: Duration,
    entries: DashMap<DatasetKey, CacheEntry>,
    bus: Arc<NotificationBus<DatasetEvent>>,
}

/// Diagnostic snapshot of one cache slot.
#[derive(Clone, Debug, Serialize)]
pub struct EntryStatus {
    pub key: String,
    pub records: usize,
    /// Seconds since the last successful fetch; `None` means never fetched.
    pub age_secs: Option<u64>,
}

impl DatasetStore {
    pub fn new(bus: Arc<NotificationBus<DatasetEvent>>) -> Self {
        Self::with_ttl(DEFAULT_CACHE_TTL, bus)
    }

    pub fn with_ttl(ttl: Duration, bus: Arc<NotificationBus<DatasetEvent>>) -> Self {
        Self {
            ttl,
            entries: DashMap::new(),
            bus,
        }
    }

    pub fn bus(&self) -> Arc<NotificationBus<DatasetEvent>> {
        Arc::clone(&self.bus)
    }

    /// True iff the key was fetched and its age is under the TTL.
    pub fn is_fresh(&self, key: &DatasetKey) -> bool {
        self.entries
            .get(key)
            .and_then(|entry| entry.fetched_at)
            .is_some_and(|at| at.elapsed() < self.ttl)
    }

    /// Age of the entry in whole seconds, when it has ever been fetched.
    pub fn age(&self, key: &DatasetKey) -> Option<Duration> {
        self.entries
            .get(key)
            .and_then(|entry| entry.fetched_at)
            .map(|at| at.elapsed())
    }

    /// Last stored value, fresh or stale, falling back to the key's empty form.
    pub fn get(&self, key: &DatasetKey) -> DatasetValue {
        self.entries
            .get(key)
            .map(|entry| entry.value.clone())
            .unwrap_or_else(|| key.empty_value())
    }

    /// Stores a freshly fetched value and announces the update.
    pub fn put(&self, key: DatasetKey, value: DatasetValue) {
        self.entries.insert(
            key.clone(),
            CacheEntry {
                value: value.clone(),
                fetched_at: Some(Instant::now()),
            },
        );
        self.bus.publish(DatasetEvent::Updated { key, value });
    }

    /// Resets one key (or every known key) to its empty form and forgets the
    /// fetch timestamp, so the next fetch goes to the network.
    pub fn clear(&self, key: Option<&DatasetKey>) {
        match key {
            Some(key) => {
                self.entries.insert(
                    key.clone(),
                    CacheEntry {
                        value: key.empty_value(),
                        fetched_at: None,
                    },
                );
            }
            None => {
                for mut entry in self.entries.iter_mut() {
                    let empty = entry.key().empty_value();
                    entry.value_mut().value = empty;
                    entry.value_mut().fetched_at = None;
                }
            }
        }
        self.bus
            .publish(DatasetEvent::CacheCleared { key: key.cloned() });
    }

    /// Snapshot of every cache slot for status reporting.
    pub fn status(&self) -> Vec<EntryStatus> {
        let mut slots: Vec<EntryStatus> = self
            .entries
            .iter()
            .map(|entry| EntryStatus {
                key: entry.key().to_string(),
                records: entry.value().value.len(),
                age_secs: entry.value().fetched_at.map(|at| at.elapsed().as_secs()),
            })
            .collect();
        slots.sort_by(|a, b| a.key.cmp(&b.key));
        slots
    }
}
