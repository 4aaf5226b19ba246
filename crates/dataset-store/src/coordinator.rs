//! Deduplicating fetch front-end over the dataset store.
//!
//! For any key there is at most one remote call in flight; concurrent
//! callers attach to the pending outcome instead of issuing their own.
//! The in-flight marker is registered under a synchronous lock before the
//! loader's first suspension point, so two near-simultaneous callers can
//! never both observe "not loading".

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::broadcast;
use tracing::{debug, warn};
use vconnect_core_types::{DatasetKey, DatasetValue, InsightError};

use crate::store::DatasetStore;

type Outcome = Result<DatasetValue, InsightError>;

pub struct FetchCoordinator {
    store: Arc<DatasetStore>,
    inflight: Mutex<HashMap<DatasetKey, broadcast::Sender<Outcome>>>,
}

impl FetchCoordinator {
    pub fn new(store: Arc<DatasetStore>) -> Self {
        Self {
            store,
            inflight: Mutex::new(HashMap::new()),
        }
    }

    pub fn store(&self) -> Arc<DatasetStore> {
        Arc::clone(&self.store)
    }

    /// Keys with a network call currently in flight.
    pub fn inflight_keys(&self) -> Vec<DatasetKey> {
        self.inflight.lock().keys().cloned().collect()
    }

    /// Like [`Self::try_fetch`], but a loader failure is logged and degrades
    /// to the key's empty form, so one bad dataset cannot abort an
    /// aggregation that joins several of them. Failures leave no freshness
    /// stamp; the next access retries.
    pub async fn fetch<F, Fut>(
        &self,
        key: DatasetKey,
        loader: F,
        force_refresh: bool,
    ) -> DatasetValue
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Outcome>,
    {
        match self.try_fetch(key.clone(), loader, force_refresh).await {
            Ok(value) => value,
            Err(err) => {
                warn!(dataset = %key, error = %err, "serving empty form after fetch failure");
                key.empty_value()
            }
        }
    }

    /// Serves `key` from cache when fresh, attaches to a pending fetch when
    /// one exists, and otherwise runs `loader` exactly once. On success the
    /// result is stored (stamping freshness and notifying subscribers) before
    /// being returned. Loader errors propagate to every waiting caller.
    ///
    /// Cancellation-safe: if the winning future is dropped mid-load, the
    /// in-flight marker is released, waiters fall back to the cache, and the
    /// next fetch for the key runs the loader again.
    pub async fn try_fetch<F, Fut>(
        &self,
        key: DatasetKey,
        loader: F,
        force_refresh: bool,
    ) -> Outcome
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Outcome>,
    {
        if !force_refresh && self.store.is_fresh(&key) {
            debug!(dataset = %key, "serving cached dataset");
            return Ok(self.store.get(&key));
        }

        // Check-then-register must be one synchronous step.
        let pending = {
            let mut inflight = self.inflight.lock();
            match inflight.get(&key) {
                Some(sender) => Some(sender.subscribe()),
                None => {
                    let (sender, _) = broadcast::channel(1);
                    inflight.insert(key.clone(), sender);
                    None
                }
            }
        };

        if let Some(mut receiver) = pending {
            debug!(dataset = %key, "awaiting in-flight fetch");
            return match receiver.recv().await {
                Ok(outcome) => outcome,
                // Sender dropped without broadcasting (loader future was
                // cancelled); fall back to whatever the cache holds.
                Err(_) => Ok(self.store.get(&key)),
            };
        }

        // From here until the outcome is broadcast, dropping this future
        // must release the marker, or the key would stay wedged behind a
        // sender nobody will ever complete.
        let guard = InflightGuard {
            coordinator: self,
            key: Some(key.clone()),
        };

        debug!(dataset = %key, force_refresh, "fetching dataset from remote");
        let outcome = loader().await;
        if let Ok(value) = &outcome {
            self.store.put(key.clone(), value.clone());
        }

        if let Some(sender) = guard.complete() {
            // No waiters is fine; send only fails when nobody subscribed.
            let _ = sender.send(outcome.clone());
        }
        outcome
    }
}

/// Removes the in-flight marker when the owning fetch future is dropped
/// before broadcasting. Dropping the sender closes the channel, so waiters
/// observe `RecvError::Closed` and fall back to the cache.
struct InflightGuard<'a> {
    coordinator: &'a FetchCoordinator,
    key: Option<DatasetKey>,
}

impl InflightGuard<'_> {
    fn complete(mut self) -> Option<broadcast::Sender<Outcome>> {
        let key = self.key.take()?;
        self.coordinator.inflight.lock().remove(&key)
    }
}

impl Drop for InflightGuard<'_> {
    fn drop(&mut self) {
        if let Some(key) = self.key.take() {
            self.coordinator.inflight.lock().remove(&key);
        }
    }
}
