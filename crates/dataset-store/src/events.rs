use serde::{Deserialize, Serialize};
use vconnect_core_types::{DatasetKey, DatasetValue};

/// Notifications emitted by the cache layer. A closed sum type instead of
/// ad hoc string event names, so subscribers match on variants.
#[derive(Clone, Debug)]
pub enum DatasetEvent {
    /// A dataset was (re)fetched successfully; carries the new value.
    Updated {
        key: DatasetKey,
        value: DatasetValue,
    },
    /// Bulk initialization finished.
    AllDataInitialized { stats: InitStats },
    /// The cache was cleared (one key or all of them).
    CacheCleared { key: Option<DatasetKey> },
}

/// Per-dataset sizes reported after bulk initialization.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitStats {
    pub users: usize,
    pub calls: usize,
    pub codes: usize,
    pub branches: usize,
    pub customers: usize,
    pub code_mappings: usize,
    pub failures: usize,
}

impl InitStats {
    pub fn succeeded(&self) -> bool {
        self.failures == 0
    }
}
