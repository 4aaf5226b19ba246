//! Cached aggregation layer for the vconnect incident-code backend.
//!
//! The crate fetches backend datasets through a deduplicating, TTL-cached
//! coordinator, normalizes them into canonical records, and exposes joined
//! and aggregated views (status tallies, group-bys, time-bucketed series)
//! through the [`DataService`] facade.

pub mod config;
pub mod service;

pub use config::ServiceConfig;
pub use service::{DataService, ServiceStatus};

pub use vconnect_core_types::{
    AudioAudit, Branch, CallStatus, ChartSummary, Code, CodeMapping, Customer, DatasetKey,
    DatasetValue, EventRecord, InsightError, MappingBundle, User,
};
pub use vconnect_dataset_store::{DatasetEvent, InitStats, DEFAULT_CACHE_TTL};
pub use vconnect_remote::{HttpRemote, RemoteConfig, RemoteError, RemotePort};
pub use vconnect_reports as reports;
pub use vconnect_reports::TimeRange;
