//! The data service facade: one object owning the cache, the fetch
//! coordinator and the remote port, exposing the query surface the report
//! views consume.
//!
//! Getter methods never fail: the coordinator swallows fetch errors into
//! the dataset's empty form, so a report renders as "no data" instead of
//! crashing the view. The exceptions are the per-branch code lookup, which
//! distinguishes "no codes" (404) from a real failure, and bulk
//! initialization, which reports whether every dataset loaded.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};
use vconnect_core_types::{
    AudioAudit, Branch, BranchChartRow, ChartSummary, Code, CodeMapping, Customer, DatasetKey,
    DatasetValue, EventRecord, InsightError, MappingBundle, User,
};
use vconnect_dataset_store::{
    DatasetEvent, DatasetStore, EntryStatus, FetchCoordinator, InitStats,
};
use vconnect_event_bus::NotificationBus;
use vconnect_remote::{HttpRemote, RemotePort};
use vconnect_reports::{
    audit_details, build_index, dashboard_summary, AuditDetail, DashboardSummary, FALLBACK_COLOR,
};

use crate::config::ServiceConfig;

type Loaded = Result<DatasetValue, InsightError>;

/// Diagnostic snapshot of the service: cache slots, in-flight fetches and
/// live bus subscriptions.
#[derive(Clone, Debug, Serialize)]
pub struct ServiceStatus {
    pub entries: Vec<EntryStatus>,
    pub inflight: Vec<String>,
    pub subscribers: usize,
}

pub struct DataService {
    remote: Arc<dyn RemotePort>,
    coordinator: FetchCoordinator,
    store: Arc<DatasetStore>,
    audio_base_url: String,
}

impl DataService {
    /// Wires a service around any [`RemotePort`]; tests pass an in-memory
    /// fake here.
    pub fn new(remote: Arc<dyn RemotePort>, config: &ServiceConfig) -> Self {
        let bus = NotificationBus::new(config.bus_capacity);
        let store = Arc::new(DatasetStore::with_ttl(config.cache_ttl, bus));
        let coordinator = FetchCoordinator::new(Arc::clone(&store));
        Self {
            remote,
            coordinator,
            store,
            audio_base_url: config.audio_base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Production wiring: HTTP remote built from the config.
    pub fn from_config(config: &ServiceConfig) -> Result<Self, InsightError> {
        let remote = HttpRemote::new(config.remote())?;
        Ok(Self::new(Arc::new(remote), config))
    }

    /// Subscription to cache-change notifications.
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<DatasetEvent> {
        self.store.bus().subscribe()
    }

    // ---- dataset loaders (one per key; shared by getters and bulk init) ----

    fn users_loader(&self) -> impl Future<Output = Loaded> + 'static {
        let remote = Arc::clone(&self.remote);
        async move { Ok(DatasetValue::Users(remote.users().await?)) }
    }

    fn calls_loader(&self) -> impl Future<Output = Loaded> + 'static {
        let remote = Arc::clone(&self.remote);
        async move { Ok(DatasetValue::Calls(remote.calls().await?)) }
    }

    fn codes_loader(&self) -> impl Future<Output = Loaded> + 'static {
        let remote = Arc::clone(&self.remote);
        async move { Ok(DatasetValue::Codes(remote.codes().await?)) }
    }

    fn branches_loader(&self) -> impl Future<Output = Loaded> + 'static {
        let remote = Arc::clone(&self.remote);
        async move { Ok(DatasetValue::Branches(remote.branches().await?)) }
    }

    fn customers_loader(&self) -> impl Future<Output = Loaded> + 'static {
        let remote = Arc::clone(&self.remote);
        async move { Ok(DatasetValue::Customers(remote.customers().await?)) }
    }

    fn mappings_loader(&self) -> impl Future<Output = Loaded> + 'static {
        let remote = Arc::clone(&self.remote);
        async move {
            let rows = remote.code_mappings().await?;
            Ok(DatasetValue::CodeMappings(MappingBundle::from_rows(rows)))
        }
    }

    fn audit_mappings_loader(&self) -> impl Future<Output = Loaded> + 'static {
        let remote = Arc::clone(&self.remote);
        async move {
            Ok(DatasetValue::CodeAuditMappings(
                remote.code_mappings().await?,
            ))
        }
    }

    fn chart_loader(&self) -> impl Future<Output = Loaded> + 'static {
        let remote = Arc::clone(&self.remote);
        async move {
            let branches = remote.branches().await?;
            Ok(DatasetValue::ChartData(Some(chart_projection(branches))))
        }
    }

    // ---- infallible getters ----

    pub async fn get_users(&self, force_refresh: bool) -> Vec<User> {
        self.coordinator
            .fetch(DatasetKey::Users, || self.users_loader(), force_refresh)
            .await
            .into_users()
    }

    pub async fn get_calls(&self, force_refresh: bool) -> Vec<EventRecord> {
        self.coordinator
            .fetch(DatasetKey::Calls, || self.calls_loader(), force_refresh)
            .await
            .into_calls()
    }

    pub async fn get_codes(&self, force_refresh: bool) -> Vec<Code> {
        self.coordinator
            .fetch(DatasetKey::Codes, || self.codes_loader(), force_refresh)
            .await
            .into_codes()
    }

    pub async fn get_branches(&self, force_refresh: bool) -> Vec<Branch> {
        self.coordinator
            .fetch(
                DatasetKey::Branches,
                || self.branches_loader(),
                force_refresh,
            )
            .await
            .into_branches()
    }

    pub async fn get_customers(&self, force_refresh: bool) -> Vec<Customer> {
        self.coordinator
            .fetch(
                DatasetKey::Customers,
                || self.customers_loader(),
                force_refresh,
            )
            .await
            .into_customers()
    }

    pub async fn get_code_mappings(&self, force_refresh: bool) -> MappingBundle {
        self.coordinator
            .fetch(
                DatasetKey::CodeMappings,
                || self.mappings_loader(),
                force_refresh,
            )
            .await
            .into_mapping_bundle()
    }

    /// Raw mapping rows for the secondary (`conf_id` -> `tsl_code_id`) join.
    pub async fn get_audit_code_mappings(&self, force_refresh: bool) -> Vec<CodeMapping> {
        self.coordinator
            .fetch(
                DatasetKey::CodeAuditMappings,
                || self.audit_mappings_loader(),
                force_refresh,
            )
            .await
            .into_audit_mappings()
    }

    /// Audio attachments derived from the call log: one row per call that
    /// carries a recording file, resolved against the code table.
    pub async fn get_audio_audits(&self, force_refresh: bool) -> Vec<AudioAudit> {
        let this = self;
        self.coordinator
            .fetch(
                DatasetKey::AudioAudits,
                move || async move {
                    let calls = this
                        .coordinator
                        .try_fetch(DatasetKey::Calls, || this.calls_loader(), force_refresh)
                        .await?
                        .into_calls();
                    let codes = this
                        .coordinator
                        .try_fetch(DatasetKey::Codes, || this.codes_loader(), force_refresh)
                        .await?
                        .into_codes();
                    Ok(DatasetValue::AudioAudits(derive_audio_audits(
                        &calls,
                        &codes,
                        &this.audio_base_url,
                    )))
                },
                force_refresh,
            )
            .await
            .into_audio_audits()
    }

    pub async fn get_chart_data(&self, force_refresh: bool) -> Option<ChartSummary> {
        self.coordinator
            .fetch(
                DatasetKey::ChartData,
                || self.chart_loader(),
                force_refresh,
            )
            .await
            .into_chart_data()
    }

    /// Events joined to mapping rows through the secondary key, newest first.
    pub async fn get_code_audit_details(&self, force_refresh: bool) -> Vec<AuditDetail> {
        let calls = self.get_calls(force_refresh).await;
        let mappings = self.get_audit_code_mappings(force_refresh).await;
        audit_details(&calls, &mappings)
    }

    /// Home-screen summary built from the joined call and code datasets.
    pub async fn get_dashboard_data(&self, force_refresh: bool) -> DashboardSummary {
        let calls = self.get_calls(force_refresh).await;
        let codes = self.get_codes(force_refresh).await;
        dashboard_summary(&calls, &codes)
    }

    /// Codes mapped to one branch. A backend 404 means "no codes mapped"
    /// and yields an empty list; any other failure propagates so the caller
    /// can tell an empty branch from an outage.
    pub async fn get_codes_by_branch(
        &self,
        branch_id: &str,
        force_refresh: bool,
    ) -> Result<Vec<Code>, InsightError> {
        let remote = Arc::clone(&self.remote);
        let id = branch_id.to_string();
        self.coordinator
            .try_fetch(
                DatasetKey::BranchCodes(branch_id.to_string()),
                move || async move {
                    match remote.branch_codes(&id).await {
                        Ok(codes) => Ok(DatasetValue::BranchCodes(codes)),
                        Err(err) if err.is_not_found() => {
                            warn!(branch_id = %id, "branch has no mapped codes");
                            Ok(DatasetValue::BranchCodes(Vec::new()))
                        }
                        Err(err) => Err(err.into()),
                    }
                },
                force_refresh,
            )
            .await
            .map(DatasetValue::into_codes)
    }

    // ---- synchronous cache lookups ----

    pub fn get_user_by_id(&self, id: &str) -> Option<User> {
        self.store
            .get(&DatasetKey::Users)
            .into_users()
            .into_iter()
            .find(|user| user.id.as_deref() == Some(id))
    }

    pub fn get_code_by_id(&self, id: &str) -> Option<Code> {
        self.store
            .get(&DatasetKey::Codes)
            .into_codes()
            .into_iter()
            .find(|code| code.id.as_deref() == Some(id))
    }

    pub fn get_branch_by_id(&self, id: &str) -> Option<Branch> {
        self.store
            .get(&DatasetKey::Branches)
            .into_branches()
            .into_iter()
            .find(|branch| branch.id.as_deref() == Some(id))
    }

    pub fn get_customer_by_id(&self, id: &str) -> Option<Customer> {
        self.store
            .get(&DatasetKey::Customers)
            .into_customers()
            .into_iter()
            .find(|customer| customer.id.as_deref() == Some(id))
    }

    /// Cached call events for one code id.
    pub fn get_activations_by_code_id(&self, code_id: &str) -> Vec<EventRecord> {
        self.store
            .get(&DatasetKey::Calls)
            .into_calls()
            .into_iter()
            .filter(|event| event.code_id.as_deref() == Some(code_id))
            .collect()
    }

    // ---- lifecycle ----

    /// Fetches every core dataset concurrently. Individual failures are
    /// tolerated (their slots keep the empty form and will be retried on
    /// next access); the return value says whether everything loaded.
    pub async fn initialize_all_data(&self, force_refresh: bool) -> bool {
        let (users, calls, codes, branches, customers, mappings, chart) = tokio::join!(
            self.coordinator
                .try_fetch(DatasetKey::Users, || self.users_loader(), force_refresh),
            self.coordinator
                .try_fetch(DatasetKey::Calls, || self.calls_loader(), force_refresh),
            self.coordinator
                .try_fetch(DatasetKey::Codes, || self.codes_loader(), force_refresh),
            self.coordinator.try_fetch(
                DatasetKey::Branches,
                || self.branches_loader(),
                force_refresh
            ),
            self.coordinator.try_fetch(
                DatasetKey::Customers,
                || self.customers_loader(),
                force_refresh
            ),
            self.coordinator.try_fetch(
                DatasetKey::CodeMappings,
                || self.mappings_loader(),
                force_refresh
            ),
            self.coordinator.try_fetch(
                DatasetKey::ChartData,
                || self.chart_loader(),
                force_refresh
            ),
        );

        let mut failures = 0usize;
        let users = dataset_len(users, &DatasetKey::Users, &mut failures);
        let calls = dataset_len(calls, &DatasetKey::Calls, &mut failures);
        let codes = dataset_len(codes, &DatasetKey::Codes, &mut failures);
        let branches = dataset_len(branches, &DatasetKey::Branches, &mut failures);
        let customers = dataset_len(customers, &DatasetKey::Customers, &mut failures);
        let code_mappings = dataset_len(mappings, &DatasetKey::CodeMappings, &mut failures);
        dataset_len(chart, &DatasetKey::ChartData, &mut failures);
        let stats = InitStats {
            users,
            calls,
            codes,
            branches,
            customers,
            code_mappings,
            failures,
        };

        let succeeded = stats.succeeded();
        if succeeded {
            info!(
                users = stats.users,
                calls = stats.calls,
                codes = stats.codes,
                "all datasets initialized"
            );
        } else {
            warn!(
                failures = stats.failures,
                "bulk initialization completed with failures"
            );
        }
        self.store
            .bus()
            .publish(DatasetEvent::AllDataInitialized { stats });
        succeeded
    }

    /// Drops every cache slot and refetches from the network.
    pub async fn refresh_all_data(&self) -> bool {
        self.store.clear(None);
        self.initialize_all_data(true).await
    }

    /// Clears one slot, or every slot when `key` is `None`.
    pub fn clear_cache(&self, key: Option<&DatasetKey>) {
        self.store.clear(key);
    }

    pub fn status(&self) -> ServiceStatus {
        ServiceStatus {
            entries: self.store.status(),
            inflight: self
                .coordinator
                .inflight_keys()
                .iter()
                .map(DatasetKey::to_string)
                .collect(),
            subscribers: self.store.bus().subscriber_count(),
        }
    }
}

fn dataset_len(outcome: Loaded, key: &DatasetKey, failures: &mut usize) -> usize {
    match outcome {
        Ok(value) => value.len(),
        Err(err) => {
            *failures += 1;
            warn!(dataset = %key, error = %err, "dataset failed during bulk initialization");
            0
        }
    }
}

/// Named-branch projection backing the chart dataset; unnamed branches
/// carry nothing a chart axis can label and are dropped.
fn chart_projection(branches: Vec<Branch>) -> ChartSummary {
    let branches = branches
        .into_iter()
        .filter_map(|branch| {
            let name = branch.name?;
            Some(BranchChartRow {
                branch_id: branch.id,
                branch_name: name,
                branch_location: branch.location,
            })
        })
        .collect();
    ChartSummary { branches }
}

/// One audio row per call that carries a recording file. Display names are
/// the resolved code name (falling back to the recording's file name)
/// uppercased plus a per-name ordinal, so repeated recordings of the same
/// code stay distinguishable in a list.
fn derive_audio_audits(
    calls: &[EventRecord],
    codes: &[Code],
    audio_base_url: &str,
) -> Vec<AudioAudit> {
    let index = build_index(codes, |code| code.id.as_deref());
    let mut ordinals: HashMap<String, usize> = HashMap::new();

    calls
        .iter()
        .filter(|call| {
            call.file_name
                .as_deref()
                .is_some_and(|name| !name.trim().is_empty())
        })
        .map(|call| {
            let code = call.code_id.as_deref().and_then(|id| index.get(id));
            let file_name = call.file_name.as_deref().unwrap_or_default();
            let base_name = code
                .and_then(|c| c.code_name.as_deref())
                .unwrap_or(file_name)
                .to_uppercase();
            let ordinal = ordinals
                .entry(base_name.clone())
                .and_modify(|n| *n += 1)
                .or_insert(1);
            AudioAudit {
                id: call.id.clone(),
                display_name: format!("{base_name} [{ordinal}]"),
                duration: call.duration,
                status: call.status.clone(),
                link: format!("{audio_base_url}/{file_name}"),
                created_at: call.created_at,
                code_id: call.code_id.clone(),
                code_color: code
                    .and_then(|c| c.code_color.clone())
                    .unwrap_or_else(|| FALLBACK_COLOR.to_string()),
                code_purpose: code
                    .and_then(|c| c.code_purpose.clone())
                    .unwrap_or_else(|| "Unknown".to_string()),
            }
        })
        .collect()
}
