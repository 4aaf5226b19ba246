//! End-to-end exercises of the data service over an in-memory remote:
//! caching, fetch deduplication, failure degradation and notifications.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use vconnect_insight::{
    Branch, Code, CodeMapping, Customer, DataService, DatasetEvent, DatasetKey, EventRecord,
    InsightError, RemoteError, RemotePort, ServiceConfig, User,
};

#[derive(Default)]
struct MockRemote {
    users_calls: AtomicUsize,
    calls_calls: AtomicUsize,
    codes_calls: AtomicUsize,
    branch_codes_calls: AtomicUsize,
    /// When set, the codes endpoint fails with this status.
    codes_failure: Option<u16>,
    /// When set, the per-branch endpoint fails with this status.
    branch_codes_failure: Option<u16>,
}

impl MockRemote {
    fn service(self) -> (Arc<Self>, DataService) {
        let remote = Arc::new(self);
        let config = ServiceConfig::default();
        let service = DataService::new(Arc::clone(&remote) as Arc<dyn RemotePort>, &config);
        (remote, service)
    }
}

#[async_trait]
impl RemotePort for MockRemote {
    async fn users(&self) -> Result<Vec<User>, RemoteError> {
        self.users_calls.fetch_add(1, Ordering::SeqCst);
        Ok(vec![User {
            id: Some("u1".into()),
            first_name: Some("Ada".into()),
            last_name: Some("Lovelace".into()),
            ..Default::default()
        }])
    }

    async fn calls(&self) -> Result<Vec<EventRecord>, RemoteError> {
        self.calls_calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(10)).await;
        Ok(vec![
            EventRecord {
                id: Some("e1".into()),
                code_id: Some("c1".into()),
                status: Some("ACTIVE".into()),
                file_name: Some("rec-1.mp3".into()),
                duration: Some(12.0),
                ..Default::default()
            },
            EventRecord {
                id: Some("e2".into()),
                code_id: Some("c1".into()),
                status: Some("DEACTIVATED".into()),
                ..Default::default()
            },
        ])
    }

    async fn codes(&self) -> Result<Vec<Code>, RemoteError> {
        self.codes_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(status) = self.codes_failure {
            return Err(RemoteError::Status { code: status });
        }
        Ok(vec![Code {
            id: Some("c1".into()),
            code_name: Some("Code Blue".into()),
            code_color: Some("#0000ff".into()),
            code_purpose: Some("Cardiac Arrest".into()),
            ..Default::default()
        }])
    }

    async fn branches(&self) -> Result<Vec<Branch>, RemoteError> {
        Ok(vec![Branch {
            id: Some("b1".into()),
            name: Some("Main".into()),
            location: Some("North".into()),
            ..Default::default()
        }])
    }

    async fn customers(&self) -> Result<Vec<Customer>, RemoteError> {
        Ok(Vec::new())
    }

    async fn code_mappings(&self) -> Result<Vec<CodeMapping>, RemoteError> {
        Ok(vec![CodeMapping {
            id: Some("m1".into()),
            branch_id: Some("b1".into()),
            vconnect_code_id: Some("c1".into()),
            tsl_code_id: Some("t1".into()),
            tsl_code_name: Some("TSL Blue".into()),
            ..Default::default()
        }])
    }

    async fn branch_codes(&self, _branch_id: &str) -> Result<Vec<Code>, RemoteError> {
        self.branch_codes_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(status) = self.branch_codes_failure {
            return Err(RemoteError::Status { code: status });
        }
        Ok(vec![Code {
            id: Some("c1".into()),
            code_name: Some("Code Blue".into()),
            ..Default::default()
        }])
    }
}

#[tokio::test]
async fn repeated_reads_within_ttl_hit_the_network_once() {
    let (remote, service) = MockRemote::default().service();

    assert_eq!(service.get_users(false).await.len(), 1);
    assert_eq!(service.get_users(false).await.len(), 1);
    assert_eq!(remote.users_calls.load(Ordering::SeqCst), 1);

    assert_eq!(service.get_users(true).await.len(), 1);
    assert_eq!(remote.users_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn concurrent_readers_share_one_fetch() {
    let (remote, service) = MockRemote::default().service();
    let service = Arc::new(service);

    let mut handles = Vec::new();
    for _ in 0..5 {
        let service = Arc::clone(&service);
        handles.push(tokio::spawn(async move { service.get_calls(false).await }));
    }
    for handle in handles {
        assert_eq!(handle.await.unwrap().len(), 2);
    }
    assert_eq!(remote.calls_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn aborted_fetch_does_not_wedge_the_dataset() {
    let (_, service) = MockRemote::default().service();
    let service = Arc::new(service);

    let first = {
        let service = Arc::clone(&service);
        tokio::spawn(async move { service.get_calls(false).await })
    };
    tokio::time::sleep(Duration::from_millis(2)).await;
    first.abort();
    let _ = first.await;

    let calls = tokio::time::timeout(Duration::from_secs(2), service.get_calls(false))
        .await
        .expect("fetch after an aborted fetch should complete");
    assert_eq!(calls.len(), 2);
}

#[tokio::test]
async fn failing_dataset_degrades_to_empty() {
    let (remote, service) = MockRemote {
        codes_failure: Some(500),
        ..Default::default()
    }
    .service();

    assert!(service.get_codes(false).await.is_empty());
    // Failures do not stamp freshness, so the next read retries.
    assert!(service.get_codes(false).await.is_empty());
    assert_eq!(remote.codes_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn initialize_tolerates_partial_failure() {
    let (_, service) = MockRemote {
        codes_failure: Some(503),
        ..Default::default()
    }
    .service();

    assert!(!service.initialize_all_data(false).await);
    // The healthy datasets still landed in the cache.
    assert_eq!(service.get_users(false).await.len(), 1);
    assert_eq!(service.get_calls(false).await.len(), 2);
}

#[tokio::test]
async fn initialize_and_refresh_emit_bus_events() {
    let (remote, service) = MockRemote::default().service();
    let mut rx = service.subscribe();

    assert!(service.initialize_all_data(false).await);

    let mut saw_users_update = false;
    let mut saw_initialized = false;
    while let Ok(event) = rx.try_recv() {
        match event {
            DatasetEvent::Updated { key, .. } if key == DatasetKey::Users => {
                saw_users_update = true;
            }
            DatasetEvent::AllDataInitialized { stats } => {
                saw_initialized = true;
                assert!(stats.succeeded());
                assert_eq!(stats.users, 1);
                assert_eq!(stats.calls, 2);
            }
            _ => {}
        }
    }
    assert!(saw_users_update);
    assert!(saw_initialized);

    assert!(service.refresh_all_data().await);
    assert_eq!(remote.users_calls.load(Ordering::SeqCst), 2);
    assert_eq!(remote.calls_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn branch_codes_not_found_means_empty_branch() {
    let (_, service) = MockRemote {
        branch_codes_failure: Some(404),
        ..Default::default()
    }
    .service();

    let codes = service.get_codes_by_branch("b1", false).await.unwrap();
    assert!(codes.is_empty());
}

#[tokio::test]
async fn branch_codes_other_failures_propagate() {
    let (_, service) = MockRemote {
        branch_codes_failure: Some(500),
        ..Default::default()
    }
    .service();

    let err = service.get_codes_by_branch("b1", false).await.unwrap_err();
    assert_eq!(err, InsightError::RemoteStatus { status: 500 });
}

#[tokio::test]
async fn branch_codes_cache_per_branch_id() {
    let (remote, service) = MockRemote::default().service();

    service.get_codes_by_branch("b1", false).await.unwrap();
    service.get_codes_by_branch("b1", false).await.unwrap();
    service.get_codes_by_branch("b2", false).await.unwrap();
    assert_eq!(remote.branch_codes_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn synchronous_lookups_read_the_cache() {
    let (_, service) = MockRemote::default().service();
    assert!(service.get_code_by_id("c1").is_none());

    service.initialize_all_data(false).await;
    let code = service.get_code_by_id("c1").unwrap();
    assert_eq!(code.code_name.as_deref(), Some("Code Blue"));
    assert_eq!(service.get_user_by_id("u1").unwrap().display_name().as_deref(), Some("Ada Lovelace"));
    assert_eq!(service.get_activations_by_code_id("c1").len(), 2);
    assert!(service.get_activations_by_code_id("nope").is_empty());
}

#[tokio::test]
async fn audio_audits_derive_from_call_recordings() {
    let (_, service) = MockRemote::default().service();
    let audits = service.get_audio_audits(false).await;

    assert_eq!(audits.len(), 1);
    assert_eq!(audits[0].display_name, "CODE BLUE [1]");
    assert!(audits[0].link.ends_with("/rec-1.mp3"));
    assert_eq!(audits[0].code_color, "#0000ff");
}

#[tokio::test]
async fn audit_details_join_through_secondary_key() {
    let (_, service) = MockRemote::default().service();
    // No conf_id on the mock calls, so nothing joins.
    assert!(service.get_code_audit_details(false).await.is_empty());

    let bundle = service.get_code_mappings(false).await;
    assert_eq!(bundle.rows.len(), 1);
    assert_eq!(bundle.mapped.len(), 1);
    assert_eq!(bundle.mapped[0].code_id.as_deref(), Some("c1"));
}

#[tokio::test]
async fn dashboard_reflects_joined_datasets() {
    let (_, service) = MockRemote::default().service();
    let summary = service.get_dashboard_data(false).await;

    assert_eq!(summary.by_code.len(), 1);
    assert_eq!(summary.by_code[0].active, 1);
    assert_eq!(summary.by_code[0].deactivated, 1);
    assert_eq!(summary.recent.len(), 2);
    assert_eq!(summary.seen_codes, vec!["c1"]);
}

#[tokio::test]
async fn clear_cache_forces_refetch() {
    let (remote, service) = MockRemote::default().service();

    service.get_users(false).await;
    service.clear_cache(Some(&DatasetKey::Users));
    service.get_users(false).await;
    assert_eq!(remote.users_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn status_reports_cache_slots() {
    let (_, service) = MockRemote::default().service();
    service.initialize_all_data(false).await;

    let status = service.status();
    assert!(status.inflight.is_empty());
    let users = status
        .entries
        .iter()
        .find(|entry| entry.key == "users")
        .unwrap();
    assert_eq!(users.records, 1);
    assert!(users.age_secs.is_some());
}
