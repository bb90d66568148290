//! End-to-end sync cycles against a mocked org
//!
//! Drives `SyncAccountsUseCase` with the real Salesforce gateway and an
//! in-memory repository, and checks which calls reach the server and which
//! records come back for persistence.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use crmsync_core::{
    domain::AccountRecord,
    ports::{EmailRecordValidator, IAccountRepository},
    usecases::SyncAccountsUseCase,
};
use wiremock::{
    matchers::{body_string, method, path},
    Mock, ResponseTemplate,
};

use crate::common;

#[derive(Default)]
struct MemoryRepo {
    records: Mutex<Vec<AccountRecord>>,
    persisted: Mutex<Vec<AccountRecord>>,
}

#[async_trait]
impl IAccountRepository for MemoryRepo {
    async fn find_modified_since(&self, since: DateTime<Utc>) -> anyhow::Result<Vec<AccountRecord>> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.last_modified() >= since)
            .cloned()
            .collect())
    }

    async fn persist(&self, records: &[AccountRecord]) -> anyhow::Result<()> {
        self.persisted.lock().unwrap().extend_from_slice(records);
        Ok(())
    }
}

fn scenario_candidates() -> Vec<AccountRecord> {
    vec![
        AccountRecord::new(1, "Ada", "Lovelace").with_email("a@b.com"),
        AccountRecord::new(2, "Bad", "Email").with_email("bad"),
        common::existing_record(3, "SF9", "Grace", "Hopper").with_email("c@d.com"),
    ]
}

#[tokio::test]
async fn test_mixed_batch_routes_to_both_paths() {
    let (server, gateway) = common::setup_gateway().await;
    common::mount_token(&server, 1).await;
    common::mount_probe_ok(&server).await;
    common::mount_create(&server, "001NEWADA", 1).await;
    common::mount_job_create(&server, 1).await;
    common::mount_job_close(&server, 1).await;

    Mock::given(method("PUT"))
        .and(path(common::data_path(&format!(
            "/jobs/ingest/{}/batches",
            common::JOB_ID
        ))))
        .and(body_string("Id,Name\nSF9,Grace Hopper\n"))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let repo = Arc::new(MemoryRepo::default());
    *repo.records.lock().unwrap() = scenario_candidates();
    let use_case = SyncAccountsUseCase::new(
        Arc::new(gateway),
        repo.clone(),
        Arc::new(EmailRecordValidator),
    );

    let report = use_case
        .run_cycle(Utc::now() - chrono::Duration::hours(1))
        .await
        .expect("run_cycle");

    assert_eq!(report.candidates, 3);
    assert_eq!(report.skipped_invalid, 1);
    assert_eq!(report.submitted_for_update, 1);
    assert_eq!(report.update_job_id.as_ref().unwrap().as_str(), common::JOB_ID);

    let persisted = repo.persisted.lock().unwrap();
    assert_eq!(persisted.len(), 1);
    assert_eq!(persisted[0].local_id(), 1);
    assert_eq!(persisted[0].remote_id().unwrap().as_str(), "001NEWADA");
}

#[tokio::test]
async fn test_authentication_failure_persists_nothing() {
    let (server, gateway) = common::setup_gateway().await;
    common::mount_token_rejected(&server).await;
    common::mount_create(&server, "001NEW", 0).await;

    let repo = Arc::new(MemoryRepo::default());
    *repo.records.lock().unwrap() = scenario_candidates();
    let use_case = SyncAccountsUseCase::new(
        Arc::new(gateway),
        repo.clone(),
        Arc::new(EmailRecordValidator),
    );

    let result = use_case
        .run_cycle(Utc::now() - chrono::Duration::hours(1))
        .await;

    assert!(result.is_err());
    assert!(repo.persisted.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_session_loss_mid_batch_persists_created_then_fails() {
    let (server, gateway) = common::setup_gateway().await;

    Mock::given(method("POST"))
        .and(path(common::TOKEN_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": common::ACCESS_TOKEN,
            "token_type": "Bearer"
        })))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    common::mount_token_rejected(&server).await;
    common::mount_probe(&server, 401, 1).await;
    common::mount_create(&server, "001A", 1).await;

    let repo = Arc::new(MemoryRepo::default());
    *repo.records.lock().unwrap() = vec![
        AccountRecord::new(1, "Ada", "Lovelace").with_email("a@b.com"),
        AccountRecord::new(2, "Grace", "Hopper").with_email("g@h.com"),
    ];
    let use_case = SyncAccountsUseCase::new(
        Arc::new(gateway),
        repo.clone(),
        Arc::new(EmailRecordValidator),
    );

    let result = use_case
        .run_cycle(Utc::now() - chrono::Duration::hours(1))
        .await;

    assert!(result.is_err());
    let persisted = repo.persisted.lock().unwrap();
    assert_eq!(persisted.len(), 1);
    assert_eq!(persisted[0].local_id(), 1);
    assert_eq!(persisted[0].remote_id().unwrap().as_str(), "001A");
}

#[tokio::test]
async fn test_bulk_failure_still_persists_created_records() {
    let (server, gateway) = common::setup_gateway().await;
    common::mount_token(&server, 1).await;
    common::mount_probe_ok(&server).await;
    common::mount_create(&server, "001NEWADA", 1).await;

    Mock::given(method("POST"))
        .and(path(common::data_path("/jobs/ingest")))
        .respond_with(ResponseTemplate::new(500).set_body_string("UNKNOWN_EXCEPTION"))
        .expect(1)
        .mount(&server)
        .await;

    let repo = Arc::new(MemoryRepo::default());
    *repo.records.lock().unwrap() = scenario_candidates();
    let use_case = SyncAccountsUseCase::new(
        Arc::new(gateway),
        repo.clone(),
        Arc::new(EmailRecordValidator),
    );

    let report = use_case
        .run_cycle(Utc::now() - chrono::Duration::hours(1))
        .await
        .expect("bulk failure must not abort the cycle");

    assert!(report.update_error.is_some());
    assert!(report.update_job_id.is_none());
    assert_eq!(repo.persisted.lock().unwrap().len(), 1);
}
