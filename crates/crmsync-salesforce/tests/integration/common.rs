//! Shared test helpers for Salesforce integration tests
//!
//! Provides wiremock-based mock server setup for the token endpoint and the
//! versioned data API. Each helper mounts the necessary mock endpoints; the
//! `expect` arguments are verified when the server is dropped.

use std::sync::Arc;

use crmsync_core::{
    config::SalesforceConfig,
    domain::{AccountRecord, RemoteId},
};
use crmsync_salesforce::{
    client::SalesforceClient, provider::SalesforceGateway, session::SessionManager,
};
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const TOKEN_PATH: &str = "/services/oauth2/token";
pub const DATA_PATH: &str = "/services/data/v60.0";
pub const ACCESS_TOKEN: &str = "00Dxx0000001gPL!AQ4AQFakeToken";
pub const JOB_ID: &str = "7505g00000ZtUXcAAN";

/// Configuration pointing both the login URL and the instance at `server`
pub fn sf_config(server: &MockServer) -> SalesforceConfig {
    SalesforceConfig {
        username: "integration-user".into(),
        password: "hunter2".into(),
        security_token: "SECTOKEN".into(),
        instance_url: server.uri(),
        login_url: format!("{}{}", server.uri(), TOKEN_PATH),
        client_id: "3MVG9test".into(),
        client_secret: "clientsecret".into(),
        request_timeout_secs: 5,
        ..Default::default()
    }
}

/// Starts a server and returns it with a session manager that holds no token
pub async fn setup_session() -> (MockServer, SessionManager) {
    let server = MockServer::start().await;
    let config = sf_config(&server);
    let client = Arc::new(SalesforceClient::new(&config).expect("client"));
    let session = SessionManager::new(client, &config).expect("session manager");
    (server, session)
}

/// Starts a server and returns it with a gateway built on it
pub async fn setup_gateway() -> (MockServer, SalesforceGateway) {
    let server = MockServer::start().await;
    let gateway = SalesforceGateway::new(&sf_config(&server)).expect("gateway");
    (server, gateway)
}

pub fn data_path(suffix: &str) -> String {
    format!("{DATA_PATH}{suffix}")
}

/// Mounts a successful password grant, expected exactly `times` times
pub async fn mount_token(server: &MockServer, times: u64) {
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .and(body_string_contains("grant_type=password"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": ACCESS_TOKEN,
            "instance_url": server.uri(),
            "id": format!("{}/id/00Dxx0000001gPLEAY/005xx000001SwiUAAS", server.uri()),
            "token_type": "Bearer",
            "issued_at": "1700000000000",
            "signature": "c2lnbmF0dXJl"
        })))
        .expect(times)
        .mount(server)
        .await;
}

/// Mounts a rejected password grant
pub async fn mount_token_rejected(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
            "error": "invalid_grant",
            "error_description": "authentication failure"
        })))
        .mount(server)
        .await;
}

/// Mounts the capability probe answering `status`, expected `times` times
pub async fn mount_probe(server: &MockServer, status: u16, times: u64) {
    Mock::given(method("GET"))
        .and(path(data_path("/limits")))
        .and(header("authorization", format!("Bearer {ACCESS_TOKEN}").as_str()))
        .respond_with(ResponseTemplate::new(status).set_body_json(serde_json::json!({})))
        .expect(times)
        .mount(server)
        .await;
}

/// Mounts the probe with no call-count expectation
pub async fn mount_probe_ok(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path(data_path("/limits")))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
        .mount(server)
        .await;
}

/// Mounts a successful sObject create returning `id`
pub async fn mount_create(server: &MockServer, id: &str, times: u64) {
    Mock::given(method("POST"))
        .and(path(data_path("/sobjects/Account")))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
            "id": id,
            "success": true,
            "errors": []
        })))
        .expect(times)
        .mount(server)
        .await;
}

/// Mounts a job create answering with [`JOB_ID`]
pub async fn mount_job_create(server: &MockServer, times: u64) {
    Mock::given(method("POST"))
        .and(path(data_path("/jobs/ingest")))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": JOB_ID,
            "operation": "update",
            "object": "Account",
            "state": "Open",
            "contentType": "CSV"
        })))
        .expect(times)
        .mount(server)
        .await;
}

/// Mounts an accepting batch upload for [`JOB_ID`]
pub async fn mount_batch_upload(server: &MockServer, times: u64) {
    Mock::given(method("PUT"))
        .and(path(data_path(&format!("/jobs/ingest/{JOB_ID}/batches"))))
        .respond_with(ResponseTemplate::new(201))
        .expect(times)
        .mount(server)
        .await;
}

/// Mounts a successful close for [`JOB_ID`]
pub async fn mount_job_close(server: &MockServer, times: u64) {
    Mock::given(method("PATCH"))
        .and(path(data_path(&format!("/jobs/ingest/{JOB_ID}"))))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": JOB_ID,
            "state": "UploadComplete"
        })))
        .expect(times)
        .mount(server)
        .await;
}

/// Mounts the three ingest job endpoints, each expected exactly `times` times
pub async fn mount_bulk_lifecycle(server: &MockServer, times: u64) {
    mount_job_create(server, times).await;
    mount_batch_upload(server, times).await;
    mount_job_close(server, times).await;
}

pub fn new_record(local_id: i64, given: &str, family: &str) -> AccountRecord {
    AccountRecord::new(local_id, given, family).with_email(format!("{}@example.com", given.to_lowercase()))
}

pub fn existing_record(local_id: i64, remote: &str, given: &str, family: &str) -> AccountRecord {
    new_record(local_id, given, family).with_remote_id(RemoteId::new(remote.to_string()).unwrap())
}
