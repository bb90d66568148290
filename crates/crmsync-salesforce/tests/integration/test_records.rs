//! Integration tests for the per-record create path

use chrono::NaiveDate;
use crmsync_core::{
    config::FieldMapping,
    ports::{ICrmGateway, RemoteError},
};
use crmsync_salesforce::provider::SalesforceGateway;
use wiremock::{
    matchers::{body_json, body_partial_json, header, method, path},
    Mock, MockServer, ResponseTemplate,
};

use crate::common;

#[tokio::test]
async fn test_create_attaches_remote_id() {
    let (server, gateway) = common::setup_gateway().await;
    common::mount_token(&server, 1).await;

    Mock::given(method("POST"))
        .and(path(common::data_path("/sobjects/Account")))
        .and(header("authorization", format!("Bearer {}", common::ACCESS_TOKEN).as_str()))
        .and(body_json(serde_json::json!({ "Name": "Ada Lovelace" })))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
            "id": "001xx000003DGb2AAG",
            "success": true,
            "errors": []
        })))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = gateway
        .create_accounts(vec![common::new_record(1, "Ada", "Lovelace")])
        .await
        .expect("create_accounts");

    assert_eq!(outcome.failures, 0);
    assert_eq!(outcome.records.len(), 1);
    assert_eq!(
        outcome.records[0].remote_id().unwrap().as_str(),
        "001xx000003DGb2AAG"
    );
}

#[tokio::test]
async fn test_rejected_create_does_not_stop_later_records() {
    let (server, gateway) = common::setup_gateway().await;
    common::mount_token(&server, 1).await;
    common::mount_probe_ok(&server).await;

    Mock::given(method("POST"))
        .and(path(common::data_path("/sobjects/Account")))
        .and(body_partial_json(serde_json::json!({ "Name": "Bad Row" })))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!([{
            "message": "Required fields are missing",
            "errorCode": "REQUIRED_FIELD_MISSING"
        }])))
        .with_priority(1)
        .expect(1)
        .mount(&server)
        .await;
    common::mount_create(&server, "001NEW", 2).await;

    let outcome = gateway
        .create_accounts(vec![
            common::new_record(1, "Ada", "Lovelace"),
            common::new_record(2, "Bad", "Row"),
            common::new_record(3, "Grace", "Hopper"),
        ])
        .await
        .expect("create_accounts");

    assert_eq!(outcome.failures, 1);
    let ids: Vec<Option<&str>> = outcome
        .records
        .iter()
        .map(|r| r.remote_id().map(|id| id.as_str()))
        .collect();
    assert_eq!(ids, vec![Some("001NEW"), None, Some("001NEW")]);
    let order: Vec<i64> = outcome.records.iter().map(|r| r.local_id()).collect();
    assert_eq!(order, vec![1, 2, 3]);
}

#[tokio::test]
async fn test_created_status_with_unusable_body_is_soft_failure() {
    let (server, gateway) = common::setup_gateway().await;
    common::mount_token(&server, 1).await;

    Mock::given(method("POST"))
        .and(path(common::data_path("/sobjects/Account")))
        .respond_with(ResponseTemplate::new(201).set_body_string("not json"))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = gateway
        .create_accounts(vec![common::new_record(1, "Ada", "Lovelace")])
        .await
        .expect("create_accounts");

    assert_eq!(outcome.failures, 1);
    assert!(!outcome.records[0].has_remote_id());
}

#[tokio::test]
async fn test_authentication_failure_aborts_create_path() {
    let (server, gateway) = common::setup_gateway().await;
    common::mount_token_rejected(&server).await;
    common::mount_create(&server, "001NEW", 0).await;

    let outcome = gateway
        .create_accounts(vec![
            common::new_record(1, "Ada", "Lovelace"),
            common::new_record(2, "Grace", "Hopper"),
        ])
        .await
        .expect("create_accounts");

    let err = outcome.aborted.expect("aborted");
    assert!(matches!(err, RemoteError::Authentication(_)));
    assert!(err.is_fatal());
    assert_eq!(outcome.records.len(), 2);
    assert!(outcome.records.iter().all(|r| !r.has_remote_id()));
}

#[tokio::test]
async fn test_session_loss_mid_batch_keeps_earlier_identities() {
    let (server, gateway) = common::setup_gateway().await;

    // First grant succeeds, the re-authentication after the 401 is refused
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

    let outcome = gateway
        .create_accounts(vec![
            common::new_record(1, "Ada", "Lovelace"),
            common::new_record(2, "Grace", "Hopper"),
            common::new_record(3, "Alan", "Turing"),
        ])
        .await
        .expect("create_accounts");

    assert!(matches!(outcome.aborted, Some(RemoteError::Authentication(_))));
    let ids: Vec<Option<&str>> = outcome
        .records
        .iter()
        .map(|r| r.remote_id().map(|id| id.as_str()))
        .collect();
    assert_eq!(ids, vec![Some("001A"), None, None]);
    assert_eq!(outcome.failures, 0);
}

#[tokio::test]
async fn test_remote_id_with_separators_is_attached() {
    let (server, gateway) = common::setup_gateway().await;
    common::mount_token(&server, 1).await;
    common::mount_create(&server, "SF-9", 1).await;

    let outcome = gateway
        .create_accounts(vec![common::new_record(1, "Ada", "Lovelace")])
        .await
        .expect("create_accounts");

    assert_eq!(outcome.failures, 0);
    assert_eq!(outcome.records[0].remote_id().unwrap().as_str(), "SF-9");
}

#[tokio::test]
async fn test_empty_create_list_makes_no_calls() {
    let (server, gateway) = common::setup_gateway().await;
    common::mount_token(&server, 0).await;
    common::mount_create(&server, "001NEW", 0).await;

    let outcome = gateway.create_accounts(vec![]).await.expect("create_accounts");
    assert!(outcome.records.is_empty());
    assert_eq!(outcome.failures, 0);
}

#[tokio::test]
async fn test_field_mapping_adds_mapped_attributes() {
    let server = MockServer::start().await;
    let mut config = common::sf_config(&server);
    config.field_mapping = FieldMapping {
        email: Some("Email__c".into()),
        birth_date: Some("Birthdate__c".into()),
    };
    let gateway = SalesforceGateway::new(&config).expect("gateway");
    common::mount_token(&server, 1).await;

    Mock::given(method("POST"))
        .and(path(common::data_path("/sobjects/Account")))
        .and(body_json(serde_json::json!({
            "Name": "Ada Lovelace",
            "Email__c": "ada@example.com",
            "Birthdate__c": "1815-12-10"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
            "id": "001ADA",
            "success": true,
            "errors": []
        })))
        .expect(1)
        .mount(&server)
        .await;

    let record = common::new_record(1, "Ada", "Lovelace")
        .with_birth_date(NaiveDate::from_ymd_opt(1815, 12, 10).unwrap());
    let outcome = gateway
        .create_accounts(vec![record])
        .await
        .expect("create_accounts");

    assert_eq!(outcome.failures, 0);
    assert_eq!(outcome.records[0].remote_id().unwrap().as_str(), "001ADA");
}
