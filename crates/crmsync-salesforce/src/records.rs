//! Per-record Account creation
//!
//! Each record without a remote identity is created with its own
//! `POST /sobjects/Account` call. Rejections are absorbed: the record keeps
//! no identity, the failure is logged and counted, and later records are
//! still attempted. Losing the session stops the loop, but the records
//! created before that keep their identities.

use std::sync::Arc;

use crmsync_core::{
    domain::{AccountRecord, RemoteId},
    ports::CreateOutcome,
};
use reqwest::{Method, StatusCode};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::{
    client::SalesforceClient,
    codec::PayloadCodec,
    session::{AccessToken, SessionManager},
};

/// sObject create endpoint for Accounts
const CREATE_PATH: &str = "/sobjects/Account";

/// Body of a successful sObject create
#[derive(Debug, Deserialize)]
struct CreateResponse {
    id: String,
}

/// Why a single create did not yield an identity
enum CreateFailure {
    Rejected { status: StatusCode, body: String },
    Transport(reqwest::Error),
    Malformed(String),
}

/// Synchronous create path for new records
pub struct RecordWriter {
    client: Arc<SalesforceClient>,
    session: Arc<SessionManager>,
    codec: Arc<PayloadCodec>,
}

impl RecordWriter {
    pub fn new(
        client: Arc<SalesforceClient>,
        session: Arc<SessionManager>,
        codec: Arc<PayloadCodec>,
    ) -> Self {
        Self {
            client,
            session,
            codec,
        }
    }

    /// Creates each record in order and attaches the assigned identity
    ///
    /// Every record is returned, in input order; the ones that were created
    /// now carry a remote ID. If no session can be established the loop
    /// stops, the error is stored in [`CreateOutcome::aborted`] and the
    /// remaining records are returned unattempted.
    pub async fn write(&self, records: Vec<AccountRecord>) -> CreateOutcome {
        let mut outcome = CreateOutcome {
            records: Vec::with_capacity(records.len()),
            failures: 0,
            aborted: None,
        };

        let mut pending = records.into_iter();
        while let Some(mut record) = pending.next() {
            let token = match self.session.ensure_valid().await {
                Ok(token) => token,
                Err(e) => {
                    warn!(
                        local_id = record.local_id(),
                        created = outcome.records.iter().filter(|r| r.has_remote_id()).count(),
                        error = %e,
                        "Stopping Account creation, no valid session"
                    );
                    outcome.aborted = Some(e.into());
                    outcome.records.push(record);
                    outcome.records.extend(pending.by_ref());
                    break;
                }
            };
            let body = self.codec.encode_object(&record);

            debug!(local_id = record.local_id(), "Creating Account");

            let result = self.create_one(&token, &body).await;
            match result.and_then(|id| {
                record
                    .assign_remote_id(id)
                    .map_err(|e| CreateFailure::Malformed(e.to_string()))
            }) {
                Ok(()) => {
                    debug!(
                        local_id = record.local_id(),
                        remote_id = ?record.remote_id().map(RemoteId::as_str),
                        "Account created"
                    );
                }
                Err(failure) => {
                    outcome.failures += 1;
                    log_failure(record.local_id(), &failure);
                }
            }

            outcome.records.push(record);
        }

        outcome
    }

    async fn create_one(
        &self,
        token: &AccessToken,
        body: &serde_json::Value,
    ) -> Result<RemoteId, CreateFailure> {
        let response = self
            .client
            .request(Method::POST, CREATE_PATH, token)
            .json(body)
            .send()
            .await
            .map_err(CreateFailure::Transport)?;

        let status = response.status();
        let text = response.text().await.map_err(CreateFailure::Transport)?;

        if status != StatusCode::CREATED {
            return Err(CreateFailure::Rejected { status, body: text });
        }

        let parsed: CreateResponse = serde_json::from_str(&text)
            .map_err(|e| CreateFailure::Malformed(format!("{e}: {text}")))?;
        RemoteId::new(parsed.id).map_err(|e| CreateFailure::Malformed(e.to_string()))
    }
}

fn log_failure(local_id: i64, failure: &CreateFailure) {
    match failure {
        CreateFailure::Rejected { status, body } => {
            warn!(local_id, status = %status, body = %body, "Account create rejected");
        }
        CreateFailure::Transport(e) => {
            warn!(local_id, error = %e, "Account create request failed");
        }
        CreateFailure::Malformed(detail) => {
            warn!(local_id, detail = %detail, "Account create returned an unusable body");
        }
    }
}
