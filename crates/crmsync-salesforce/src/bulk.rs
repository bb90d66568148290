//! Bulk API 2.0 ingest job driver
//!
//! Submits all records that already have a remote identity as one update job:
//!
//! 1. `POST /jobs/ingest` creates an Open job for `Account` with CSV content
//! 2. `PUT /jobs/ingest/{id}/batches` uploads the CSV document (expects 201)
//! 3. `PATCH /jobs/ingest/{id}` moves the job to `UploadComplete`
//!
//! Processing on the Salesforce side is asynchronous and is not polled.

use std::sync::Arc;

use crmsync_core::domain::{AccountRecord, DomainError, JobId};
use reqwest::{Method, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{
    client::SalesforceClient,
    codec::PayloadCodec,
    session::{AccessToken, SessionManager},
    SalesforceError,
};

/// Ingest job collection endpoint
const JOBS_PATH: &str = "/jobs/ingest";

/// sObject every job targets
const TARGET_OBJECT: &str = "Account";

// ============================================================================
// Job model
// ============================================================================

/// Lifecycle of an ingest job as far as this client drives it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    /// Created; accepting batch content
    Open,
    /// Closed for upload; Salesforce processes it asynchronously
    UploadComplete,
}

impl JobState {
    fn as_str(&self) -> &'static str {
        match self {
            JobState::Open => "Open",
            JobState::UploadComplete => "UploadComplete",
        }
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One Bulk API 2.0 ingest job
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestJob {
    id: JobId,
    state: JobState,
}

impl IngestJob {
    /// A freshly created job
    pub fn open(id: JobId) -> Self {
        Self {
            id,
            state: JobState::Open,
        }
    }

    pub fn id(&self) -> &JobId {
        &self.id
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    /// Moves Open to UploadComplete
    ///
    /// # Errors
    /// Returns [`DomainError::InvalidState`] if the job is not Open.
    pub fn mark_upload_complete(&mut self) -> Result<(), DomainError> {
        if self.state != JobState::Open {
            return Err(DomainError::InvalidState {
                from: self.state.to_string(),
                to: JobState::UploadComplete.to_string(),
            });
        }
        self.state = JobState::UploadComplete;
        Ok(())
    }
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateJobRequest<'a> {
    operation: &'a str,
    object: &'a str,
    content_type: &'a str,
}

#[derive(Debug, Deserialize)]
struct CreateJobResponse {
    id: Option<String>,
}

#[derive(Debug, Serialize)]
struct CloseJobRequest<'a> {
    state: &'a str,
}

// ============================================================================
// BulkJobDriver
// ============================================================================

/// Asynchronous bulk update path for existing records
pub struct BulkJobDriver {
    client: Arc<SalesforceClient>,
    session: Arc<SessionManager>,
    codec: Arc<PayloadCodec>,
}

impl BulkJobDriver {
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

    /// Runs create, upload and close for one batch
    ///
    /// An empty batch returns `Ok(None)` without any remote call. Otherwise
    /// the closed job is returned; the records themselves are not modified.
    ///
    /// # Errors
    /// - [`SalesforceError::JobCreation`] if no job could be opened
    /// - [`SalesforceError::BatchUpload`] if the CSV was not accepted; the job
    ///   is left Open on the server
    /// - [`SalesforceError::Serialization`] if a record has no remote ID
    /// - [`SalesforceError::Authentication`] if no session can be established
    pub async fn submit(
        &self,
        records: &[AccountRecord],
    ) -> Result<Option<IngestJob>, SalesforceError> {
        if records.is_empty() {
            return Ok(None);
        }

        let payload = self.codec.encode_batch(records)?;

        let mut job = self.create_job().await?;
        info!(job_id = %job.id(), records = records.len(), "Ingest job created");

        self.upload_batch(&job, payload).await?;
        self.close_job(&job).await;

        job.mark_upload_complete()
            .map_err(|e| SalesforceError::InvalidResponse(e.to_string()))?;
        info!(job_id = %job.id(), "Ingest job marked UploadComplete");

        Ok(Some(job))
    }

    async fn create_job(&self) -> Result<IngestJob, SalesforceError> {
        let token = self.session.ensure_valid().await?;
        let request = CreateJobRequest {
            operation: "update",
            object: TARGET_OBJECT,
            content_type: "CSV",
        };

        let response = self
            .client
            .request(Method::POST, JOBS_PATH, &token)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(SalesforceError::JobCreation { status, body });
        }

        let id = serde_json::from_str::<CreateJobResponse>(&body)
            .ok()
            .and_then(|r| r.id)
            .and_then(|id| JobId::new(id).ok())
            .ok_or_else(|| SalesforceError::JobCreation {
                status,
                body: body.clone(),
            })?;

        Ok(IngestJob::open(id))
    }

    async fn upload_batch(&self, job: &IngestJob, payload: String) -> Result<(), SalesforceError> {
        let token = self.session.ensure_valid().await?;
        let path = format!("{JOBS_PATH}/{}/batches", job.id());

        let response = self
            .client
            .request(Method::PUT, &path, &token)
            .header(reqwest::header::CONTENT_TYPE, "text/csv")
            .body(payload)
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::CREATED {
            let body = response.text().await.unwrap_or_default();
            return Err(SalesforceError::BatchUpload {
                job_id: job.id().to_string(),
                status,
                body,
            });
        }
        Ok(())
    }

    /// Closes the job; failures are logged, not returned
    async fn close_job(&self, job: &IngestJob) {
        let token = match self.session.ensure_valid().await {
            Ok(token) => token,
            Err(e) => {
                warn!(job_id = %job.id(), error = %e, "Could not close ingest job");
                return;
            }
        };
        self.send_close(job, &token).await;
    }

    async fn send_close(&self, job: &IngestJob, token: &AccessToken) {
        let path = format!("{JOBS_PATH}/{}", job.id());
        let result = self
            .client
            .request(Method::PATCH, &path, token)
            .json(&CloseJobRequest {
                state: JobState::UploadComplete.as_str(),
            })
            .send()
            .await;

        match result {
            Ok(response) if response.status().is_success() => {}
            Ok(response) => {
                warn!(
                    job_id = %job.id(),
                    status = %response.status(),
                    "Ingest job close returned non-success status"
                );
            }
            Err(e) => {
                warn!(job_id = %job.id(), error = %e, "Ingest job close request failed");
            }
        }
    }
}
