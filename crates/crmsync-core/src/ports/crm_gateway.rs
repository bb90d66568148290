//! CRM gateway port (driven/secondary port)
//!
//! This module defines the interface the sync use case uses to push account
//! records into the remote CRM. The Salesforce adapter implements it with a
//! per-record create path and a bulk ingest path.
//!
//! ## Design Notes
//!
//! - Errors are a closed set of tagged variants ([`RemoteError`]) rather than
//!   `anyhow::Error`, because the orchestrator must tell a fatal
//!   authentication failure apart from a failed bulk batch.
//! - Per-record create failures are not errors. They are reported through
//!   [`CreateOutcome::failures`] and the record keeps no remote identity.
//! - A session failure partway through the create loop is reported in
//!   [`CreateOutcome::aborted`] next to the identities assigned before it.

use thiserror::Error;

use crate::domain::{AccountRecord, JobId};

/// Failures surfaced by a CRM gateway
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RemoteError {
    /// The credential exchange failed; no remote call can proceed
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// The bulk ingest job could not be created
    #[error("Job creation failed: {0}")]
    JobCreation(String),

    /// The batch payload was not accepted by the ingest job
    #[error("Batch upload failed: {0}")]
    BatchUpload(String),

    /// A payload could not be encoded
    #[error("Serialization failed: {0}")]
    Serialization(String),

    /// Network failure or malformed response on a step that cannot absorb it
    #[error("Transport error: {0}")]
    Transport(String),
}

impl RemoteError {
    /// Returns true if the error ends the whole sync cycle
    pub fn is_fatal(&self) -> bool {
        matches!(self, RemoteError::Authentication(_))
    }
}

/// Result of the per-record create path
#[derive(Debug, Clone, Default)]
pub struct CreateOutcome {
    /// Every input record, in input order
    ///
    /// Records whose create succeeded now carry a remote identity.
    pub records: Vec<AccountRecord>,
    /// Number of records whose create call did not return an identity
    pub failures: usize,
    /// Fatal error that stopped the loop; later records were not attempted
    pub aborted: Option<RemoteError>,
}

/// Result of the bulk update path
#[derive(Debug, Clone, Default)]
pub struct UpdateOutcome {
    /// The submitted records, unchanged
    pub records: Vec<AccountRecord>,
    /// Ingest job that carried the batch (None when nothing was submitted)
    pub job_id: Option<JobId>,
}

/// Port trait for CRM write operations
///
/// ## Implementation Notes
///
/// - Implementations obtain a valid session before every remote call.
/// - `create_accounts` processes records sequentially and never stops early
///   on a per-record rejection.
/// - `update_accounts` with an empty list must not issue any remote call.
#[async_trait::async_trait]
pub trait ICrmGateway: Send + Sync {
    /// Creates each record in the CRM and attaches the assigned identity
    ///
    /// Rejected creates are counted in the outcome. A session failure stops
    /// the loop and is returned in [`CreateOutcome::aborted`] so identities
    /// already assigned are not lost.
    ///
    /// # Errors
    /// Returned only when the path fails before any record is attempted.
    async fn create_accounts(
        &self,
        records: Vec<AccountRecord>,
    ) -> Result<CreateOutcome, RemoteError>;

    /// Submits all records to a single bulk update job
    ///
    /// # Errors
    /// Returns [`RemoteError::JobCreation`] or [`RemoteError::BatchUpload`]
    /// when the batch is abandoned.
    async fn update_accounts(
        &self,
        records: Vec<AccountRecord>,
    ) -> Result<UpdateOutcome, RemoteError>;
}
