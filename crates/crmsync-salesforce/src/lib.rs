//! CRMSync Salesforce - Salesforce REST and Bulk API 2.0 client
//!
//! Provides async client for:
//! - OAuth2 authentication (username-password grant)
//! - Per-record Account creation via the sObject REST endpoint
//! - Bulk updates via Bulk API 2.0 ingest jobs
//!
//! ## Modules
//!
//! - [`session`] - Bearer token ownership, probing and re-authentication
//! - [`client`] - Salesforce REST HTTP client
//! - [`codec`] - JSON and CSV payload encoding
//! - [`records`] - Per-record create path
//! - [`bulk`] - Bulk ingest job lifecycle
//! - [`provider`] - `ICrmGateway` implementation tying the above together

pub mod bulk;
pub mod client;
pub mod codec;
pub mod provider;
pub mod records;
pub mod session;

use crmsync_core::ports::RemoteError;
use reqwest::StatusCode;
use thiserror::Error;

/// Errors that can occur when communicating with Salesforce
#[derive(Debug, Error)]
pub enum SalesforceError {
    /// The token exchange was rejected or could not be completed
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// The ingest job could not be created
    #[error("Job creation failed with status {status}: {body}")]
    JobCreation {
        /// HTTP status returned by the job endpoint
        status: StatusCode,
        /// Response body, as returned
        body: String,
    },

    /// The job accepted no batch content
    #[error("Batch upload for job {job_id} failed with status {status}: {body}")]
    BatchUpload {
        /// Ingest job that rejected the batch
        job_id: String,
        /// HTTP status returned by the batch endpoint
        status: StatusCode,
        /// Response body, as returned
        body: String,
    },

    /// A payload could not be encoded
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A network-level error occurred
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The API response could not be parsed or was malformed
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// The client could not be built from the supplied settings
    #[error("Invalid configuration: {0}")]
    Configuration(String),
}

impl From<SalesforceError> for RemoteError {
    fn from(err: SalesforceError) -> Self {
        let message = err.to_string();
        match err {
            SalesforceError::Authentication(_) => RemoteError::Authentication(message),
            SalesforceError::JobCreation { .. } => RemoteError::JobCreation(message),
            SalesforceError::BatchUpload { .. } => RemoteError::BatchUpload(message),
            SalesforceError::Serialization(_) => RemoteError::Serialization(message),
            SalesforceError::Network(_)
            | SalesforceError::InvalidResponse(_)
            | SalesforceError::Configuration(_) => RemoteError::Transport(message),
        }
    }
}
