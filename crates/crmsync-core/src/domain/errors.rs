//! Domain error types
//!
//! This module defines error types specific to domain operations,
//! including validation failures and identity invariants.

use thiserror::Error;

/// Errors that can occur in domain operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Invalid remote ID format
    #[error("Invalid remote ID: {0}")]
    InvalidRemoteId(String),

    /// Invalid ingest job ID format
    #[error("Invalid job ID: {0}")]
    InvalidJobId(String),

    /// The record already carries a remote identity
    #[error("Record {local_id} already has remote ID {existing}")]
    RemoteIdAlreadyAssigned {
        /// Local identifier of the record
        local_id: i64,
        /// The identity that is already attached
        existing: String,
    },

    /// Invalid state transition attempt
    #[error("Invalid state transition from {from} to {to}")]
    InvalidState {
        /// The current state
        from: String,
        /// The attempted target state
        to: String,
    },
}
