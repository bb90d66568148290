//! Account synchronization use case
//!
//! Filters candidate records, routes records without a remote identity to
//! the per-record create path and records with one to the bulk update path,
//! then hands the newly identified records back to the local store.

use std::{sync::Arc, time::Instant};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use tracing::{debug, error, info};

use crate::{
    domain::{AccountRecord, JobId},
    ports::{IAccountRepository, ICrmGateway, IRecordValidator, RemoteError},
};

/// Summary of one sync cycle
#[derive(Debug, Clone, Default)]
pub struct SyncReport {
    /// Records handed to the cycle before filtering
    pub candidates: usize,
    /// Records dropped by the validity check
    pub skipped_invalid: usize,
    /// Records that received a remote identity this cycle
    pub created: Vec<AccountRecord>,
    /// Records whose create call did not return an identity
    pub create_failures: usize,
    /// Fatal error that stopped the create path partway through
    pub create_error: Option<RemoteError>,
    /// Records submitted to the bulk update job
    pub submitted_for_update: usize,
    /// Bulk ingest job that carried the update batch
    pub update_job_id: Option<JobId>,
    /// Why the update batch was abandoned, if it was
    pub update_error: Option<RemoteError>,
    /// Wall-clock duration of the remote phase
    pub duration_ms: u64,
}

impl SyncReport {
    /// Records that must be written back to the local store
    pub fn created(&self) -> &[AccountRecord] {
        &self.created
    }

    /// Returns true if every remote step completed without loss
    pub fn is_clean(&self) -> bool {
        self.create_failures == 0 && self.create_error.is_none() && self.update_error.is_none()
    }
}

/// Splits records into `(without_remote_id, with_remote_id)`
///
/// Input order is preserved within each side.
pub fn partition_by_remote_id(
    records: Vec<AccountRecord>,
) -> (Vec<AccountRecord>, Vec<AccountRecord>) {
    records.into_iter().partition(|r| !r.has_remote_id())
}

/// Use case that reconciles local accounts with the CRM
pub struct SyncAccountsUseCase {
    gateway: Arc<dyn ICrmGateway + Send + Sync>,
    repository: Arc<dyn IAccountRepository + Send + Sync>,
    validator: Arc<dyn IRecordValidator + Send + Sync>,
}

impl SyncAccountsUseCase {
    /// Creates a new SyncAccountsUseCase with the required dependencies
    ///
    /// # Arguments
    ///
    /// * `gateway` - CRM adapter for create and bulk update calls
    /// * `repository` - Local store for candidates and write-back
    /// * `validator` - Candidate eligibility check
    pub fn new(
        gateway: Arc<dyn ICrmGateway + Send + Sync>,
        repository: Arc<dyn IAccountRepository + Send + Sync>,
        validator: Arc<dyn IRecordValidator + Send + Sync>,
    ) -> Self {
        Self {
            gateway,
            repository,
            validator,
        }
    }

    /// Synchronizes a batch of candidate records with the CRM
    ///
    /// This method:
    /// 1. Drops records that fail the validity check
    /// 2. Partitions the rest by whether they already have a remote identity
    /// 3. Runs the create path and the bulk update path concurrently
    /// 4. Collects the records that received an identity
    ///
    /// # Errors
    ///
    /// Returns an error if the create path fails before attempting any
    /// record. A create path stopped partway through is recorded in
    /// [`SyncReport::create_error`] together with the identities it assigned;
    /// a failed update batch is recorded in the report as well.
    pub async fn sync(&self, candidates: Vec<AccountRecord>) -> Result<SyncReport, RemoteError> {
        let started = Instant::now();
        let candidate_count = candidates.len();

        let eligible: Vec<AccountRecord> = candidates
            .into_iter()
            .filter(|record| {
                let valid = self.validator.is_valid(record);
                if !valid {
                    debug!(local_id = record.local_id(), "Skipping record that failed validation");
                }
                valid
            })
            .collect();
        let skipped_invalid = candidate_count - eligible.len();

        let (new_records, existing_records) = partition_by_remote_id(eligible);
        let submitted_for_update = existing_records.len();

        info!(
            candidates = candidate_count,
            skipped = skipped_invalid,
            to_create = new_records.len(),
            to_update = submitted_for_update,
            "Partitioned sync candidates"
        );

        let (create_result, update_result) = tokio::join!(
            self.gateway.create_accounts(new_records),
            self.gateway.update_accounts(existing_records),
        );

        let create_outcome = match create_result {
            Ok(outcome) => outcome,
            Err(e) => {
                if let Err(update_err) = &update_result {
                    error!(
                        error = %update_err,
                        records = submitted_for_update,
                        "Bulk update batch abandoned"
                    );
                }
                return Err(e);
            }
        };

        if let Some(e) = &create_outcome.aborted {
            error!(error = %e, "Create path stopped before the end of the batch");
        }

        let (update_job_id, update_error) = match update_result {
            Ok(outcome) => (outcome.job_id, None),
            Err(e) => {
                error!(
                    error = %e,
                    records = submitted_for_update,
                    "Bulk update batch abandoned"
                );
                (None, Some(e))
            }
        };

        let created: Vec<AccountRecord> = create_outcome
            .records
            .into_iter()
            .filter(AccountRecord::has_remote_id)
            .collect();

        Ok(SyncReport {
            candidates: candidate_count,
            skipped_invalid,
            created,
            create_failures: create_outcome.failures,
            create_error: create_outcome.aborted,
            submitted_for_update,
            update_job_id,
            update_error,
            duration_ms: started.elapsed().as_millis() as u64,
        })
    }

    /// Runs one full cycle against the local store
    ///
    /// Loads records modified since `since`, synchronizes them, and persists
    /// the records that received a remote identity.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read or written, or if the
    /// sync itself fails fatally. Identities assigned before a fatal create
    /// error are persisted before the error is returned.
    pub async fn run_cycle(&self, since: DateTime<Utc>) -> Result<SyncReport> {
        let candidates = self
            .repository
            .find_modified_since(since)
            .await
            .context("Failed to load modified accounts")?;

        debug!(count = candidates.len(), since = %since, "Loaded sync candidates");

        let report = self
            .sync(candidates)
            .await
            .context("Account sync aborted")?;

        if !report.created.is_empty() {
            self.repository
                .persist(&report.created)
                .await
                .context("Failed to persist assigned remote IDs")?;
        }

        if let Some(e) = &report.create_error {
            return Err(anyhow::Error::new(e.clone()).context(format!(
                "Account sync aborted after persisting {} created record(s)",
                report.created.len()
            )));
        }

        info!(
            created = report.created.len(),
            create_failures = report.create_failures,
            updated = report.submitted_for_update,
            job_id = ?report.update_job_id.as_ref().map(JobId::as_str),
            duration_ms = report.duration_ms,
            "Sync cycle finished"
        );

        Ok(report)
    }
}
