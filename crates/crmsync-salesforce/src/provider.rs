//! SalesforceGateway - ICrmGateway implementation for Salesforce
//!
//! Wires one [`SessionManager`] into both write paths so a token refreshed by
//! one path is seen by the other:
//!
//! - `create_accounts` delegates to [`RecordWriter`]
//! - `update_accounts` delegates to [`BulkJobDriver`]

use std::sync::Arc;

use async_trait::async_trait;
use crmsync_core::{
    config::SalesforceConfig,
    domain::AccountRecord,
    ports::{CreateOutcome, ICrmGateway, RemoteError, UpdateOutcome},
};
use tracing::debug;

use crate::{
    bulk::BulkJobDriver, client::SalesforceClient, codec::PayloadCodec, records::RecordWriter,
    session::SessionManager, SalesforceError,
};

/// Salesforce adapter for the CRM gateway port
pub struct SalesforceGateway {
    session: Arc<SessionManager>,
    writer: RecordWriter,
    driver: BulkJobDriver,
}

impl SalesforceGateway {
    /// Builds the client, session manager, codec and both write paths
    ///
    /// # Errors
    /// Returns [`SalesforceError::Configuration`] for an unusable login URL
    /// or HTTP client settings.
    pub fn new(config: &SalesforceConfig) -> Result<Self, SalesforceError> {
        let client = Arc::new(SalesforceClient::new(config)?);
        Self::with_client(client, config)
    }

    /// Builds the gateway on an existing client (useful for testing)
    pub fn with_client(
        client: Arc<SalesforceClient>,
        config: &SalesforceConfig,
    ) -> Result<Self, SalesforceError> {
        let session = Arc::new(SessionManager::new(Arc::clone(&client), config)?);
        let codec = Arc::new(PayloadCodec::new(config.field_mapping.clone()));

        Ok(Self {
            writer: RecordWriter::new(Arc::clone(&client), Arc::clone(&session), Arc::clone(&codec)),
            driver: BulkJobDriver::new(client, Arc::clone(&session), codec),
            session,
        })
    }

    /// The shared session manager
    pub fn session(&self) -> &Arc<SessionManager> {
        &self.session
    }
}

#[async_trait]
impl ICrmGateway for SalesforceGateway {
    async fn create_accounts(
        &self,
        records: Vec<AccountRecord>,
    ) -> Result<CreateOutcome, RemoteError> {
        debug!(count = records.len(), "create_accounts");
        Ok(self.writer.write(records).await)
    }

    async fn update_accounts(
        &self,
        records: Vec<AccountRecord>,
    ) -> Result<UpdateOutcome, RemoteError> {
        debug!(count = records.len(), "update_accounts");
        let job = self.driver.submit(&records).await?;
        Ok(UpdateOutcome {
            records,
            job_id: job.map(|j| j.id().clone()),
        })
    }
}
