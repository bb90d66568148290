//! Account repository port (driven/secondary port)
//!
//! This module defines the interface for reading candidate account records
//! and writing back the ones that received a remote identity.
//!
//! ## Design Notes
//!
//! - Uses `anyhow::Result` because storage errors are adapter-specific
//!   (SQLite, in-memory, etc.) and don't need domain-level classification.
//! - Write operations take slices, allowing the caller to retain ownership.

use chrono::{DateTime, Utc};

use crate::domain::AccountRecord;

/// Port trait for the local account store
#[async_trait::async_trait]
pub trait IAccountRepository: Send + Sync {
    /// Returns every record whose last modification is at or after `since`
    async fn find_modified_since(&self, since: DateTime<Utc>)
        -> anyhow::Result<Vec<AccountRecord>>;

    /// Saves the given records (insert or update by local id)
    async fn persist(&self, records: &[AccountRecord]) -> anyhow::Result<()>;
}
