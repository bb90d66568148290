//! Account record entity
//!
//! This module defines the local account record that is mirrored into the
//! CRM. The local store owns these records; the sync core receives a
//! snapshot and hands back the records that gained a remote identity.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::{errors::DomainError, newtypes::RemoteId};

/// A local account that is synchronized with the CRM
///
/// `remote_id` stays `None` until the CRM assigns an identity. Once set it
/// cannot be replaced through [`AccountRecord::assign_remote_id`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountRecord {
    /// Primary key in the local store
    local_id: i64,
    /// Given (first) name
    given_name: String,
    /// Family (last) name
    family_name: String,
    /// Date of birth, if known
    birth_date: Option<NaiveDate>,
    /// Contact email as entered; may be missing or malformed
    email: Option<String>,
    /// Identity assigned by the CRM
    remote_id: Option<RemoteId>,
    /// Last local modification
    last_modified: DateTime<Utc>,
}

impl AccountRecord {
    /// Creates a record with no email, birth date or remote identity
    ///
    /// `last_modified` defaults to now.
    pub fn new(
        local_id: i64,
        given_name: impl Into<String>,
        family_name: impl Into<String>,
    ) -> Self {
        Self {
            local_id,
            given_name: given_name.into(),
            family_name: family_name.into(),
            birth_date: None,
            email: None,
            remote_id: None,
            last_modified: Utc::now(),
        }
    }

    /// Sets the email address
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Sets the birth date
    pub fn with_birth_date(mut self, birth_date: NaiveDate) -> Self {
        self.birth_date = Some(birth_date);
        self
    }

    /// Sets the remote identity (for reconstitution from storage)
    pub fn with_remote_id(mut self, remote_id: RemoteId) -> Self {
        self.remote_id = Some(remote_id);
        self
    }

    /// Sets the last modification timestamp
    pub fn with_last_modified(mut self, last_modified: DateTime<Utc>) -> Self {
        self.last_modified = last_modified;
        self
    }

    // --- Getters ---

    pub fn local_id(&self) -> i64 {
        self.local_id
    }

    pub fn given_name(&self) -> &str {
        &self.given_name
    }

    pub fn family_name(&self) -> &str {
        &self.family_name
    }

    pub fn birth_date(&self) -> Option<NaiveDate> {
        self.birth_date
    }

    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    pub fn remote_id(&self) -> Option<&RemoteId> {
        self.remote_id.as_ref()
    }

    pub fn last_modified(&self) -> DateTime<Utc> {
        self.last_modified
    }

    /// Returns true if the CRM has assigned an identity to this record
    pub fn has_remote_id(&self) -> bool {
        self.remote_id.is_some()
    }

    /// Combined display name: given name, a space, family name
    pub fn display_name(&self) -> String {
        format!("{} {}", self.given_name, self.family_name)
    }

    /// Attaches the identity returned by the CRM
    ///
    /// # Errors
    /// Returns [`DomainError::RemoteIdAlreadyAssigned`] if the record already
    /// has an identity; the existing one is kept.
    pub fn assign_remote_id(&mut self, remote_id: RemoteId) -> Result<(), DomainError> {
        if let Some(existing) = &self.remote_id {
            return Err(DomainError::RemoteIdAlreadyAssigned {
                local_id: self.local_id,
                existing: existing.to_string(),
            });
        }
        self.remote_id = Some(remote_id);
        Ok(())
    }
}
