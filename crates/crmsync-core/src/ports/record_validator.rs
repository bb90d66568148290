//! Record validity port
//!
//! Decides which candidate records are eligible for a sync cycle. Records
//! that fail the check are skipped for this cycle only.

use std::sync::LazyLock;

use regex::Regex;

use crate::domain::AccountRecord;

/// Email shape accepted by the CRM import.
static EMAIL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
        .expect("EMAIL_REGEX is a valid regex pattern")
});

/// Port trait for the candidate filter
pub trait IRecordValidator: Send + Sync {
    /// Returns true if the record may be synchronized this cycle
    fn is_valid(&self, record: &AccountRecord) -> bool;
}

/// Accepts records with a present, well-formed email address
#[derive(Debug, Clone, Copy, Default)]
pub struct EmailRecordValidator;

impl IRecordValidator for EmailRecordValidator {
    fn is_valid(&self, record: &AccountRecord) -> bool {
        record.email().is_some_and(|email| EMAIL_REGEX.is_match(email))
    }
}
