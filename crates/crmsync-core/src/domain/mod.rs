//! Domain entities and business logic
//!
//! This module contains the core domain types for CRMSync:
//! - Account records mirrored into the CRM
//! - Newtypes for remote identifiers
//! - Domain-specific error types

pub mod account;
pub mod errors;
pub mod newtypes;

// Re-export commonly used types
pub use account::AccountRecord;
pub use errors::DomainError;
pub use newtypes::*;
