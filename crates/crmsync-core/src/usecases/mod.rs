//! Use cases (interactors) for CRMSync
//!
//! This module contains the application use cases that orchestrate
//! domain entities and port interfaces. Use cases are thin coordinators
//! that delegate business rules to domain methods and I/O to ports.
//!
//! ## Use Cases
//!
//! - [`SyncAccountsUseCase`] - Reconcile modified local accounts with the CRM

pub mod sync_accounts;

pub use sync_accounts::{partition_by_remote_id, SyncAccountsUseCase, SyncReport};
