//! Port definitions (hexagonal architecture interfaces)
//!
//! This module defines the port traits that form the boundaries of the
//! hexagonal architecture. Ports are interfaces that the domain core
//! depends on, but whose implementations live in adapter crates.
//!
//! ## Ports Overview
//!
//! - [`ICrmGateway`] - Remote CRM writes (Salesforce)
//! - [`IAccountRepository`] - Local account store
//! - [`IRecordValidator`] - Candidate eligibility check

pub mod account_repository;
pub mod crm_gateway;
pub mod record_validator;

pub use account_repository::IAccountRepository;
pub use crm_gateway::{CreateOutcome, ICrmGateway, RemoteError, UpdateOutcome};
pub use record_validator::{EmailRecordValidator, IRecordValidator};
