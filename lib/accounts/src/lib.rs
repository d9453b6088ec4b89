//! Durable records owned by the medigate gateway.
//!
//! This crate provides:
//! - Customer account profiles (`AccountProfile`, `AccountStatus`)
//! - Staff profiles, doctor details and schedules used by OAuth logins
//! - Refresh credentials and their generation
//! - Repository traits the gateway consumes (`AccountRepository`,
//!   `RefreshCredentialStore`)
//!
//! Storage itself lives outside this crate. The Postgres implementation is
//! part of the server; an in-memory implementation is available behind the
//! `testing` feature.

pub mod account;
pub mod error;
#[cfg(any(test, feature = "testing"))]
pub mod memory;
pub mod refresh;
pub mod repository;
pub mod staff;
pub mod token;

pub use account::{AccountProfile, AccountStatus, LoginMethod};
pub use error::RepositoryError;
#[cfg(any(test, feature = "testing"))]
pub use memory::{FailurePoint, InMemoryAccountRepository};
pub use refresh::{RefreshCredential, RequestOrigin};
pub use repository::{AccountRepository, RefreshCredentialStore};
pub use staff::{
    DoctorDetail, Schedule, StaffProfile, StaffProfileUpsert, StaffRole, UnknownRole,
};
