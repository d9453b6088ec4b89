//! Core domain types and utilities for the medigate authentication gateway.
//!
//! This crate provides the identifier types and the `Result` alias shared by
//! the identity, accounts and gateway crates.

pub mod error;
pub mod id;

pub use error::Result;
pub use id::{IdentityId, ParseIdError, RefreshCredentialId, ScheduleId};
