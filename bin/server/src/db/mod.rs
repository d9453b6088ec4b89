//! Database repositories for the medigate gateway.
//!
//! This module provides the Postgres implementation of the account
//! repository and refresh credential store consumed by `AuthGateway`.

pub mod accounts;

pub use accounts::PgAccountRepository;
