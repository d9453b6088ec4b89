//! Identity provider client for the medigate gateway.
//!
//! The gateway never verifies passwords or signs tokens itself. Those
//! capabilities live in an external identity provider and are consumed
//! through the [`IdentityProvider`] trait:
//! - password sign-in (phone or email)
//! - validation of a pre-issued access token
//! - PKCE authorization-code exchange
//! - creation of a new identity with a pre-confirmed phone number
//!
//! [`HttpIdentityProvider`] implements the trait against a GoTrue-compatible
//! REST API using a privileged service key.

pub mod config;
pub mod error;
pub mod http;
pub mod identity;
pub mod provider;

pub use config::IdentityConfig;
pub use error::IdentityError;
pub use http::HttpIdentityProvider;
pub use identity::{Contact, Identity, NewIdentity, ProviderSession, SignIn};
pub use provider::IdentityProvider;
