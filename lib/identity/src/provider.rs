//! The identity provider capability consumed by the gateway.

use crate::error::IdentityError;
use crate::identity::{Contact, Identity, NewIdentity, SignIn};
use async_trait::async_trait;
use medigate_core::Result;

/// Trait for the external identity provider.
///
/// Implementations report refusals as [`IdentityError::Rejected`] and keep
/// transport or provider-side failures in the other variants, so callers can
/// tell a bad credential apart from an outage.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Verifies a password for a phone or email contact.
    ///
    /// # Errors
    ///
    /// Returns `Rejected` for bad credentials, other variants on failure.
    async fn sign_in_with_password(
        &self,
        contact: &Contact,
        password: &str,
    ) -> Result<SignIn, IdentityError>;

    /// Resolves the identity that owns a pre-issued access token.
    ///
    /// Returns `Ok(None)` when the provider accepts the token but reports no
    /// identity for it.
    async fn identity_for_access_token(
        &self,
        access_token: &str,
    ) -> Result<Option<Identity>, IdentityError>;

    /// Exchanges an OAuth authorization code and its PKCE verifier.
    async fn exchange_code(&self, code: &str, code_verifier: &str)
    -> Result<SignIn, IdentityError>;

    /// Creates a new identity.
    async fn create_identity(&self, identity: &NewIdentity) -> Result<Identity, IdentityError>;
}
