//! The authentication gateway.
//!
//! [`AuthGateway::login`] routes a request to one of three login paths:
//!
//! - **OAuth code**: exchange an authorization code and PKCE verifier, then
//!   provision the staff records for the identity.
//! - **Access token**: validate a pre-issued token and report the customer
//!   profile. Never touches refresh credentials.
//! - **Password**: verify a phone or email credential and rotate the
//!   customer's refresh credential.
//!
//! External calls within a request run strictly in sequence, each bounded
//! by the configured call timeout.

use crate::config::GatewayConfig;
use crate::error::{GatewayError, Operation};
use crate::request::{LoginPresentation, LoginRequest, check_access_token_shape};
use crate::response::{
    AccessTokenLogin, Envelope, LoginData, PasswordLogin, TOKEN_TYPE, UserView,
};
use chrono::Utc;
use medigate_accounts::{
    AccountProfile, AccountRepository, RefreshCredential, RefreshCredentialStore,
    RepositoryError, RequestOrigin,
};
use medigate_core::{IdentityId, Result};
use medigate_identity::{Contact, IdentityError, IdentityProvider};
use rootcause::Report;
use serde_json::json;
use std::future::Future;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Routes login and registration requests and composes session payloads.
#[derive(Clone)]
pub struct AuthGateway {
    pub(crate) identity: Arc<dyn IdentityProvider>,
    pub(crate) accounts: Arc<dyn AccountRepository>,
    pub(crate) refresh: Arc<dyn RefreshCredentialStore>,
    pub(crate) config: GatewayConfig,
}

impl AuthGateway {
    /// Creates a gateway over its collaborators.
    pub fn new(
        identity: Arc<dyn IdentityProvider>,
        accounts: Arc<dyn AccountRepository>,
        refresh: Arc<dyn RefreshCredentialStore>,
        config: GatewayConfig,
    ) -> Self {
        Self {
            identity,
            accounts,
            refresh,
            config,
        }
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Handles a login request on whichever path its fields select.
    ///
    /// # Errors
    ///
    /// Returns a [`GatewayError`] describing the first failing step.
    pub async fn login(
        &self,
        request: LoginRequest,
        origin: RequestOrigin,
    ) -> Result<Envelope<LoginData>, GatewayError> {
        let presentation = request.into_presentation()?;
        info!(path = presentation.path(), "login requested");

        match presentation {
            LoginPresentation::OAuthCode(oauth) => {
                let envelope = self.oauth_login(oauth).await?;
                Ok(Envelope::ok(envelope.message, LoginData::OAuth(envelope.data)))
            }
            LoginPresentation::AccessToken(token) => {
                let envelope = self.access_token_login(token).await?;
                Ok(Envelope::ok(
                    envelope.message,
                    LoginData::AccessToken(envelope.data),
                ))
            }
            LoginPresentation::Password { contact, password } => {
                let envelope = self.password_login(contact, &password, origin).await?;
                Ok(Envelope::ok(envelope.message, LoginData::Password(envelope.data)))
            }
        }
    }

    /// Logs in with a pre-issued access token.
    ///
    /// The token is returned unchanged. Refresh credentials are only read.
    ///
    /// # Errors
    ///
    /// Returns `Authentication` for a malformed or rejected token, `NotFound`
    /// if the identity has no customer profile and `Authorization` if the
    /// profile is not active.
    #[instrument(skip_all, fields(identity_id = tracing::field::Empty))]
    pub async fn access_token_login(
        &self,
        access_token: String,
    ) -> Result<Envelope<AccessTokenLogin>, GatewayError> {
        check_access_token_shape(&access_token)?;

        let identity = self
            .within(
                Operation::AccessTokenValidation,
                None,
                self.identity.identity_for_access_token(&access_token),
            )
            .await?
            .map_err(|report| {
                identity_failure(
                    report,
                    Operation::AccessTokenValidation,
                    None,
                    GatewayError::authentication("Invalid or expired access token"),
                )
            })?
            .ok_or_else(|| GatewayError::authentication("No user found for access token"))?;

        tracing::Span::current().record("identity_id", identity.id.as_str());

        let customer = self
            .within(
                Operation::LoadAccount,
                Some(&identity.id),
                self.accounts.find_account(&identity.id),
            )
            .await?
            .map_err(|report| {
                if report.current_context().is_not_found() {
                    report.context(GatewayError::NotFound {
                        message: "Customer profile not found",
                        details: Some(json!({ "userId": identity.id })),
                    })
                } else {
                    report.context(GatewayError::upstream(
                        Operation::LoadAccount,
                        Some(&identity.id),
                    ))
                }
            })?;

        ensure_active(&customer)?;

        // Read only. An absent credential is fine, a failed lookup is not.
        let check = self
            .within(
                Operation::RefreshCheck,
                Some(&identity.id),
                self.refresh.find_active(&identity.id, Utc::now()),
            )
            .await?;
        if let Err(report) = check
            && !report.current_context().is_not_found()
        {
            return Err(report.context(GatewayError::authentication(
                "Refresh token validation failed",
            )));
        }

        info!("access token login succeeded");

        Ok(Envelope::ok(
            "Login successful with access token",
            AccessTokenLogin {
                customer_id: identity.id.clone(),
                access_token,
                token_type: TOKEN_TYPE,
                expires_in: self.config.default_expires_in_seconds,
                user: UserView::from(&identity),
                customer,
            },
        ))
    }

    /// Logs in with a phone or email password credential.
    ///
    /// On success the customer's refresh credentials are rotated so exactly
    /// one remains active.
    ///
    /// # Errors
    ///
    /// Returns `Authentication` for a rejected credential, `Authorization` if
    /// the profile is not active and `Upstream` if any repository step fails.
    #[instrument(skip_all, fields(contact = contact.field(), identity_id = tracing::field::Empty))]
    pub async fn password_login(
        &self,
        contact: Contact,
        password: &str,
        origin: RequestOrigin,
    ) -> Result<Envelope<PasswordLogin>, GatewayError> {
        let sign_in = self
            .within(
                Operation::PasswordSignIn,
                None,
                self.identity.sign_in_with_password(&contact, password),
            )
            .await?
            .map_err(|report| {
                identity_failure(
                    report,
                    Operation::PasswordSignIn,
                    None,
                    GatewayError::authentication("Login failed"),
                )
            })?;

        let (Some(identity), Some(session)) = (sign_in.identity, sign_in.session) else {
            return Err(GatewayError::authentication("Login failed - invalid session").into());
        };

        tracing::Span::current().record("identity_id", identity.id.as_str());

        let customer = self
            .within(
                Operation::LoadAccount,
                Some(&identity.id),
                self.accounts.find_account(&identity.id),
            )
            .await?
            .map_err(|report| repository_failure(report, Operation::LoadAccount, &identity.id))?;

        ensure_active(&customer)?;

        let now = Utc::now();
        let credential = self.issue_refresh_credential(&identity.id, origin, now)?;
        let revoked = self
            .within(
                Operation::StoreRefreshCredential,
                Some(&identity.id),
                self.refresh.rotate(&credential),
            )
            .await?
            .map_err(|report| {
                repository_failure(report, Operation::StoreRefreshCredential, &identity.id)
            })?;

        self.touch_account(&identity.id, now).await;

        info!(revoked, "password login succeeded");

        Ok(Envelope::ok(
            "Login successful",
            PasswordLogin {
                customer_id: identity.id.clone(),
                access_token: session.access_token,
                token_type: TOKEN_TYPE,
                expires_in: session.expires_in,
                refresh_token: credential.token,
                user: UserView::from(&identity),
                customer,
            },
        ))
    }

    /// Best-effort update of the profile's last-login timestamp.
    async fn touch_account(&self, id: &IdentityId, at: chrono::DateTime<Utc>) {
        match self
            .within(Operation::TouchAccount, Some(id), self.accounts.touch_account(id, at))
            .await
        {
            Ok(Ok(())) => {}
            Ok(Err(report)) => {
                warn!(identity_id = %id, error = %report, "failed to touch customer profile");
            }
            Err(report) => {
                warn!(identity_id = %id, error = %report, "failed to touch customer profile");
            }
        }
    }

    /// Creates a new refresh credential for `owner`.
    pub(crate) fn issue_refresh_credential(
        &self,
        owner: &IdentityId,
        origin: RequestOrigin,
        now: chrono::DateTime<Utc>,
    ) -> Result<RefreshCredential, GatewayError> {
        RefreshCredential::issue(owner.clone(), self.config.refresh_validity(), origin, now).map_err(
            |e| {
                GatewayError::Internal {
                    details: format!("failed to generate refresh token: {e}"),
                }
                .into()
            },
        )
    }

    /// Runs an external call under the configured timeout.
    ///
    /// The outer result reports an elapsed timeout; the inner one is the
    /// call's own outcome.
    pub(crate) async fn within<T>(
        &self,
        operation: Operation,
        identity: Option<&IdentityId>,
        call: impl Future<Output = T>,
    ) -> Result<T, GatewayError> {
        tokio::time::timeout(self.config.call_timeout(), call)
            .await
            .map_err(|_| {
                warn!(operation = operation.as_str(), "external call timed out");
                GatewayError::timeout(operation, identity).into()
            })
    }
}

/// Rejects profiles that may not log in.
fn ensure_active(customer: &AccountProfile) -> Result<(), GatewayError> {
    if customer.is_active() {
        Ok(())
    } else {
        Err(GatewayError::Authorization {
            message: "Account is not active",
            details: Some(json!({ "status": customer.status.as_str() })),
        }
        .into())
    }
}

/// Maps an identity provider failure: refusals become `rejection`, anything
/// else an upstream failure of `operation`.
pub(crate) fn identity_failure(
    report: Report<IdentityError>,
    operation: Operation,
    identity: Option<&IdentityId>,
    rejection: GatewayError,
) -> Report<GatewayError> {
    let (rejected, timed_out) = {
        let context = report.current_context();
        (context.is_rejection(), context.is_timeout())
    };
    if rejected {
        report.context(rejection)
    } else if timed_out {
        report.context(GatewayError::timeout(operation, identity))
    } else {
        report.context(GatewayError::upstream(operation, identity))
    }
}

/// Maps a repository failure to an upstream failure of `operation`.
pub(crate) fn repository_failure(
    report: Report<RepositoryError>,
    operation: Operation,
    identity: &IdentityId,
) -> Report<GatewayError> {
    report.context(GatewayError::upstream(operation, Some(identity)))
}
