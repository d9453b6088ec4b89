//! Customer registration.

use crate::error::{GatewayError, Operation};
use crate::gateway::{AuthGateway, repository_failure};
use crate::request::RegistrationRequest;
use crate::response::{Envelope, RegisteredUserView, RegistrationData, TOKEN_TYPE};
use chrono::Utc;
use medigate_accounts::{AccountProfile, RequestOrigin};
use medigate_core::Result;
use medigate_identity::{Contact, IdentityError, NewIdentity, ProviderSession};
use rootcause::Report;
use serde_json::json;
use tracing::{info, instrument, warn};

impl AuthGateway {
    /// Registers a new phone customer.
    ///
    /// Creates the identity with its phone pre-confirmed, an active customer
    /// profile and one refresh credential. An initial sign-in is attempted
    /// but its failure only leaves `access_token` empty.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for missing fields or a refused identity, and
    /// `Upstream` if the provider is unreachable or a repository write fails.
    #[instrument(skip_all, fields(identity_id = tracing::field::Empty))]
    pub async fn register(
        &self,
        request: RegistrationRequest,
        origin: RequestOrigin,
    ) -> Result<Envelope<RegistrationData>, GatewayError> {
        let registration = request.into_registration()?;

        let new_identity = NewIdentity {
            phone: registration.phone.clone(),
            password: registration.password.clone(),
            phone_confirmed: true,
            display_name: registration.full_name.clone(),
        };
        let identity = self
            .within(
                Operation::IdentityCreation,
                None,
                self.identity.create_identity(&new_identity),
            )
            .await?
            .map_err(creation_failure)?;

        tracing::Span::current().record("identity_id", identity.id.as_str());

        let now = Utc::now();
        let customer = AccountProfile::new_phone_registration(
            identity.id.clone(),
            registration.phone.clone(),
            registration.full_name,
            registration.sex_identify,
            now,
        );
        self.within(
            Operation::InsertAccount,
            Some(&identity.id),
            self.accounts.insert_account(&customer),
        )
        .await?
        .map_err(|report| repository_failure(report, Operation::InsertAccount, &identity.id))?;

        let session = self
            .initial_sign_in(Contact::Phone(registration.phone), &registration.password)
            .await;

        let credential = self.issue_refresh_credential(&identity.id, origin, now)?;
        self.within(
            Operation::StoreRefreshCredential,
            Some(&identity.id),
            self.refresh.insert(&credential),
        )
        .await?
        .map_err(|report| {
            repository_failure(report, Operation::StoreRefreshCredential, &identity.id)
        })?;

        info!(signed_in = session.is_some(), "customer registered");

        let expires_in = session
            .as_ref()
            .map_or(self.config.default_expires_in_seconds, |s| s.expires_in);

        Ok(Envelope::ok(
            "User created successfully. Phone number pre-verified.",
            RegistrationData {
                customer_id: identity.id.clone(),
                access_token: session.map(|s| s.access_token),
                token_type: TOKEN_TYPE,
                expires_in,
                refresh_token: credential.token,
                user: RegisteredUserView {
                    id: identity.id,
                    phone: identity.phone,
                    phone_confirmed_at: identity.phone_confirmed_at,
                },
                customer,
            },
        ))
    }

    /// Signs the new identity in, swallowing any failure.
    async fn initial_sign_in(&self, contact: Contact, password: &str) -> Option<ProviderSession> {
        let outcome = self
            .within(
                Operation::PasswordSignIn,
                None,
                self.identity.sign_in_with_password(&contact, password),
            )
            .await;

        match outcome {
            Ok(Ok(sign_in)) => sign_in.session,
            Ok(Err(report)) => {
                warn!(error = %report, "initial sign-in after registration failed");
                None
            }
            Err(report) => {
                warn!(error = %report, "initial sign-in after registration failed");
                None
            }
        }
    }
}

/// Refusals become a 400 carrying only the provider's reason.
fn creation_failure(report: Report<IdentityError>) -> Report<GatewayError> {
    let reason = match report.current_context() {
        IdentityError::Rejected { message, .. } => Some(message.clone()),
        _ => None,
    };
    let timed_out = report.current_context().is_timeout();

    match reason {
        Some(reason) => report.context(GatewayError::InvalidInput {
            message: "User creation failed",
            details: Some(json!({ "reason": reason })),
        }),
        None if timed_out => report.context(GatewayError::timeout(Operation::IdentityCreation, None)),
        None => report.context(GatewayError::upstream(Operation::IdentityCreation, None)),
    }
}
