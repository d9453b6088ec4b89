//! Test doubles for the gateway's collaborators.
//!
//! [`FakeIdentityProvider`] keeps identities, passwords, tokens and codes in
//! memory and records every call. Together with
//! [`InMemoryAccountRepository`] it lets tests drive every login path
//! without a network.

use crate::config::GatewayConfig;
use crate::gateway::AuthGateway;
use async_trait::async_trait;
use chrono::Utc;
use medigate_accounts::InMemoryAccountRepository;
use medigate_core::{IdentityId, Result};
use medigate_identity::{
    Contact, Identity, IdentityError, IdentityProvider, NewIdentity, ProviderSession, SignIn,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// Identity provider operations recorded by the fake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FakeCall {
    SignIn,
    AccessToken,
    ExchangeCode,
    CreateIdentity,
}

#[derive(Default)]
struct State {
    passwords: HashMap<String, (String, Identity)>,
    tokens: HashMap<String, Option<Identity>>,
    codes: HashMap<(String, String), Identity>,
    failures: HashMap<FakeCall, IdentityError>,
    delays: HashMap<FakeCall, Duration>,
    omit_sessions: bool,
    calls: Vec<FakeCall>,
    next_id: u64,
}

/// In-memory identity provider.
#[derive(Default)]
pub struct FakeIdentityProvider {
    state: Mutex<State>,
}

impl FakeIdentityProvider {
    /// Creates a provider that knows no identities.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Accepts `password` for the contact value (phone or email) of `identity`.
    pub fn add_password(&self, contact: &str, password: &str, identity: Identity) {
        self.lock()
            .passwords
            .insert(contact.to_string(), (password.to_string(), identity));
    }

    /// Accepts `token` as belonging to `identity`, or to nobody for `None`.
    pub fn add_access_token(&self, token: &str, identity: Option<Identity>) {
        self.lock().tokens.insert(token.to_string(), identity);
    }

    /// Accepts the code and verifier pair for `identity`.
    pub fn add_code(&self, code: &str, verifier: &str, identity: Identity) {
        self.lock()
            .codes
            .insert((code.to_string(), verifier.to_string()), identity);
    }

    /// Makes every subsequent `call` fail with `error`.
    pub fn fail(&self, call: FakeCall, error: IdentityError) {
        self.lock().failures.insert(call, error);
    }

    /// Delays every subsequent `call` by `delay`.
    pub fn delay(&self, call: FakeCall, delay: Duration) {
        self.lock().delays.insert(call, delay);
    }

    /// Makes password sign-ins and code exchanges return no session.
    pub fn omit_sessions(&self) {
        self.lock().omit_sessions = true;
    }

    /// Returns every call made so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<FakeCall> {
        self.lock().calls.clone()
    }

    /// Records `call` and applies any configured delay or failure.
    async fn enter(&self, call: FakeCall) -> Result<(), IdentityError> {
        let delay = {
            let mut state = self.lock();
            state.calls.push(call);
            state.delays.get(&call).copied()
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        match self.lock().failures.get(&call) {
            Some(err) => Err(err.clone().into()),
            None => Ok(()),
        }
    }

    fn session(&self, identity: &Identity) -> Option<ProviderSession> {
        if self.lock().omit_sessions {
            return None;
        }
        Some(ProviderSession {
            access_token: format!("eyJfake.{}.sig", identity.id),
            token_type: "bearer".to_string(),
            expires_in: 3600,
            refresh_token: Some(format!("provider-refresh-{}", identity.id)),
        })
    }
}

fn rejected(code: &str, message: &str) -> IdentityError {
    IdentityError::Rejected {
        code: code.to_string(),
        message: message.to_string(),
    }
}

#[async_trait]
impl IdentityProvider for FakeIdentityProvider {
    async fn sign_in_with_password(
        &self,
        contact: &Contact,
        password: &str,
    ) -> Result<SignIn, IdentityError> {
        self.enter(FakeCall::SignIn).await?;
        let identity = match self.lock().passwords.get(contact.value()) {
            Some((expected, identity)) if expected == password => identity.clone(),
            _ => {
                return Err(rejected("invalid_credentials", "Invalid login credentials").into());
            }
        };
        Ok(SignIn {
            session: self.session(&identity),
            identity: Some(identity),
        })
    }

    async fn identity_for_access_token(
        &self,
        access_token: &str,
    ) -> Result<Option<Identity>, IdentityError> {
        self.enter(FakeCall::AccessToken).await?;
        match self.lock().tokens.get(access_token) {
            Some(identity) => Ok(identity.clone()),
            None => Err(rejected("bad_jwt", "invalid JWT").into()),
        }
    }

    async fn exchange_code(
        &self,
        code: &str,
        code_verifier: &str,
    ) -> Result<SignIn, IdentityError> {
        self.enter(FakeCall::ExchangeCode).await?;
        let key = (code.to_string(), code_verifier.to_string());
        let Some(identity) = self.lock().codes.get(&key).cloned() else {
            return Err(rejected("flow_state_not_found", "invalid flow state").into());
        };
        Ok(SignIn {
            session: self.session(&identity),
            identity: Some(identity),
        })
    }

    async fn create_identity(&self, new_identity: &NewIdentity) -> Result<Identity, IdentityError> {
        self.enter(FakeCall::CreateIdentity).await?;
        let mut state = self.lock();
        if state.passwords.contains_key(&new_identity.phone) {
            return Err(rejected("phone_exists", "Phone number already registered").into());
        }
        state.next_id += 1;
        let identity = Identity {
            phone_confirmed_at: new_identity.phone_confirmed.then(Utc::now),
            ..Identity::new(IdentityId::new(format!("fake-{}", state.next_id)))
                .with_phone(Some(new_identity.phone.clone()))
                .with_display_name(new_identity.display_name.clone())
        };
        state.passwords.insert(
            new_identity.phone.clone(),
            (new_identity.password.clone(), identity.clone()),
        );
        Ok(identity)
    }
}

/// A gateway wired to fresh fakes.
pub struct TestGateway {
    pub gateway: AuthGateway,
    pub identity: Arc<FakeIdentityProvider>,
    pub repository: Arc<InMemoryAccountRepository>,
}

impl TestGateway {
    /// Builds a gateway with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(GatewayConfig::default())
    }

    /// Builds a gateway with `config`.
    #[must_use]
    pub fn with_config(config: GatewayConfig) -> Self {
        let identity = Arc::new(FakeIdentityProvider::new());
        let repository = Arc::new(InMemoryAccountRepository::new());
        let gateway = AuthGateway::new(
            identity.clone(),
            repository.clone(),
            repository.clone(),
            config,
        );
        Self {
            gateway,
            identity,
            repository,
        }
    }
}

impl Default for TestGateway {
    fn default() -> Self {
        Self::new()
    }
}
