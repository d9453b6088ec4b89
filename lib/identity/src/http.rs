//! GoTrue-compatible HTTP implementation of [`IdentityProvider`].

use crate::config::IdentityConfig;
use crate::error::IdentityError;
use crate::identity::{Contact, Identity, NewIdentity, ProviderSession, SignIn};
use crate::provider::IdentityProvider;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use medigate_core::{IdentityId, Result};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::{debug, instrument};

const DEFAULT_EXPIRES_IN: u64 = 3600;

/// Identity provider client speaking the GoTrue REST API.
///
/// Every request carries the service key as `apikey`; requests made on
/// behalf of a caller (access token validation) carry the caller's token as
/// the bearer credential instead of the service key.
pub struct HttpIdentityProvider {
    client: reqwest::Client,
    config: IdentityConfig,
}

impl HttpIdentityProvider {
    /// Creates a new client from validated configuration.
    ///
    /// # Errors
    ///
    /// Returns `Configuration` if the HTTP client cannot be built.
    pub fn new(config: IdentityConfig) -> Result<Self, IdentityError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| IdentityError::Configuration {
                details: format!("failed to create HTTP client: {e}"),
            })?;

        Ok(Self { client, config })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.config.base_url(), path)
    }

    fn request(
        &self,
        method: reqwest::Method,
        path: &str,
        bearer: Bearer<'_>,
    ) -> reqwest::RequestBuilder {
        let token = match bearer {
            Bearer::Service => self.config.service_key(),
            Bearer::Caller(token) => token,
        };
        self.client
            .request(method, self.endpoint(path))
            .header("apikey", self.config.service_key())
            .bearer_auth(token)
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        bearer: Bearer<'_>,
        operation: &'static str,
    ) -> Result<T, IdentityError> {
        let response = request
            .send()
            .await
            .map_err(|e| transport_error(operation, &e))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| transport_error(operation, &e))?;

        debug!(operation, status = status.as_u16(), "identity provider responded");

        if status.is_success() {
            let value = serde_json::from_slice(&body).map_err(|e| IdentityError::InvalidResponse {
                operation,
                details: e.to_string(),
            })?;
            Ok(value)
        } else {
            Err(classify_failure(status, bearer, operation, &body).into())
        }
    }
}

/// Whose credential authenticates a request.
#[derive(Debug, Clone, Copy)]
enum Bearer<'a> {
    /// The gateway's own service key.
    Service,
    /// A token presented by the caller.
    Caller(&'a str),
}

/// Maps a non-success status to a refusal or an outage.
///
/// Only a refusal of the caller's input is a rejection. Throttling, request
/// timeouts and a refused service key are the provider's or the gateway's
/// problem, never the caller's.
fn classify_failure(
    status: reqwest::StatusCode,
    bearer: Bearer<'_>,
    operation: &'static str,
    body: &[u8],
) -> IdentityError {
    use reqwest::StatusCode;

    let service_key_refused = matches!(bearer, Bearer::Service)
        && matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN);
    let transient = matches!(
        status,
        StatusCode::TOO_MANY_REQUESTS | StatusCode::REQUEST_TIMEOUT
    );

    if status.is_client_error() && !service_key_refused && !transient {
        decode_rejection(status.as_u16(), body)
    } else {
        IdentityError::Unavailable {
            operation,
            details: format!("provider returned status {}", status.as_u16()),
        }
    }
}

#[async_trait]
impl IdentityProvider for HttpIdentityProvider {
    #[instrument(skip_all, fields(contact = contact.field()))]
    async fn sign_in_with_password(
        &self,
        contact: &Contact,
        password: &str,
    ) -> Result<SignIn, IdentityError> {
        let mut body = serde_json::Map::new();
        body.insert(contact.field().to_string(), json!(contact.value()));
        body.insert("password".to_string(), json!(password));

        let request = self
            .request(reqwest::Method::POST, "token", Bearer::Service)
            .query(&[("grant_type", "password")])
            .json(&body);

        let token: TokenWire = self
            .send(request, Bearer::Service, "password sign-in")
            .await?;
        Ok(token.into_sign_in())
    }

    #[instrument(skip_all)]
    async fn identity_for_access_token(
        &self,
        access_token: &str,
    ) -> Result<Option<Identity>, IdentityError> {
        let bearer = Bearer::Caller(access_token);
        let request = self.request(reqwest::Method::GET, "user", bearer);
        let user: Option<UserWire> = self
            .send(request, bearer, "access token validation")
            .await?;
        Ok(user.map(UserWire::into_identity))
    }

    #[instrument(skip_all)]
    async fn exchange_code(
        &self,
        code: &str,
        code_verifier: &str,
    ) -> Result<SignIn, IdentityError> {
        let request = self
            .request(reqwest::Method::POST, "token", Bearer::Service)
            .query(&[("grant_type", "pkce")])
            .json(&json!({
                "auth_code": code,
                "code_verifier": code_verifier,
            }));

        let token: TokenWire = self
            .send(request, Bearer::Service, "code exchange")
            .await?;
        Ok(token.into_sign_in())
    }

    #[instrument(skip_all)]
    async fn create_identity(&self, identity: &NewIdentity) -> Result<Identity, IdentityError> {
        let request = self
            .request(reqwest::Method::POST, "admin/users", Bearer::Service)
            .json(&json!({
                "phone": identity.phone,
                "password": identity.password,
                "phone_confirm": identity.phone_confirmed,
                "user_metadata": { "full_name": identity.display_name },
            }));

        let user: UserWire = self
            .send(request, Bearer::Service, "identity creation")
            .await?;
        Ok(user.into_identity())
    }
}

fn transport_error(operation: &'static str, error: &reqwest::Error) -> IdentityError {
    if error.is_timeout() {
        IdentityError::Timeout { operation }
    } else {
        IdentityError::Unavailable {
            operation,
            details: error.to_string(),
        }
    }
}

/// User object as returned by the provider.
#[derive(Debug, Deserialize)]
struct UserWire {
    id: String,
    email: Option<String>,
    phone: Option<String>,
    email_confirmed_at: Option<DateTime<Utc>>,
    phone_confirmed_at: Option<DateTime<Utc>>,
    last_sign_in_at: Option<DateTime<Utc>>,
    #[serde(default)]
    user_metadata: serde_json::Value,
}

impl UserWire {
    fn into_identity(self) -> Identity {
        let display_name = self
            .user_metadata
            .get("full_name")
            .and_then(|v| v.as_str())
            .map(str::to_string);

        Identity {
            id: IdentityId::new(self.id),
            email: non_empty(self.email),
            phone: non_empty(self.phone),
            display_name,
            email_confirmed_at: self.email_confirmed_at,
            phone_confirmed_at: self.phone_confirmed_at,
            last_sign_in_at: self.last_sign_in_at,
        }
    }
}

/// Token grant response.
#[derive(Debug, Deserialize)]
struct TokenWire {
    access_token: Option<String>,
    token_type: Option<String>,
    expires_in: Option<u64>,
    refresh_token: Option<String>,
    user: Option<UserWire>,
}

impl TokenWire {
    fn into_sign_in(self) -> SignIn {
        let session = non_empty(self.access_token).map(|access_token| ProviderSession {
            access_token,
            token_type: self.token_type.unwrap_or_else(|| "Bearer".to_string()),
            expires_in: self.expires_in.unwrap_or(DEFAULT_EXPIRES_IN),
            refresh_token: non_empty(self.refresh_token),
        });

        SignIn {
            identity: self.user.map(UserWire::into_identity),
            session,
        }
    }
}

/// Error body; different provider versions use different field names.
#[derive(Debug, Default, Deserialize)]
struct ErrorWire {
    error_code: Option<String>,
    error: Option<String>,
    msg: Option<String>,
    message: Option<String>,
    error_description: Option<String>,
}

fn decode_rejection(status: u16, body: &[u8]) -> IdentityError {
    let wire: ErrorWire = serde_json::from_slice(body).unwrap_or_default();

    let code = wire
        .error_code
        .or(wire.error)
        .unwrap_or_else(|| format!("http_{status}"));
    let message = wire
        .msg
        .or(wire.message)
        .or(wire.error_description)
        .unwrap_or_else(|| "request rejected".to_string());

    IdentityError::Rejected { code, message }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}
