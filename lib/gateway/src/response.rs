//! Session payloads returned to callers.
//!
//! Field names follow the JSON contract clients already depend on.

use chrono::{DateTime, Utc};
use medigate_accounts::{AccountProfile, DoctorDetail, Schedule, StaffProfile};
use medigate_core::IdentityId;
use medigate_identity::Identity;
use serde::Serialize;

/// Token type reported for every session.
pub const TOKEN_TYPE: &str = "Bearer";

/// Success envelope `{success, message, data}`.
#[derive(Debug, Clone, Serialize)]
pub struct Envelope<T> {
    pub success: bool,
    pub message: &'static str,
    pub data: T,
}

impl<T> Envelope<T> {
    pub(crate) fn ok(message: &'static str, data: T) -> Self {
        Self {
            success: true,
            message,
            data,
        }
    }
}

/// Identity fields echoed by password and access-token logins.
#[derive(Debug, Clone, Serialize)]
pub struct UserView {
    pub id: IdentityId,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub email_confirmed_at: Option<DateTime<Utc>>,
    pub phone_confirmed_at: Option<DateTime<Utc>>,
    pub last_sign_in_at: Option<DateTime<Utc>>,
}

impl From<&Identity> for UserView {
    fn from(identity: &Identity) -> Self {
        Self {
            id: identity.id.clone(),
            email: identity.email.clone(),
            phone: identity.phone.clone(),
            email_confirmed_at: identity.email_confirmed_at,
            phone_confirmed_at: identity.phone_confirmed_at,
            last_sign_in_at: identity.last_sign_in_at,
        }
    }
}

/// Data of a successful password login.
#[derive(Debug, Clone, Serialize)]
pub struct PasswordLogin {
    pub customer_id: IdentityId,
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_in: u64,
    pub refresh_token: String,
    pub user: UserView,
    pub customer: AccountProfile,
}

/// Data of a successful access-token login.
#[derive(Debug, Clone, Serialize)]
pub struct AccessTokenLogin {
    pub customer_id: IdentityId,
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_in: u64,
    pub user: UserView,
    pub customer: AccountProfile,
}

/// Identity fields echoed by an OAuth login.
#[derive(Debug, Clone, Serialize)]
pub struct OAuthUserView {
    pub id: IdentityId,
    pub email: String,
    pub name: String,
    pub last_sign_in_at: Option<DateTime<Utc>>,
}

/// Data of a successful OAuth-code login.
#[derive(Debug, Clone, Serialize)]
pub struct OAuthLogin {
    pub user: OAuthUserView,
    pub staff: StaffProfile,
    pub doctor: Option<DoctorDetail>,
    pub schedule: Schedule,
    pub access_token: Option<String>,
    pub token_type: &'static str,
    pub expires_in: u64,
    pub refresh_token: Option<String>,
}

/// Data of any successful login.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum LoginData {
    Password(PasswordLogin),
    AccessToken(AccessTokenLogin),
    OAuth(OAuthLogin),
}

/// Identity fields echoed by a registration.
#[derive(Debug, Clone, Serialize)]
pub struct RegisteredUserView {
    pub id: IdentityId,
    pub phone: Option<String>,
    pub phone_confirmed_at: Option<DateTime<Utc>>,
}

/// Data of a successful registration.
#[derive(Debug, Clone, Serialize)]
pub struct RegistrationData {
    pub customer_id: IdentityId,
    pub access_token: Option<String>,
    pub token_type: &'static str,
    pub expires_in: u64,
    pub refresh_token: String,
    pub user: RegisteredUserView,
    pub customer: AccountProfile,
}
