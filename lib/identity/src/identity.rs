//! Identity assertions and sessions returned by the provider.

use chrono::{DateTime, Utc};
use medigate_core::IdentityId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A principal as asserted by the identity provider.
///
/// The gateway only reads identities; it never mutates them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Provider-assigned identifier.
    pub id: IdentityId,
    /// Email address, if the identity has one.
    pub email: Option<String>,
    /// Phone number, if the identity has one.
    pub phone: Option<String>,
    /// Display name from the identity metadata (`full_name`).
    pub display_name: Option<String>,
    /// When the email address was confirmed.
    pub email_confirmed_at: Option<DateTime<Utc>>,
    /// When the phone number was confirmed.
    pub phone_confirmed_at: Option<DateTime<Utc>>,
    /// When the identity last signed in.
    pub last_sign_in_at: Option<DateTime<Utc>>,
}

impl Identity {
    /// Creates an identity with only an ID set.
    #[must_use]
    pub fn new(id: impl Into<IdentityId>) -> Self {
        Self {
            id: id.into(),
            email: None,
            phone: None,
            display_name: None,
            email_confirmed_at: None,
            phone_confirmed_at: None,
            last_sign_in_at: None,
        }
    }

    /// Sets the email address.
    #[must_use]
    pub fn with_email(mut self, email: Option<String>) -> Self {
        self.email = email;
        self
    }

    /// Sets the phone number.
    #[must_use]
    pub fn with_phone(mut self, phone: Option<String>) -> Self {
        self.phone = phone;
        self
    }

    /// Sets the display name.
    #[must_use]
    pub fn with_display_name(mut self, name: Option<String>) -> Self {
        self.display_name = name;
        self
    }

    /// Returns the email address when it is present and non-blank.
    #[must_use]
    pub fn usable_email(&self) -> Option<&str> {
        self.email.as_deref().filter(|e| !e.trim().is_empty())
    }
}

/// Credentials issued by the provider after a successful sign-in.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderSession {
    /// Short-lived bearer token.
    pub access_token: String,
    /// Token type, normally `Bearer`.
    pub token_type: String,
    /// Lifetime of the access token in seconds.
    pub expires_in: u64,
    /// Provider refresh token, if one was issued.
    pub refresh_token: Option<String>,
}

impl fmt::Debug for ProviderSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderSession")
            .field("access_token", &"<redacted>")
            .field("token_type", &self.token_type)
            .field("expires_in", &self.expires_in)
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Outcome of a password sign-in or code exchange.
///
/// Either half may be missing in a malformed provider answer; callers decide
/// whether that is acceptable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignIn {
    pub identity: Option<Identity>,
    pub session: Option<ProviderSession>,
}

/// The contact a password credential is presented with.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Contact {
    Phone(String),
    Email(String),
}

impl Contact {
    /// Returns the JSON field name the provider expects for this contact.
    #[must_use]
    pub fn field(&self) -> &'static str {
        match self {
            Self::Phone(_) => "phone",
            Self::Email(_) => "email",
        }
    }

    /// Returns the contact value.
    #[must_use]
    pub fn value(&self) -> &str {
        match self {
            Self::Phone(v) | Self::Email(v) => v,
        }
    }
}

/// Request to create a new identity at the provider.
#[derive(Clone, PartialEq, Eq)]
pub struct NewIdentity {
    /// Phone number for the identity.
    pub phone: String,
    /// Initial password.
    pub password: String,
    /// Whether the phone number is marked as already confirmed.
    pub phone_confirmed: bool,
    /// Display name stored in the identity metadata.
    pub display_name: Option<String>,
}

impl fmt::Debug for NewIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewIdentity")
            .field("phone", &self.phone)
            .field("password", &"<redacted>")
            .field("phone_confirmed", &self.phone_confirmed)
            .field("display_name", &self.display_name)
            .finish()
    }
}
