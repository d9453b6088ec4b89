//! Customer account profiles.

use chrono::{DateTime, Utc};
use medigate_core::IdentityId;
use serde::{Deserialize, Serialize};

/// Lifecycle status of an account profile.
///
/// Only `active` is meaningful to the gateway; any other stored value is kept
/// verbatim so it can be reported back to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AccountStatus {
    Active,
    Other(String),
}

impl AccountStatus {
    /// Returns the stored string form.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Active => "active",
            Self::Other(s) => s,
        }
    }

    /// Returns true if logins are allowed.
    #[must_use]
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }
}

impl From<String> for AccountStatus {
    fn from(s: String) -> Self {
        if s == "active" {
            Self::Active
        } else {
            Self::Other(s)
        }
    }
}

impl From<&str> for AccountStatus {
    fn from(s: &str) -> Self {
        Self::from(s.to_string())
    }
}

impl From<AccountStatus> for String {
    fn from(status: AccountStatus) -> Self {
        status.as_str().to_string()
    }
}

/// How an account was originally created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoginMethod {
    Phone,
    Email,
    Oauth,
}

impl LoginMethod {
    /// Returns the stored string form.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Phone => "phone",
            Self::Email => "email",
            Self::Oauth => "oauth",
        }
    }
}

/// The gateway's durable customer record, one per identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountProfile {
    pub customer_id: IdentityId,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub full_name: Option<String>,
    pub sex_identify: Option<String>,
    /// Stored login method tag (see [`LoginMethod`]).
    pub login_type: String,
    pub is_email_verified: bool,
    pub is_phone_verified: bool,
    pub status: AccountStatus,
    pub create_at: DateTime<Utc>,
    pub update_at: DateTime<Utc>,
}

impl AccountProfile {
    /// Creates an active profile for a newly registered phone identity.
    #[must_use]
    pub fn new_phone_registration(
        customer_id: IdentityId,
        phone: String,
        full_name: Option<String>,
        sex_identify: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            customer_id,
            email: None,
            phone: Some(phone),
            full_name,
            sex_identify,
            login_type: LoginMethod::Phone.as_str().to_string(),
            is_email_verified: false,
            is_phone_verified: true,
            status: AccountStatus::Active,
            create_at: now,
            update_at: now,
        }
    }

    /// Returns true if the account may log in.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_parses_active_and_keeps_others() {
        assert_eq!(AccountStatus::from("active"), AccountStatus::Active);
        assert_eq!(
            AccountStatus::from("suspended"),
            AccountStatus::Other("suspended".to_string())
        );
        assert!(!AccountStatus::from("Active").is_active());
    }

    #[test]
    fn status_serializes_as_plain_string() {
        let json = serde_json::to_string(&AccountStatus::Other("banned".to_string()))
            .expect("serialize");
        assert_eq!(json, "\"banned\"");
        let parsed: AccountStatus = serde_json::from_str("\"active\"").expect("deserialize");
        assert!(parsed.is_active());
    }

    #[test]
    fn phone_registration_is_active_and_phone_verified() {
        let now = Utc::now();
        let profile = AccountProfile::new_phone_registration(
            IdentityId::new("u-1"),
            "+15550100".to_string(),
            Some("Ada".to_string()),
            None,
            now,
        );
        assert!(profile.is_active());
        assert!(profile.is_phone_verified);
        assert!(!profile.is_email_verified);
        assert_eq!(profile.login_type, "phone");
        assert_eq!(profile.create_at, profile.update_at);
    }
}
