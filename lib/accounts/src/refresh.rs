//! Refresh credentials.
//!
//! A refresh credential is a long-lived opaque value bound to one account.
//! The gateway issues one on registration and rotates them on every password
//! login; access-token logins never touch them.

use crate::token::generate_refresh_token;
use chrono::{DateTime, Duration, Utc};
use medigate_core::{IdentityId, RefreshCredentialId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Where the request that produced a credential came from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestOrigin {
    pub user_agent: Option<String>,
    pub ip_address: Option<String>,
}

/// A stored refresh credential.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshCredential {
    pub id: RefreshCredentialId,
    pub customer_id: IdentityId,
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub is_revoked: bool,
    pub created_at: DateTime<Utc>,
    pub origin: RequestOrigin,
}

impl RefreshCredential {
    /// Issues a new, non-revoked credential valid for `validity` from `now`.
    ///
    /// # Errors
    ///
    /// Returns an error if no randomness is available for the token.
    pub fn issue(
        customer_id: IdentityId,
        validity: Duration,
        origin: RequestOrigin,
        now: DateTime<Utc>,
    ) -> Result<Self, getrandom::Error> {
        Ok(Self {
            id: RefreshCredentialId::new(),
            customer_id,
            token: generate_refresh_token()?,
            expires_at: now + validity,
            is_revoked: false,
            created_at: now,
            origin,
        })
    }

    /// Returns true if the credential is neither revoked nor expired at `now`.
    #[must_use]
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        !self.is_revoked && self.expires_at > now
    }
}

impl fmt::Debug for RefreshCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefreshCredential")
            .field("id", &self.id)
            .field("customer_id", &self.customer_id)
            .field("token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .field("is_revoked", &self.is_revoked)
            .field("created_at", &self.created_at)
            .field("origin", &self.origin)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issued_credential_is_active_until_expiry() {
        let now = Utc::now();
        let credential = RefreshCredential::issue(
            IdentityId::new("u-1"),
            Duration::days(7),
            RequestOrigin::default(),
            now,
        )
        .expect("issue");

        assert!(!credential.is_revoked);
        assert_eq!(credential.expires_at, now + Duration::days(7));
        assert!(credential.is_active(now));
        assert!(!credential.is_active(now + Duration::days(7)));
    }

    #[test]
    fn revoked_credential_is_inactive() {
        let now = Utc::now();
        let mut credential = RefreshCredential::issue(
            IdentityId::new("u-1"),
            Duration::days(7),
            RequestOrigin::default(),
            now,
        )
        .expect("issue");
        credential.is_revoked = true;
        assert!(!credential.is_active(now));
    }

    #[test]
    fn debug_hides_token() {
        let credential = RefreshCredential::issue(
            IdentityId::new("u-1"),
            Duration::days(7),
            RequestOrigin::default(),
            Utc::now(),
        )
        .expect("issue");
        assert!(!format!("{credential:?}").contains(&credential.token));
    }
}
