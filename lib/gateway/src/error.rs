//! Gateway error taxonomy.
//!
//! Every failure the gateway reports maps to exactly one HTTP status. The
//! public message and details are fixed per variant; the causes reported by
//! the identity provider or the repository stay in the [`rootcause::Report`]
//! chain and are only ever logged.

use medigate_core::IdentityId;
use serde_json::{Value, json};
use std::fmt;

/// External call made while serving a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    PasswordSignIn,
    AccessTokenValidation,
    CodeExchange,
    IdentityCreation,
    LoadAccount,
    InsertAccount,
    TouchAccount,
    RefreshCheck,
    StoreRefreshCredential,
    UpsertStaff,
    UpsertDoctor,
    RemoveDoctor,
    InsertSchedule,
}

impl Operation {
    /// Returns the name used in logs.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PasswordSignIn => "password sign-in",
            Self::AccessTokenValidation => "access token validation",
            Self::CodeExchange => "code exchange",
            Self::IdentityCreation => "identity creation",
            Self::LoadAccount => "load customer profile",
            Self::InsertAccount => "insert customer profile",
            Self::TouchAccount => "touch customer profile",
            Self::RefreshCheck => "refresh credential check",
            Self::StoreRefreshCredential => "store refresh credential",
            Self::UpsertStaff => "upsert staff member",
            Self::UpsertDoctor => "upsert doctor details",
            Self::RemoveDoctor => "remove doctor details",
            Self::InsertSchedule => "insert schedule",
        }
    }

    /// Message shown to the caller when this operation fails upstream.
    #[must_use]
    pub fn public_message(&self) -> &'static str {
        match self {
            Self::PasswordSignIn
            | Self::AccessTokenValidation
            | Self::CodeExchange
            | Self::IdentityCreation => "Identity provider unavailable",
            Self::LoadAccount | Self::TouchAccount | Self::RefreshCheck => {
                "Failed to retrieve customer profile"
            }
            Self::InsertAccount => "Failed to create customer profile",
            Self::StoreRefreshCredential => "Failed to store refresh token",
            Self::UpsertStaff => "Failed to create/update staff member",
            Self::UpsertDoctor | Self::RemoveDoctor => "Failed to create/update doctor details",
            Self::InsertSchedule => "Failed to create schedule",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors returned by [`AuthGateway`](crate::AuthGateway) operations.
#[derive(Debug, Clone, PartialEq)]
pub enum GatewayError {
    /// Request rejected before any external call (400).
    InvalidInput {
        message: &'static str,
        details: Option<Value>,
    },
    /// Provider refused the credential, token or code (401).
    Authentication {
        message: &'static str,
        details: Option<Value>,
    },
    /// Account exists but may not log in (403).
    Authorization {
        message: &'static str,
        details: Option<Value>,
    },
    /// An expected profile is absent (404).
    NotFound {
        message: &'static str,
        details: Option<Value>,
    },
    /// HTTP method other than POST or OPTIONS (405).
    MethodNotAllowed,
    /// An identity provider or repository call failed or timed out (500).
    Upstream {
        operation: Operation,
        identity: Option<IdentityId>,
        timed_out: bool,
    },
    /// Unexpected local failure (500).
    Internal { details: String },
    /// Required runtime configuration is missing (500).
    Configuration { missing: Vec<String> },
}

impl GatewayError {
    pub(crate) fn invalid_input(message: &'static str) -> Self {
        Self::InvalidInput {
            message,
            details: None,
        }
    }

    pub(crate) fn authentication(message: &'static str) -> Self {
        Self::Authentication {
            message,
            details: None,
        }
    }

    pub(crate) fn upstream(operation: Operation, identity: Option<&IdentityId>) -> Self {
        Self::Upstream {
            operation,
            identity: identity.cloned(),
            timed_out: false,
        }
    }

    pub(crate) fn timeout(operation: Operation, identity: Option<&IdentityId>) -> Self {
        Self::Upstream {
            operation,
            identity: identity.cloned(),
            timed_out: true,
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn status(&self) -> u16 {
        match self {
            Self::InvalidInput { .. } => 400,
            Self::Authentication { .. } => 401,
            Self::Authorization { .. } => 403,
            Self::NotFound { .. } => 404,
            Self::MethodNotAllowed => 405,
            Self::Upstream { .. } | Self::Internal { .. } | Self::Configuration { .. } => 500,
        }
    }

    /// Returns the message safe to show to the caller.
    #[must_use]
    pub fn public_message(&self) -> &'static str {
        match self {
            Self::InvalidInput { message, .. }
            | Self::Authentication { message, .. }
            | Self::Authorization { message, .. }
            | Self::NotFound { message, .. } => message,
            Self::MethodNotAllowed => "Method not allowed",
            Self::Upstream { operation, .. } => operation.public_message(),
            Self::Internal { .. } => "Internal server error",
            Self::Configuration { .. } => "Server configuration error",
        }
    }

    /// Returns the curated details safe to show to the caller.
    #[must_use]
    pub fn public_details(&self) -> Option<Value> {
        match self {
            Self::InvalidInput { details, .. }
            | Self::Authentication { details, .. }
            | Self::Authorization { details, .. }
            | Self::NotFound { details, .. } => details.clone(),
            Self::Upstream {
                identity: Some(id),
                ..
            } => Some(json!({ "userId": id })),
            Self::Upstream { identity: None, .. }
            | Self::MethodNotAllowed
            | Self::Internal { .. }
            | Self::Configuration { .. } => None,
        }
    }

    /// Returns true for server-side failures.
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        self.status() >= 500
    }
}

impl fmt::Display for GatewayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidInput { message, .. } => write!(f, "invalid input: {message}"),
            Self::Authentication { message, .. } => {
                write!(f, "authentication failed: {message}")
            }
            Self::Authorization { message, .. } => write!(f, "not authorized: {message}"),
            Self::NotFound { message, .. } => write!(f, "not found: {message}"),
            Self::MethodNotAllowed => write!(f, "method not allowed"),
            Self::Upstream {
                operation,
                identity,
                timed_out,
            } => {
                let outcome = if *timed_out { "timed out" } else { "failed" };
                match identity {
                    Some(id) => write!(f, "{operation} {outcome} for identity '{id}'"),
                    None => write!(f, "{operation} {outcome}"),
                }
            }
            Self::Internal { details } => write!(f, "internal error: {details}"),
            Self::Configuration { missing } => {
                write!(f, "missing configuration: {}", missing.join(", "))
            }
        }
    }
}

impl std::error::Error for GatewayError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses() {
        assert_eq!(GatewayError::invalid_input("x").status(), 400);
        assert_eq!(GatewayError::authentication("x").status(), 401);
        assert_eq!(GatewayError::MethodNotAllowed.status(), 405);
        assert_eq!(
            GatewayError::upstream(Operation::LoadAccount, None).status(),
            500
        );
        assert_eq!(
            GatewayError::Configuration {
                missing: vec!["DATABASE_URL".to_string()]
            }
            .status(),
            500
        );
    }

    #[test]
    fn upstream_exposes_only_operation_message_and_user_id() {
        let id = IdentityId::new("u-1");
        let err = GatewayError::timeout(Operation::UpsertStaff, Some(&id));
        assert_eq!(err.public_message(), "Failed to create/update staff member");
        assert_eq!(err.public_details(), Some(json!({ "userId": "u-1" })));
        assert_eq!(
            err.to_string(),
            "upsert staff member timed out for identity 'u-1'"
        );
    }

    #[test]
    fn configuration_error_hides_missing_keys_from_caller() {
        let err = GatewayError::Configuration {
            missing: vec!["IDENTITY__SERVICE_KEY".to_string()],
        };
        assert_eq!(err.public_message(), "Server configuration error");
        assert_eq!(err.public_details(), None);
        assert!(err.to_string().contains("IDENTITY__SERVICE_KEY"));
    }
}
