//! Error types for the identity crate.
//!
//! Errors are reported through rootcause at the [`IdentityProvider`]
//! boundary. The gateway distinguishes a provider *rejection* (bad password,
//! expired token, unknown code) from the provider being unreachable, because
//! the two map to different outward statuses.
//!
//! [`IdentityProvider`]: crate::IdentityProvider

use std::fmt;

/// Errors from identity provider operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityError {
    /// The provider understood the request and refused it.
    Rejected {
        /// Provider error code (e.g. `invalid_credentials`).
        code: String,
        /// Human-readable reason reported by the provider.
        message: String,
    },
    /// The request did not complete within the configured bound.
    Timeout { operation: &'static str },
    /// Transport failure or a provider-side (5xx) error.
    Unavailable {
        operation: &'static str,
        details: String,
    },
    /// The provider answered with a body that could not be decoded.
    InvalidResponse {
        operation: &'static str,
        details: String,
    },
    /// The client could not be constructed from its configuration.
    Configuration { details: String },
}

impl IdentityError {
    /// Returns true if the provider deliberately refused the request.
    #[must_use]
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::Rejected { .. })
    }

    /// Returns true if the request ran out of time.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

impl fmt::Display for IdentityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rejected { code, message } => {
                write!(f, "identity provider rejected request ({code}): {message}")
            }
            Self::Timeout { operation } => {
                write!(f, "identity provider timed out during {operation}")
            }
            Self::Unavailable { operation, details } => {
                write!(f, "identity provider unavailable during {operation}: {details}")
            }
            Self::InvalidResponse { operation, details } => {
                write!(f, "invalid identity provider response to {operation}: {details}")
            }
            Self::Configuration { details } => {
                write!(f, "identity client configuration error: {details}")
            }
        }
    }
}

impl std::error::Error for IdentityError {}
