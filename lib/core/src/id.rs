//! Strongly-typed ID types for domain entities.
//!
//! Rows created by the gateway itself (schedules, refresh credentials) use
//! ULID-backed identifiers. Identities are owned by the external identity
//! provider, so [`IdentityId`] wraps the provider's opaque string instead.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ulid::Ulid;

/// Error returned when parsing an ID from a string fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseIdError {
    /// The type of ID that failed to parse.
    pub id_type: &'static str,
    /// The reason for the parse failure.
    pub reason: String,
}

impl fmt::Display for ParseIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to parse {}: {}", self.id_type, self.reason)
    }
}

impl std::error::Error for ParseIdError {}

/// Macro to generate a strongly-typed ID wrapper around ULID.
macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident, $prefix:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Ulid);

        impl $name {
            /// Creates a new ID with a randomly generated ULID.
            #[must_use]
            pub fn new() -> Self {
                Self(Ulid::new())
            }

            /// Creates an ID from a ULID.
            #[must_use]
            pub const fn from_ulid(ulid: Ulid) -> Self {
                Self(ulid)
            }

            /// Returns the underlying ULID.
            #[must_use]
            pub const fn as_ulid(&self) -> Ulid {
                self.0
            }

            /// Returns the prefix used for display formatting.
            #[must_use]
            pub const fn prefix() -> &'static str {
                $prefix
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}_{}", $prefix, self.0)
            }
        }

        impl FromStr for $name {
            type Err = ParseIdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let prefix_with_underscore = concat!($prefix, "_");
                let ulid_str = s.strip_prefix(prefix_with_underscore).unwrap_or(s);

                Ulid::from_str(ulid_str)
                    .map(Self)
                    .map_err(|e| ParseIdError {
                        id_type: stringify!($name),
                        reason: e.to_string(),
                    })
            }
        }

        impl From<Ulid> for $name {
            fn from(ulid: Ulid) -> Self {
                Self(ulid)
            }
        }

        impl From<$name> for Ulid {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id!(
    /// Unique identifier for a staff schedule row.
    ScheduleId,
    "sch"
);

define_id!(
    /// Unique identifier for a stored refresh credential.
    RefreshCredentialId,
    "rft"
);

/// Identifier of a principal held by the identity provider.
///
/// The value is opaque to the gateway (usually a UUID) and is also the
/// primary key of every profile row the gateway owns for that principal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdentityId(String);

impl IdentityId {
    /// Creates an identity ID from the provider's string form.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identity ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IdentityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for IdentityId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for IdentityId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schedule_id_display_format() {
        let id = ScheduleId::new();
        assert!(id.to_string().starts_with("sch_"));
    }

    #[test]
    fn refresh_credential_id_display_format() {
        let id = RefreshCredentialId::new();
        assert!(id.to_string().starts_with("rft_"));
    }

    #[test]
    fn parse_with_prefix() {
        let id = ScheduleId::new();
        let parsed: ScheduleId = id.to_string().parse().expect("should parse");
        assert_eq!(id, parsed);
    }

    #[test]
    fn parse_without_prefix() {
        let ulid = Ulid::new();
        let id: RefreshCredentialId = ulid.to_string().parse().expect("should parse");
        assert_eq!(id.as_ulid(), ulid);
    }

    #[test]
    fn parse_invalid_ulid() {
        let err = "not_a_ulid".parse::<ScheduleId>().unwrap_err();
        assert_eq!(err.id_type, "ScheduleId");
    }

    #[test]
    fn identity_id_is_opaque() {
        let id = IdentityId::new("0b7c5f7e-4d59-4c1e-9a52-3f1f0e0d2a11");
        assert_eq!(id.as_str(), "0b7c5f7e-4d59-4c1e-9a52-3f1f0e0d2a11");
        assert_eq!(id.to_string(), id.as_str());
    }

    #[test]
    fn identity_id_serializes_as_plain_string() {
        let id: IdentityId = "user-1".into();
        let json = serde_json::to_string(&id).expect("serialize");
        assert_eq!(json, "\"user-1\"");
    }

    #[test]
    fn id_serde_roundtrip() {
        let id = RefreshCredentialId::new();
        let json = serde_json::to_string(&id).expect("serialize");
        let parsed: RefreshCredentialId = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(id, parsed);
    }
}
