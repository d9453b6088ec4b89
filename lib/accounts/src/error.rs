//! Repository error types.
//!
//! An empty result is an explicit `NotFound` variant rather than a
//! vendor-specific code callers have to compare against.

use std::fmt;

/// Errors from account repository and refresh credential store operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    /// No row matched the lookup.
    NotFound { entity: &'static str, key: String },
    /// A row with the same key already exists.
    Conflict { entity: &'static str, key: String },
    /// The query or statement failed.
    Query {
        operation: &'static str,
        details: String,
    },
    /// The backing store could not be reached.
    Unavailable { details: String },
    /// A stored row could not be converted into its domain type.
    Decode { entity: &'static str, details: String },
}

impl RepositoryError {
    /// Returns true if the lookup simply found nothing.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl fmt::Display for RepositoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound { entity, key } => write!(f, "{entity} '{key}' not found"),
            Self::Conflict { entity, key } => write!(f, "{entity} '{key}' already exists"),
            Self::Query { operation, details } => {
                write!(f, "repository query '{operation}' failed: {details}")
            }
            Self::Unavailable { details } => write!(f, "repository unavailable: {details}"),
            Self::Decode { entity, details } => {
                write!(f, "failed to decode {entity} row: {details}")
            }
        }
    }
}

impl std::error::Error for RepositoryError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_is_detectable() {
        let err = RepositoryError::NotFound {
            entity: "customer",
            key: "u-1".to_string(),
        };
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "customer 'u-1' not found");
    }

    #[test]
    fn query_failure_is_not_not_found() {
        let err = RepositoryError::Query {
            operation: "rotate refresh credentials",
            details: "deadlock detected".to_string(),
        };
        assert!(!err.is_not_found());
        assert!(err.to_string().contains("deadlock detected"));
    }
}
