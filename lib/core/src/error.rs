//! Error handling foundation for the medigate workspace.
//!
//! This module provides only the `Result` type alias using rootcause.
//! Each crate defines its own domain-specific error types in their own
//! error modules and reports them through [`rootcause::Report`] at the
//! trait boundaries between the gateway and its collaborators.

use rootcause::Report;

/// A Result type alias using rootcause's Report for error handling.
///
/// Collaborator traits return `Result<T, SomeError>` so callers can inspect
/// the typed context while still carrying any attached diagnostics.
pub type Result<T, C> = std::result::Result<T, Report<C>>;
