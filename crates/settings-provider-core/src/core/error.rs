// crates/settings-provider-core/src/core/error.rs
// ============================================================================
// Module: Settings Errors
// Description: Caller-facing failure taxonomy for settings operations.
// Purpose: Give every provider entry point a typed, non-retryable failure.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! All failures are local to the call that produced them. None of them leave
//! the store cache or the migration flag half-updated, because each resolves
//! inside an atomic boundary before any cache or flag mutation.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

use crate::interfaces::StoreError;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Settings operation failures.
///
/// # Invariants
/// - Variants are stable for error classification.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SettingsError {
    /// Identifier does not match any known namespace pattern.
    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),
    /// Caller lacks the permission required for the operation.
    #[error("permission denial: operation requires {permission}")]
    PermissionDenied {
        /// Name of the missing permission.
        permission: String,
    },
    /// Required argument is missing or empty.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// Setting name is unknown or its value fails the registered validator.
    #[error("validation failed: {0}")]
    ValidationFailed(String),
    /// Underlying storage engine failure; the transaction was rolled back.
    #[error("storage failure: {0}")]
    StorageFailure(String),
}

impl SettingsError {
    /// Returns a stable label for audit records.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::InvalidIdentifier(_) => "invalid_identifier",
            Self::PermissionDenied {
                ..
            } => "permission_denied",
            Self::InvalidArgument(_) => "invalid_argument",
            Self::ValidationFailed(_) => "validation_failed",
            Self::StorageFailure(_) => "storage_failure",
        }
    }
}

impl From<StoreError> for SettingsError {
    fn from(error: StoreError) -> Self {
        Self::StorageFailure(error.to_string())
    }
}
