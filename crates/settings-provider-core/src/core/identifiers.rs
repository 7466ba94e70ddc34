// crates/settings-provider-core/src/core/identifiers.rs
// ============================================================================
// Module: Settings Identifiers
// Description: User handles and caller identities for settings requests.
// Purpose: Provide strongly typed, serializable ids with stable string forms.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! User ids are small integer handles. The primordial user (handle `0`) owns
//! the global namespace and is always provisioned at startup. Callers carry
//! the user they act as plus an opaque principal used for permission checks;
//! the provider's own identity is modeled as an internal caller.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Largest user handle accepted by default. Larger values are treated as
/// application ids passed where a user handle was expected.
pub const DEFAULT_MAX_USER_ID: u32 = 999;

// ============================================================================
// SECTION: User Identifier
// ============================================================================

/// User handle owning a set of per-user settings tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(u32);

impl UserId {
    /// The primordial (owner) user of the system.
    pub const PRIMORDIAL: Self = Self(0);

    /// Creates a user identifier from a raw handle.
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Returns the raw handle.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }

    /// Returns true for the primordial user.
    #[must_use]
    pub const fn is_primordial(self) -> bool {
        self.0 == Self::PRIMORDIAL.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<u32> for UserId {
    fn from(value: u32) -> Self {
        Self::new(value)
    }
}

// ============================================================================
// SECTION: Caller Identity
// ============================================================================

/// Identity of the party invoking a provider operation.
///
/// # Invariants
/// - Internal callers represent the provider itself and are always privileged.
/// - External callers are authorized through the permission oracle by principal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Caller {
    /// Principal identifier; `None` for the provider's own identity.
    principal: Option<String>,
    /// User the caller acts as.
    user_id: UserId,
}

impl Caller {
    /// Creates an external caller acting as `user_id`.
    #[must_use]
    pub fn external(principal: impl Into<String>, user_id: UserId) -> Self {
        Self {
            principal: Some(principal.into()),
            user_id,
        }
    }

    /// Creates the provider's own identity acting as `user_id`.
    #[must_use]
    pub const fn internal(user_id: UserId) -> Self {
        Self {
            principal: None,
            user_id,
        }
    }

    /// Returns the user the caller acts as.
    #[must_use]
    pub const fn user_id(&self) -> UserId {
        self.user_id
    }

    /// Returns the external principal, if any.
    #[must_use]
    pub fn principal(&self) -> Option<&str> {
        self.principal.as_deref()
    }

    /// Returns true for the provider's own identity.
    #[must_use]
    pub const fn is_internal(&self) -> bool {
        self.principal.is_none()
    }

    /// Returns a stable label for audit records.
    #[must_use]
    pub fn label(&self) -> String {
        self.principal.clone().unwrap_or_else(|| "internal".to_string())
    }
}
