// crates/settings-provider-core/src/core/namespace.rs
// ============================================================================
// Module: Namespace Registry
// Description: Static routing rules for the system, secure and global namespaces.
// Purpose: Resolve store ownership and write requirements per namespace.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! The registry is a closed set of namespaces. Each namespace maps to one
//! table per owning store and a write requirement. The global namespace is
//! backed by a single table owned by the primordial user; the system and
//! secure namespaces have one table per user.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::UserId;

// ============================================================================
// SECTION: Namespace
// ============================================================================

/// Settings namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Namespace {
    /// Per-user preferences writable without elevated permission.
    System,
    /// Per-user settings guarded by the secure write permission.
    Secure,
    /// Device-wide settings owned by the primordial user.
    Global,
}

/// Namespaces provisioned for every user.
const PER_USER_NAMESPACES: &[Namespace] = &[Namespace::System, Namespace::Secure];
/// Namespaces provisioned for the primordial user.
const PRIMORDIAL_NAMESPACES: &[Namespace] =
    &[Namespace::System, Namespace::Secure, Namespace::Global];

impl Namespace {
    /// All namespaces in registry order.
    pub const ALL: [Self; 3] = [Self::System, Self::Secure, Self::Global];

    /// Returns the canonical namespace name (also its table name).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::Secure => "secure",
            Self::Global => "global",
        }
    }

    /// Parses a canonical namespace name.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|namespace| namespace.as_str() == value)
    }

    /// Returns a dense index in registry order.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::System => 0,
            Self::Secure => 1,
            Self::Global => 2,
        }
    }

    /// Returns the routing rules for this namespace.
    #[must_use]
    pub const fn rules(self) -> NamespaceRules {
        match self {
            Self::System => NamespaceRules {
                owner: OwnerScope::PerUser,
                write: WriteRequirement::None,
            },
            Self::Secure => NamespaceRules {
                owner: OwnerScope::PerUser,
                write: WriteRequirement::SecurePermission,
            },
            Self::Global => NamespaceRules {
                owner: OwnerScope::Primordial,
                write: WriteRequirement::SecurePermission,
            },
        }
    }

    /// Returns the namespaces whose tables live in `user`'s store.
    #[must_use]
    pub const fn provisioned_for(user: UserId) -> &'static [Self] {
        if user.is_primordial() { PRIMORDIAL_NAMESPACES } else { PER_USER_NAMESPACES }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Routing Rules
// ============================================================================

/// Which store owns a namespace's table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OwnerScope {
    /// One table per user.
    PerUser,
    /// A single table owned by the primordial user.
    Primordial,
}

/// Permission required to mutate a namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteRequirement {
    /// No permission beyond being a caller.
    None,
    /// The secure-settings write permission.
    SecurePermission,
}

/// Routing rules for one namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NamespaceRules {
    /// Store ownership scope.
    pub owner: OwnerScope,
    /// Write permission requirement.
    pub write: WriteRequirement,
}

impl NamespaceRules {
    /// Resolves the user whose store holds the namespace for `requested`.
    #[must_use]
    pub const fn owner_for(self, requested: UserId) -> UserId {
        match self.owner {
            OwnerScope::PerUser => requested,
            OwnerScope::Primordial => UserId::PRIMORDIAL,
        }
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn global_always_routes_to_primordial_user() {
        let rules = Namespace::Global.rules();
        assert_eq!(rules.owner_for(UserId::new(7)), UserId::PRIMORDIAL);
        assert_eq!(Namespace::System.rules().owner_for(UserId::new(7)), UserId::new(7));
    }

    #[test]
    fn only_system_is_writable_without_permission() {
        assert_eq!(Namespace::System.rules().write, WriteRequirement::None);
        assert_eq!(Namespace::Secure.rules().write, WriteRequirement::SecurePermission);
        assert_eq!(Namespace::Global.rules().write, WriteRequirement::SecurePermission);
    }

    #[test]
    fn global_table_is_provisioned_for_primordial_only() {
        assert!(Namespace::provisioned_for(UserId::PRIMORDIAL).contains(&Namespace::Global));
        assert!(!Namespace::provisioned_for(UserId::new(10)).contains(&Namespace::Global));
    }

    #[test]
    fn parse_accepts_only_canonical_names() {
        assert_eq!(Namespace::parse("secure"), Some(Namespace::Secure));
        assert_eq!(Namespace::parse("Secure"), None);
        assert_eq!(Namespace::parse(""), None);
    }
}
