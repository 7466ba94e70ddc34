// crates/settings-provider-core/src/runtime/router.rs
// ============================================================================
// Module: Request Router
// Description: Identifier resolution, user routing and permission checks.
// Purpose: Turn an external request into a namespace, a user and a verdict.
// Dependencies: crate::{core, interfaces, runtime::audit}
// ============================================================================

//! ## Overview
//! The router is the provider's fail-closed gate. It resolves identifiers to
//! a namespace route, maps the requested user onto the store owner and asks
//! the permission oracle before any write. The provider's own identity is
//! always privileged. Every denial is audited.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use serde::Deserialize;
use serde::Serialize;

use crate::core::Caller;
use crate::core::Namespace;
use crate::core::SettingsError;
use crate::core::SettingsUri;
use crate::core::UserId;
use crate::core::WriteRequirement;
use crate::interfaces::PermissionOracle;
use crate::runtime::audit::AuditSink;
use crate::runtime::audit::PermissionAuditEvent;
use crate::runtime::audit::PermissionAuditEventParams;

// ============================================================================
// SECTION: Permission Names
// ============================================================================

/// Names of the permissions the provider checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionNames {
    /// Required by the single-value put calls.
    pub write_settings: String,
    /// Required for writes to the secure and global namespaces.
    pub write_secure_settings: String,
    /// Required when a call targets another user.
    pub interact_across_users: String,
}

impl Default for PermissionNames {
    fn default() -> Self {
        Self {
            write_settings: "settings.permission.WRITE_SETTINGS".to_string(),
            write_secure_settings: "settings.permission.WRITE_SECURE_SETTINGS".to_string(),
            interact_across_users: "settings.permission.INTERACT_ACROSS_USERS".to_string(),
        }
    }
}

// ============================================================================
// SECTION: Router
// ============================================================================

/// Resolves requests and enforces permissions.
pub struct Router {
    /// Authorization oracle.
    oracle: Arc<dyn PermissionOracle>,
    /// Checked permission names.
    permissions: PermissionNames,
    /// Sink for denials.
    audit: Arc<dyn AuditSink>,
}

impl Router {
    /// Creates a router.
    #[must_use]
    pub fn new(
        oracle: Arc<dyn PermissionOracle>,
        permissions: PermissionNames,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            oracle,
            permissions,
            audit,
        }
    }

    /// Returns the checked permission names.
    #[must_use]
    pub const fn permissions(&self) -> &PermissionNames {
        &self.permissions
    }

    /// Parses an external identifier.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::InvalidArgument`] for an empty identifier and
    /// [`SettingsError::InvalidIdentifier`] for unknown patterns.
    pub fn resolve(identifier: &str) -> Result<SettingsUri, SettingsError> {
        SettingsUri::parse(identifier)
    }

    /// Returns the user whose store holds `namespace` for `requested`.
    #[must_use]
    pub const fn route_user(namespace: Namespace, requested: UserId) -> UserId {
        namespace.rules().owner_for(requested)
    }

    /// Requires the namespace's write permission.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::PermissionDenied`] when the caller lacks it.
    pub fn check_write_permission(
        &self,
        namespace: Namespace,
        caller: &Caller,
    ) -> Result<(), SettingsError> {
        match namespace.rules().write {
            WriteRequirement::None => Ok(()),
            WriteRequirement::SecurePermission => {
                self.require(Some(namespace), caller, &self.permissions.write_secure_settings)
            }
        }
    }

    /// Requires the single-value put permission.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::PermissionDenied`] when the caller lacks it.
    pub fn check_put_permission(
        &self,
        namespace: Namespace,
        caller: &Caller,
    ) -> Result<(), SettingsError> {
        self.require(Some(namespace), caller, &self.permissions.write_settings)
    }

    /// Requires the cross-user permission when `target` is not the caller's user.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::PermissionDenied`] when the caller lacks it.
    pub fn check_cross_user(&self, caller: &Caller, target: UserId) -> Result<(), SettingsError> {
        if target == caller.user_id() {
            return Ok(());
        }
        self.require(None, caller, &self.permissions.interact_across_users)
    }

    /// Asks the oracle; internal callers always pass.
    fn require(
        &self,
        namespace: Option<Namespace>,
        caller: &Caller,
        permission: &str,
    ) -> Result<(), SettingsError> {
        if caller.is_internal() || self.oracle.has_permission(caller, permission) {
            return Ok(());
        }
        self.audit.record_permission(&PermissionAuditEvent::new(PermissionAuditEventParams {
            namespace,
            caller: caller.label(),
            permission: permission.to_string(),
        }));
        Err(SettingsError::PermissionDenied {
            permission: permission.to_string(),
        })
    }
}
