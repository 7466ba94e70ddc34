// crates/settings-provider-core/src/runtime/notifier.rs
// ============================================================================
// Module: Change Notifier
// Description: Per-namespace change versions and change event publication.
// Purpose: Tell observers that a namespace changed after a committed write.
// Dependencies: crate::{core, interfaces}, tracing
// ============================================================================

//! ## Overview
//! Each namespace has a persisted change version. After a mutation commits
//! and affected at least one row, the notifier bumps that version by one and
//! publishes a change event. Global changes are broadcast to every user; the
//! other namespaces notify only the affected user. Version bumps for one
//! namespace are serialized; different namespaces proceed independently.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::sync::Mutex;

use tracing::warn;

use crate::core::Namespace;
use crate::core::SettingsError;
use crate::core::SettingsUri;
use crate::core::UserId;
use crate::interfaces::ChangeBus;
use crate::interfaces::ChangeScope;
use crate::interfaces::ProviderStateStore;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Result of one notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChangeNotice {
    /// Persisted version after the bump; `None` when persisting failed.
    pub version: Option<u64>,
    /// Audience the event was published to.
    pub scope: ChangeScope,
}

/// Publishes change events and maintains change versions.
pub struct ChangeNotifier {
    /// Persisted version counters.
    state: Arc<dyn ProviderStateStore>,
    /// Event bus.
    bus: Arc<dyn ChangeBus>,
    /// One lock per namespace, indexed by [`Namespace::index`].
    locks: [Mutex<()>; 3],
}

// ============================================================================
// SECTION: Implementation
// ============================================================================

impl ChangeNotifier {
    /// Creates a notifier.
    #[must_use]
    pub fn new(state: Arc<dyn ProviderStateStore>, bus: Arc<dyn ChangeBus>) -> Self {
        Self {
            state,
            bus,
            locks: [Mutex::new(()), Mutex::new(()), Mutex::new(())],
        }
    }

    /// Returns the audience for a change to `namespace` made for `user`.
    #[must_use]
    pub const fn scope_for(namespace: Namespace, user: UserId) -> ChangeScope {
        match namespace {
            Namespace::Global => ChangeScope::AllUsers,
            Namespace::System | Namespace::Secure => ChangeScope::User(user),
        }
    }

    /// Bumps `namespace`'s version and publishes a change to `uri`.
    ///
    /// Must only be called after the mutation committed with a non-zero
    /// affected count. A version that cannot be persisted is logged; the
    /// event is still published.
    pub fn notify(&self, namespace: Namespace, user: UserId, uri: &SettingsUri) -> ChangeNotice {
        let version = match self.bump(namespace) {
            Ok(version) => Some(version),
            Err(err) => {
                warn!(namespace = %namespace, error = %err, "change version not persisted");
                None
            }
        };
        let scope = Self::scope_for(namespace, user);
        self.bus.publish(scope, uri);
        ChangeNotice {
            version,
            scope,
        }
    }

    /// Returns `namespace`'s current version.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::StorageFailure`] when the version cannot be read.
    pub fn version(&self, namespace: Namespace) -> Result<u64, SettingsError> {
        Ok(self.state.change_version(namespace)?)
    }

    /// Increments and persists the version under the namespace lock.
    fn bump(&self, namespace: Namespace) -> Result<u64, SettingsError> {
        let lock = &self.locks[namespace.index()];
        let _guard = lock.lock().map_err(|_| {
            SettingsError::StorageFailure("change version mutex poisoned".to_string())
        })?;
        let next = self.state.change_version(namespace)?.saturating_add(1);
        self.state.set_change_version(namespace, next)?;
        Ok(next)
    }
}
