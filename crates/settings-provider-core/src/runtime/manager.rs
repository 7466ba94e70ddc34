// crates/settings-provider-core/src/runtime/manager.rs
// ============================================================================
// Module: Per-User Store Manager
// Description: Lazily opened, cached user stores keyed by user id.
// Purpose: Own the only cache of user store handles.
// Dependencies: crate::{core, interfaces}, tracing
// ============================================================================

//! ## Overview
//! The manager opens a user's database on first access, creates the tables
//! provisioned for that user, loads defaults and caches the handle. One lock
//! guards the cache for the whole get-or-create sequence, so two callers never
//! open the same user's store twice. A failed creation leaves no cache entry.
//!
//! ## Invariants
//! - At most one cached store per user.
//! - Only stores whose initialization committed are cached.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;

use tracing::debug;

use crate::core::Namespace;
use crate::core::SettingsError;
use crate::core::UserId;
use crate::interfaces::DefaultSetting;
use crate::interfaces::StorageEngine;
use crate::interfaces::TableSchema;
use crate::runtime::table::UserStore;

// ============================================================================
// SECTION: Store Manager
// ============================================================================

/// Cache of opened user stores.
pub struct StoreManager {
    /// Engine used to open databases.
    engine: Arc<dyn StorageEngine>,
    /// Defaults loaded into new stores.
    defaults: Vec<DefaultSetting>,
    /// Largest accepted user handle.
    max_user_id: u32,
    /// Opened stores.
    stores: Mutex<BTreeMap<UserId, Arc<UserStore>>>,
}

impl StoreManager {
    /// Creates an empty manager.
    #[must_use]
    pub fn new(
        engine: Arc<dyn StorageEngine>,
        defaults: Vec<DefaultSetting>,
        max_user_id: u32,
    ) -> Self {
        Self {
            engine,
            defaults,
            max_user_id,
            stores: Mutex::new(BTreeMap::new()),
        }
    }

    /// Returns `user`'s store, creating and initializing it on first access.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::InvalidArgument`] for user ids above the
    /// configured maximum and [`SettingsError::StorageFailure`] when the store
    /// cannot be opened or initialized.
    pub fn get_or_create(&self, user: UserId) -> Result<Arc<UserStore>, SettingsError> {
        if user.get() > self.max_user_id {
            return Err(SettingsError::InvalidArgument(format!(
                "user id {user} exceeds maximum {}; application ids are not user handles",
                self.max_user_id
            )));
        }
        let mut stores = self.lock()?;
        if let Some(store) = stores.get(&user) {
            return Ok(Arc::clone(store));
        }
        let namespaces = Namespace::provisioned_for(user);
        let schemas: Vec<TableSchema> =
            namespaces.iter().copied().map(TableSchema::for_namespace).collect();
        let defaults: Vec<DefaultSetting> = self
            .defaults
            .iter()
            .filter(|default| namespaces.contains(&default.namespace))
            .cloned()
            .collect();
        let database = self.engine.open(user)?;
        database.initialize(&schemas, &defaults)?;
        let store = Arc::new(UserStore::new(user, database));
        stores.insert(user, Arc::clone(&store));
        debug!(user = %user, tables = schemas.len(), "opened user settings store");
        Ok(store)
    }

    /// Drops the cached store for `user`; returns true when one was cached.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::StorageFailure`] when the cache lock is poisoned.
    pub fn evict(&self, user: UserId) -> Result<bool, SettingsError> {
        let removed = self.lock()?.remove(&user).is_some();
        if removed {
            debug!(user = %user, "evicted user settings store");
        }
        Ok(removed)
    }

    /// Returns the users with a cached store.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::StorageFailure`] when the cache lock is poisoned.
    pub fn cached_users(&self) -> Result<Vec<UserId>, SettingsError> {
        Ok(self.lock()?.keys().copied().collect())
    }

    /// Locks the cache.
    fn lock(&self) -> Result<MutexGuard<'_, BTreeMap<UserId, Arc<UserStore>>>, SettingsError> {
        self.stores
            .lock()
            .map_err(|_| SettingsError::StorageFailure("store cache mutex poisoned".to_string()))
    }
}
