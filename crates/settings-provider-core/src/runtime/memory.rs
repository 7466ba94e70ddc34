// crates/settings-provider-core/src/runtime/memory.rs
// ============================================================================
// Module: In-Memory Collaborators
// Description: Simple in-memory storage, state, permission and bus backends.
// Purpose: Run the provider deterministically without external systems.
// Dependencies: crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! This module provides in-memory implementations of every collaborator trait
//! for tests, demos and embedding. Databases survive cache eviction, so a
//! re-opened user store sees the rows written before. They are not intended
//! for production use.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;

use crate::core::Caller;
use crate::core::Namespace;
use crate::core::Predicate;
use crate::core::RowUpdate;
use crate::core::SettingRecord;
use crate::core::SettingRow;
use crate::core::SettingsUri;
use crate::core::SortOrder;
use crate::core::UserId;
use crate::core::sort_records;
use crate::interfaces::ChangeBus;
use crate::interfaces::ChangeScope;
use crate::interfaces::DefaultSetting;
use crate::interfaces::LegacySettingsSource;
use crate::interfaces::PermissionOracle;
use crate::interfaces::ProviderStateStore;
use crate::interfaces::SettingsDatabase;
use crate::interfaces::StorageEngine;
use crate::interfaces::StoreError;
use crate::interfaces::TableSchema;
use crate::interfaces::UserDirectory;
use crate::interfaces::UserRemovalHandler;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Granted permission names keyed by principal.
type GrantTable = BTreeMap<String, BTreeSet<String>>;
/// Legacy values keyed by namespace, owning user and key.
type LegacyValues = BTreeMap<(Namespace, UserId, String), String>;

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Locks a mutex, mapping poisoning to a store error.
fn lock<'a, T>(mutex: &'a Mutex<T>, what: &str) -> Result<MutexGuard<'a, T>, StoreError> {
    mutex.lock().map_err(|_| StoreError::Db(format!("{what} mutex poisoned")))
}

// ============================================================================
// SECTION: Storage
// ============================================================================

/// Rows of one table.
#[derive(Debug, Clone, Default)]
struct MemoryTable {
    /// Rows keyed by row id.
    rows: BTreeMap<i64, SettingRecord>,
    /// Last assigned row id (autoincrement never reuses ids).
    last_id: i64,
}

impl MemoryTable {
    /// Inserts or replaces by name, assigning a fresh id.
    fn upsert(&mut self, row: &SettingRow) -> i64 {
        self.rows.retain(|_, record| record.name != row.name);
        self.last_id += 1;
        let id = self.last_id;
        self.rows.insert(id, SettingRecord {
            id,
            name: row.name.clone(),
            value: row.value.clone(),
        });
        id
    }

    /// Inserts unless the name exists.
    fn insert_if_absent(&mut self, row: &SettingRow) {
        if !self.rows.values().any(|record| record.name == row.name) {
            self.upsert(row);
        }
    }
}

/// In-memory database holding one user's tables.
#[derive(Debug, Default)]
pub struct InMemorySettingsDatabase {
    /// Tables keyed by name.
    tables: Mutex<BTreeMap<String, MemoryTable>>,
}

impl InMemorySettingsDatabase {
    /// Creates an empty database.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the table names.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the mutex is poisoned.
    pub fn table_names(&self) -> Result<Vec<String>, StoreError> {
        Ok(lock(&self.tables, "database")?.keys().cloned().collect())
    }
}

/// Looks up a table or reports it missing.
fn table_mut<'a>(
    tables: &'a mut BTreeMap<String, MemoryTable>,
    table: &str,
) -> Result<&'a mut MemoryTable, StoreError> {
    tables.get_mut(table).ok_or_else(|| StoreError::Invalid(format!("no such table: {table}")))
}

impl SettingsDatabase for InMemorySettingsDatabase {
    fn initialize(
        &self,
        schemas: &[TableSchema],
        defaults: &[DefaultSetting],
    ) -> Result<(), StoreError> {
        let mut tables = lock(&self.tables, "database")?;
        let mut staged = tables.clone();
        let mut created = BTreeSet::new();
        for schema in schemas {
            if !staged.contains_key(schema.table) {
                staged.insert(schema.table.to_string(), MemoryTable::default());
                created.insert(schema.table);
            }
        }
        // Defaults only seed tables created by this call.
        for default in defaults.iter().filter(|default| created.contains(default.namespace.as_str())) {
            table_mut(&mut staged, default.namespace.as_str())?.insert_if_absent(&default.row);
        }
        *tables = staged;
        Ok(())
    }

    fn insert(&self, table: &str, row: &SettingRow) -> Result<i64, StoreError> {
        let mut tables = lock(&self.tables, "database")?;
        Ok(table_mut(&mut tables, table)?.upsert(row))
    }

    fn insert_batch(&self, table: &str, rows: &[SettingRow]) -> Result<usize, StoreError> {
        let mut tables = lock(&self.tables, "database")?;
        let mut staged = table_mut(&mut tables, table)?.clone();
        for row in rows {
            staged.upsert(row);
        }
        *table_mut(&mut tables, table)? = staged;
        Ok(rows.len())
    }

    fn select(
        &self,
        table: &str,
        predicate: Option<&Predicate>,
        sort: Option<&SortOrder>,
    ) -> Result<Vec<SettingRecord>, StoreError> {
        let mut tables = lock(&self.tables, "database")?;
        let mut records: Vec<SettingRecord> = table_mut(&mut tables, table)?
            .rows
            .values()
            .filter(|record| predicate.is_none_or(|predicate| predicate.matches(record)))
            .cloned()
            .collect();
        sort_records(&mut records, sort);
        Ok(records)
    }

    fn update(
        &self,
        table: &str,
        update: &RowUpdate,
        predicate: Option<&Predicate>,
    ) -> Result<usize, StoreError> {
        let mut tables = lock(&self.tables, "database")?;
        let target = table_mut(&mut tables, table)?;
        let mut staged = target.clone();
        let matched: Vec<i64> = staged
            .rows
            .values()
            .filter(|record| predicate.is_none_or(|predicate| predicate.matches(record)))
            .map(|record| record.id)
            .collect();
        for id in &matched {
            let Some(mut record) = staged.rows.remove(id) else {
                continue;
            };
            if let Some(name) = &update.name {
                record.name.clone_from(name);
            }
            if let Some(value) = &update.value {
                record.value.clone_from(value);
            }
            // Renaming onto an existing name replaces that row.
            staged.rows.retain(|_, other| other.name != record.name);
            staged.rows.insert(*id, record);
        }
        *target = staged;
        Ok(matched.len())
    }

    fn delete(&self, table: &str, predicate: &Predicate) -> Result<usize, StoreError> {
        let mut tables = lock(&self.tables, "database")?;
        let target = table_mut(&mut tables, table)?;
        let before = target.rows.len();
        target.rows.retain(|_, record| !predicate.matches(record));
        Ok(before - target.rows.len())
    }
}

/// In-memory engine keeping one database per user for its whole lifetime.
#[derive(Debug, Default, Clone)]
pub struct InMemoryStorageEngine {
    /// Databases keyed by user.
    databases: Arc<Mutex<BTreeMap<UserId, Arc<InMemorySettingsDatabase>>>>,
}

impl InMemoryStorageEngine {
    /// Creates an empty engine.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `user`'s database if it was ever opened.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the mutex is poisoned.
    pub fn database(
        &self,
        user: UserId,
    ) -> Result<Option<Arc<InMemorySettingsDatabase>>, StoreError> {
        Ok(lock(&self.databases, "engine")?.get(&user).cloned())
    }
}

impl StorageEngine for InMemoryStorageEngine {
    fn open(&self, user: UserId) -> Result<Arc<dyn SettingsDatabase>, StoreError> {
        let mut databases = lock(&self.databases, "engine")?;
        let database: Arc<dyn SettingsDatabase> = databases.entry(user).or_default().clone();
        Ok(database)
    }
}

// ============================================================================
// SECTION: Provider State
// ============================================================================

/// In-memory migration flag and change versions.
#[derive(Debug, Default, Clone)]
pub struct InMemoryStateStore {
    /// Migration flag.
    migrated: Arc<Mutex<bool>>,
    /// Change versions by namespace.
    versions: Arc<Mutex<BTreeMap<Namespace, u64>>>,
}

impl InMemoryStateStore {
    /// Creates a fresh state store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProviderStateStore for InMemoryStateStore {
    fn migration_complete(&self) -> Result<bool, StoreError> {
        Ok(*lock(&self.migrated, "state")?)
    }

    fn mark_migration_complete(&self) -> Result<(), StoreError> {
        *lock(&self.migrated, "state")? = true;
        Ok(())
    }

    fn change_version(&self, namespace: Namespace) -> Result<u64, StoreError> {
        Ok(lock(&self.versions, "state")?.get(&namespace).copied().unwrap_or(0))
    }

    fn set_change_version(&self, namespace: Namespace, version: u64) -> Result<(), StoreError> {
        lock(&self.versions, "state")?.insert(namespace, version);
        Ok(())
    }
}

// ============================================================================
// SECTION: Permissions
// ============================================================================

/// Permission oracle backed by an explicit grant table.
#[derive(Debug, Default, Clone)]
pub struct StaticPermissionOracle {
    /// Granted permissions by principal.
    grants: Arc<Mutex<GrantTable>>,
}

impl StaticPermissionOracle {
    /// Creates an oracle with no grants.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Grants `permission` to `principal`.
    pub fn grant(&self, principal: &str, permission: &str) {
        if let Ok(mut grants) = self.grants.lock() {
            grants.entry(principal.to_string()).or_default().insert(permission.to_string());
        }
    }

    /// Revokes `permission` from `principal`.
    pub fn revoke(&self, principal: &str, permission: &str) {
        if let Ok(mut grants) = self.grants.lock()
            && let Some(granted) = grants.get_mut(principal)
        {
            granted.remove(permission);
        }
    }
}

impl PermissionOracle for StaticPermissionOracle {
    fn has_permission(&self, caller: &Caller, permission: &str) -> bool {
        let Some(principal) = caller.principal() else {
            return false;
        };
        self.grants
            .lock()
            .is_ok_and(|grants| grants.get(principal).is_some_and(|set| set.contains(permission)))
    }
}

// ============================================================================
// SECTION: Change Bus
// ============================================================================

/// Change bus that records every published event.
#[derive(Debug, Default, Clone)]
pub struct RecordingChangeBus {
    /// Published events in order.
    events: Arc<Mutex<Vec<(ChangeScope, SettingsUri)>>>,
}

impl RecordingChangeBus {
    /// Creates an empty bus.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the published events.
    #[must_use]
    pub fn events(&self) -> Vec<(ChangeScope, SettingsUri)> {
        self.events.lock().map(|events| events.clone()).unwrap_or_default()
    }

    /// Forgets recorded events.
    pub fn clear(&self) {
        if let Ok(mut events) = self.events.lock() {
            events.clear();
        }
    }
}

impl ChangeBus for RecordingChangeBus {
    fn publish(&self, scope: ChangeScope, uri: &SettingsUri) {
        if let Ok(mut events) = self.events.lock() {
            events.push((scope, uri.clone()));
        }
    }
}

// ============================================================================
// SECTION: User Directory
// ============================================================================

/// Mutable user list with removal subscriptions.
#[derive(Default, Clone)]
pub struct InMemoryUserDirectory {
    /// Known users.
    users: Arc<Mutex<BTreeSet<UserId>>>,
    /// Removal subscribers.
    handlers: Arc<Mutex<Vec<Arc<UserRemovalHandler>>>>,
}

impl InMemoryUserDirectory {
    /// Creates a directory containing only the primordial user.
    #[must_use]
    pub fn new() -> Self {
        let directory = Self::default();
        directory.add_user(UserId::PRIMORDIAL);
        directory
    }

    /// Adds a user.
    pub fn add_user(&self, user: UserId) {
        if let Ok(mut users) = self.users.lock() {
            users.insert(user);
        }
    }

    /// Removes a user and notifies subscribers outside the directory lock.
    pub fn remove_user(&self, user: UserId) {
        let removed = self.users.lock().is_ok_and(|mut users| users.remove(&user));
        if !removed {
            return;
        }
        let handlers: Vec<Arc<UserRemovalHandler>> =
            self.handlers.lock().map(|handlers| handlers.clone()).unwrap_or_default();
        for handler in handlers {
            (**handler)(user);
        }
    }
}

impl UserDirectory for InMemoryUserDirectory {
    fn list_users(&self) -> Result<Vec<UserId>, StoreError> {
        Ok(lock(&self.users, "directory")?.iter().copied().collect())
    }

    fn subscribe_removals(&self, handler: UserRemovalHandler) {
        if let Ok(mut handlers) = self.handlers.lock() {
            handlers.push(Arc::new(handler));
        }
    }
}

// ============================================================================
// SECTION: Legacy Settings
// ============================================================================

/// Legacy values keyed by namespace, user and key. Global values ignore the
/// user.
#[derive(Debug, Default, Clone)]
pub struct InMemoryLegacySettings {
    /// Stored values.
    values: Arc<Mutex<LegacyValues>>,
}

impl InMemoryLegacySettings {
    /// Creates an empty legacy store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a legacy value.
    pub fn set(&self, namespace: Namespace, user: UserId, key: &str, value: &str) {
        if let Ok(mut values) = self.values.lock() {
            let owner = Self::owner(namespace, user);
            values.insert((namespace, owner, key.to_string()), value.to_string());
        }
    }

    /// Legacy global values were device-wide.
    const fn owner(namespace: Namespace, user: UserId) -> UserId {
        match namespace {
            Namespace::Global => UserId::PRIMORDIAL,
            Namespace::System | Namespace::Secure => user,
        }
    }
}

impl LegacySettingsSource for InMemoryLegacySettings {
    fn read(
        &self,
        namespace: Namespace,
        user: UserId,
        key: &str,
    ) -> Result<Option<String>, StoreError> {
        let values = lock(&self.values, "legacy")?;
        Ok(values.get(&(namespace, Self::owner(namespace, user), key.to_string())).cloned())
    }
}
