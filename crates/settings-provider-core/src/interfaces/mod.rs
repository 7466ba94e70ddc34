// crates/settings-provider-core/src/interfaces/mod.rs
// ============================================================================
// Module: Settings Interfaces
// Description: Contracts for storage, permissions, notification and users.
// Purpose: Define the collaborator surfaces consumed by the settings runtime.
// Dependencies: crate::core, thiserror
// ============================================================================

//! ## Overview
//! The settings runtime never talks to a database, a permission system or a
//! broadcast bus directly. It consumes the traits below, which deployments
//! implement against their own infrastructure. Storage receives an
//! engine-agnostic [`TableSchema`] and bound [`Predicate`]s; it never receives
//! query text from the runtime.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use thiserror::Error;

use crate::core::Namespace;
use crate::core::Predicate;
use crate::core::RowUpdate;
use crate::core::SettingRecord;
use crate::core::SettingRow;
use crate::core::SettingsUri;
use crate::core::SortOrder;
use crate::core::identifiers::Caller;
use crate::core::identifiers::UserId;

// ============================================================================
// SECTION: Storage Errors
// ============================================================================

/// Storage engine errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Store I/O error.
    #[error("settings store io error: {0}")]
    Io(String),
    /// Store engine reported an error; the transaction was rolled back.
    #[error("settings store db error: {0}")]
    Db(String),
    /// Store data is corrupted or fails integrity checks.
    #[error("settings store corruption: {0}")]
    Corrupt(String),
    /// Store schema version is incompatible.
    #[error("settings store version mismatch: {0}")]
    VersionMismatch(String),
    /// Request or stored data is invalid.
    #[error("settings store invalid data: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Schema
// ============================================================================

/// Engine-agnostic description of one namespace table.
///
/// # Invariants
/// - `unique_column` is unique with replace-on-conflict semantics.
/// - `id_column` is an autoincrement integer key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSchema {
    /// Table name.
    pub table: &'static str,
    /// Autoincrement row id column.
    pub id_column: &'static str,
    /// Unique, indexed name column.
    pub unique_column: &'static str,
    /// Nullable value column.
    pub value_column: &'static str,
    /// Secondary index over `unique_column`.
    pub index_name: String,
}

impl TableSchema {
    /// Returns the schema of `namespace`'s table.
    #[must_use]
    pub fn for_namespace(namespace: Namespace) -> Self {
        let table = namespace.as_str();
        Self {
            table,
            id_column: "_id",
            unique_column: "name",
            value_column: "value",
            index_name: format!("{table}_name_index"),
        }
    }
}

/// Row loaded into a freshly created store without overwriting existing rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefaultSetting {
    /// Target namespace.
    pub namespace: Namespace,
    /// Default row.
    pub row: SettingRow,
}

// ============================================================================
// SECTION: Storage Engine
// ============================================================================

/// Transactional table store for one user.
///
/// # Invariants
/// - Every method runs in exactly one atomic transaction.
/// - `insert` and `insert_batch` replace rows whose name already exists.
pub trait SettingsDatabase: Send + Sync {
    /// Creates missing tables and loads `defaults` with insert-or-ignore.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when creation fails; nothing is committed.
    fn initialize(
        &self,
        schemas: &[TableSchema],
        defaults: &[DefaultSetting],
    ) -> Result<(), StoreError>;

    /// Inserts or replaces one row and returns its new row id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the write fails.
    fn insert(&self, table: &str, row: &SettingRow) -> Result<i64, StoreError>;

    /// Inserts or replaces all rows atomically and returns the count written.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when any row fails; no row is committed.
    fn insert_batch(&self, table: &str, rows: &[SettingRow]) -> Result<usize, StoreError>;

    /// Returns matching rows in `sort` order (row id order when `None`).
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the read fails.
    fn select(
        &self,
        table: &str,
        predicate: Option<&Predicate>,
        sort: Option<&SortOrder>,
    ) -> Result<Vec<SettingRecord>, StoreError>;

    /// Applies `update` to matching rows and returns the affected count.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the write fails.
    fn update(
        &self,
        table: &str,
        update: &RowUpdate,
        predicate: Option<&Predicate>,
    ) -> Result<usize, StoreError>;

    /// Deletes matching rows and returns the affected count.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the write fails.
    fn delete(&self, table: &str, predicate: &Predicate) -> Result<usize, StoreError>;
}

/// Opens per-user databases.
pub trait StorageEngine: Send + Sync {
    /// Opens (creating if needed) the database backing `user`'s store.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the database cannot be opened.
    fn open(&self, user: UserId) -> Result<Arc<dyn SettingsDatabase>, StoreError>;
}

// ============================================================================
// SECTION: Provider State
// ============================================================================

/// Persisted process-wide provider state.
pub trait ProviderStateStore: Send + Sync {
    /// Returns true once a full migration pass has completed.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the flag cannot be read.
    fn migration_complete(&self) -> Result<bool, StoreError>;

    /// Persists the migration completion flag.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the flag cannot be written.
    fn mark_migration_complete(&self) -> Result<(), StoreError>;

    /// Returns the change version of `namespace` (0 when never bumped).
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the version cannot be read.
    fn change_version(&self, namespace: Namespace) -> Result<u64, StoreError>;

    /// Persists the change version of `namespace`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the version cannot be written.
    fn set_change_version(&self, namespace: Namespace, version: u64) -> Result<(), StoreError>;
}

// ============================================================================
// SECTION: Permissions
// ============================================================================

/// External authorization oracle.
pub trait PermissionOracle: Send + Sync {
    /// Returns true when `caller` holds `permission`.
    fn has_permission(&self, caller: &Caller, permission: &str) -> bool;
}

// ============================================================================
// SECTION: Change Bus
// ============================================================================

/// Audience of a change event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeScope {
    /// Observers of one user.
    User(UserId),
    /// Observers of every user.
    AllUsers,
}

/// Process-wide change broadcast.
pub trait ChangeBus: Send + Sync {
    /// Publishes a change to `uri` for `scope`.
    fn publish(&self, scope: ChangeScope, uri: &SettingsUri);
}

// ============================================================================
// SECTION: User Directory
// ============================================================================

/// Callback invoked when a user is removed.
pub type UserRemovalHandler = Box<dyn Fn(UserId) + Send + Sync>;

/// Source of known users and user removals.
pub trait UserDirectory: Send + Sync {
    /// Lists every existing user.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the directory cannot be read.
    fn list_users(&self) -> Result<Vec<UserId>, StoreError>;

    /// Registers `handler` for user removals.
    fn subscribe_removals(&self, handler: UserRemovalHandler);
}

// ============================================================================
// SECTION: Legacy Settings
// ============================================================================

/// Read-only source of pre-migration setting values.
pub trait LegacySettingsSource: Send + Sync {
    /// Reads `key` for `user` in the legacy store (`None` when never set).
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the legacy store cannot be read.
    fn read(
        &self,
        namespace: Namespace,
        user: UserId,
        key: &str,
    ) -> Result<Option<String>, StoreError>;
}
