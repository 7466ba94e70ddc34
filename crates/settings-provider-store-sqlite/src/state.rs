// crates/settings-provider-store-sqlite/src/state.rs
// ============================================================================
// Module: SQLite Provider State
// Description: Durable migration flag and change version counters.
// Purpose: Keep process-wide provider state across restarts.
// Dependencies: settings-provider-core, rusqlite
// ============================================================================

//! ## Overview
//! [`SqliteStateStore`] persists the one-time migration flag and the
//! per-namespace change versions in `<root>/provider_state.db`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::path::PathBuf;
use std::sync::Mutex;
use std::sync::MutexGuard;

use rusqlite::Connection;
use rusqlite::OptionalExtension;
use rusqlite::params;
use settings_provider_core::Namespace;
use settings_provider_core::ProviderStateStore;
use settings_provider_core::StoreError;

use crate::store::SqliteStoreConfig;
use crate::store::SqliteStoreError;
use crate::store::ensure_parent_dir;
use crate::store::open_connection;
use crate::store::validate_store_path;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// State database file name under the store root.
pub const STATE_FILE: &str = "provider_state.db";
/// Flag key recording a completed migration pass.
const MIGRATION_FLAG: &str = "migration_complete";

// ============================================================================
// SECTION: State Store
// ============================================================================

/// `SQLite`-backed [`ProviderStateStore`].
pub struct SqliteStateStore {
    /// Database file path.
    path: PathBuf,
    /// Guarded connection.
    connection: Mutex<Connection>,
}

impl SqliteStateStore {
    /// Opens (creating if needed) the state database under `config.root`.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the database cannot be opened or its
    /// tables cannot be created.
    pub fn open(config: &SqliteStoreConfig) -> Result<Self, SqliteStoreError> {
        let path = config.root.join(STATE_FILE);
        validate_store_path(&path)?;
        ensure_parent_dir(&path)?;
        let connection = open_connection(&path, config)?;
        connection
            .execute_batch(
                "CREATE TABLE IF NOT EXISTS provider_flags (
                    key TEXT PRIMARY KEY,
                    value INTEGER NOT NULL
                );
                CREATE TABLE IF NOT EXISTS change_versions (
                    namespace TEXT PRIMARY KEY,
                    version INTEGER NOT NULL
                );",
            )
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        Ok(Self {
            path,
            connection: Mutex::new(connection),
        })
    }

    /// Returns the database file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Locks the connection.
    fn lock(&self) -> Result<MutexGuard<'_, Connection>, SqliteStoreError> {
        self.connection
            .lock()
            .map_err(|_| SqliteStoreError::Io("sqlite state mutex poisoned".to_string()))
    }

    /// Reads a stored version.
    fn read_version(&self, namespace: Namespace) -> Result<u64, SqliteStoreError> {
        let connection = self.lock()?;
        let stored: Option<i64> = connection
            .query_row(
                "SELECT version FROM change_versions WHERE namespace = ?1",
                params![namespace.as_str()],
                |row| row.get(0),
            )
            .optional()
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        stored.map_or(Ok(0), |version| {
            u64::try_from(version).map_err(|_| {
                SqliteStoreError::Corrupt(format!("negative change version for {namespace}"))
            })
        })
    }

    /// Writes a version.
    fn write_version(&self, namespace: Namespace, version: u64) -> Result<(), SqliteStoreError> {
        let version = i64::try_from(version)
            .map_err(|_| SqliteStoreError::Invalid("change version too large".to_string()))?;
        let connection = self.lock()?;
        connection
            .execute(
                "INSERT INTO change_versions (namespace, version) VALUES (?1, ?2) ON \
                 CONFLICT(namespace) DO UPDATE SET version = excluded.version",
                params![namespace.as_str(), version],
            )
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        Ok(())
    }
}

impl ProviderStateStore for SqliteStateStore {
    fn migration_complete(&self) -> Result<bool, StoreError> {
        let connection = self.lock()?;
        let flag: Option<i64> = connection
            .query_row("SELECT value FROM provider_flags WHERE key = ?1", params![MIGRATION_FLAG], |row| {
                row.get(0)
            })
            .optional()
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        Ok(flag.is_some_and(|value| value != 0))
    }

    fn mark_migration_complete(&self) -> Result<(), StoreError> {
        let connection = self.lock()?;
        connection
            .execute(
                "INSERT OR REPLACE INTO provider_flags (key, value) VALUES (?1, 1)",
                params![MIGRATION_FLAG],
            )
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        Ok(())
    }

    fn change_version(&self, namespace: Namespace) -> Result<u64, StoreError> {
        self.read_version(namespace).map_err(StoreError::from)
    }

    fn set_change_version(&self, namespace: Namespace, version: u64) -> Result<(), StoreError> {
        self.write_version(namespace, version).map_err(StoreError::from)
    }
}
