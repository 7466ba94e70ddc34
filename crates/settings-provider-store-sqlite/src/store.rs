// crates/settings-provider-store-sqlite/src/store.rs
// ============================================================================
// Module: SQLite Settings Store
// Description: Per-user settings databases backed by SQLite.
// Purpose: Persist namespace tables with replace-on-conflict names.
// Dependencies: settings-provider-core, rusqlite, serde, thiserror, tracing
// ============================================================================

//! ## Overview
//! This module implements [`StorageEngine`] and [`SettingsDatabase`] with
//! `SQLite`. Each user owns one database file; the primordial user's lives at
//! `<root>/settings.db` and every other user's at
//! `<root>/users/<id>/settings.db`. Every operation runs in exactly one
//! transaction on a mutex-guarded connection, so a failed batch leaves no
//! partial rows behind.
//!
//! Each file records its schema version in `store_meta`. Older files are
//! upgraded in place and reseeded with defaults (insert-or-ignore); newer
//! files fail closed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::time::Duration;

use rusqlite::Connection;
use rusqlite::OpenFlags;
use rusqlite::OptionalExtension;
use rusqlite::Transaction;
use rusqlite::params;
use rusqlite::params_from_iter;
use serde::Deserialize;
use settings_provider_core::DefaultSetting;
use settings_provider_core::Namespace;
use settings_provider_core::Predicate;
use settings_provider_core::RowUpdate;
use settings_provider_core::SettingRecord;
use settings_provider_core::SettingRow;
use settings_provider_core::SettingsDatabase;
use settings_provider_core::SortOrder;
use settings_provider_core::StorageEngine;
use settings_provider_core::StoreError;
use settings_provider_core::TableSchema;
use settings_provider_core::UserId;
use thiserror::Error;
use tracing::debug;
use tracing::info;

use crate::sql;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Current settings database schema version.
pub const SCHEMA_VERSION: i64 = 2;
/// Database file name inside a user directory.
pub const DATABASE_FILE: &str = "settings.db";
/// Directory holding secondary users' databases.
pub const USERS_DIR: &str = "users";
/// Default busy timeout (ms).
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;

// ============================================================================
// SECTION: Config
// ============================================================================

/// `SQLite` journal mode configuration.
///
/// # Invariants
/// - Values map 1:1 to `SQLite` `journal_mode` pragma settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteStoreMode {
    /// WAL journal mode (recommended).
    #[default]
    Wal,
    /// Delete journal mode.
    Delete,
}

impl SqliteStoreMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Wal => "wal",
            Self::Delete => "delete",
        }
    }
}

/// `SQLite` sync mode configuration.
///
/// # Invariants
/// - Values map 1:1 to `SQLite` `synchronous` pragma settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteSyncMode {
    /// Full synchronous mode (safest).
    #[default]
    Full,
    /// Normal synchronous mode.
    Normal,
}

impl SqliteSyncMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Normal => "normal",
        }
    }
}

/// Configuration shared by the settings databases and the state store.
///
/// # Invariants
/// - `root` is a directory; database files are created beneath it.
/// - `busy_timeout_ms` is interpreted as milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SqliteStoreConfig {
    /// Root directory for every database file.
    pub root: PathBuf,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: SqliteStoreMode,
    /// `SQLite` sync mode.
    #[serde(default)]
    pub sync_mode: SqliteSyncMode,
}

impl SqliteStoreConfig {
    /// Creates a config rooted at `root` with default tuning.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            journal_mode: SqliteStoreMode::default(),
            sync_mode: SqliteSyncMode::default(),
        }
    }

    /// Returns the database path for `user`.
    #[must_use]
    pub fn database_path(&self, user: UserId) -> PathBuf {
        if user.is_primordial() {
            self.root.join(DATABASE_FILE)
        } else {
            self.root.join(USERS_DIR).join(user.to_string()).join(DATABASE_FILE)
        }
    }
}

/// Returns the default busy timeout for `SQLite` connections.
const fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// `SQLite` store errors.
///
/// # Invariants
/// - Error messages avoid embedding setting values.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SqliteStoreError {
    /// Store I/O error.
    #[error("sqlite store io error: {0}")]
    Io(String),
    /// `SQLite` engine error.
    #[error("sqlite store db error: {0}")]
    Db(String),
    /// Stored data failed integrity checks.
    #[error("sqlite store corruption: {0}")]
    Corrupt(String),
    /// Store schema version mismatch.
    #[error("sqlite store version mismatch: {0}")]
    VersionMismatch(String),
    /// Invalid request or configuration.
    #[error("sqlite store invalid data: {0}")]
    Invalid(String),
}

impl From<SqliteStoreError> for StoreError {
    fn from(error: SqliteStoreError) -> Self {
        match error {
            SqliteStoreError::Io(message) => Self::Io(message),
            SqliteStoreError::Db(message) => Self::Db(message),
            SqliteStoreError::Corrupt(message) => Self::Corrupt(message),
            SqliteStoreError::VersionMismatch(message) => Self::VersionMismatch(message),
            SqliteStoreError::Invalid(message) => Self::Invalid(message),
        }
    }
}

// ============================================================================
// SECTION: Engine
// ============================================================================

/// Opens one `SQLite` database per user under a shared root.
#[derive(Debug, Clone)]
pub struct SqliteStorageEngine {
    /// Store configuration.
    config: SqliteStoreConfig,
}

impl SqliteStorageEngine {
    /// Creates an engine; databases are opened lazily per user.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the root is unusable.
    pub fn new(config: SqliteStoreConfig) -> Result<Self, SqliteStoreError> {
        validate_store_path(&config.root)?;
        if config.root.is_file() {
            return Err(SqliteStoreError::Invalid(
                "store root must be a directory, not a file".to_string(),
            ));
        }
        std::fs::create_dir_all(&config.root).map_err(|err| SqliteStoreError::Io(err.to_string()))?;
        Ok(Self {
            config,
        })
    }

    /// Returns the engine configuration.
    #[must_use]
    pub const fn config(&self) -> &SqliteStoreConfig {
        &self.config
    }
}

impl StorageEngine for SqliteStorageEngine {
    fn open(&self, user: UserId) -> Result<Arc<dyn SettingsDatabase>, StoreError> {
        let path = self.config.database_path(user);
        let database = SqliteSettingsDatabase::open(&path, &self.config)?;
        debug!(user = %user, path = %path.display(), "opened sqlite settings database");
        Ok(Arc::new(database))
    }
}

// ============================================================================
// SECTION: Database
// ============================================================================

/// One user's settings database.
///
/// # Invariants
/// - Connection access is serialized through a mutex.
/// - Every public operation commits or rolls back one transaction.
pub struct SqliteSettingsDatabase {
    /// Database file path.
    path: PathBuf,
    /// Guarded connection.
    connection: Mutex<Connection>,
}

impl SqliteSettingsDatabase {
    /// Opens (creating if needed) the database at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the path is unsafe or the database
    /// cannot be opened.
    pub fn open(path: &Path, config: &SqliteStoreConfig) -> Result<Self, SqliteStoreError> {
        validate_store_path(path)?;
        ensure_parent_dir(path)?;
        let connection = open_connection(path, config)?;
        Ok(Self {
            path: path.to_path_buf(),
            connection: Mutex::new(connection),
        })
    }

    /// Returns the database file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the recorded schema version, if the database was initialized.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the version cannot be read.
    pub fn schema_version(&self) -> Result<Option<i64>, SqliteStoreError> {
        let mut connection = self.lock()?;
        let tx = connection.transaction().map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        let version = read_schema_version(&tx)?;
        tx.commit().map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        Ok(version)
    }

    /// Locks the connection.
    fn lock(&self) -> Result<MutexGuard<'_, Connection>, SqliteStoreError> {
        self.connection
            .lock()
            .map_err(|_| SqliteStoreError::Io("sqlite connection mutex poisoned".to_string()))
    }

    /// Runs `operation` inside one transaction, committing on success.
    fn with_transaction<T>(
        &self,
        operation: impl FnOnce(&Transaction<'_>) -> Result<T, SqliteStoreError>,
    ) -> Result<T, SqliteStoreError> {
        let mut connection = self.lock()?;
        let tx = connection.transaction().map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        let value = operation(&tx)?;
        tx.commit().map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        Ok(value)
    }

    /// Creates tables and applies upgrades.
    fn initialize_schema(
        &self,
        schemas: &[TableSchema],
        defaults: &[DefaultSetting],
    ) -> Result<(), SqliteStoreError> {
        self.with_transaction(|tx| {
            tx.execute_batch("CREATE TABLE IF NOT EXISTS store_meta (version INTEGER NOT NULL);")
                .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
            let seed = match read_schema_version(tx)? {
                None => {
                    tx.execute("INSERT INTO store_meta (version) VALUES (?1)", params![
                        SCHEMA_VERSION
                    ])
                    .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
                    true
                }
                Some(version) if version == SCHEMA_VERSION => false,
                Some(version) if (1 .. SCHEMA_VERSION).contains(&version) => {
                    tx.execute("UPDATE store_meta SET version = ?1", params![SCHEMA_VERSION])
                        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
                    info!(
                        path = %self.path.display(),
                        from = version,
                        to = SCHEMA_VERSION,
                        "upgraded sqlite settings schema"
                    );
                    true
                }
                Some(version) => {
                    return Err(SqliteStoreError::VersionMismatch(format!(
                        "unsupported schema version: {version}"
                    )));
                }
            };
            let mut created = Vec::new();
            for schema in schemas {
                if !table_exists(tx, schema.table)? {
                    created.push(schema.table);
                }
                create_table(tx, schema)?;
            }
            for default in defaults {
                let table = default.namespace.as_str();
                let provisioned = schemas.iter().any(|schema| schema.table == table);
                if provisioned && (seed || created.contains(&table)) {
                    tx.execute(
                        &format!("INSERT OR IGNORE INTO \"{table}\" (name, value) VALUES (?1, ?2)"),
                        params![default.row.name, default.row.value],
                    )
                    .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
                }
            }
            Ok(())
        })
    }

    /// Inserts or replaces rows and returns the last row id.
    fn insert_rows(&self, table: &str, rows: &[SettingRow]) -> Result<i64, SqliteStoreError> {
        let table = known_table(table)?;
        self.with_transaction(|tx| {
            let mut stmt = tx
                .prepare_cached(&format!(
                    "INSERT OR REPLACE INTO \"{table}\" (name, value) VALUES (?1, ?2)"
                ))
                .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
            let mut last_id = 0;
            for row in rows {
                stmt.execute(params![row.name, row.value])
                    .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
                last_id = tx.last_insert_rowid();
            }
            Ok(last_id)
        })
    }

    /// Reads matching rows.
    fn select_rows(
        &self,
        table: &str,
        predicate: Option<&Predicate>,
        sort: Option<&SortOrder>,
    ) -> Result<Vec<SettingRecord>, SqliteStoreError> {
        let table = known_table(table)?;
        let condition = predicate.map(sql::condition);
        let filter = condition.as_ref().map_or_else(String::new, |c| format!(" WHERE {}", c.sql));
        let query =
            format!("SELECT _id, name, value FROM \"{table}\"{filter} {}", sql::order_by(sort));
        let params: Vec<String> = condition.map(|c| c.params).unwrap_or_default();
        self.with_transaction(|tx| {
            let mut stmt =
                tx.prepare_cached(&query).map_err(|err| SqliteStoreError::Db(err.to_string()))?;
            let rows = stmt
                .query_map(params_from_iter(params.iter()), |row| {
                    Ok(SettingRecord {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        value: row.get(2)?,
                    })
                })
                .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
            rows.collect::<Result<Vec<_>, _>>().map_err(|err| SqliteStoreError::Corrupt(err.to_string()))
        })
    }

    /// Updates matching rows.
    fn update_rows(
        &self,
        table: &str,
        update: &RowUpdate,
        predicate: Option<&Predicate>,
    ) -> Result<usize, SqliteStoreError> {
        let table = known_table(table)?;
        let mut assignments = Vec::new();
        let mut params: Vec<Option<String>> = Vec::new();
        if let Some(name) = &update.name {
            assignments.push("name = ?");
            params.push(Some(name.clone()));
        }
        if let Some(value) = &update.value {
            assignments.push("value = ?");
            params.push(value.clone());
        }
        if assignments.is_empty() {
            return Err(SqliteStoreError::Invalid("update sets no columns".to_string()));
        }
        let mut statement =
            format!("UPDATE OR REPLACE \"{table}\" SET {}", assignments.join(", "));
        if let Some(condition) = predicate.map(sql::condition) {
            statement.push_str(&format!(" WHERE {}", condition.sql));
            params.extend(condition.params.into_iter().map(Some));
        }
        self.with_transaction(|tx| {
            tx.execute(&statement, params_from_iter(params.iter()))
                .map_err(|err| SqliteStoreError::Db(err.to_string()))
        })
    }

    /// Deletes matching rows.
    fn delete_rows(&self, table: &str, predicate: &Predicate) -> Result<usize, SqliteStoreError> {
        let table = known_table(table)?;
        let condition = sql::condition(predicate);
        let statement = format!("DELETE FROM \"{table}\" WHERE {}", condition.sql);
        self.with_transaction(|tx| {
            tx.execute(&statement, params_from_iter(condition.params.iter()))
                .map_err(|err| SqliteStoreError::Db(err.to_string()))
        })
    }
}

impl SettingsDatabase for SqliteSettingsDatabase {
    fn initialize(
        &self,
        schemas: &[TableSchema],
        defaults: &[DefaultSetting],
    ) -> Result<(), StoreError> {
        self.initialize_schema(schemas, defaults).map_err(StoreError::from)
    }

    fn insert(&self, table: &str, row: &SettingRow) -> Result<i64, StoreError> {
        self.insert_rows(table, std::slice::from_ref(row)).map_err(StoreError::from)
    }

    fn insert_batch(&self, table: &str, rows: &[SettingRow]) -> Result<usize, StoreError> {
        self.insert_rows(table, rows).map(|_| rows.len()).map_err(StoreError::from)
    }

    fn select(
        &self,
        table: &str,
        predicate: Option<&Predicate>,
        sort: Option<&SortOrder>,
    ) -> Result<Vec<SettingRecord>, StoreError> {
        self.select_rows(table, predicate, sort).map_err(StoreError::from)
    }

    fn update(
        &self,
        table: &str,
        update: &RowUpdate,
        predicate: Option<&Predicate>,
    ) -> Result<usize, StoreError> {
        self.update_rows(table, update, predicate).map_err(StoreError::from)
    }

    fn delete(&self, table: &str, predicate: &Predicate) -> Result<usize, StoreError> {
        self.delete_rows(table, predicate).map_err(StoreError::from)
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Maps a table name onto a namespace table, rejecting anything else.
fn known_table(table: &str) -> Result<&'static str, SqliteStoreError> {
    Namespace::parse(table)
        .map(Namespace::as_str)
        .ok_or_else(|| SqliteStoreError::Invalid(format!("no such table: {table}")))
}

/// Reads the `store_meta` version.
fn read_schema_version(tx: &Transaction<'_>) -> Result<Option<i64>, SqliteStoreError> {
    let exists: bool = tx
        .query_row(
            "SELECT EXISTS (SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = \
             'store_meta')",
            params![],
            |row| row.get(0),
        )
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    if !exists {
        return Ok(None);
    }
    tx.query_row("SELECT version FROM store_meta LIMIT 1", params![], |row| row.get(0))
        .optional()
        .map_err(|err| SqliteStoreError::Db(err.to_string()))
}

/// Returns true when `table` already exists.
fn table_exists(tx: &Transaction<'_>, table: &str) -> Result<bool, SqliteStoreError> {
    tx.query_row(
        "SELECT EXISTS (SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1)",
        params![table],
        |row| row.get(0),
    )
    .map_err(|err| SqliteStoreError::Db(err.to_string()))
}

/// Creates a namespace table and its name index if missing.
fn create_table(tx: &Transaction<'_>, schema: &TableSchema) -> Result<(), SqliteStoreError> {
    let table = known_table(schema.table)?;
    tx.execute_batch(&format!(
        "CREATE TABLE IF NOT EXISTS \"{table}\" (
            \"{id}\" INTEGER PRIMARY KEY AUTOINCREMENT,
            \"{name}\" TEXT NOT NULL UNIQUE ON CONFLICT REPLACE,
            \"{value}\" TEXT
        );
        CREATE INDEX IF NOT EXISTS \"{index}\" ON \"{table}\" (\"{name}\");",
        id = schema.id_column,
        name = schema.unique_column,
        value = schema.value_column,
        index = schema.index_name,
    ))
    .map_err(|err| SqliteStoreError::Db(err.to_string()))
}

/// Ensures the parent directory for a database file exists.
pub(crate) fn ensure_parent_dir(path: &Path) -> Result<(), SqliteStoreError> {
    let Some(parent) = path.parent() else {
        return Err(SqliteStoreError::Io("store path missing parent directory".to_string()));
    };
    std::fs::create_dir_all(parent).map_err(|err| SqliteStoreError::Io(err.to_string()))
}

/// Validates store paths for safety limits.
pub(crate) fn validate_store_path(path: &Path) -> Result<(), SqliteStoreError> {
    if path.as_os_str().is_empty() {
        return Err(SqliteStoreError::Invalid("store path must not be empty".to_string()));
    }
    let path_string = path.display().to_string();
    if path_string.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(SqliteStoreError::Invalid("store path exceeds length limit".to_string()));
    }
    for component in path.components() {
        let name = component.as_os_str().to_string_lossy();
        if name.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(SqliteStoreError::Invalid(
                "store path contains an overlong component".to_string(),
            ));
        }
    }
    Ok(())
}

/// Opens an `SQLite` connection with the configured pragmas.
pub(crate) fn open_connection(
    path: &Path,
    config: &SqliteStoreConfig,
) -> Result<Connection, SqliteStoreError> {
    if path.is_dir() {
        return Err(SqliteStoreError::Invalid(
            "database path must be a file, not a directory".to_string(),
        ));
    }
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_FULL_MUTEX;
    let connection = Connection::open_with_flags(path, flags)
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    connection
        .execute_batch(&format!("PRAGMA journal_mode = {};", config.journal_mode.pragma_value()))
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    connection
        .execute_batch(&format!("PRAGMA synchronous = {};", config.sync_mode.pragma_value()))
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    connection
        .busy_timeout(Duration::from_millis(config.busy_timeout_ms))
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    Ok(connection)
}
