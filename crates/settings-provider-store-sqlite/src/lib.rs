// crates/settings-provider-store-sqlite/src/lib.rs
// ============================================================================
// Module: Settings Provider SQLite Store
// Description: SQLite storage engine and provider state store.
// Purpose: Durable backends for the settings provider collaborators.
// Dependencies: settings-provider-core, rusqlite
// ============================================================================

//! ## Overview
//! `SQLite` implementations of the settings provider's storage collaborators:
//! [`SqliteStorageEngine`] opens one database per user and
//! [`SqliteStateStore`] keeps the migration flag and change versions.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod sql;
pub mod state;
pub mod store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use state::STATE_FILE;
pub use state::SqliteStateStore;
pub use store::DATABASE_FILE;
pub use store::SCHEMA_VERSION;
pub use store::SqliteSettingsDatabase;
pub use store::SqliteStorageEngine;
pub use store::SqliteStoreConfig;
pub use store::SqliteStoreError;
pub use store::SqliteStoreMode;
pub use store::SqliteSyncMode;
pub use store::USERS_DIR;
