// crates/settings-provider-core/src/runtime/migration.rs
// ============================================================================
// Module: Migration Engine
// Description: One-time copy of legacy settings into the namespaced store.
// Purpose: Migrate every user exactly once, guarded by a persisted flag.
// Dependencies: crate::{core, interfaces, runtime::audit}, tracing
// ============================================================================

//! ## Overview
//! Legacy settings live in a flat key space outside the namespaced store. The
//! migration engine reads every known legacy key for a user and writes one
//! batch per namespace through the provider's bulk-insert path. Because rows
//! are inserted with replace-on-conflict, migrating a user twice leaves the
//! same rows as migrating once.
//!
//! The full pass (check flag, migrate all users, set flag) runs inside one
//! critical section, so concurrent callers never both perform a pass; later
//! callers observe the flag already set.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::sync::Mutex;
use std::time::Instant;

use tracing::debug;
use tracing::info;

use crate::core::Namespace;
use crate::core::RowValues;
use crate::core::SettingsError;
use crate::core::UserId;
use crate::interfaces::LegacySettingsSource;
use crate::interfaces::ProviderStateStore;
use crate::interfaces::UserDirectory;
use crate::runtime::audit::AuditSink;
use crate::runtime::audit::MigrationAuditEvent;
use crate::runtime::audit::MigrationAuditEventParams;
use crate::runtime::audit::MigrationScope;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Legacy keys copied into each namespace.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LegacyKeys {
    /// Keys copied into the system namespace.
    pub system: Vec<String>,
    /// Keys copied into the secure namespace.
    pub secure: Vec<String>,
    /// Keys copied into the global namespace.
    pub global: Vec<String>,
}

impl LegacyKeys {
    /// Returns the keys for `namespace`.
    #[must_use]
    pub fn keys(&self, namespace: Namespace) -> &[String] {
        match namespace {
            Namespace::System => &self.system,
            Namespace::Secure => &self.secure,
            Namespace::Global => &self.global,
        }
    }
}

/// Destination of migrated rows.
pub trait MigrationSink {
    /// Bulk inserts `rows` into `namespace` for `user`; returns rows written.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError`] when the request is rejected before writing.
    fn bulk_insert_for_user(
        &self,
        user: UserId,
        namespace: Namespace,
        rows: &[RowValues],
    ) -> Result<usize, SettingsError>;
}

/// Rows migrated for one user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationReport {
    /// Migrated user.
    pub user: UserId,
    /// Rows written per namespace.
    pub rows: Vec<(Namespace, usize)>,
}

impl MigrationReport {
    /// Returns the total rows written.
    #[must_use]
    pub fn total(&self) -> usize {
        self.rows.iter().map(|(_, count)| count).sum()
    }
}

/// Result of a full-pass request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrationOutcome {
    /// The flag was already set; nothing ran.
    AlreadyMigrated,
    /// A full pass ran and set the flag.
    Migrated {
        /// Per-user reports in migration order.
        reports: Vec<MigrationReport>,
    },
}

/// Runs legacy migrations.
pub struct MigrationEngine {
    /// Persisted migration flag.
    state: Arc<dyn ProviderStateStore>,
    /// Known users.
    directory: Arc<dyn UserDirectory>,
    /// Legacy values.
    legacy: Arc<dyn LegacySettingsSource>,
    /// Keys to copy.
    keys: LegacyKeys,
    /// Audit sink.
    audit: Arc<dyn AuditSink>,
    /// Serializes full passes.
    pass_lock: Mutex<()>,
}

// ============================================================================
// SECTION: Implementation
// ============================================================================

impl MigrationEngine {
    /// Creates an engine.
    #[must_use]
    pub fn new(
        state: Arc<dyn ProviderStateStore>,
        directory: Arc<dyn UserDirectory>,
        legacy: Arc<dyn LegacySettingsSource>,
        keys: LegacyKeys,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            state,
            directory,
            legacy,
            keys,
            audit,
            pass_lock: Mutex::new(()),
        }
    }

    /// Returns true once a full pass has completed.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::StorageFailure`] when the flag cannot be read.
    pub fn is_complete(&self) -> Result<bool, SettingsError> {
        Ok(self.state.migration_complete()?)
    }

    /// Migrates every known user unless the flag is already set.
    ///
    /// The flag is set only after every user migrated completely.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError`] when listing users, reading legacy values or
    /// writing any batch fails; the flag stays unset.
    pub fn migrate_if_needed(
        &self,
        sink: &dyn MigrationSink,
    ) -> Result<MigrationOutcome, SettingsError> {
        let _guard = self
            .pass_lock
            .lock()
            .map_err(|_| SettingsError::StorageFailure("migration mutex poisoned".to_string()))?;
        if self.state.migration_complete()? {
            return Ok(MigrationOutcome::AlreadyMigrated);
        }
        let mut users = self.directory.list_users()?;
        users.push(UserId::PRIMORDIAL);
        users.sort_unstable();
        users.dedup();
        let mut reports = Vec::with_capacity(users.len());
        for user in users {
            reports.push(self.run(user, sink, MigrationScope::FullPass)?);
        }
        self.state.mark_migration_complete()?;
        info!(users = reports.len(), "legacy settings migration complete");
        Ok(MigrationOutcome::Migrated {
            reports,
        })
    }

    /// Migrates one user. Safe to repeat.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError`] when reading legacy values or writing any
    /// batch fails.
    pub fn migrate_user(
        &self,
        user: UserId,
        sink: &dyn MigrationSink,
    ) -> Result<MigrationReport, SettingsError> {
        self.run(user, sink, MigrationScope::SingleUser)
    }

    /// Copies every namespace's legacy keys for `user`; global rows land in
    /// the primordial user's store.
    fn run(
        &self,
        user: UserId,
        sink: &dyn MigrationSink,
        scope: MigrationScope,
    ) -> Result<MigrationReport, SettingsError> {
        let started = Instant::now();
        let mut report = MigrationReport {
            user,
            rows: Vec::new(),
        };
        for namespace in Namespace::ALL {
            let keys = self.keys.keys(namespace);
            if keys.is_empty() {
                continue;
            }
            let owner = namespace.rules().owner_for(user);
            let mut rows = Vec::with_capacity(keys.len());
            for key in keys {
                let value = self.legacy.read(namespace, owner, key)?;
                rows.push(RowValues::setting(key.clone(), value));
            }
            let written = sink.bulk_insert_for_user(owner, namespace, &rows)?;
            if written < rows.len() {
                return Err(SettingsError::StorageFailure(format!(
                    "migration of {namespace} for user {user} wrote {written} of {} rows",
                    rows.len()
                )));
            }
            debug!(
                user = %user,
                owner = %owner,
                namespace = %namespace,
                rows = written,
                "migrated legacy settings"
            );
            report.rows.push((namespace, written));
        }
        self.audit.record_migration(&MigrationAuditEvent::new(MigrationAuditEventParams {
            scope,
            user,
            migrated_rows: report.total(),
            elapsed_ms: started.elapsed().as_millis(),
        }));
        Ok(report)
    }
}
