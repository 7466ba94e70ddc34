// crates/settings-provider-core/src/runtime/audit.rs
// ============================================================================
// Module: Settings Audit Logging
// Description: Structured audit events for settings mutations and migrations.
// Purpose: Emit JSON-line audit records without a hard logging dependency.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Audit events record who changed which namespace, which writes were denied
//! and what each migration copied. Sinks receive typed events and decide how
//! to persist them; the built-in sinks write one JSON object per line.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use serde::Serialize;

use crate::core::Namespace;
use crate::core::UserId;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Mutating operation classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationOperation {
    /// Single-row insert.
    Insert,
    /// Batch insert.
    BulkInsert,
    /// Row update.
    Update,
    /// Row delete.
    Delete,
    /// Single-value put call.
    Put,
}

/// Migration trigger classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MigrationScope {
    /// Part of the one-time pass over all users.
    FullPass,
    /// Explicit single-user migration.
    SingleUser,
}

/// Committed mutation audit payload.
#[derive(Debug, Clone, Serialize)]
pub struct MutationAuditEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Operation kind.
    pub operation: MutationOperation,
    /// Target namespace.
    pub namespace: Namespace,
    /// User whose store was written.
    pub user: UserId,
    /// Caller label.
    pub caller: String,
    /// Rows affected.
    pub affected_rows: usize,
    /// Change version after the bump, when persisted.
    pub change_version: Option<u64>,
}

/// Permission denial audit payload.
#[derive(Debug, Clone, Serialize)]
pub struct PermissionAuditEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Namespace the caller tried to write, when known.
    pub namespace: Option<Namespace>,
    /// Caller label.
    pub caller: String,
    /// Missing permission.
    pub permission: String,
}

/// Migration audit payload.
#[derive(Debug, Clone, Serialize)]
pub struct MigrationAuditEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Migration trigger.
    pub scope: MigrationScope,
    /// Migrated user.
    pub user: UserId,
    /// Rows written across namespaces.
    pub migrated_rows: usize,
    /// Wall-clock duration in milliseconds.
    pub elapsed_ms: u128,
}

/// Inputs required to construct a mutation audit event.
pub struct MutationAuditEventParams {
    /// Operation kind.
    pub operation: MutationOperation,
    /// Target namespace.
    pub namespace: Namespace,
    /// User whose store was written.
    pub user: UserId,
    /// Caller label.
    pub caller: String,
    /// Rows affected.
    pub affected_rows: usize,
    /// Change version after the bump, when persisted.
    pub change_version: Option<u64>,
}

/// Inputs required to construct a permission audit event.
pub struct PermissionAuditEventParams {
    /// Namespace the caller tried to write, when known.
    pub namespace: Option<Namespace>,
    /// Caller label.
    pub caller: String,
    /// Missing permission.
    pub permission: String,
}

/// Inputs required to construct a migration audit event.
pub struct MigrationAuditEventParams {
    /// Migration trigger.
    pub scope: MigrationScope,
    /// Migrated user.
    pub user: UserId,
    /// Rows written across namespaces.
    pub migrated_rows: usize,
    /// Wall-clock duration in milliseconds.
    pub elapsed_ms: u128,
}

/// Milliseconds since the epoch, zero if the clock is before it.
fn now_ms() -> u128 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis()
}

impl MutationAuditEvent {
    /// Creates a mutation audit event stamped with the current time.
    #[must_use]
    pub fn new(params: MutationAuditEventParams) -> Self {
        Self {
            event: "settings_mutation",
            timestamp_ms: now_ms(),
            operation: params.operation,
            namespace: params.namespace,
            user: params.user,
            caller: params.caller,
            affected_rows: params.affected_rows,
            change_version: params.change_version,
        }
    }
}

impl PermissionAuditEvent {
    /// Creates a permission audit event stamped with the current time.
    #[must_use]
    pub fn new(params: PermissionAuditEventParams) -> Self {
        Self {
            event: "settings_permission_denied",
            timestamp_ms: now_ms(),
            namespace: params.namespace,
            caller: params.caller,
            permission: params.permission,
        }
    }
}

impl MigrationAuditEvent {
    /// Creates a migration audit event stamped with the current time.
    #[must_use]
    pub fn new(params: MigrationAuditEventParams) -> Self {
        Self {
            event: "settings_migration",
            timestamp_ms: now_ms(),
            scope: params.scope,
            user: params.user,
            migrated_rows: params.migrated_rows,
            elapsed_ms: params.elapsed_ms,
        }
    }
}

// ============================================================================
// SECTION: Trait
// ============================================================================

/// Audit sink for settings events.
pub trait AuditSink: Send + Sync {
    /// Record a committed mutation.
    fn record_mutation(&self, event: &MutationAuditEvent);

    /// Record a permission denial.
    fn record_permission(&self, _event: &PermissionAuditEvent) {}

    /// Record a migration.
    fn record_migration(&self, _event: &MigrationAuditEvent) {}
}

/// Audit sink that logs JSON lines to stderr.
pub struct StderrAuditSink;

impl StderrAuditSink {
    /// Writes one event line to stderr.
    fn emit<T: Serialize>(event: &T) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(io::stderr(), "{payload}");
        }
    }
}

impl AuditSink for StderrAuditSink {
    fn record_mutation(&self, event: &MutationAuditEvent) {
        Self::emit(event);
    }

    fn record_permission(&self, event: &PermissionAuditEvent) {
        Self::emit(event);
    }

    fn record_migration(&self, event: &MigrationAuditEvent) {
        Self::emit(event);
    }
}

/// Audit sink that appends JSON lines to a file.
pub struct FileAuditSink {
    /// File handle used for append-only logging.
    file: Mutex<std::fs::File>,
}

impl FileAuditSink {
    /// Opens the audit log file in append mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn new(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }

    /// Appends one event line.
    fn emit<T: Serialize>(&self, event: &T) {
        if let Ok(payload) = serde_json::to_string(event)
            && let Ok(mut file) = self.file.lock()
        {
            let _ = writeln!(file, "{payload}");
            let _ = file.flush();
        }
    }
}

impl AuditSink for FileAuditSink {
    fn record_mutation(&self, event: &MutationAuditEvent) {
        self.emit(event);
    }

    fn record_permission(&self, event: &PermissionAuditEvent) {
        self.emit(event);
    }

    fn record_migration(&self, event: &MigrationAuditEvent) {
        self.emit(event);
    }
}

/// No-op audit sink.
pub struct NoopAuditSink;

impl AuditSink for NoopAuditSink {
    fn record_mutation(&self, _event: &MutationAuditEvent) {}
}

// ============================================================================
// SECTION: Tests
// ============================================================================
