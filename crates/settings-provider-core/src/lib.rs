// crates/settings-provider-core/src/lib.rs
// ============================================================================
// Module: Settings Provider Core Library
// Description: Public API surface for the multi-user settings provider.
// Purpose: Expose core types, collaborator interfaces and the runtime.
// Dependencies: crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! Settings provider core implements a per-user, namespaced key-value store
//! with permission-gated writes, change notification and one-time migration
//! of legacy values. Storage, authorization, broadcast and the user directory
//! are external collaborators reached through [`interfaces`]; the
//! [`runtime`] module ships in-memory versions of each.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use crate::core::*;

pub use interfaces::ChangeBus;
pub use interfaces::ChangeScope;
pub use interfaces::DefaultSetting;
pub use interfaces::LegacySettingsSource;
pub use interfaces::PermissionOracle;
pub use interfaces::ProviderStateStore;
pub use interfaces::SettingsDatabase;
pub use interfaces::StorageEngine;
pub use interfaces::StoreError;
pub use interfaces::TableSchema;
pub use interfaces::UserDirectory;
pub use interfaces::UserRemovalHandler;
pub use runtime::AuditSink;
pub use runtime::CallArgs;
pub use runtime::CallMethod;
pub use runtime::CallResponse;
pub use runtime::ChangeNotifier;
pub use runtime::FileAuditSink;
pub use runtime::InMemoryLegacySettings;
pub use runtime::InMemoryStateStore;
pub use runtime::InMemoryStorageEngine;
pub use runtime::InMemoryUserDirectory;
pub use runtime::LegacyKeys;
pub use runtime::MigrationOutcome;
pub use runtime::MigrationReport;
pub use runtime::NoopAuditSink;
pub use runtime::PermissionNames;
pub use runtime::ProviderCollaborators;
pub use runtime::ProviderConfig;
pub use runtime::RecordingChangeBus;
pub use runtime::Router;
pub use runtime::SettingsProvider;
pub use runtime::StaticPermissionOracle;
pub use runtime::StderrAuditSink;
pub use runtime::StoreManager;
