// crates/settings-provider-core/src/runtime/mod.rs
// ============================================================================
// Module: Settings Runtime
// Description: Provider facade, routing, stores, migration and notification.
// Purpose: Execute settings requests against the external collaborators.
// Dependencies: crate::{core, interfaces}, tracing
// ============================================================================

//! ## Overview
//! Runtime modules implement the settings provider. Every external entry
//! point goes through [`SettingsProvider`], which composes the router, the
//! per-user store manager, the change notifier and the migration engine.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod audit;
pub mod manager;
pub mod memory;
pub mod migration;
pub mod notifier;
pub mod provider;
pub mod router;
pub mod table;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use audit::AuditSink;
pub use audit::FileAuditSink;
pub use audit::MigrationAuditEvent;
pub use audit::MigrationScope;
pub use audit::MutationAuditEvent;
pub use audit::MutationOperation;
pub use audit::NoopAuditSink;
pub use audit::PermissionAuditEvent;
pub use audit::StderrAuditSink;
pub use manager::StoreManager;
pub use memory::InMemoryLegacySettings;
pub use memory::InMemorySettingsDatabase;
pub use memory::InMemoryStateStore;
pub use memory::InMemoryStorageEngine;
pub use memory::InMemoryUserDirectory;
pub use memory::RecordingChangeBus;
pub use memory::StaticPermissionOracle;
pub use migration::LegacyKeys;
pub use migration::MigrationEngine;
pub use migration::MigrationOutcome;
pub use migration::MigrationReport;
pub use migration::MigrationSink;
pub use notifier::ChangeNotice;
pub use notifier::ChangeNotifier;
pub use provider::CallArgs;
pub use provider::CallMethod;
pub use provider::CallResponse;
pub use provider::ProviderCollaborators;
pub use provider::ProviderConfig;
pub use provider::SettingsProvider;
pub use router::PermissionNames;
pub use router::Router;
pub use table::TableStore;
pub use table::UserStore;
