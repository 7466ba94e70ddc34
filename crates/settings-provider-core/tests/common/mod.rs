// crates/settings-provider-core/tests/common/mod.rs
// ============================================================================
// Module: Common Test Fixtures
// Description: Shared provider harness for settings core tests.
// Purpose: Build providers over in-memory collaborators with known callers.
// Dependencies: settings-provider-core
// ============================================================================

//! ## Overview
//! Builds a [`SettingsProvider`] wired to in-memory collaborators and exposes
//! handles to each so tests can inspect stored rows, change events, audit
//! records and the migration flag.

#![allow(dead_code, reason = "Shared test helpers may be unused in some cases.")]
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    reason = "Test-only helpers use unwrap/expect for clarity."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::sync::Mutex;

use settings_provider_core::Caller;
use settings_provider_core::Column;
use settings_provider_core::DefaultSetting;
use settings_provider_core::InMemoryLegacySettings;
use settings_provider_core::InMemoryStateStore;
use settings_provider_core::InMemoryStorageEngine;
use settings_provider_core::InMemoryUserDirectory;
use settings_provider_core::LegacyKeys;
use settings_provider_core::Lookup;
use settings_provider_core::Namespace;
use settings_provider_core::PermissionNames;
use settings_provider_core::ProviderCollaborators;
use settings_provider_core::ProviderConfig;
use settings_provider_core::RecordingChangeBus;
use settings_provider_core::Selection;
use settings_provider_core::SettingRow;
use settings_provider_core::SettingsProvider;
use settings_provider_core::SettingsUri;
use settings_provider_core::StaticPermissionOracle;
use settings_provider_core::UserId;
use settings_provider_core::Validator;
use settings_provider_core::ValidatorRegistry;
use settings_provider_core::runtime::AuditSink;
use settings_provider_core::runtime::MigrationAuditEvent;
use settings_provider_core::runtime::MutationAuditEvent;
use settings_provider_core::runtime::PermissionAuditEvent;

// ============================================================================
// SECTION: Callers
// ============================================================================

/// Principal without any grants.
pub const APP: &str = "com.example.app";
/// Principal holding every provider permission.
pub const PRIVILEGED: &str = "com.example.privileged";

/// Unprivileged caller acting as `user`.
pub fn app(user: u32) -> Caller {
    Caller::external(APP, UserId::new(user))
}

/// Fully privileged caller acting as `user`.
pub fn privileged(user: u32) -> Caller {
    Caller::external(PRIVILEGED, UserId::new(user))
}

// ============================================================================
// SECTION: Audit Recorder
// ============================================================================

/// Audit sink that keeps every event.
#[derive(Default)]
pub struct RecordingAuditSink {
    /// Mutation events.
    pub mutations: Mutex<Vec<MutationAuditEvent>>,
    /// Permission denial events.
    pub denials: Mutex<Vec<PermissionAuditEvent>>,
    /// Migration events.
    pub migrations: Mutex<Vec<MigrationAuditEvent>>,
}

impl AuditSink for RecordingAuditSink {
    fn record_mutation(&self, event: &MutationAuditEvent) {
        self.mutations.lock().unwrap().push(event.clone());
    }

    fn record_permission(&self, event: &PermissionAuditEvent) {
        self.denials.lock().unwrap().push(event.clone());
    }

    fn record_migration(&self, event: &MigrationAuditEvent) {
        self.migrations.lock().unwrap().push(event.clone());
    }
}

// ============================================================================
// SECTION: Harness
// ============================================================================

/// Provider plus handles to its collaborators.
pub struct Harness {
    /// Provider under test.
    pub provider: Arc<SettingsProvider>,
    /// Storage engine.
    pub engine: InMemoryStorageEngine,
    /// Migration flag and versions.
    pub state: InMemoryStateStore,
    /// Grant table.
    pub oracle: StaticPermissionOracle,
    /// Published events.
    pub bus: RecordingChangeBus,
    /// User list.
    pub directory: InMemoryUserDirectory,
    /// Legacy values.
    pub legacy: InMemoryLegacySettings,
    /// Audit records.
    pub audit: Arc<RecordingAuditSink>,
}

/// System validators used by the fixtures.
pub fn validators() -> ValidatorRegistry {
    ValidatorRegistry::new()
        .with("screen_brightness", Validator::IntegerRange {
            min: 0,
            max: 255,
        })
        .with("haptic_feedback_enabled", Validator::Boolean)
        .with("ringtone", Validator::Any)
        .with("font_scale", Validator::NonEmpty)
}

/// Default provider configuration for tests.
pub fn config() -> ProviderConfig {
    ProviderConfig {
        validators: validators(),
        legacy_keys: LegacyKeys {
            system: vec!["screen_brightness".to_string(), "ringtone".to_string()],
            secure: vec!["location_providers_allowed".to_string()],
            global: vec!["adb_enabled".to_string(), "wifi_on".to_string()],
        },
        ..ProviderConfig::default()
    }
}

/// Config with one default row per namespace.
pub fn config_with_defaults() -> ProviderConfig {
    ProviderConfig {
        defaults: vec![
            DefaultSetting {
                namespace: Namespace::System,
                row: SettingRow::new("screen_brightness", Some("102".to_string())),
            },
            DefaultSetting {
                namespace: Namespace::Secure,
                row: SettingRow::new("install_non_market_apps", Some("0".to_string())),
            },
            DefaultSetting {
                namespace: Namespace::Global,
                row: SettingRow::new("auto_time", Some("1".to_string())),
            },
        ],
        ..config()
    }
}

/// Harness with the default test configuration.
pub fn harness() -> Harness {
    harness_with(config())
}

/// Harness with `config`; [`PRIVILEGED`] holds every permission.
pub fn harness_with(config: ProviderConfig) -> Harness {
    let names: PermissionNames = config.permissions.clone();
    let engine = InMemoryStorageEngine::new();
    let state = InMemoryStateStore::new();
    let oracle = StaticPermissionOracle::new();
    oracle.grant(PRIVILEGED, &names.write_settings);
    oracle.grant(PRIVILEGED, &names.write_secure_settings);
    oracle.grant(PRIVILEGED, &names.interact_across_users);
    let bus = RecordingChangeBus::new();
    let directory = InMemoryUserDirectory::new();
    let legacy = InMemoryLegacySettings::new();
    let audit = Arc::new(RecordingAuditSink::default());
    let provider = SettingsProvider::start(config, ProviderCollaborators {
        engine: Arc::new(engine.clone()),
        state: Arc::new(state.clone()),
        permissions: Arc::new(oracle.clone()),
        bus: Arc::new(bus.clone()),
        directory: Arc::new(directory.clone()),
        legacy: Arc::new(legacy.clone()),
        audit: Arc::clone(&audit) as Arc<dyn AuditSink>,
    })
    .expect("provider starts");
    Harness {
        provider,
        engine,
        state,
        oracle,
        bus,
        directory,
        legacy,
        audit,
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Collection identifier text for `namespace`.
pub fn collection(namespace: Namespace) -> String {
    SettingsUri::collection(namespace).to_string()
}

/// Item identifier text.
pub fn item(namespace: Namespace, name: &str) -> String {
    SettingsUri::item(namespace, name).to_string()
}

/// Number of rows `caller` sees in `namespace`.
pub fn row_count(harness: &Harness, caller: &Caller, namespace: Namespace) -> usize {
    harness
        .provider
        .query(caller, &collection(namespace), &[], &Selection::none(), None)
        .unwrap()
        .len()
}

/// Reads one setting as `caller` sees it.
pub fn lookup(harness: &Harness, caller: &Caller, namespace: Namespace, name: &str) -> Lookup {
    let rows = harness
        .provider
        .query(caller, &item(namespace, name), &[Column::Value], &Selection::none(), None)
        .unwrap();
    match rows.cell(0, Column::Value) {
        None => Lookup::Missing,
        Some(cell) => cell.as_text().map_or(Lookup::FoundNull, |text| Lookup::Found(text.to_string())),
    }
}
