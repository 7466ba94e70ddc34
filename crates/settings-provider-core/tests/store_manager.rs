// crates/settings-provider-core/tests/store_manager.rs
// ============================================================================
// Module: Store Manager Tests
// Description: Lazy per-user store creation and eviction.
// Purpose: Validate single initialization, failure handling and provisioning.
// Dependencies: settings-provider-core
// ============================================================================
//! ## Overview
//! Exercises [`StoreManager`] against counting and failing engines.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions and helpers are permitted."
)]

use std::sync::Arc;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::thread;

use settings_provider_core::DefaultSetting;
use settings_provider_core::InMemoryStorageEngine;
use settings_provider_core::Lookup;
use settings_provider_core::Namespace;
use settings_provider_core::SettingRow;
use settings_provider_core::SettingsDatabase;
use settings_provider_core::SettingsError;
use settings_provider_core::StorageEngine;
use settings_provider_core::StoreError;
use settings_provider_core::StoreManager;
use settings_provider_core::UserId;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

/// Engine that counts opens before delegating.
#[derive(Default)]
struct CountingEngine {
    inner: InMemoryStorageEngine,
    opens: AtomicUsize,
}

impl StorageEngine for CountingEngine {
    fn open(&self, user: UserId) -> Result<Arc<dyn SettingsDatabase>, StoreError> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        self.inner.open(user)
    }
}

/// Engine whose first `failures` opens fail.
struct FlakyEngine {
    inner: InMemoryStorageEngine,
    failures: AtomicUsize,
}

impl StorageEngine for FlakyEngine {
    fn open(&self, user: UserId) -> Result<Arc<dyn SettingsDatabase>, StoreError> {
        let remaining = self.failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failures.store(remaining - 1, Ordering::SeqCst);
            return Err(StoreError::Io("disk unavailable".to_string()));
        }
        self.inner.open(user)
    }
}

fn defaults() -> Vec<DefaultSetting> {
    vec![
        DefaultSetting {
            namespace: Namespace::System,
            row: SettingRow::new("font_scale", Some("1.0".to_string())),
        },
        DefaultSetting {
            namespace: Namespace::Global,
            row: SettingRow::new("auto_time", Some("1".to_string())),
        },
    ]
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[test]
fn concurrent_first_access_opens_once() {
    let engine = Arc::new(CountingEngine::default());
    let manager = Arc::new(StoreManager::new(
        Arc::clone(&engine) as Arc<dyn StorageEngine>,
        defaults(),
        999,
    ));
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let manager = Arc::clone(&manager);
            thread::spawn(move || manager.get_or_create(UserId::new(7)).unwrap())
        })
        .collect();
    let stores: Vec<_> = handles.into_iter().map(|handle| handle.join().unwrap()).collect();
    assert_eq!(engine.opens.load(Ordering::SeqCst), 1);
    assert!(stores.iter().all(|store| Arc::ptr_eq(store, &stores[0])));
}

#[test]
fn failed_open_is_not_cached() {
    let engine = FlakyEngine {
        inner: InMemoryStorageEngine::new(),
        failures: AtomicUsize::new(1),
    };
    let manager = StoreManager::new(Arc::new(engine), Vec::new(), 999);
    let err = manager.get_or_create(UserId::new(3));
    assert!(matches!(err, Err(SettingsError::StorageFailure(_))));
    assert!(manager.cached_users().unwrap().is_empty());
    manager.get_or_create(UserId::new(3)).unwrap();
    assert_eq!(manager.cached_users().unwrap(), vec![UserId::new(3)]);
}

#[test]
fn tables_follow_namespace_provisioning() {
    let engine = InMemoryStorageEngine::new();
    let manager = StoreManager::new(Arc::new(engine.clone()), defaults(), 999);

    let secondary = manager.get_or_create(UserId::new(10)).unwrap();
    assert!(matches!(secondary.table(Namespace::Global), Err(SettingsError::InvalidArgument(_))));
    let tables = engine.database(UserId::new(10)).unwrap().unwrap().table_names().unwrap();
    assert_eq!(tables, vec!["secure".to_string(), "system".to_string()]);

    let primordial = manager.get_or_create(UserId::PRIMORDIAL).unwrap();
    let global = primordial.table(Namespace::Global).unwrap();
    assert_eq!(global.get("auto_time").unwrap(), Lookup::Found("1".to_string()));
    let system = secondary.table(Namespace::System).unwrap();
    assert_eq!(system.get("font_scale").unwrap(), Lookup::Found("1.0".to_string()));
}

#[test]
fn eviction_is_idempotent() {
    let manager = StoreManager::new(Arc::new(InMemoryStorageEngine::new()), Vec::new(), 999);
    assert!(!manager.evict(UserId::new(4)).unwrap());
    manager.get_or_create(UserId::new(4)).unwrap();
    assert!(manager.evict(UserId::new(4)).unwrap());
    assert!(!manager.evict(UserId::new(4)).unwrap());
}

#[test]
fn users_above_the_limit_are_rejected() {
    let manager = StoreManager::new(Arc::new(InMemoryStorageEngine::new()), Vec::new(), 10);
    assert!(manager.get_or_create(UserId::new(10)).is_ok());
    let err = manager.get_or_create(UserId::new(11));
    assert!(matches!(err, Err(SettingsError::InvalidArgument(_))));
}
