// crates/settings-provider-store-sqlite/tests/sqlite_parity.rs
// ============================================================================
// Module: SQLite Parity Property Tests
// Description: SQLite and in-memory stores agree on writes and predicates.
// Purpose: Keep the reference engine and the durable engine interchangeable.
// Dependencies: settings-provider-core, settings-provider-store-sqlite, proptest
// ============================================================================

//! ## Overview
//! Applies the same insert sequence to both engines and checks that arbitrary
//! predicates select identical records.

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

use proptest::prelude::*;
use settings_provider_core::Column;
use settings_provider_core::Namespace;
use settings_provider_core::Predicate;
use settings_provider_core::SettingRow;
use settings_provider_core::SettingsDatabase;
use settings_provider_core::TableSchema;
use settings_provider_core::runtime::InMemorySettingsDatabase;
use settings_provider_store_sqlite::SqliteSettingsDatabase;
use settings_provider_store_sqlite::SqliteStoreConfig;
use tempfile::TempDir;

const ID_LITERALS: [&str; 6] = ["2.0", "1.5", "+1", "3e0", "0.0", "2x"];

fn open_pair(dir: &TempDir, rows: &[SettingRow]) -> (SqliteSettingsDatabase, InMemorySettingsDatabase) {
    let schemas = [TableSchema::for_namespace(Namespace::System)];
    let sqlite = SqliteSettingsDatabase::open(
        &dir.path().join("settings.db"),
        &SqliteStoreConfig::new(dir.path()),
    )
    .unwrap();
    let memory = InMemorySettingsDatabase::new();
    for database in [&sqlite as &dyn SettingsDatabase, &memory] {
        database.initialize(&schemas, &[]).unwrap();
        for row in rows {
            database.insert("system", row).unwrap();
        }
    }
    (sqlite, memory)
}

fn column() -> impl Strategy<Value = Column> {
    prop_oneof![Just(Column::Id), Just(Column::Name), Just(Column::Value)]
}

fn leaf() -> impl Strategy<Value = Predicate> {
    prop_oneof![
        (column(), "[aAb1-3]{0,2}").prop_map(|(column, value)| Predicate::Eq(column, value)),
        (column(), "[aAb1-3]{0,2}").prop_map(|(column, value)| Predicate::NotEq(column, value)),
        (column(), "[aAb1%_]{0,3}").prop_map(|(column, pattern)| Predicate::Like(column, pattern)),
        (column(), prop::collection::vec("[ab1-3]{1,2}", 0..3))
            .prop_map(|(column, values)| Predicate::In(column, values)),
        (prop::sample::select(ID_LITERALS.to_vec()), any::<bool>()).prop_map(|(literal, equal)| {
            if equal {
                Predicate::Eq(Column::Id, literal.to_string())
            } else {
                Predicate::NotEq(Column::Id, literal.to_string())
            }
        }),
        column().prop_map(Predicate::IsNull),
        column().prop_map(Predicate::IsNotNull),
    ]
}

fn predicate() -> impl Strategy<Value = Predicate> {
    leaf().prop_recursive(2, 12, 3, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..3).prop_map(Predicate::And),
            prop::collection::vec(inner.clone(), 0..3).prop_map(Predicate::Or),
            inner.prop_map(|predicate| Predicate::Not(Box::new(predicate))),
        ]
    })
}

fn rows() -> impl Strategy<Value = Vec<SettingRow>> {
    prop::collection::vec(
        ("[aAb]{1,2}", proptest::option::of("[ab1-3]{0,2}"))
            .prop_map(|(name, value)| SettingRow::new(name, value)),
        0..10,
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn engines_select_the_same_records(rows in rows(), predicate in predicate()) {
        let dir = TempDir::new().unwrap();
        let (sqlite, memory) = open_pair(&dir, &rows);
        prop_assert_eq!(
            sqlite.select("system", Some(&predicate), None).unwrap(),
            memory.select("system", Some(&predicate), None).unwrap()
        );
    }
}

#[test]
fn real_literals_match_integral_row_ids_in_both_engines() {
    let dir = TempDir::new().unwrap();
    let rows: Vec<SettingRow> = ["a", "b", "c"]
        .into_iter()
        .map(|name| SettingRow::new(name, Some("1".to_string())))
        .collect();
    let (sqlite, memory) = open_pair(&dir, &rows);
    for literal in ID_LITERALS {
        let predicate = Predicate::Eq(Column::Id, literal.to_string());
        let durable = sqlite.select("system", Some(&predicate), None).unwrap();
        assert_eq!(durable, memory.select("system", Some(&predicate), None).unwrap(), "{literal}");
    }
    let predicate = Predicate::Eq(Column::Id, "2.0".to_string());
    let matched = memory.select("system", Some(&predicate), None).unwrap();
    assert_eq!(matched.len(), 1);
    assert_eq!(matched[0].name, "b");
}
