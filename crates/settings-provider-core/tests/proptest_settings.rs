// crates/settings-provider-core/tests/proptest_settings.rs
// ============================================================================
// Module: Settings Property Tests
// Description: Property checks for replace-on-conflict and delete safety.
// Purpose: Ensure name uniqueness and the unfiltered-delete no-op hold broadly.
// Dependencies: settings-provider-core, proptest
// ============================================================================
//! ## Overview
//! Generates arbitrary names and write sequences and checks that each name
//! maps to exactly one row holding the last written value.

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

mod common;

use std::collections::BTreeMap;

use proptest::prelude::*;
use settings_provider_core::Lookup;
use settings_provider_core::Namespace;
use settings_provider_core::RowValues;
use settings_provider_core::Selection;

use crate::common::collection;
use crate::common::harness;
use crate::common::lookup;
use crate::common::privileged;
use crate::common::row_count;

proptest! {
    #[test]
    fn last_write_wins_per_name(
        writes in prop::collection::vec(("[a-c]{1,2}", "[a-z0-9]{0,6}"), 1..24)
    ) {
        let h = harness();
        let caller = privileged(0);
        let target = collection(Namespace::Secure);
        let mut expected = BTreeMap::new();
        for (name, value) in &writes {
            h.provider
                .insert(&caller, &target, &RowValues::setting(name.clone(), Some(value.clone())))
                .unwrap();
            expected.insert(name.clone(), value.clone());
        }
        prop_assert_eq!(row_count(&h, &caller, Namespace::Secure), expected.len());
        for (name, value) in &expected {
            prop_assert_eq!(
                lookup(&h, &caller, Namespace::Secure, name),
                Lookup::Found(value.clone())
            );
        }
    }

    #[test]
    fn unbound_delete_never_removes_rows(names in prop::collection::btree_set("[a-z_]{1,12}", 1..12)) {
        let h = harness();
        let caller = privileged(0);
        let target = collection(Namespace::Global);
        for name in &names {
            h.provider.insert(&caller, &target, &RowValues::setting(name.clone(), None)).unwrap();
        }
        prop_assert_eq!(h.provider.delete(&caller, &target, &Selection::none()).unwrap(), 0);
        prop_assert_eq!(row_count(&h, &caller, Namespace::Global), names.len());
    }
}
