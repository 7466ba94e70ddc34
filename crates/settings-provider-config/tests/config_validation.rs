//! Config validation and conversion tests for settings-provider-config.
// crates/settings-provider-config/tests/config_validation.rs
// =============================================================================
// Module: Config Validation Tests
// Description: Validate defaults, validators, permissions and legacy keys.
// Purpose: Ensure invalid provider inputs are rejected before startup.
// =============================================================================

use std::path::PathBuf;

use settings_provider_config::DefaultConfig;
use settings_provider_config::ValidatorKind;
use settings_provider_core::Namespace;
use settings_provider_core::Validator;
use settings_provider_store_sqlite::SqliteStoreMode;

mod common;

type TestResult = Result<(), String>;

fn default_row(namespace: &str, name: &str, value: Option<&str>) -> DefaultConfig {
    DefaultConfig {
        namespace: namespace.to_string(),
        name: name.to_string(),
        value: value.map(str::to_string),
    }
}

#[test]
fn minimal_config_is_valid() -> TestResult {
    let config = common::minimal_config().map_err(|err| err.to_string())?;
    config.validate().map_err(|err| err.to_string())?;
    Ok(())
}

#[test]
fn defaults_reject_empty_name() -> TestResult {
    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    config.defaults.push(default_row("system", " ", Some("1")));
    common::assert_invalid(config.validate(), "default name must be non-empty")?;
    Ok(())
}

#[test]
fn defaults_reject_unknown_namespace() -> TestResult {
    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    config.defaults.push(default_row("vendor", "volume", Some("3")));
    common::assert_invalid(config.validate(), "unknown default namespace: vendor")?;
    Ok(())
}

#[test]
fn defaults_reject_duplicates_within_namespace() -> TestResult {
    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    config.defaults.push(default_row("secure", "adb_enabled", Some("0")));
    config.defaults.push(default_row("secure", "adb_enabled", Some("1")));
    common::assert_invalid(config.validate(), "duplicate default secure.adb_enabled")?;
    Ok(())
}

#[test]
fn defaults_allow_same_name_in_different_namespaces() -> TestResult {
    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    config.defaults.push(default_row("system", "volume", Some("3")));
    config.defaults.push(default_row("global", "volume", None));
    config.validate().map_err(|err| err.to_string())?;
    Ok(())
}

#[test]
fn validators_reject_empty_and_duplicate_names() -> TestResult {
    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    config.validators.push(common::validator("", ValidatorKind::Boolean));
    common::assert_invalid(config.validate(), "validator name must be non-empty")?;

    config.validators.clear();
    config.validators.push(common::validator("haptic_feedback_enabled", ValidatorKind::Boolean));
    config.validators.push(common::validator("haptic_feedback_enabled", ValidatorKind::Any));
    common::assert_invalid(config.validate(), "duplicate validator haptic_feedback_enabled")?;
    Ok(())
}

#[test]
fn integer_range_requires_ordered_bounds() -> TestResult {
    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    let mut range = common::validator("screen_brightness", ValidatorKind::IntegerRange);
    range.min = Some(0);
    config.validators.push(range.clone());
    common::assert_invalid(config.validate(), "validator screen_brightness requires min and max")?;

    range.min = Some(256);
    range.max = Some(255);
    config.validators[0] = range.clone();
    common::assert_invalid(config.validate(), "validator screen_brightness min exceeds max")?;

    range.min = Some(255);
    config.validators[0] = range;
    config.validate().map_err(|err| err.to_string())?;
    Ok(())
}

#[test]
fn discrete_requires_allowed_values() -> TestResult {
    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    config.validators.push(common::validator("font_scale", ValidatorKind::Discrete));
    common::assert_invalid(config.validate(), "validator font_scale requires allowed values")?;
    Ok(())
}

#[test]
fn permissions_reject_empty_names() -> TestResult {
    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    config.permissions.interact_across_users = "  ".to_string();
    common::assert_invalid(config.validate(), "permissions.interact_across_users must be non-empty")?;
    Ok(())
}

#[test]
fn migration_rejects_duplicate_keys_within_namespace() -> TestResult {
    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    config.migration.global_keys = vec!["adb_enabled".to_string(), "adb_enabled".to_string()];
    common::assert_invalid(config.validate(), "duplicate legacy key global.adb_enabled")?;
    Ok(())
}

#[test]
fn migration_allows_same_key_across_namespaces() -> TestResult {
    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    config.migration.system_keys = vec!["volume".to_string()];
    config.migration.secure_keys = vec!["volume".to_string()];
    config.validate().map_err(|err| err.to_string())?;
    Ok(())
}

#[test]
fn store_rejects_zero_busy_timeout_and_empty_root() -> TestResult {
    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    config.store.busy_timeout_ms = 0;
    common::assert_invalid(config.validate(), "store.busy_timeout_ms must be greater than zero")?;

    config.store.busy_timeout_ms = 100;
    config.store.root = PathBuf::new();
    common::assert_invalid(config.validate(), "store.root must be non-empty")?;
    Ok(())
}

#[test]
fn audit_path_component_is_bounded() -> TestResult {
    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    config.audit.path = Some(PathBuf::from("logs").join("a".repeat(300)));
    common::assert_invalid(config.validate(), "audit.path path component too long")?;
    Ok(())
}

#[test]
fn provider_config_carries_every_section() -> TestResult {
    let config = common::config_from_toml(
        r#"
[users]
max_user_id = 42

[permissions]
write_settings = "perm.write"

[[defaults]]
namespace = "secure"
name = "lockscreen_disabled"
value = "0"

[[validators]]
name = "screen_brightness"
kind = "integer_range"
min = 0
max = 255

[migration]
system_keys = ["screen_brightness"]
"#,
    )
    .map_err(|err| err.to_string())?;
    config.validate().map_err(|err| err.to_string())?;
    let provider = config.provider_config().map_err(|err| err.to_string())?;
    if provider.max_user_id != 42 || provider.permissions.write_settings != "perm.write" {
        return Err("users or permissions not applied".to_string());
    }
    if provider.permissions.write_secure_settings != "settings.permission.WRITE_SECURE_SETTINGS" {
        return Err("unset permission lost its default".to_string());
    }
    match provider.defaults.as_slice() {
        [setting] if setting.namespace == Namespace::Secure
            && setting.row.name == "lockscreen_disabled" => {}
        _ => return Err("defaults not converted".to_string()),
    }
    if provider.validators.get("screen_brightness")
        != Some(&Validator::IntegerRange {
            min: 0,
            max: 255,
        })
    {
        return Err("validator not registered".to_string());
    }
    if provider.legacy_keys.keys(Namespace::System) != ["screen_brightness".to_string()] {
        return Err("legacy keys not converted".to_string());
    }
    Ok(())
}

#[test]
fn sqlite_store_config_mirrors_store_section() -> TestResult {
    let config = common::config_from_toml(
        r#"
[store]
root = "/data/settings"
journal_mode = "delete"
"#,
    )
    .map_err(|err| err.to_string())?;
    let store = config.sqlite_store_config();
    if store.root != PathBuf::from("/data/settings") || store.journal_mode != SqliteStoreMode::Delete {
        return Err("store section not applied".to_string());
    }
    if store.busy_timeout_ms != 5_000 {
        return Err("busy timeout default not applied".to_string());
    }
    Ok(())
}

#[test]
fn audit_sink_opens_configured_file() -> TestResult {
    let dir = tempfile::tempdir().map_err(|err| err.to_string())?;
    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    let path = dir.path().join("audit.jsonl");
    config.audit.path = Some(path.clone());
    config.audit_sink().map_err(|err| err.to_string())?;
    if !path.exists() {
        return Err("audit file not created".to_string());
    }
    config.audit.path = Some(dir.path().join("missing").join("audit.jsonl"));
    common::assert_invalid(config.audit_sink(), "config io error")?;
    Ok(())
}
