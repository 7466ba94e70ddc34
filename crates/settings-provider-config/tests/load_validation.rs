//! Config load validation tests for settings-provider-config.
// crates/settings-provider-config/tests/load_validation.rs
// =============================================================================
// Module: Config Load Validation Tests
// Description: Validate config loading guards (path, size, encoding).
// Purpose: Ensure config input handling is strict and fail-closed.
// =============================================================================

use std::io::Write;
use std::path::Path;

use settings_provider_config::ConfigError;
use settings_provider_config::SettingsConfig;
use tempfile::NamedTempFile;

mod common;

type TestResult = Result<(), String>;

fn write_config(contents: &str) -> Result<NamedTempFile, String> {
    let mut file = NamedTempFile::new().map_err(|err| err.to_string())?;
    file.write_all(contents.as_bytes()).map_err(|err| err.to_string())?;
    Ok(file)
}

#[test]
fn load_rejects_path_too_long() -> TestResult {
    let long_path = "a".repeat(5_000);
    let path = Path::new(&long_path);
    common::assert_invalid(SettingsConfig::load(Some(path)), "config path exceeds max length")?;
    Ok(())
}

#[test]
fn load_rejects_path_component_too_long() -> TestResult {
    let long_component = "a".repeat(300);
    let path = Path::new(&long_component);
    common::assert_invalid(SettingsConfig::load(Some(path)), "config path component too long")?;
    Ok(())
}

#[test]
fn load_rejects_oversized_file() -> TestResult {
    let mut file = NamedTempFile::new().map_err(|err| err.to_string())?;
    let payload = vec![b'a'; 1_048_577];
    file.write_all(&payload).map_err(|err| err.to_string())?;
    common::assert_invalid(SettingsConfig::load(Some(file.path())), "config file exceeds size limit")?;
    Ok(())
}

#[test]
fn load_rejects_non_utf8_file() -> TestResult {
    let mut file = NamedTempFile::new().map_err(|err| err.to_string())?;
    file.write_all(&[0xFF, 0xFE, 0xFF]).map_err(|err| err.to_string())?;
    common::assert_invalid(SettingsConfig::load(Some(file.path())), "config file must be utf-8")?;
    Ok(())
}

#[test]
fn load_reports_missing_file_as_io_error() -> TestResult {
    let dir = tempfile::tempdir().map_err(|err| err.to_string())?;
    match SettingsConfig::load(Some(&dir.path().join("absent.toml"))) {
        Err(ConfigError::Io(_)) => Ok(()),
        Err(error) => Err(format!("expected io error, got {error}")),
        Ok(_) => Err("expected missing file to fail".to_string()),
    }
}

#[test]
fn load_reports_malformed_toml_as_parse_error() -> TestResult {
    let file = write_config("[store\nroot = ")?;
    match SettingsConfig::load(Some(file.path())) {
        Err(ConfigError::Parse(_)) => Ok(()),
        Err(error) => Err(format!("expected parse error, got {error}")),
        Ok(_) => Err("expected malformed toml to fail".to_string()),
    }
}

#[test]
fn load_validates_after_parsing() -> TestResult {
    let file = write_config(
        r#"
[[validators]]
name = "screen_brightness"
kind = "integer_range"
min = 10
max = 1
"#,
    )?;
    common::assert_invalid(SettingsConfig::load(Some(file.path())), "min exceeds max")?;
    Ok(())
}

#[test]
fn load_accepts_complete_config() -> TestResult {
    let file = write_config(
        r#"
[store]
root = "/var/lib/settings"
busy_timeout_ms = 250
journal_mode = "delete"
sync_mode = "normal"

[users]
max_user_id = 99

[permissions]
write_settings = "perm.write"
write_secure_settings = "perm.write_secure"
interact_across_users = "perm.cross_user"

[[defaults]]
namespace = "system"
name = "screen_brightness"
value = "102"

[[defaults]]
namespace = "global"
name = "airplane_mode_on"
value = "0"

[[validators]]
name = "screen_off_timeout"
kind = "integer_range"
min = 1000
max = 600000

[[validators]]
name = "font_scale"
kind = "discrete"
allowed = ["0.85", "1.0", "1.15"]

[migration]
system_keys = ["screen_brightness"]
secure_keys = ["location_providers_allowed"]
global_keys = ["adb_enabled"]
"#,
    )?;
    let config = SettingsConfig::load(Some(file.path())).map_err(|err| err.to_string())?;
    if config.users.max_user_id != 99 || config.defaults.len() != 2 || config.validators.len() != 2 {
        return Err("config sections not applied".to_string());
    }
    if config.store.busy_timeout_ms != 250 {
        return Err("busy timeout not applied".to_string());
    }
    Ok(())
}
