// crates/settings-provider-config/tests/common/mod.rs
// =============================================================================
// Module: Config Test Helpers
// Description: Shared helpers for config validation tests.
// Purpose: Reduce duplication across integration tests for settings-provider-config.
// =============================================================================

#![allow(dead_code, reason = "Test helpers are selectively used across suites.")]

use settings_provider_config::ConfigError;
use settings_provider_config::SettingsConfig;
use settings_provider_config::ValidatorConfig;
use settings_provider_config::ValidatorKind;

/// Parses a TOML string into a `SettingsConfig` for tests.
pub fn config_from_toml(toml_str: &str) -> Result<SettingsConfig, toml::de::Error> {
    toml::from_str(toml_str)
}

/// Returns a minimal config with all defaults applied.
pub fn minimal_config() -> Result<SettingsConfig, toml::de::Error> {
    config_from_toml("")
}

/// Returns a validator entry of `kind` with no bounds or values.
pub fn validator(name: &str, kind: ValidatorKind) -> ValidatorConfig {
    ValidatorConfig {
        name: name.to_string(),
        kind,
        min: None,
        max: None,
        allowed: Vec::new(),
    }
}

/// Checks that `result` failed with a message containing `needle`.
pub fn assert_invalid<T>(result: Result<T, ConfigError>, needle: &str) -> Result<(), String> {
    match result {
        Err(error) => {
            let message = error.to_string();
            if message.contains(needle) {
                Ok(())
            } else {
                Err(format!("error {message} did not contain {needle}"))
            }
        }
        Ok(_) => Err("expected invalid config".to_string()),
    }
}
