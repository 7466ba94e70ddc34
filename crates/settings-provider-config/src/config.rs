// crates/settings-provider-config/src/config.rs
// ============================================================================
// Module: Settings Provider Configuration
// Description: Configuration loading and validation for the settings provider.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: settings-provider-core, settings-provider-store-sqlite, serde, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! Missing or invalid configuration fails closed; a validated config converts
//! into [`ProviderConfig`], [`SqliteStoreConfig`] and an audit sink.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::env;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use serde::Deserialize;
use settings_provider_core::AuditSink;
use settings_provider_core::DEFAULT_MAX_USER_ID;
use settings_provider_core::DefaultSetting;
use settings_provider_core::FileAuditSink;
use settings_provider_core::LegacyKeys;
use settings_provider_core::Namespace;
use settings_provider_core::NoopAuditSink;
use settings_provider_core::PermissionNames;
use settings_provider_core::ProviderConfig;
use settings_provider_core::SettingRow;
use settings_provider_core::Validator;
use settings_provider_core::ValidatorRegistry;
use settings_provider_store_sqlite::SqliteStoreConfig;
use settings_provider_store_sqlite::SqliteStoreMode;
use settings_provider_store_sqlite::SqliteSyncMode;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "settings-provider.toml";
/// Environment variable used to override the config path.
pub const CONFIG_ENV_VAR: &str = "SETTINGS_PROVIDER_CONFIG";
/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
pub(crate) const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Default store root directory.
const DEFAULT_STORE_ROOT: &str = "settings-data";
/// Default `SQLite` busy timeout in milliseconds.
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

// ============================================================================
// SECTION: Configuration Types
// ============================================================================

/// Settings provider configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SettingsConfig {
    /// Storage configuration.
    #[serde(default)]
    pub store: StoreConfig,
    /// User handle limits.
    #[serde(default)]
    pub users: UsersConfig,
    /// Checked permission names.
    #[serde(default)]
    pub permissions: PermissionsConfig,
    /// Rows loaded into newly created stores.
    #[serde(default)]
    pub defaults: Vec<DefaultConfig>,
    /// System namespace validators.
    #[serde(default)]
    pub validators: Vec<ValidatorConfig>,
    /// Legacy keys copied by migration.
    #[serde(default)]
    pub migration: MigrationConfig,
    /// Audit log configuration.
    #[serde(default)]
    pub audit: AuditConfig,
}

impl SettingsConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path)?;
        validate_path(&resolved)?;
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.store.validate()?;
        self.permissions.validate()?;
        validate_defaults(&self.defaults)?;
        validate_validators(&self.validators)?;
        self.migration.validate()?;
        self.audit.validate()?;
        Ok(())
    }

    /// Returns the `SQLite` store configuration.
    #[must_use]
    pub fn sqlite_store_config(&self) -> SqliteStoreConfig {
        SqliteStoreConfig {
            root: self.store.root.clone(),
            busy_timeout_ms: self.store.busy_timeout_ms,
            journal_mode: self.store.journal_mode,
            sync_mode: self.store.sync_mode,
        }
    }

    /// Builds the provider configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a default or validator entry is invalid.
    pub fn provider_config(&self) -> Result<ProviderConfig, ConfigError> {
        let mut validators = ValidatorRegistry::new();
        for entry in &self.validators {
            validators.register(entry.name.clone(), entry.to_validator()?);
        }
        let defaults = self
            .defaults
            .iter()
            .map(DefaultConfig::to_default_setting)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ProviderConfig {
            permissions: self.permissions.to_permission_names(),
            max_user_id: self.users.max_user_id,
            defaults,
            validators,
            legacy_keys: self.migration.to_legacy_keys(),
        })
    }

    /// Builds the audit sink; a configured path appends JSON lines to a file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] when the audit file cannot be opened.
    pub fn audit_sink(&self) -> Result<Arc<dyn AuditSink>, ConfigError> {
        match &self.audit.path {
            Some(path) => {
                let sink = FileAuditSink::new(path).map_err(|err| ConfigError::Io(err.to_string()))?;
                Ok(Arc::new(sink))
            }
            None => Ok(Arc::new(NoopAuditSink)),
        }
    }
}

/// Storage configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// Root directory for database files.
    #[serde(default = "default_store_root")]
    pub root: PathBuf,
    /// `SQLite` busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: SqliteStoreMode,
    /// `SQLite` sync mode.
    #[serde(default)]
    pub sync_mode: SqliteSyncMode,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            root: default_store_root(),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            journal_mode: SqliteStoreMode::default(),
            sync_mode: SqliteSyncMode::default(),
        }
    }
}

impl StoreConfig {
    /// Validates storage configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_path_string("store.root", &self.root.to_string_lossy())?;
        if self.busy_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "store.busy_timeout_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// User handle configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct UsersConfig {
    /// Largest accepted user handle.
    #[serde(default = "default_max_user_id")]
    pub max_user_id: u32,
}

impl Default for UsersConfig {
    fn default() -> Self {
        Self {
            max_user_id: DEFAULT_MAX_USER_ID,
        }
    }
}

/// Permission names checked by the provider.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PermissionsConfig {
    /// Required by the single-value put calls.
    pub write_settings: String,
    /// Required for secure and global writes.
    pub write_secure_settings: String,
    /// Required when a call targets another user.
    pub interact_across_users: String,
}

impl Default for PermissionsConfig {
    fn default() -> Self {
        let names = PermissionNames::default();
        Self {
            write_settings: names.write_settings,
            write_secure_settings: names.write_secure_settings,
            interact_across_users: names.interact_across_users,
        }
    }
}

impl PermissionsConfig {
    /// Validates permission names.
    fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("write_settings", &self.write_settings),
            ("write_secure_settings", &self.write_secure_settings),
            ("interact_across_users", &self.interact_across_users),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::Invalid(format!("permissions.{field} must be non-empty")));
            }
        }
        Ok(())
    }

    /// Returns the provider permission names.
    fn to_permission_names(&self) -> PermissionNames {
        PermissionNames {
            write_settings: self.write_settings.clone(),
            write_secure_settings: self.write_secure_settings.clone(),
            interact_across_users: self.interact_across_users.clone(),
        }
    }
}

/// One default row.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DefaultConfig {
    /// Target namespace name.
    pub namespace: String,
    /// Setting name.
    pub name: String,
    /// Setting value; absent means null.
    #[serde(default)]
    pub value: Option<String>,
}

impl DefaultConfig {
    /// Converts the entry into a provider default.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the namespace is unknown.
    pub fn to_default_setting(&self) -> Result<DefaultSetting, ConfigError> {
        let namespace = Namespace::parse(&self.namespace).ok_or_else(|| {
            ConfigError::Invalid(format!("unknown default namespace: {}", self.namespace))
        })?;
        Ok(DefaultSetting {
            namespace,
            row: SettingRow::new(self.name.clone(), self.value.clone()),
        })
    }
}

/// Validator kinds accepted in config.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidatorKind {
    /// Any value, including null.
    Any,
    /// `"0"` or `"1"`.
    Boolean,
    /// Integer within `min..=max`.
    IntegerRange,
    /// One of `allowed`.
    Discrete,
    /// Any non-empty value.
    NonEmpty,
}

/// One system namespace validator.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ValidatorConfig {
    /// Setting name the validator applies to.
    pub name: String,
    /// Validator kind.
    pub kind: ValidatorKind,
    /// Inclusive lower bound for `integer_range`.
    #[serde(default)]
    pub min: Option<i64>,
    /// Inclusive upper bound for `integer_range`.
    #[serde(default)]
    pub max: Option<i64>,
    /// Accepted values for `discrete`.
    #[serde(default)]
    pub allowed: Vec<String>,
}

impl ValidatorConfig {
    /// Converts the entry into a provider validator.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when bounds or values are missing or
    /// inconsistent with the kind.
    pub fn to_validator(&self) -> Result<Validator, ConfigError> {
        match self.kind {
            ValidatorKind::Any => Ok(Validator::Any),
            ValidatorKind::Boolean => Ok(Validator::Boolean),
            ValidatorKind::NonEmpty => Ok(Validator::NonEmpty),
            ValidatorKind::IntegerRange => {
                let (Some(min), Some(max)) = (self.min, self.max) else {
                    return Err(ConfigError::Invalid(format!(
                        "validator {} requires min and max",
                        self.name
                    )));
                };
                if min > max {
                    return Err(ConfigError::Invalid(format!(
                        "validator {} min exceeds max",
                        self.name
                    )));
                }
                Ok(Validator::IntegerRange {
                    min,
                    max,
                })
            }
            ValidatorKind::Discrete => {
                if self.allowed.is_empty() {
                    return Err(ConfigError::Invalid(format!(
                        "validator {} requires allowed values",
                        self.name
                    )));
                }
                Ok(Validator::Discrete {
                    allowed: self.allowed.clone(),
                })
            }
        }
    }
}

/// Legacy key lists copied by migration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MigrationConfig {
    /// Keys copied into the system namespace.
    pub system_keys: Vec<String>,
    /// Keys copied into the secure namespace.
    pub secure_keys: Vec<String>,
    /// Keys copied into the global namespace.
    pub global_keys: Vec<String>,
}

impl MigrationConfig {
    /// Rejects empty and duplicate keys within one namespace.
    fn validate(&self) -> Result<(), ConfigError> {
        for (namespace, keys) in [
            (Namespace::System, &self.system_keys),
            (Namespace::Secure, &self.secure_keys),
            (Namespace::Global, &self.global_keys),
        ] {
            let mut seen = BTreeSet::new();
            for key in keys {
                if key.trim().is_empty() {
                    return Err(ConfigError::Invalid(format!(
                        "migration.{namespace}_keys entries must be non-empty"
                    )));
                }
                if !seen.insert(key.as_str()) {
                    return Err(ConfigError::Invalid(format!(
                        "duplicate legacy key {namespace}.{key}"
                    )));
                }
            }
        }
        Ok(())
    }

    /// Returns the provider legacy key lists.
    fn to_legacy_keys(&self) -> LegacyKeys {
        LegacyKeys {
            system: self.system_keys.clone(),
            secure: self.secure_keys.clone(),
            global: self.global_keys.clone(),
        }
    }
}

/// Audit log configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuditConfig {
    /// JSON-lines audit log path; audit is disabled when absent.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl AuditConfig {
    /// Validates the audit path.
    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(path) = &self.path {
            validate_path_string("audit.path", &path.to_string_lossy())?;
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration loading or validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Returns the default store root.
fn default_store_root() -> PathBuf {
    PathBuf::from(DEFAULT_STORE_ROOT)
}

/// Returns the default busy timeout.
const fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

/// Returns the default maximum user handle.
const fn default_max_user_id() -> u32 {
    DEFAULT_MAX_USER_ID
}

/// Rejects empty names, duplicates and unknown namespaces.
fn validate_defaults(defaults: &[DefaultConfig]) -> Result<(), ConfigError> {
    let mut seen = BTreeSet::new();
    for entry in defaults {
        if entry.name.trim().is_empty() {
            return Err(ConfigError::Invalid("default name must be non-empty".to_string()));
        }
        let setting = entry.to_default_setting()?;
        if !seen.insert((setting.namespace, entry.name.as_str())) {
            return Err(ConfigError::Invalid(format!(
                "duplicate default {}.{}",
                setting.namespace, entry.name
            )));
        }
    }
    Ok(())
}

/// Rejects empty names, duplicates and inconsistent validators.
fn validate_validators(validators: &[ValidatorConfig]) -> Result<(), ConfigError> {
    let mut seen = BTreeSet::new();
    for entry in validators {
        if entry.name.trim().is_empty() {
            return Err(ConfigError::Invalid("validator name must be non-empty".to_string()));
        }
        if !seen.insert(entry.name.as_str()) {
            return Err(ConfigError::Invalid(format!("duplicate validator {}", entry.name)));
        }
        entry.to_validator()?;
    }
    Ok(())
}

/// Resolves the config path from an explicit path or environment defaults.
fn resolve_path(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(PathBuf::from(env_path));
    }
    Ok(PathBuf::from(DEFAULT_CONFIG_NAME))
}

/// Validates the resolved path against security limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a path string against length constraints.
fn validate_path_string(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if trimmed.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    for component in Path::new(trimmed).components() {
        let component_value = component.as_os_str().to_string_lossy();
        if component_value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid(format!("{field} path component too long")));
        }
    }
    Ok(())
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "Test-only assertions use unwrap for clarity.")]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let config: SettingsConfig = toml::from_str("").unwrap();
        assert_eq!(config.store.root, PathBuf::from(DEFAULT_STORE_ROOT));
        assert_eq!(config.users.max_user_id, DEFAULT_MAX_USER_ID);
        assert_eq!(config.permissions.to_permission_names(), PermissionNames::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn path_limits_apply_per_component() {
        assert!(validate_path(Path::new("a/b/settings.toml")).is_ok());
        let long = "c".repeat(MAX_PATH_COMPONENT_LENGTH + 1);
        assert!(validate_path(&Path::new("a").join(long)).is_err());
    }
}
