// crates/settings-provider-core/src/core/validation.rs
// ============================================================================
// Module: Setting Validators
// Description: Per-name value validators for the system namespace.
// Purpose: Reject unknown setting names and malformed values before writes.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! System settings are a closed set: each writable name has a registered
//! [`Validator`]. Names without a validator are rejected, as are values the
//! validator refuses. Checks run before any storage work.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;

use crate::core::error::SettingsError;

// ============================================================================
// SECTION: Validators
// ============================================================================

/// Value validator for one setting name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Validator {
    /// Any value, including null.
    Any,
    /// `"0"` or `"1"`.
    Boolean,
    /// Base-10 integer within `min..=max`.
    IntegerRange {
        /// Inclusive lower bound.
        min: i64,
        /// Inclusive upper bound.
        max: i64,
    },
    /// One of a fixed set of values.
    Discrete {
        /// Accepted values.
        allowed: Vec<String>,
    },
    /// Any non-empty value.
    NonEmpty,
}

impl Validator {
    /// Returns true when `value` is acceptable.
    #[must_use]
    pub fn accepts(&self, value: Option<&str>) -> bool {
        match (self, value) {
            (Self::Any, _) => true,
            (_, None) => false,
            (Self::Boolean, Some(value)) => matches!(value, "0" | "1"),
            (
                Self::IntegerRange {
                    min,
                    max,
                },
                Some(value),
            ) => value.parse::<i64>().is_ok_and(|number| (*min..=*max).contains(&number)),
            (
                Self::Discrete {
                    allowed,
                },
                Some(value),
            ) => allowed.iter().any(|candidate| candidate == value),
            (Self::NonEmpty, Some(value)) => !value.is_empty(),
        }
    }
}

// ============================================================================
// SECTION: Registry
// ============================================================================

/// Validators keyed by setting name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidatorRegistry {
    /// Registered validators.
    validators: BTreeMap<String, Validator>,
}

impl ValidatorRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the registry with `validator` registered for `name`.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, validator: Validator) -> Self {
        self.register(name, validator);
        self
    }

    /// Registers `validator` for `name`, replacing any previous one.
    pub fn register(&mut self, name: impl Into<String>, validator: Validator) {
        self.validators.insert(name.into(), validator);
    }

    /// Returns the validator for `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Validator> {
        self.validators.get(name)
    }

    /// Returns the number of registered names.
    #[must_use]
    pub fn len(&self) -> usize {
        self.validators.len()
    }

    /// Returns true when no names are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }

    /// Checks a name/value pair.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::ValidationFailed`] when the name is missing or
    /// unknown, or when the value is refused.
    pub fn check(&self, name: Option<&str>, value: Option<&str>) -> Result<(), SettingsError> {
        let Some(name) = name else {
            return Err(SettingsError::ValidationFailed("setting name is required".to_string()));
        };
        let Some(validator) = self.validators.get(name) else {
            return Err(SettingsError::ValidationFailed(format!("unknown setting: {name}")));
        };
        if validator.accepts(value) {
            Ok(())
        } else {
            Err(SettingsError::ValidationFailed(format!(
                "invalid value for {name}: {}",
                value.unwrap_or("null")
            )))
        }
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> ValidatorRegistry {
        ValidatorRegistry::new()
            .with("haptic_feedback_enabled", Validator::Boolean)
            .with("screen_brightness", Validator::IntegerRange {
                min: 0,
                max: 255,
            })
            .with("end_button_behavior", Validator::Discrete {
                allowed: vec!["0".into(), "1".into(), "2".into(), "3".into()],
            })
            .with("ringtone", Validator::Any)
    }

    #[test]
    fn unknown_names_are_rejected() {
        let result = registry().check(Some("not_a_setting"), Some("1"));
        assert!(matches!(result, Err(SettingsError::ValidationFailed(_))));
        assert!(registry().check(None, Some("1")).is_err());
    }

    #[test]
    fn values_are_checked_against_the_registered_validator() {
        let registry = registry();
        assert!(registry.check(Some("haptic_feedback_enabled"), Some("1")).is_ok());
        assert!(registry.check(Some("haptic_feedback_enabled"), Some("yes")).is_err());
        assert!(registry.check(Some("screen_brightness"), Some("255")).is_ok());
        assert!(registry.check(Some("screen_brightness"), Some("256")).is_err());
        assert!(registry.check(Some("end_button_behavior"), Some("4")).is_err());
    }

    #[test]
    fn null_values_pass_only_the_any_validator() {
        let registry = registry();
        assert!(registry.check(Some("ringtone"), None).is_ok());
        assert!(registry.check(Some("screen_brightness"), None).is_err());
    }
}
