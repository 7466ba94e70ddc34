// crates/settings-provider-core/src/core/mod.rs
// ============================================================================
// Module: Settings Core Types
// Description: Identifiers, namespaces, rows, selections and validators.
// Purpose: Provide the stable data model shared by every settings component.
// Dependencies: serde, thiserror
// ============================================================================

//! ## Overview
//! Core types describe what a settings request addresses (namespace, user,
//! item), what it carries (row values, selections) and what it returns (row
//! sets, lookups, typed errors). They hold no state and perform no I/O.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod error;
pub mod identifiers;
pub mod namespace;
pub mod rows;
pub mod selection;
pub mod uri;
pub mod validation;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use error::SettingsError;
pub use identifiers::Caller;
pub use identifiers::DEFAULT_MAX_USER_ID;
pub use identifiers::UserId;
pub use namespace::Namespace;
pub use namespace::NamespaceRules;
pub use namespace::OwnerScope;
pub use namespace::WriteRequirement;
pub use rows::Cell;
pub use rows::Column;
pub use rows::Lookup;
pub use rows::RowSet;
pub use rows::RowUpdate;
pub use rows::RowValues;
pub use rows::SettingRecord;
pub use rows::SettingRow;
pub use selection::Filter;
pub use selection::Operand;
pub use selection::Predicate;
pub use selection::Selection;
pub use selection::SortDirection;
pub use selection::SortOrder;
pub use selection::sort_records;
pub use uri::ResourceKind;
pub use uri::ResourceType;
pub use uri::SettingsUri;
pub use validation::Validator;
pub use validation::ValidatorRegistry;
