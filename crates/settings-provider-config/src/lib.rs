// crates/settings-provider-config/src/lib.rs
// ============================================================================
// Module: Settings Provider Config Library
// Description: Canonical config model and validation.
// Purpose: Single source of truth for settings-provider.toml semantics.
// Dependencies: settings-provider-core, settings-provider-store-sqlite, toml
// ============================================================================

//! ## Overview
//! `settings-provider-config` defines the configuration model for the
//! settings provider. Loading is strict and fail-closed; a validated config
//! converts into the provider, store and audit inputs.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
