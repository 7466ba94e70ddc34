// crates/settings-provider-core/src/runtime/table.rs
// ============================================================================
// Module: Table Store
// Description: Per-namespace table operations over a user's database.
// Purpose: Apply settings semantics on top of the transactional engine.
// Dependencies: crate::{core, interfaces}, tracing
// ============================================================================

//! ## Overview
//! A [`UserStore`] is the opened database of one user. [`TableStore`] narrows
//! it to one namespace table and layers the settings policies on top of the
//! raw engine: deletes without a predicate are refused, and bulk inserts are
//! all-or-nothing, reporting zero on any failure.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use tracing::debug;
use tracing::warn;

use crate::core::Cell;
use crate::core::Column;
use crate::core::Lookup;
use crate::core::Namespace;
use crate::core::Predicate;
use crate::core::RowUpdate;
use crate::core::RowValues;
use crate::core::SettingRecord;
use crate::core::SettingRow;
use crate::core::SettingsError;
use crate::core::SortOrder;
use crate::core::UserId;
use crate::interfaces::SettingsDatabase;

// ============================================================================
// SECTION: User Store
// ============================================================================

/// Opened database handle for one user.
pub struct UserStore {
    /// Owning user.
    user: UserId,
    /// Engine handle.
    database: Arc<dyn SettingsDatabase>,
}

impl UserStore {
    /// Wraps an initialized database.
    #[must_use]
    pub fn new(user: UserId, database: Arc<dyn SettingsDatabase>) -> Self {
        Self {
            user,
            database,
        }
    }

    /// Returns the owning user.
    #[must_use]
    pub const fn user(&self) -> UserId {
        self.user
    }

    /// Returns the table for `namespace`.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::InvalidArgument`] when the namespace is not
    /// provisioned in this user's store.
    pub fn table(&self, namespace: Namespace) -> Result<TableStore<'_>, SettingsError> {
        if !Namespace::provisioned_for(self.user).contains(&namespace) {
            return Err(SettingsError::InvalidArgument(format!(
                "namespace {namespace} is not provisioned for user {}",
                self.user
            )));
        }
        Ok(TableStore {
            namespace,
            user: self.user,
            database: self.database.as_ref(),
        })
    }
}

// ============================================================================
// SECTION: Table Store
// ============================================================================

/// One namespace table inside a user's database.
pub struct TableStore<'a> {
    /// Table namespace.
    namespace: Namespace,
    /// Owning user, for diagnostics.
    user: UserId,
    /// Engine handle.
    database: &'a dyn SettingsDatabase,
}

impl TableStore<'_> {
    /// Returns the table's namespace.
    #[must_use]
    pub const fn namespace(&self) -> Namespace {
        self.namespace
    }

    /// Inserts `name`, replacing any existing row; returns the new row id.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::StorageFailure`] when the write fails.
    pub fn insert_or_replace(
        &self,
        name: &str,
        value: Option<&str>,
    ) -> Result<i64, SettingsError> {
        self.insert_row(&SettingRow::new(name, value.map(str::to_string)))
    }

    /// Inserts a validated row, replacing any row with the same name.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::StorageFailure`] when the write fails.
    pub fn insert_row(&self, row: &SettingRow) -> Result<i64, SettingsError> {
        Ok(self.database.insert(self.namespace.as_str(), row)?)
    }

    /// Looks up one setting by name.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::StorageFailure`] when the read fails.
    pub fn get(&self, name: &str) -> Result<Lookup, SettingsError> {
        let predicate = Predicate::name_equals(name);
        let records = self.database.select(self.namespace.as_str(), Some(&predicate), None)?;
        Ok(match records.into_iter().next() {
            Some(SettingRecord {
                value: Some(value),
                ..
            }) => Lookup::Found(value),
            Some(_) => Lookup::FoundNull,
            None => Lookup::Missing,
        })
    }

    /// Returns matching records.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::StorageFailure`] when the read fails.
    pub fn records(
        &self,
        predicate: Option<&Predicate>,
        sort: Option<&SortOrder>,
    ) -> Result<Vec<SettingRecord>, SettingsError> {
        Ok(self.database.select(self.namespace.as_str(), predicate, sort)?)
    }

    /// Returns matching rows projected onto `projection`.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::StorageFailure`] when the read fails.
    pub fn query(
        &self,
        predicate: Option<&Predicate>,
        projection: &[Column],
        sort: Option<&SortOrder>,
    ) -> Result<Vec<Vec<Cell>>, SettingsError> {
        let records = self.records(predicate, sort)?;
        Ok(records.iter().map(|record| record.project(projection)).collect())
    }

    /// Applies `update` to matching rows.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::StorageFailure`] when the write fails.
    pub fn update(
        &self,
        update: &RowUpdate,
        predicate: Option<&Predicate>,
    ) -> Result<usize, SettingsError> {
        Ok(self.database.update(self.namespace.as_str(), update, predicate)?)
    }

    /// Deletes matching rows. Without a predicate nothing is deleted.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::StorageFailure`] when the write fails.
    pub fn delete(&self, predicate: Option<&Predicate>) -> Result<usize, SettingsError> {
        let Some(predicate) = predicate else {
            debug!(namespace = %self.namespace, user = %self.user, "refusing unfiltered delete");
            return Ok(0);
        };
        Ok(self.database.delete(self.namespace.as_str(), predicate)?)
    }

    /// Inserts every row or none; returns 0 when any row or the engine fails.
    #[must_use]
    pub fn bulk_insert(&self, rows: &[RowValues]) -> usize {
        let mut prepared = Vec::with_capacity(rows.len());
        for (index, values) in rows.iter().enumerate() {
            match SettingRow::try_from(values) {
                Ok(row) => prepared.push(row),
                Err(err) => {
                    warn!(
                        namespace = %self.namespace,
                        user = %self.user,
                        row = index,
                        error = %err,
                        "bulk insert abandoned on malformed row"
                    );
                    return 0;
                }
            }
        }
        match self.database.insert_batch(self.namespace.as_str(), &prepared) {
            Ok(count) => count,
            Err(err) => {
                warn!(
                    namespace = %self.namespace,
                    user = %self.user,
                    error = %err,
                    "bulk insert rolled back"
                );
                0
            }
        }
    }
}
