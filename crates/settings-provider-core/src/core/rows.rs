// crates/settings-provider-core/src/core/rows.rs
// ============================================================================
// Module: Setting Rows
// Description: Flat name/value rows, column projections and result sets.
// Purpose: Model request values and stored records for every namespace table.
// Dependencies: crate::core
// ============================================================================

//! ## Overview
//! Every namespace table has the same flat shape: an autoincrement row id, a
//! unique setting name and a nullable value. Request payloads are modeled as
//! [`RowValues`], which keeps "column present with null" distinct from
//! "column absent". Stored rows come back as [`SettingRecord`]s and are
//! projected into [`RowSet`]s for callers.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use crate::core::error::SettingsError;
use crate::core::identifiers::UserId;
use crate::core::uri::SettingsUri;

// ============================================================================
// SECTION: Columns
// ============================================================================

/// Column of a namespace table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Column {
    /// Autoincrement row id.
    Id,
    /// Unique setting name.
    Name,
    /// Nullable setting value.
    Value,
}

impl Column {
    /// All columns in table order.
    pub const ALL: [Self; 3] = [Self::Id, Self::Name, Self::Value];

    /// Returns the stored column name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Id => "_id",
            Self::Name => "name",
            Self::Value => "value",
        }
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Request Values
// ============================================================================

/// Column values supplied by a caller for insert or update.
///
/// # Invariants
/// - A column mapped to `None` is present with a null value, which differs from
///   an absent column.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowValues {
    /// Present columns and their (nullable) values.
    entries: BTreeMap<Column, Option<String>>,
}

impl RowValues {
    /// Creates an empty value set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a `{name, value}` pair.
    #[must_use]
    pub fn setting(name: impl Into<String>, value: Option<String>) -> Self {
        Self::new().with(Column::Name, Some(name.into())).with(Column::Value, value)
    }

    /// Returns the value set with `column` assigned.
    #[must_use]
    pub fn with(mut self, column: Column, value: Option<String>) -> Self {
        self.put(column, value);
        self
    }

    /// Assigns `column`, replacing any previous value.
    pub fn put(&mut self, column: Column, value: Option<String>) {
        self.entries.insert(column, value);
    }

    /// Returns `Some(value)` when the column is present.
    #[must_use]
    pub fn get(&self, column: Column) -> Option<Option<&str>> {
        self.entries.get(&column).map(Option::as_deref)
    }

    /// Returns true when the column is present (possibly null).
    #[must_use]
    pub fn contains(&self, column: Column) -> bool {
        self.entries.contains_key(&column)
    }

    /// Returns the non-null setting name, if present.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.get(Column::Name).flatten()
    }

    /// Returns the non-null setting value, if present.
    #[must_use]
    pub fn value(&self) -> Option<&str> {
        self.get(Column::Value).flatten()
    }

    /// Returns true when no column is present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ============================================================================
// SECTION: Stored Rows
// ============================================================================

/// Validated row ready to be written with insert-or-replace semantics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingRow {
    /// Unique setting name.
    pub name: String,
    /// Setting value (`None` stores a null).
    pub value: Option<String>,
}

impl SettingRow {
    /// Creates a row.
    #[must_use]
    pub fn new(name: impl Into<String>, value: Option<String>) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

impl TryFrom<&RowValues> for SettingRow {
    type Error = SettingsError;

    fn try_from(values: &RowValues) -> Result<Self, Self::Error> {
        if values.contains(Column::Id) {
            return Err(SettingsError::InvalidArgument("row id cannot be assigned".to_string()));
        }
        let Some(name) = values.name() else {
            return Err(SettingsError::InvalidArgument("row requires a non-null name".to_string()));
        };
        Ok(Self::new(name, values.value().map(str::to_string)))
    }
}

/// Column assignments applied by an update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowUpdate {
    /// New setting name, when assigned.
    pub name: Option<String>,
    /// New setting value, when assigned (`Some(None)` stores a null).
    pub value: Option<Option<String>>,
}

impl TryFrom<&RowValues> for RowUpdate {
    type Error = SettingsError;

    fn try_from(values: &RowValues) -> Result<Self, Self::Error> {
        if values.is_empty() {
            return Err(SettingsError::InvalidArgument("update values cannot be empty".to_string()));
        }
        if values.contains(Column::Id) {
            return Err(SettingsError::InvalidArgument("row id cannot be assigned".to_string()));
        }
        let name = match values.get(Column::Name) {
            None => None,
            Some(Some(name)) => Some(name.to_string()),
            Some(None) => {
                return Err(SettingsError::InvalidArgument("name cannot be set to null".to_string()));
            }
        };
        let value = values.get(Column::Value).map(|value| value.map(str::to_string));
        Ok(Self {
            name,
            value,
        })
    }
}

/// Row as stored in a namespace table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingRecord {
    /// Autoincrement row id.
    pub id: i64,
    /// Unique setting name.
    pub name: String,
    /// Nullable setting value.
    pub value: Option<String>,
}

impl SettingRecord {
    /// Returns the record's cell for `column`.
    #[must_use]
    pub fn cell(&self, column: Column) -> Cell {
        match column {
            Column::Id => Cell::Integer(self.id),
            Column::Name => Cell::Text(self.name.clone()),
            Column::Value => self.value.clone().map_or(Cell::Null, Cell::Text),
        }
    }

    /// Projects the record onto `columns`.
    #[must_use]
    pub fn project(&self, columns: &[Column]) -> Vec<Cell> {
        columns.iter().map(|column| self.cell(*column)).collect()
    }
}

// ============================================================================
// SECTION: Results
// ============================================================================

/// Single cell of a query result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cell {
    /// Integer cell (row ids).
    Integer(i64),
    /// Text cell.
    Text(String),
    /// Null cell.
    Null,
}

impl Cell {
    /// Returns the text content, if this is a text cell.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(value) => Some(value),
            Self::Integer(_) | Self::Null => None,
        }
    }
}

/// Projected query result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowSet {
    /// Projected columns, in order.
    pub columns: Vec<Column>,
    /// Projected rows.
    pub rows: Vec<Vec<Cell>>,
    /// Identifier observers should watch for changes to this result.
    pub notification_uri: SettingsUri,
    /// User whose change events cover this result.
    pub notification_user: UserId,
}

impl RowSet {
    /// Returns the number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true when no rows matched.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Returns the cell at `row` for `column`, if projected.
    #[must_use]
    pub fn cell(&self, row: usize, column: Column) -> Option<&Cell> {
        let index = self.columns.iter().position(|candidate| *candidate == column)?;
        self.rows.get(row)?.get(index)
    }

    /// Returns the text cell at `row` for `column`, if projected and non-null.
    #[must_use]
    pub fn text(&self, row: usize, column: Column) -> Option<&str> {
        self.cell(row, column).and_then(Cell::as_text)
    }
}

/// Outcome of a single-setting lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    /// Row exists with a value.
    Found(String),
    /// Row exists with a null value.
    FoundNull,
    /// No row with that name.
    Missing,
}

impl Lookup {
    /// Returns the value when found and non-null.
    #[must_use]
    pub fn value(&self) -> Option<&str> {
        match self {
            Self::Found(value) => Some(value),
            Self::FoundNull | Self::Missing => None,
        }
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
