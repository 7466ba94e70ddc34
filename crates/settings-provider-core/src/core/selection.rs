// crates/settings-provider-core/src/core/selection.rs
// ============================================================================
// Module: Row Selection
// Description: Typed row predicates with positional arguments and sort orders.
// Purpose: Describe filters without constructing raw query strings.
// Dependencies: crate::core
// ============================================================================

//! ## Overview
//! Callers describe which rows an operation targets with a [`Selection`]: a
//! [`Filter`] tree whose operands may reference positional arguments, plus the
//! argument list. Binding resolves every argument reference and yields a
//! [`Predicate`], which storage engines either evaluate directly or compile
//! into their own query language.
//!
//! Predicates use three-valued logic: a comparison against a null column is
//! unknown, and only rows whose predicate is definitely true match.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::cmp::Ordering;

use serde::Deserialize;
use serde::Serialize;

use crate::core::error::SettingsError;
use crate::core::rows::Column;
use crate::core::rows::SettingRecord;

// ============================================================================
// SECTION: Unbound Filters
// ============================================================================

/// Filter operand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operand {
    /// Positional argument reference (zero-based).
    Arg(usize),
    /// Inline literal; `None` is a null literal.
    Literal(Option<String>),
}

/// Filter tree with unresolved argument references.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Filter {
    /// Column equals operand.
    Eq(Column, Operand),
    /// Column differs from operand.
    NotEq(Column, Operand),
    /// Column matches a `%`/`_` pattern, ASCII case-insensitive.
    Like(Column, Operand),
    /// Column equals any operand.
    In(Column, Vec<Operand>),
    /// Column is null.
    IsNull(Column),
    /// Column is not null.
    IsNotNull(Column),
    /// All filters hold.
    And(Vec<Filter>),
    /// Any filter holds.
    Or(Vec<Filter>),
    /// Filter does not hold.
    Not(Box<Filter>),
}

impl Filter {
    /// Resolves argument references against `args`.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::InvalidArgument`] when an argument index is out
    /// of range or a pattern operand is null.
    pub fn bind(&self, args: &[String]) -> Result<Predicate, SettingsError> {
        match self {
            Self::Eq(column, operand) => Ok(match resolve(operand, args)? {
                Some(value) => Predicate::Eq(*column, value),
                None => Predicate::IsNull(*column),
            }),
            Self::NotEq(column, operand) => Ok(match resolve(operand, args)? {
                Some(value) => Predicate::NotEq(*column, value),
                None => Predicate::IsNotNull(*column),
            }),
            Self::Like(column, operand) => {
                let pattern = resolve(operand, args)?.ok_or_else(|| {
                    SettingsError::InvalidArgument("like pattern cannot be null".to_string())
                })?;
                Ok(Predicate::Like(*column, pattern))
            }
            Self::In(column, operands) => {
                let mut values = Vec::with_capacity(operands.len());
                for operand in operands {
                    let value = resolve(operand, args)?.ok_or_else(|| {
                        SettingsError::InvalidArgument("in-list values cannot be null".to_string())
                    })?;
                    values.push(value);
                }
                Ok(Predicate::In(*column, values))
            }
            Self::IsNull(column) => Ok(Predicate::IsNull(*column)),
            Self::IsNotNull(column) => Ok(Predicate::IsNotNull(*column)),
            Self::And(filters) => Ok(Predicate::And(bind_all(filters, args)?)),
            Self::Or(filters) => Ok(Predicate::Or(bind_all(filters, args)?)),
            Self::Not(filter) => Ok(Predicate::Not(Box::new(filter.bind(args)?))),
        }
    }
}

/// Resolves one operand.
fn resolve(operand: &Operand, args: &[String]) -> Result<Option<String>, SettingsError> {
    match operand {
        Operand::Literal(value) => Ok(value.clone()),
        Operand::Arg(index) => args.get(*index).cloned().map(Some).ok_or_else(|| {
            SettingsError::InvalidArgument(format!(
                "selection references argument {index} but {} were supplied",
                args.len()
            ))
        }),
    }
}

/// Binds a list of filters.
fn bind_all(filters: &[Filter], args: &[String]) -> Result<Vec<Predicate>, SettingsError> {
    filters.iter().map(|filter| filter.bind(args)).collect()
}

// ============================================================================
// SECTION: Selection
// ============================================================================

/// Caller-supplied filter plus its positional arguments.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    /// Filter tree; `None` selects every row.
    pub filter: Option<Filter>,
    /// Positional argument values.
    pub args: Vec<String>,
}

impl Selection {
    /// Selection without filter or arguments.
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// Creates a selection from a filter and its arguments.
    #[must_use]
    pub const fn new(filter: Filter, args: Vec<String>) -> Self {
        Self {
            filter: Some(filter),
            args,
        }
    }

    /// Selects the row named `name` through a bound argument.
    #[must_use]
    pub fn name_equals(name: impl Into<String>) -> Self {
        Self::new(Filter::Eq(Column::Name, Operand::Arg(0)), vec![name.into()])
    }

    /// Returns true when the filter or the argument list is missing.
    #[must_use]
    pub const fn is_unbound(&self) -> bool {
        self.filter.is_none() || self.args.is_empty()
    }

    /// Binds the filter, if any.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::InvalidArgument`] when binding fails.
    pub fn bind(&self) -> Result<Option<Predicate>, SettingsError> {
        self.filter.as_ref().map(|filter| filter.bind(&self.args)).transpose()
    }
}

// ============================================================================
// SECTION: Bound Predicates
// ============================================================================

/// Fully bound row predicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    /// Column equals value.
    Eq(Column, String),
    /// Column differs from value.
    NotEq(Column, String),
    /// Column matches pattern.
    Like(Column, String),
    /// Column equals any value.
    In(Column, Vec<String>),
    /// Column is null.
    IsNull(Column),
    /// Column is not null.
    IsNotNull(Column),
    /// All predicates hold.
    And(Vec<Predicate>),
    /// Any predicate holds.
    Or(Vec<Predicate>),
    /// Predicate does not hold.
    Not(Box<Predicate>),
}

impl Predicate {
    /// Selects the row named `name`.
    #[must_use]
    pub fn name_equals(name: impl Into<String>) -> Self {
        Self::Eq(Column::Name, name.into())
    }

    /// Returns the conjunction of `self` and `other`.
    #[must_use]
    pub fn and(self, other: Self) -> Self {
        match self {
            Self::And(mut predicates) => {
                predicates.push(other);
                Self::And(predicates)
            }
            predicate => Self::And(vec![predicate, other]),
        }
    }

    /// Evaluates the predicate with three-valued logic (`None` is unknown).
    #[must_use]
    pub fn evaluate(&self, record: &SettingRecord) -> Option<bool> {
        match self {
            Self::Eq(column, value) => compare(record, *column, value).map(Ordering::is_eq),
            Self::NotEq(column, value) => compare(record, *column, value).map(Ordering::is_ne),
            Self::Like(column, pattern) => {
                column_text(record, *column).map(|text| like_matches(pattern, &text))
            }
            Self::In(column, values) => {
                let mut outcome = Some(false);
                for value in values {
                    match compare(record, *column, value) {
                        Some(Ordering::Equal) => return Some(true),
                        Some(_) => {}
                        None => outcome = None,
                    }
                }
                outcome
            }
            Self::IsNull(column) => Some(column_text(record, *column).is_none()),
            Self::IsNotNull(column) => Some(column_text(record, *column).is_some()),
            Self::And(predicates) => {
                let mut outcome = Some(true);
                for predicate in predicates {
                    match predicate.evaluate(record) {
                        Some(false) => return Some(false),
                        Some(true) => {}
                        None => outcome = None,
                    }
                }
                outcome
            }
            Self::Or(predicates) => {
                let mut outcome = Some(false);
                for predicate in predicates {
                    match predicate.evaluate(record) {
                        Some(true) => return Some(true),
                        Some(false) => {}
                        None => outcome = None,
                    }
                }
                outcome
            }
            Self::Not(predicate) => predicate.evaluate(record).map(|value| !value),
        }
    }

    /// Returns true when the predicate definitely holds for `record`.
    #[must_use]
    pub fn matches(&self, record: &SettingRecord) -> bool {
        self.evaluate(record) == Some(true)
    }
}

/// Returns the column's text form, `None` for null.
fn column_text(record: &SettingRecord, column: Column) -> Option<String> {
    match column {
        Column::Id => Some(record.id.to_string()),
        Column::Name => Some(record.name.clone()),
        Column::Value => record.value.clone(),
    }
}

/// Compares a column against a bound value. Row ids compare numerically and
/// never equal a non-numeric value.
fn compare(record: &SettingRecord, column: Column, value: &str) -> Option<Ordering> {
    match column {
        Column::Id => Some(compare_row_id(record.id, value)),
        Column::Name => Some(record.name.as_str().cmp(value)),
        Column::Value => record.value.as_deref().map(|text| text.cmp(value)),
    }
}

/// Compares a row id with text under numeric affinity: integer and real
/// literals convert, anything else stays text and sorts after every number.
#[allow(clippy::cast_precision_loss, reason = "Row ids compare against real literals as f64.")]
fn compare_row_id(id: i64, value: &str) -> Ordering {
    let text = value.trim();
    if let Ok(other) = text.parse::<i64>() {
        return id.cmp(&other);
    }
    if is_real_literal(text)
        && let Ok(other) = text.parse::<f64>()
        && let Some(ordering) = (id as f64).partial_cmp(&other)
    {
        return ordering;
    }
    Ordering::Less
}

/// Returns true for decimal real literals such as `2.0`, `.5` or `3e0`.
fn is_real_literal(text: &str) -> bool {
    text.bytes().any(|byte| byte.is_ascii_digit())
        && text.bytes().all(|byte| byte.is_ascii_digit() || matches!(byte, b'.' | b'e' | b'E' | b'+' | b'-'))
}

/// Matches `text` against a LIKE pattern (`%` any run, `_` any one char).
fn like_matches(pattern: &str, text: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().map(|c| c.to_ascii_lowercase()).collect();
    let text: Vec<char> = text.chars().map(|c| c.to_ascii_lowercase()).collect();
    // reachable[j]: pattern prefix consumed so far matches text[..j]
    let mut reachable = vec![false; text.len() + 1];
    reachable[0] = true;
    for token in pattern {
        let mut next = vec![false; text.len() + 1];
        match token {
            '%' => {
                let mut seen = false;
                for (j, slot) in next.iter_mut().enumerate() {
                    seen = seen || reachable[j];
                    *slot = seen;
                }
            }
            _ => {
                for j in 0..text.len() {
                    if reachable[j] && (token == '_' || token == text[j]) {
                        next[j + 1] = true;
                    }
                }
            }
        }
        reachable = next;
    }
    reachable[text.len()]
}

// ============================================================================
// SECTION: Sorting
// ============================================================================

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    /// Smallest first; nulls sort first.
    Ascending,
    /// Largest first; nulls sort last.
    Descending,
}

/// Requested result ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortOrder {
    /// Sort column.
    pub column: Column,
    /// Sort direction.
    pub direction: SortDirection,
}

impl SortOrder {
    /// Ascending order on `column`.
    #[must_use]
    pub const fn ascending(column: Column) -> Self {
        Self {
            column,
            direction: SortDirection::Ascending,
        }
    }

    /// Descending order on `column`.
    #[must_use]
    pub const fn descending(column: Column) -> Self {
        Self {
            column,
            direction: SortDirection::Descending,
        }
    }

    /// Orders two records; ties fall back to ascending row id.
    #[must_use]
    pub fn compare(&self, left: &SettingRecord, right: &SettingRecord) -> Ordering {
        let primary = match self.column {
            Column::Id => left.id.cmp(&right.id),
            Column::Name => left.name.cmp(&right.name),
            Column::Value => left.value.cmp(&right.value),
        };
        let primary = match self.direction {
            SortDirection::Ascending => primary,
            SortDirection::Descending => primary.reverse(),
        };
        primary.then(left.id.cmp(&right.id))
    }
}

/// Orders `records` by `sort`, or by row id when no sort is requested.
pub fn sort_records(records: &mut [SettingRecord], sort: Option<&SortOrder>) {
    match sort {
        Some(order) => records.sort_by(|left, right| order.compare(left, right)),
        None => records.sort_by_key(|record| record.id),
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
