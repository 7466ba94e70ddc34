// crates/settings-provider-store-sqlite/src/sql.rs
// ============================================================================
// Module: SQL Rendering
// Description: Renders bound predicates and sort orders as SQLite clauses.
// Purpose: Keep caller values out of SQL text.
// Dependencies: settings-provider-core
// ============================================================================

//! ## Overview
//! Predicates become parameterized `WHERE` clauses: column names come from the
//! closed [`Column`] set and every caller value is bound as a positional
//! parameter. `SQLite` applies numeric affinity when a text parameter is
//! compared with the integer row id (so `'2.0'` matches row 2), and its `LIKE`
//! is ASCII case-insensitive; [`Predicate::evaluate`] follows both rules.

// ============================================================================
// SECTION: Imports
// ============================================================================

use settings_provider_core::Column;
use settings_provider_core::Predicate;
use settings_provider_core::SortDirection;
use settings_provider_core::SortOrder;

// ============================================================================
// SECTION: Rendering
// ============================================================================

/// Rendered condition plus its positional parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition {
    /// SQL text using `?` placeholders.
    pub sql: String,
    /// Parameters in placeholder order.
    pub params: Vec<String>,
}

/// Renders `predicate` as a `WHERE` condition.
#[must_use]
pub fn condition(predicate: &Predicate) -> Condition {
    let mut sql = String::new();
    let mut params = Vec::new();
    render(predicate, &mut sql, &mut params);
    Condition {
        sql,
        params,
    }
}

/// Renders an `ORDER BY` clause; ties fall back to ascending row id.
#[must_use]
pub fn order_by(sort: Option<&SortOrder>) -> String {
    match sort {
        None => format!("ORDER BY {}", quoted(Column::Id)),
        Some(order) => {
            let direction = match order.direction {
                SortDirection::Ascending => "ASC",
                SortDirection::Descending => "DESC",
            };
            format!("ORDER BY {} {direction}, {} ASC", quoted(order.column), quoted(Column::Id))
        }
    }
}

/// Returns the quoted column identifier.
fn quoted(column: Column) -> String {
    format!("\"{}\"", column.as_str())
}

/// Appends one predicate.
fn render(predicate: &Predicate, sql: &mut String, params: &mut Vec<String>) {
    match predicate {
        Predicate::Eq(column, value) => binary(*column, "=", value, sql, params),
        Predicate::NotEq(column, value) => binary(*column, "!=", value, sql, params),
        Predicate::Like(column, pattern) => binary(*column, "LIKE", pattern, sql, params),
        Predicate::In(column, values) => {
            if values.is_empty() {
                sql.push('0');
                return;
            }
            let placeholders = vec!["?"; values.len()].join(", ");
            sql.push_str(&format!("{} IN ({placeholders})", quoted(*column)));
            params.extend(values.iter().cloned());
        }
        Predicate::IsNull(column) => sql.push_str(&format!("{} IS NULL", quoted(*column))),
        Predicate::IsNotNull(column) => sql.push_str(&format!("{} IS NOT NULL", quoted(*column))),
        Predicate::And(predicates) => join(predicates, " AND ", "1", sql, params),
        Predicate::Or(predicates) => join(predicates, " OR ", "0", sql, params),
        Predicate::Not(inner) => {
            sql.push_str("NOT (");
            render(inner, sql, params);
            sql.push(')');
        }
    }
}

/// Appends `column <operator> ?`.
fn binary(column: Column, operator: &str, value: &str, sql: &mut String, params: &mut Vec<String>) {
    sql.push_str(&format!("{} {operator} ?", quoted(column)));
    params.push(value.to_string());
}

/// Appends a parenthesized conjunction or disjunction; `empty` stands in for
/// an empty list.
fn join(
    predicates: &[Predicate],
    separator: &str,
    empty: &str,
    sql: &mut String,
    params: &mut Vec<String>,
) {
    if predicates.is_empty() {
        sql.push_str(empty);
        return;
    }
    sql.push('(');
    for (index, predicate) in predicates.iter().enumerate() {
        if index > 0 {
            sql.push_str(separator);
        }
        render(predicate, sql, params);
    }
    sql.push(')');
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use settings_provider_core::Column;
    use settings_provider_core::Predicate;
    use settings_provider_core::SortOrder;

    use super::condition;
    use super::order_by;

    #[test]
    fn values_are_bound_not_inlined() {
        let predicate = Predicate::name_equals("x' OR 1=1 --")
            .and(Predicate::In(Column::Value, vec!["a".into(), "b".into()]));
        let rendered = condition(&predicate);
        assert_eq!(rendered.sql, "(\"name\" = ? AND \"value\" IN (?, ?))");
        assert_eq!(rendered.params, vec!["x' OR 1=1 --", "a", "b"]);
    }

    #[test]
    fn empty_lists_render_constants() {
        assert_eq!(condition(&Predicate::In(Column::Name, Vec::new())).sql, "0");
        assert_eq!(condition(&Predicate::And(Vec::new())).sql, "1");
        let negated = condition(&Predicate::Not(Box::new(Predicate::IsNull(Column::Value))));
        assert_eq!(negated.sql, "NOT (\"value\" IS NULL)");
    }

    #[test]
    fn sort_ties_break_on_row_id() {
        assert_eq!(order_by(None), "ORDER BY \"_id\"");
        assert_eq!(
            order_by(Some(&SortOrder::descending(Column::Value))),
            "ORDER BY \"value\" DESC, \"_id\" ASC"
        );
    }
}
