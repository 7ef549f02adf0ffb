//! Filtered table queries.
//!
//! A [`Query`] renders to PostgREST query parameters for [`crate::RestStore`]
//! and is evaluated directly against rows by [`crate::MemoryStore`].

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use fpt_core::row::Row;
use serde_json::Value;

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    Asc,
    Desc,
}

impl Order {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

/// One column predicate.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Eq(String, Value),
    Neq(String, Value),
    Gte(String, Value),
    Lt(String, Value),
    Lte(String, Value),
    NotNull(String),
}

impl Filter {
    fn column(&self) -> &str {
        match self {
            Self::Eq(c, _)
            | Self::Neq(c, _)
            | Self::Gte(c, _)
            | Self::Lt(c, _)
            | Self::Lte(c, _)
            | Self::NotNull(c) => c,
        }
    }

    /// PostgREST operator expression (`eq.sent`, `not.is.null`, ...).
    fn expression(&self) -> String {
        match self {
            Self::Eq(_, v) => format!("eq.{}", literal(v)),
            Self::Neq(_, v) => format!("neq.{}", literal(v)),
            Self::Gte(_, v) => format!("gte.{}", literal(v)),
            Self::Lt(_, v) => format!("lt.{}", literal(v)),
            Self::Lte(_, v) => format!("lte.{}", literal(v)),
            Self::NotNull(_) => "not.is.null".to_string(),
        }
    }

    /// Evaluate against a row. Missing columns read as `null`, and `null`
    /// never satisfies a comparison.
    #[must_use]
    pub fn matches(&self, row: &Row) -> bool {
        let actual = row.get(self.column()).unwrap_or(&Value::Null);
        match self {
            Self::Eq(_, v) => compare(actual, v) == Some(Ordering::Equal),
            Self::Neq(_, v) => {
                !actual.is_null() && compare(actual, v) != Some(Ordering::Equal)
            }
            Self::Gte(_, v) => matches!(
                compare(actual, v),
                Some(Ordering::Greater | Ordering::Equal)
            ),
            Self::Lt(_, v) => compare(actual, v) == Some(Ordering::Less),
            Self::Lte(_, v) => matches!(compare(actual, v), Some(Ordering::Less | Ordering::Equal)),
            Self::NotNull(_) => !actual.is_null(),
        }
    }
}

fn literal(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn as_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    value
        .as_str()
        .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
        .map(|ts| ts.with_timezone(&Utc))
}

/// Order two JSON scalars the way Postgres would for the common column types.
/// Timestamps compare chronologically, numbers numerically.
#[must_use]
pub fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Null, _) | (_, Value::Null) => None,
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        (Value::String(x), Value::String(y)) => match (as_timestamp(a), as_timestamp(b)) {
            (Some(tx), Some(ty)) => Some(tx.cmp(&ty)),
            _ => Some(x.cmp(y)),
        },
        _ => None,
    }
}

/// A filtered read of one table.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub table: String,
    pub columns: Option<String>,
    pub filters: Vec<Filter>,
    pub order: Option<(String, Order)>,
    pub limit: Option<usize>,
}

impl Query {
    #[must_use]
    pub fn table(table: &str) -> Self {
        Self {
            table: table.to_string(),
            columns: None,
            filters: Vec::new(),
            order: None,
            limit: None,
        }
    }

    /// Comma-separated column list (`id,name`). Defaults to `*`.
    #[must_use]
    pub fn columns(mut self, columns: &str) -> Self {
        self.columns = Some(columns.to_string());
        self
    }

    #[must_use]
    pub fn eq(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.filters.push(Filter::Eq(column.to_string(), value.into()));
        self
    }

    #[must_use]
    pub fn neq(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.filters.push(Filter::Neq(column.to_string(), value.into()));
        self
    }

    #[must_use]
    pub fn gte(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.filters.push(Filter::Gte(column.to_string(), value.into()));
        self
    }

    #[must_use]
    pub fn lt(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.filters.push(Filter::Lt(column.to_string(), value.into()));
        self
    }

    #[must_use]
    pub fn lte(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.filters.push(Filter::Lte(column.to_string(), value.into()));
        self
    }

    #[must_use]
    pub fn not_null(mut self, column: &str) -> Self {
        self.filters.push(Filter::NotNull(column.to_string()));
        self
    }

    #[must_use]
    pub fn order(mut self, column: &str, order: Order) -> Self {
        self.order = Some((column.to_string(), order));
        self
    }

    #[must_use]
    pub const fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// True when every filter accepts the row.
    #[must_use]
    pub fn matches(&self, row: &Row) -> bool {
        self.filters.iter().all(|f| f.matches(row))
    }

    /// Filter, sort and truncate rows in memory.
    #[must_use]
    pub fn apply<'a, I>(&self, rows: I) -> Vec<Row>
    where
        I: IntoIterator<Item = &'a Row>,
    {
        let mut selected: Vec<Row> = rows.into_iter().filter(|r| self.matches(r)).cloned().collect();
        if let Some((column, order)) = &self.order {
            selected.sort_by(|a, b| {
                let left = a.get(column).unwrap_or(&Value::Null);
                let right = b.get(column).unwrap_or(&Value::Null);
                // Postgres sorts nulls last ascending, first descending.
                let ordering = match (left.is_null(), right.is_null()) {
                    (true, true) => Ordering::Equal,
                    (true, false) => Ordering::Greater,
                    (false, true) => Ordering::Less,
                    (false, false) => compare(left, right).unwrap_or(Ordering::Equal),
                };
                match order {
                    Order::Asc => ordering,
                    Order::Desc => ordering.reverse(),
                }
            });
        }
        if let Some(limit) = self.limit {
            selected.truncate(limit);
        }
        if let Some(columns) = &self.columns {
            let keep: Vec<&str> = columns.split(',').map(str::trim).collect();
            if !keep.contains(&"*") {
                for row in &mut selected {
                    row.retain(|k, _| keep.contains(&k.as_str()));
                }
            }
        }
        selected
    }

    /// PostgREST query-string pairs, filters included.
    #[must_use]
    pub fn to_params(&self) -> Vec<(String, String)> {
        let mut params = vec![(
            "select".to_string(),
            self.columns.clone().unwrap_or_else(|| "*".to_string()),
        )];
        params.extend(
            self.filters
                .iter()
                .map(|f| (f.column().to_string(), f.expression())),
        );
        if let Some((column, order)) = &self.order {
            params.push(("order".to_string(), format!("{column}.{}", order.as_str())));
        }
        if let Some(limit) = self.limit {
            params.push(("limit".to_string(), limit.to_string()));
        }
        params
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fpt_core::row::from_pairs;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn tasks() -> Vec<Row> {
        vec![
            from_pairs([
                ("id", json!("t-1")),
                ("status", json!("completed")),
                ("due_date", json!("2026-10-20T09:00:00Z")),
            ]),
            from_pairs([
                ("id", json!("t-2")),
                ("status", json!("in_progress")),
                ("due_date", json!("2026-10-19T09:00:00+00:00")),
            ]),
            from_pairs([
                ("id", json!("t-3")),
                ("status", json!("todo")),
                ("due_date", Value::Null),
            ]),
        ]
    }

    #[test]
    fn renders_postgrest_params() {
        let query = Query::table("tasks")
            .columns("id,name")
            .neq("status", "completed")
            .gte("due_date", "2026-10-18T00:00:00Z")
            .not_null("assigned_to")
            .order("due_date", Order::Asc)
            .limit(5);

        assert_eq!(
            query.to_params(),
            vec![
                ("select".to_string(), "id,name".to_string()),
                ("status".to_string(), "neq.completed".to_string()),
                ("due_date".to_string(), "gte.2026-10-18T00:00:00Z".to_string()),
                ("assigned_to".to_string(), "not.is.null".to_string()),
                ("order".to_string(), "due_date.asc".to_string()),
                ("limit".to_string(), "5".to_string()),
            ]
        );
    }

    #[test]
    fn neq_excludes_nulls() {
        let rows = tasks();
        let selected = Query::table("tasks").neq("due_date", "x").apply(&rows);
        assert_eq!(selected.len(), 2);
    }

    #[test]
    fn timestamps_compare_chronologically_across_offsets() {
        let rows = tasks();
        let selected = Query::table("tasks")
            .neq("status", "completed")
            .not_null("due_date")
            .order("due_date", Order::Asc)
            .apply(&rows);

        let ids: Vec<_> = selected.iter().map(|r| r["id"].clone()).collect();
        assert_eq!(ids, vec![json!("t-2")]);

        let before = Query::table("tasks")
            .lt("due_date", "2026-10-19T10:00:00Z")
            .apply(&rows);
        assert_eq!(before.len(), 1);
    }

    #[test]
    fn nulls_sort_last_ascending() {
        let rows = tasks();
        let selected = Query::table("tasks")
            .order("due_date", Order::Asc)
            .columns("id")
            .apply(&rows);

        let ids: Vec<_> = selected.iter().map(|r| r["id"].clone()).collect();
        assert_eq!(ids, vec![json!("t-2"), json!("t-1"), json!("t-3")]);
        assert_eq!(selected[0].len(), 1);
    }
}
