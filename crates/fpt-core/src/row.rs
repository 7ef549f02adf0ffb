//! Row records exchanged with the remote store.
//!
//! A row is a JSON object keyed by column name. Scalar values (including
//! `null`) are carried verbatim so a snapshot can be restored byte-for-byte.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

/// One record of a remote table.
pub type Row = Map<String, Value>;

/// Read a column as a string slice.
#[must_use]
pub fn text<'a>(row: &'a Row, column: &str) -> Option<&'a str> {
    row.get(column).and_then(Value::as_str)
}

/// Read a column as a boolean. Missing or non-boolean values read as `false`.
#[must_use]
pub fn flag(row: &Row, column: &str) -> bool {
    row.get(column).and_then(Value::as_bool).unwrap_or(false)
}

/// Read a column as an RFC 3339 timestamp.
#[must_use]
pub fn timestamp(row: &Row, column: &str) -> Option<DateTime<Utc>> {
    text(row, column)
        .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
        .map(|ts| ts.with_timezone(&Utc))
}

/// Build a row from `(column, value)` pairs.
pub fn from_pairs<I, K>(pairs: I) -> Row
where
    I: IntoIterator<Item = (K, Value)>,
    K: Into<String>,
{
    pairs.into_iter().map(|(k, v)| (k.into(), v)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn reads_typed_columns() {
        let row = from_pairs([
            ("id", json!("t-1")),
            ("done", json!(true)),
            ("due_date", json!("2026-10-18T08:00:00+02:00")),
        ]);
        assert_eq!(text(&row, "id"), Some("t-1"));
        assert!(flag(&row, "done"));
        assert!(!flag(&row, "missing"));
        let due = timestamp(&row, "due_date").unwrap();
        assert_eq!(due.to_rfc3339(), "2026-10-18T06:00:00+00:00");
    }

    #[test]
    fn null_and_malformed_timestamps_read_as_none() {
        let row = from_pairs([("a", Value::Null), ("b", json!("yesterday"))]);
        assert_eq!(timestamp(&row, "a"), None);
        assert_eq!(timestamp(&row, "b"), None);
    }
}
