//! Dynamically typed rows
//!
//! The repository boundary works in terms of `Row`: an ordered mapping from
//! column name to a loosely typed scalar. Catalog managers convert rows to
//! strongly typed entities immediately after loading; loose rows never leak
//! past that boundary.
//!
//! An absent column and an explicit SQL NULL are different things at the
//! driver level, but the safe accessors treat both as "use the default".

use chrono::{DateTime, NaiveDateTime, Utc};

/// A single dynamically typed database scalar
#[derive(Debug, Clone, PartialEq)]
pub enum DbValue {
    Int(i64),
    Float(f64),
    Text(String),
    Bool(bool),
    Timestamp(DateTime<Utc>),
    Null,
}

impl DbValue {
    pub fn is_null(&self) -> bool {
        matches!(self, DbValue::Null)
    }
}

impl From<i64> for DbValue {
    fn from(v: i64) -> Self {
        DbValue::Int(v)
    }
}

impl From<i32> for DbValue {
    fn from(v: i32) -> Self {
        DbValue::Int(v as i64)
    }
}

impl From<f64> for DbValue {
    fn from(v: f64) -> Self {
        DbValue::Float(v)
    }
}

impl From<&str> for DbValue {
    fn from(v: &str) -> Self {
        DbValue::Text(v.to_string())
    }
}

impl From<String> for DbValue {
    fn from(v: String) -> Self {
        DbValue::Text(v)
    }
}

impl From<bool> for DbValue {
    fn from(v: bool) -> Self {
        DbValue::Bool(v)
    }
}

impl From<DateTime<Utc>> for DbValue {
    fn from(v: DateTime<Utc>) -> Self {
        DbValue::Timestamp(v)
    }
}

impl<T> From<Option<T>> for DbValue
where
    T: Into<DbValue>,
{
    fn from(v: Option<T>) -> Self {
        match v {
            Some(v) => v.into(),
            None => DbValue::Null,
        }
    }
}

/// An ordered column-name → scalar mapping
///
/// Insertion order is preserved so generated SQL lists columns in a stable
/// order. Column names are unique; setting an existing name replaces the
/// value in place.
#[derive(Debug, Clone, Default)]
pub struct Row {
    columns: Vec<(String, DbValue)>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a column value, replacing any existing value for that name
    pub fn set(&mut self, name: &str, value: impl Into<DbValue>) {
        let value = value.into();
        if let Some(slot) = self.columns.iter_mut().find(|(n, _)| n == name) {
            slot.1 = value;
        } else {
            self.columns.push((name.to_string(), value));
        }
    }

    /// Builder-style `set`
    pub fn with(mut self, name: &str, value: impl Into<DbValue>) -> Self {
        self.set(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&DbValue> {
        self.columns
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.columns.iter().any(|(n, _)| n == name)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Column names in insertion order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(n, _)| n.as_str())
    }

    /// Values in insertion order
    pub fn values(&self) -> impl Iterator<Item = &DbValue> {
        self.columns.iter().map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &DbValue)> {
        self.columns.iter().map(|(n, v)| (n.as_str(), v))
    }

    // ========================================================================
    // Safe accessors
    //
    // Missing column and explicit NULL both yield the caller's default.
    // Cross-kind coercions follow SQLite affinity (integer↔real, 0/1↔bool,
    // RFC 3339 / "YYYY-MM-DD HH:MM:SS" text↔timestamp).
    // ========================================================================

    pub fn int_or(&self, name: &str, default: i64) -> i64 {
        match self.get(name) {
            Some(DbValue::Int(v)) => *v,
            Some(DbValue::Float(v)) => *v as i64,
            Some(DbValue::Bool(v)) => *v as i64,
            Some(DbValue::Text(s)) => s.parse().unwrap_or(default),
            _ => default,
        }
    }

    pub fn float_or(&self, name: &str, default: f64) -> f64 {
        match self.get(name) {
            Some(DbValue::Float(v)) => *v,
            Some(DbValue::Int(v)) => *v as f64,
            Some(DbValue::Text(s)) => s.parse().unwrap_or(default),
            _ => default,
        }
    }

    pub fn text_or(&self, name: &str, default: &str) -> String {
        match self.get(name) {
            Some(DbValue::Text(s)) => s.clone(),
            Some(DbValue::Int(v)) => v.to_string(),
            Some(DbValue::Float(v)) => v.to_string(),
            _ => default.to_string(),
        }
    }

    pub fn bool_or(&self, name: &str, default: bool) -> bool {
        match self.get(name) {
            Some(DbValue::Bool(v)) => *v,
            Some(DbValue::Int(v)) => *v != 0,
            _ => default,
        }
    }

    pub fn timestamp_or(&self, name: &str, default: DateTime<Utc>) -> DateTime<Utc> {
        self.timestamp(name).unwrap_or(default)
    }

    /// Timestamp, or `None` when the column is missing, NULL, or unparseable
    pub fn timestamp(&self, name: &str) -> Option<DateTime<Utc>> {
        match self.get(name) {
            Some(DbValue::Timestamp(t)) => Some(*t),
            Some(DbValue::Text(s)) => parse_timestamp(s),
            _ => None,
        }
    }

    /// A positive integer identifier, or `None` when the column is missing,
    /// NULL, or not coercible — the per-row invalid-ID case
    pub fn id(&self, name: &str) -> Option<i64> {
        let id = match self.get(name)? {
            DbValue::Int(v) => *v,
            DbValue::Float(v) => *v as i64,
            DbValue::Text(s) => s.parse().ok()?,
            _ => return None,
        };
        (id > 0).then_some(id)
    }
}

fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(t) = DateTime::parse_from_rfc3339(s) {
        return Some(t.with_timezone(&Utc));
    }
    // SQLite CURRENT_TIMESTAMP format
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|t| t.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn missing_key_yields_default_for_every_kind() {
        let row = Row::new();
        let epoch = Utc.timestamp_opt(0, 0).unwrap();
        assert_eq!(row.int_or("n", 7), 7);
        assert_eq!(row.float_or("n", 1.5), 1.5);
        assert_eq!(row.text_or("n", "fallback"), "fallback");
        assert!(row.bool_or("n", true));
        assert_eq!(row.timestamp_or("n", epoch), epoch);
    }

    #[test]
    fn explicit_null_yields_default_for_every_kind() {
        let row = Row::new().with("n", DbValue::Null);
        let epoch = Utc.timestamp_opt(0, 0).unwrap();
        assert_eq!(row.int_or("n", 7), 7);
        assert_eq!(row.float_or("n", 1.5), 1.5);
        assert_eq!(row.text_or("n", "fallback"), "fallback");
        assert!(!row.bool_or("n", false));
        assert_eq!(row.timestamp_or("n", epoch), epoch);
    }

    #[test]
    fn accessors_coerce_across_kinds() {
        let row = Row::new()
            .with("count", 3i64)
            .with("ratio", 2.9f64)
            .with("flag", 1i64)
            .with("textual", "42");
        assert_eq!(row.float_or("count", 0.0), 3.0);
        assert_eq!(row.int_or("ratio", 0), 2);
        assert!(row.bool_or("flag", false));
        assert_eq!(row.int_or("textual", 0), 42);
    }

    #[test]
    fn set_replaces_in_place_and_preserves_order() {
        let mut row = Row::new().with("a", 1i64).with("b", 2i64);
        row.set("a", 10i64);
        let names: Vec<_> = row.names().collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(row.int_or("a", 0), 10);
        assert_eq!(row.len(), 2);
    }

    #[test]
    fn id_rejects_null_zero_and_garbage() {
        assert_eq!(Row::new().id("id"), None);
        assert_eq!(Row::new().with("id", DbValue::Null).id("id"), None);
        assert_eq!(Row::new().with("id", 0i64).id("id"), None);
        assert_eq!(Row::new().with("id", -4i64).id("id"), None);
        assert_eq!(Row::new().with("id", "junk").id("id"), None);
        assert_eq!(Row::new().with("id", 12i64).id("id"), Some(12));
    }

    #[test]
    fn timestamp_parses_rfc3339_and_sqlite_text() {
        let row = Row::new()
            .with("a", "2024-03-01T12:30:00Z")
            .with("b", "2024-03-01 12:30:00");
        assert_eq!(row.timestamp("a"), row.timestamp("b"));
        assert!(row.timestamp("a").is_some());
    }
}
