//! Dynamically typed table rows.

use chrono::{NaiveDate, NaiveDateTime};
use std::collections::HashMap;
use std::sync::Arc;

use crate::duration::Duration;
use crate::error::FieldError;

/// A single cell value as produced by a row source.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Str(String),
    Int(i32),
    Float(f64),
    Bool(bool),
    Timestamp(NaiveDateTime),
    Bytes(Vec<u8>),
}

impl Value {
    fn as_text(&self) -> String {
        match self {
            Value::Str(s) => s.clone(),
            Value::Int(n) => n.to_string(),
            Value::Float(f) => f.to_string(),
            Value::Bool(b) => if *b { "Y" } else { "N" }.to_string(),
            Value::Timestamp(t) => t.format("%Y-%m-%d %H:%M").to_string(),
            Value::Bytes(b) => String::from_utf8_lossy(b).into_owned(),
        }
    }
}

/// Timestamp layouts, primary first.
const TIMESTAMP_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H.%M",
    "%Y-%m-%d %H.%M.%S",
    "%Y-%m-%d %H",
];

/// Parse a timestamp in the export layout, falling back through the alternates.
/// A bare date is read as midnight.
pub fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// Ordered, lower-cased column names shared by every row of a table section.
#[derive(Debug)]
pub struct Columns {
    names: Vec<String>,
    index: HashMap<String, usize>,
}

impl Columns {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let names: Vec<String> = names
            .into_iter()
            .map(|n| n.as_ref().to_lowercase())
            .collect();
        let index = names
            .iter()
            .enumerate()
            .map(|(i, n)| (n.clone(), i))
            .collect();
        Self { names, index }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn name(&self, position: usize) -> Option<&str> {
        self.names.get(position).map(|s| s.as_str())
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }
}

#[derive(Debug, Clone)]
pub struct Row {
    columns: Arc<Columns>,
    values: Vec<Option<Value>>,
}

impl Row {
    /// Build a row. Surplus values are dropped and missing trailing values
    /// are absent.
    pub fn new(columns: Arc<Columns>, mut values: Vec<Option<Value>>) -> Self {
        values.resize(columns.len(), None);
        Self { columns, values }
    }

    /// Build a string-valued row from name/value pairs.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let (names, values): (Vec<String>, Vec<Option<Value>>) = pairs
            .into_iter()
            .map(|(k, v)| {
                let v: String = v.into();
                let value = if v.is_empty() { None } else { Some(Value::Str(v)) };
                (k.as_ref().to_string(), value)
            })
            .unzip();
        Self::new(Arc::new(Columns::new(names)), values)
    }

    pub fn columns(&self) -> &Columns {
        &self.columns
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns
            .position(column)
            .and_then(|i| self.values.get(i))
            .and_then(|v| v.as_ref())
    }

    /// Any value rendered as text. Never fails.
    pub fn get_string(&self, column: &str) -> Option<String> {
        self.get(column).map(Value::as_text)
    }

    pub fn get_integer(&self, column: &str) -> Result<Option<i32>, FieldError> {
        match self.get(column) {
            None => Ok(None),
            Some(Value::Int(n)) => Ok(Some(*n)),
            Some(Value::Float(f))
                if f.fract() == 0.0 && (i32::MIN as f64..=i32::MAX as f64).contains(f) =>
            {
                Ok(Some(*f as i32))
            }
            Some(Value::Str(s)) => s
                .trim()
                .parse::<i32>()
                .map(Some)
                .map_err(|_| cast_error(column, "integer", s)),
            Some(other) => Err(cast_error(column, "integer", &other.as_text())),
        }
    }

    pub fn get_double(&self, column: &str) -> Result<Option<f64>, FieldError> {
        match self.get(column) {
            None => Ok(None),
            Some(Value::Float(f)) => Ok(Some(*f)),
            Some(Value::Int(n)) => Ok(Some(f64::from(*n))),
            Some(Value::Str(s)) => s
                .trim()
                .parse::<f64>()
                .map(Some)
                .map_err(|_| cast_error(column, "number", s)),
            Some(other) => Err(cast_error(column, "number", &other.as_text())),
        }
    }

    /// `Y`, `1` and `true` read as true; anything else, including an absent
    /// value, reads as false.
    pub fn get_boolean(&self, column: &str) -> bool {
        match self.get(column) {
            Some(Value::Bool(b)) => *b,
            Some(Value::Int(n)) => *n != 0,
            Some(Value::Float(f)) => *f != 0.0,
            Some(Value::Str(s)) => matches!(s.trim(), "Y" | "y" | "1" | "true" | "TRUE"),
            _ => false,
        }
    }

    pub fn get_date(&self, column: &str) -> Result<Option<NaiveDateTime>, FieldError> {
        match self.get(column) {
            None => Ok(None),
            Some(Value::Timestamp(t)) => Ok(Some(*t)),
            Some(Value::Str(s)) => parse_timestamp(s)
                .map(Some)
                .ok_or_else(|| cast_error(column, "timestamp", s)),
            Some(other) => Err(cast_error(column, "timestamp", &other.as_text())),
        }
    }

    /// A numeric cell read as a duration in hours.
    pub fn get_duration(&self, column: &str) -> Result<Option<Duration>, FieldError> {
        Ok(self.get_double(column)?.map(Duration::hours))
    }
}

fn cast_error(column: &str, expected: &'static str, found: &str) -> FieldError {
    FieldError::Cast {
        column: column.to_string(),
        expected,
        found: found.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(values: Vec<Option<Value>>) -> Row {
        Row::new(Arc::new(Columns::new(["A", "b", "c"])), values)
    }

    #[test]
    fn test_column_names_lowercased() {
        let r = row(vec![Some(Value::Int(1)), None, None]);
        assert_eq!(r.columns().name(0), Some("a"));
        assert_eq!(r.get_integer("a").unwrap(), Some(1));
    }

    #[test]
    fn test_missing_trailing_values_are_absent() {
        let r = row(vec![Some(Value::Int(1))]);
        assert_eq!(r.get("c"), None);
        assert_eq!(r.get_integer("c").unwrap(), None);
    }

    #[test]
    fn test_surplus_values_dropped() {
        let r = row(vec![
            Some(Value::Int(1)),
            Some(Value::Int(2)),
            Some(Value::Int(3)),
            Some(Value::Int(4)),
        ]);
        assert_eq!(r.columns().len(), 3);
        assert_eq!(r.get_integer("c").unwrap(), Some(3));
    }

    #[test]
    fn test_integer_from_unparseable_string_is_error() {
        let r = row(vec![Some(Value::Str("12x".into())), None, None]);
        assert!(matches!(
            r.get_integer("a"),
            Err(FieldError::Cast { expected: "integer", .. })
        ));
        // The text is still there
        assert_eq!(r.get_string("a").as_deref(), Some("12x"));
    }

    #[test]
    fn test_integer_from_float() {
        let r = row(vec![
            Some(Value::Float(7.0)),
            Some(Value::Float(1e12)),
            Some(Value::Float(2.5)),
        ]);
        assert_eq!(r.get_integer("a").unwrap(), Some(7));
        assert!(matches!(r.get_integer("b"), Err(FieldError::Cast { .. })));
        assert!(matches!(r.get_integer("c"), Err(FieldError::Cast { .. })));
    }

    #[test]
    fn test_numeric_strings_coerce() {
        let r = Row::from_pairs([("n", "42"), ("f", "1.5"), ("flag", "Y"), ("empty", "")]);
        assert_eq!(r.get_integer("n").unwrap(), Some(42));
        assert_eq!(r.get_double("f").unwrap(), Some(1.5));
        assert!(r.get_boolean("flag"));
        assert!(!r.get_boolean("empty"));
        assert_eq!(r.get("empty"), None);
    }

    #[test]
    fn test_parse_timestamp_fallbacks() {
        let primary = parse_timestamp("2024-03-04 08:30").unwrap();
        assert_eq!(primary.format("%H:%M").to_string(), "08:30");
        let seconds = parse_timestamp("2024-03-04 08:30:15").unwrap();
        assert_eq!(seconds.format("%S").to_string(), "15");
        let date_only = parse_timestamp("2024-3-04").unwrap();
        assert_eq!(date_only.format("%Y-%m-%d %H:%M").to_string(), "2024-03-04 00:00");
        assert!(parse_timestamp("not a date").is_none());
    }

    #[test]
    fn test_duration_in_hours() {
        let r = row(vec![Some(Value::Float(16.0)), None, None]);
        assert_eq!(r.get_duration("a").unwrap(), Some(Duration::hours(16.0)));
    }
}
