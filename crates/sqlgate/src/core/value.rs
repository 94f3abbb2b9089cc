//! SQL value and result-row types exchanged with the executor.
//!
//! The engine never speaks a wire protocol itself: generated SQL goes out as
//! text with a parameter vector, and rows come back as [`Row`] values. These
//! types are deliberately owned (no borrowed buffers) — this engine shapes
//! queries and metadata, it is not a bulk transfer pipeline.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::error::{Result, SchemaError};

/// A single SQL value, either a bound parameter or a result cell.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Bool(bool),
    I32(i32),
    I64(i64),
    F64(f64),
    Decimal(Decimal),
    Text(String),
    Bytes(Vec<u8>),
    Uuid(Uuid),
    Date(NaiveDate),
    Time(NaiveTime),
    DateTime(NaiveDateTime),
    DateTimeOffset(DateTime<FixedOffset>),
}

impl SqlValue {
    /// Check if this value is NULL.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }

    /// Render as an inline SQL literal.
    ///
    /// Only used where an engine's syntax forces a literal (session-variable
    /// preambles, DEFAULT clauses); data values otherwise travel as bound
    /// parameters.
    #[must_use]
    pub fn to_sql_literal(&self) -> String {
        match self {
            SqlValue::Null => "NULL".to_string(),
            SqlValue::Bool(v) => if *v { "1" } else { "0" }.to_string(),
            SqlValue::I32(v) => v.to_string(),
            SqlValue::I64(v) => v.to_string(),
            SqlValue::F64(v) => v.to_string(),
            SqlValue::Decimal(v) => v.to_string(),
            SqlValue::Text(v) => format!("'{}'", v.replace('\'', "''")),
            SqlValue::Bytes(v) => {
                let hex: String = v.iter().map(|b| format!("{:02x}", b)).collect();
                format!("X'{}'", hex)
            }
            SqlValue::Uuid(v) => format!("'{}'", v),
            SqlValue::Date(v) => format!("'{}'", v),
            SqlValue::Time(v) => format!("'{}'", v),
            SqlValue::DateTime(v) => format!("'{}'", v.format("%Y-%m-%d %H:%M:%S")),
            SqlValue::DateTimeOffset(v) => format!("'{}'", v.to_rfc3339()),
        }
    }

    /// Convert to a JSON value for client-facing payloads.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value;
        match self {
            SqlValue::Null => Value::Null,
            SqlValue::Bool(v) => Value::Bool(*v),
            SqlValue::I32(v) => Value::from(*v),
            SqlValue::I64(v) => Value::from(*v),
            SqlValue::F64(v) => serde_json::Number::from_f64(*v)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            SqlValue::Decimal(v) => Value::String(v.to_string()),
            SqlValue::Text(v) => Value::String(v.clone()),
            SqlValue::Bytes(v) => {
                Value::String(v.iter().map(|b| format!("{:02x}", b)).collect())
            }
            SqlValue::Uuid(v) => Value::String(v.to_string()),
            SqlValue::Date(v) => Value::String(v.to_string()),
            SqlValue::Time(v) => Value::String(v.to_string()),
            SqlValue::DateTime(v) => Value::String(v.format("%Y-%m-%d %H:%M:%S").to_string()),
            SqlValue::DateTimeOffset(v) => Value::String(v.to_rfc3339()),
        }
    }
}

impl From<bool> for SqlValue {
    fn from(v: bool) -> Self {
        SqlValue::Bool(v)
    }
}

impl From<i32> for SqlValue {
    fn from(v: i32) -> Self {
        SqlValue::I32(v)
    }
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        SqlValue::I64(v)
    }
}

impl From<f64> for SqlValue {
    fn from(v: f64) -> Self {
        SqlValue::F64(v)
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        SqlValue::Text(v)
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        SqlValue::Text(v.to_string())
    }
}

impl From<Vec<u8>> for SqlValue {
    fn from(v: Vec<u8>) -> Self {
        SqlValue::Bytes(v)
    }
}

impl From<Decimal> for SqlValue {
    fn from(v: Decimal) -> Self {
        SqlValue::Decimal(v)
    }
}

impl From<Uuid> for SqlValue {
    fn from(v: Uuid) -> Self {
        SqlValue::Uuid(v)
    }
}

impl From<NaiveDateTime> for SqlValue {
    fn from(v: NaiveDateTime) -> Self {
        SqlValue::DateTime(v)
    }
}

/// One result row: column names in result order plus values.
#[derive(Debug, Clone, Default)]
pub struct Row {
    /// Column names as reported by the driver.
    pub columns: Vec<String>,
    /// Cell values, index-aligned with `columns`.
    pub values: Vec<SqlValue>,
}

impl Row {
    /// Build a row from (name, value) pairs.
    pub fn from_pairs<I, N>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (N, SqlValue)>,
        N: Into<String>,
    {
        let mut columns = Vec::new();
        let mut values = Vec::new();
        for (name, value) in pairs {
            columns.push(name.into());
            values.push(value);
        }
        Self { columns, values }
    }

    /// Look up a cell by column name (case-insensitive).
    pub fn get(&self, name: &str) -> Option<&SqlValue> {
        self.columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(name))
            .map(|i| &self.values[i])
    }

    /// Get a cell as text, coercing scalar types.
    pub fn get_text(&self, name: &str) -> Option<String> {
        self.get(name).and_then(|v| match v {
            SqlValue::Text(s) => Some(s.clone()),
            SqlValue::I32(n) => Some(n.to_string()),
            SqlValue::I64(n) => Some(n.to_string()),
            SqlValue::Null => None,
            other => Some(other.to_sql_literal()),
        })
    }

    /// Get a cell as an integer, coercing numeric text.
    pub fn get_i64(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(|v| match v {
            SqlValue::I32(n) => Some(*n as i64),
            SqlValue::I64(n) => Some(*n),
            SqlValue::Text(s) => s.trim().parse().ok(),
            SqlValue::Bool(b) => Some(*b as i64),
            _ => None,
        })
    }

    /// Get a cell as a boolean, accepting the usual catalog spellings.
    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(|v| match v {
            SqlValue::Bool(b) => Some(*b),
            SqlValue::I32(n) => Some(*n != 0),
            SqlValue::I64(n) => Some(*n != 0),
            SqlValue::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
                "yes" | "y" | "true" | "t" | "1" => Some(true),
                "no" | "n" | "false" | "f" | "0" => Some(false),
                _ => None,
            },
            _ => None,
        })
    }
}

/// Direction of a routine parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamDirection {
    In,
    Out,
    InOut,
}

impl ParamDirection {
    /// Parse the catalog spelling ("IN", "OUT", "INOUT").
    pub fn parse(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "IN" | "" => Ok(ParamDirection::In),
            "OUT" => Ok(ParamDirection::Out),
            "INOUT" | "IN_OUT" => Ok(ParamDirection::InOut),
            other => Err(SchemaError::RoutineInvocation(format!(
                "Unknown parameter direction '{}'",
                other
            ))),
        }
    }

    /// Whether the parameter receives a value back from the routine.
    #[must_use]
    pub fn is_output(&self) -> bool {
        matches!(self, ParamDirection::Out | ParamDirection::InOut)
    }
}

/// One stored-procedure/function parameter: name, value, direction.
#[derive(Debug, Clone)]
pub struct RoutineParam {
    pub name: String,
    pub value: SqlValue,
    pub direction: ParamDirection,
}

impl RoutineParam {
    /// Create an IN parameter.
    pub fn input(name: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            direction: ParamDirection::In,
        }
    }

    /// Create an OUT parameter (value filled after the call).
    pub fn output(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: SqlValue::Null,
            direction: ParamDirection::Out,
        }
    }

    /// Create an INOUT parameter.
    pub fn inout(name: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            direction: ParamDirection::InOut,
        }
    }
}

/// Result of invoking a stored routine.
///
/// Result sets are collected in arrival order; OUT parameter values are
/// copied back into the caller's parameter slice, not stored here.
#[derive(Debug, Default)]
pub struct CallResult {
    pub result_sets: Vec<Vec<Row>>,
}

impl CallResult {
    /// The first cell of the first row, if any (function return values).
    pub fn scalar(&self) -> Option<&SqlValue> {
        self.result_sets
            .first()
            .and_then(|rs| rs.first())
            .and_then(|row| row.values.first())
    }

    /// Whether more than one result set came back.
    #[must_use]
    pub fn is_multi(&self) -> bool {
        self.result_sets.len() > 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sql_literal_escaping() {
        assert_eq!(
            SqlValue::Text("O'Brien".to_string()).to_sql_literal(),
            "'O''Brien'"
        );
        assert_eq!(SqlValue::Null.to_sql_literal(), "NULL");
        assert_eq!(SqlValue::Bool(true).to_sql_literal(), "1");
        assert_eq!(SqlValue::Bytes(vec![0xde, 0xad]).to_sql_literal(), "X'dead'");
    }

    #[test]
    fn test_row_lookup_case_insensitive() {
        let row = Row::from_pairs([
            ("TABLE_NAME", SqlValue::from("users")),
            ("ORDINAL", SqlValue::I32(3)),
        ]);
        assert_eq!(row.get_text("table_name").as_deref(), Some("users"));
        assert_eq!(row.get_i64("ordinal"), Some(3));
        assert!(row.get("missing").is_none());
    }

    #[test]
    fn test_row_bool_spellings() {
        let row = Row::from_pairs([
            ("a", SqlValue::from("YES")),
            ("b", SqlValue::from("N")),
            ("c", SqlValue::I32(1)),
        ]);
        assert_eq!(row.get_bool("a"), Some(true));
        assert_eq!(row.get_bool("b"), Some(false));
        assert_eq!(row.get_bool("c"), Some(true));
    }

    #[test]
    fn test_param_direction_parse() {
        assert_eq!(ParamDirection::parse("in").unwrap(), ParamDirection::In);
        assert_eq!(ParamDirection::parse("OUT").unwrap(), ParamDirection::Out);
        assert_eq!(
            ParamDirection::parse("InOut").unwrap(),
            ParamDirection::InOut
        );
        assert!(ParamDirection::parse("sideways").is_err());
    }

    #[test]
    fn test_call_result_scalar() {
        let result = CallResult {
            result_sets: vec![vec![Row::from_pairs([("v", SqlValue::I64(7))])]],
        };
        assert_eq!(result.scalar(), Some(&SqlValue::I64(7)));
        assert!(!result.is_multi());
    }
}
