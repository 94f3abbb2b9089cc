//! Coercion between client-facing JSON values and typed SQL parameters.
//!
//! The write path accepts JSON payloads; before binding, each value is
//! coerced to the column's abstract type so that every engine receives the
//! same typed parameter regardless of how the client spelled it
//! ("1"/1/true for booleans, "2024-01-05" for dates, and so on).

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde_json::Value;

use crate::error::{Result, SchemaError};

use super::descriptor::AbstractType;
use super::schema::ColumnSchema;
use super::value::SqlValue;

/// Coerce a JSON value to a typed parameter for the given column.
///
/// NULL handling is the caller's concern; `Value::Null` always maps to
/// `SqlValue::Null` here.
pub fn parse_value_for_set(col: &ColumnSchema, value: &Value) -> Result<SqlValue> {
    if value.is_null() {
        return Ok(SqlValue::Null);
    }
    match col.abstract_type {
        AbstractType::Boolean => coerce_bool(col, value),
        AbstractType::Id
        | AbstractType::Reference
        | AbstractType::UserId
        | AbstractType::UserIdOnCreate
        | AbstractType::UserIdOnUpdate
        | AbstractType::Integer
        | AbstractType::BigInt => coerce_integer(col, value),
        AbstractType::Float | AbstractType::Double => coerce_float(col, value),
        AbstractType::Decimal | AbstractType::Money => coerce_decimal(col, value),
        AbstractType::Date => coerce_date(col, value),
        AbstractType::Time => coerce_time(col, value),
        AbstractType::DateTime
        | AbstractType::Timestamp
        | AbstractType::TimestampOnCreate
        | AbstractType::TimestampOnUpdate => coerce_datetime(col, value),
        AbstractType::Binary => coerce_binary(col, value),
        AbstractType::String | AbstractType::Text => Ok(SqlValue::Text(stringify(value))),
    }
}

/// Server-side stamp for `*_on_create` / `*_on_update` timestamp columns.
#[must_use]
pub fn timestamp_for_set() -> SqlValue {
    SqlValue::DateTime(Utc::now().naive_utc())
}

fn bad_value(col: &ColumnSchema, value: &Value, expected: &str) -> SchemaError {
    SchemaError::Execution(format!(
        "Cannot coerce {} to {} for column '{}'",
        value, expected, col.name
    ))
}

fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn coerce_bool(col: &ColumnSchema, value: &Value) -> Result<SqlValue> {
    match value {
        Value::Bool(b) => Ok(SqlValue::Bool(*b)),
        Value::Number(n) => Ok(SqlValue::Bool(n.as_i64().unwrap_or(0) != 0)),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "t" | "yes" | "y" | "1" | "on" => Ok(SqlValue::Bool(true)),
            "false" | "f" | "no" | "n" | "0" | "off" | "" => Ok(SqlValue::Bool(false)),
            _ => Err(bad_value(col, value, "boolean")),
        },
        _ => Err(bad_value(col, value, "boolean")),
    }
}

fn coerce_integer(col: &ColumnSchema, value: &Value) -> Result<SqlValue> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .map(SqlValue::I64)
            .ok_or_else(|| bad_value(col, value, "integer")),
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .map(SqlValue::I64)
            .map_err(|_| bad_value(col, value, "integer")),
        Value::Bool(b) => Ok(SqlValue::I64(*b as i64)),
        _ => Err(bad_value(col, value, "integer")),
    }
}

fn coerce_float(col: &ColumnSchema, value: &Value) -> Result<SqlValue> {
    match value {
        Value::Number(n) => n
            .as_f64()
            .map(SqlValue::F64)
            .ok_or_else(|| bad_value(col, value, "float")),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map(SqlValue::F64)
            .map_err(|_| bad_value(col, value, "float")),
        _ => Err(bad_value(col, value, "float")),
    }
}

fn coerce_decimal(col: &ColumnSchema, value: &Value) -> Result<SqlValue> {
    let text = match value {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.trim().to_string(),
        _ => return Err(bad_value(col, value, "decimal")),
    };
    text.parse::<Decimal>()
        .map(SqlValue::Decimal)
        .map_err(|_| bad_value(col, value, "decimal"))
}

fn coerce_date(col: &ColumnSchema, value: &Value) -> Result<SqlValue> {
    let s = match value {
        Value::String(s) => s.trim(),
        _ => return Err(bad_value(col, value, "date")),
    };
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map(SqlValue::Date)
        .map_err(|_| bad_value(col, value, "date"))
}

fn coerce_time(col: &ColumnSchema, value: &Value) -> Result<SqlValue> {
    let s = match value {
        Value::String(s) => s.trim(),
        _ => return Err(bad_value(col, value, "time")),
    };
    NaiveTime::parse_from_str(s, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M"))
        .map(SqlValue::Time)
        .map_err(|_| bad_value(col, value, "time"))
}

fn coerce_datetime(col: &ColumnSchema, value: &Value) -> Result<SqlValue> {
    let s = match value {
        Value::String(s) => s.trim(),
        _ => return Err(bad_value(col, value, "datetime")),
    };
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S"))
        .or_else(|_| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .map(|d| d.and_hms_opt(0, 0, 0).unwrap_or_default())
        })
        .map(SqlValue::DateTime)
        .map_err(|_| bad_value(col, value, "datetime"))
}

fn coerce_binary(col: &ColumnSchema, value: &Value) -> Result<SqlValue> {
    match value {
        Value::String(s) => {
            let s = s.trim();
            if s.len() % 2 != 0 || !s.bytes().all(|b| b.is_ascii_hexdigit()) {
                return Err(bad_value(col, value, "hex-encoded binary"));
            }
            let bytes = (0..s.len())
                .step_by(2)
                .map(|i| u8::from_str_radix(&s[i..i + 2], 16))
                .collect::<std::result::Result<Vec<u8>, _>>()
                .map_err(|_| bad_value(col, value, "hex-encoded binary"))?;
            Ok(SqlValue::Bytes(bytes))
        }
        _ => Err(bad_value(col, value, "hex-encoded binary")),
    }
}
