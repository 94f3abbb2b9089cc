//! Centralized identifier validation and quoting.
//!
//! SQL identifiers cannot be passed as bound parameters, so every dynamic
//! table/column name that reaches generated SQL goes through this module:
//! validation for suspicious input first, then the engine's quoting style.

use crate::error::{Result, SchemaError};

/// Maximum identifier length (conservative limit across engines).
/// - PostgreSQL: 63 bytes
/// - MySQL: 64 characters
/// - DB2: 128 characters
const MAX_IDENTIFIER_LENGTH: usize = 128;

/// Identifier quoting convention of an engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuoteStyle {
    /// MySQL backticks: `` `name` ``.
    Backtick,
    /// ANSI double quotes: `"name"` (Postgres, SQLite, DB2, SQL Anywhere).
    DoubleQuote,
    /// Square brackets: `[name]` (TDS-derived dialects).
    Bracket,
}

impl QuoteStyle {
    /// Quote an identifier, escaping the closing character by doubling it.
    pub fn quote(&self, name: &str) -> Result<String> {
        validate_identifier(name)?;
        Ok(match self {
            QuoteStyle::Backtick => format!("`{}`", name.replace('`', "``")),
            QuoteStyle::DoubleQuote => format!("\"{}\"", name.replace('"', "\"\"")),
            QuoteStyle::Bracket => format!("[{}]", name.replace(']', "]]")),
        })
    }

    /// Qualify a table name with an optional schema.
    pub fn qualify(&self, schema: Option<&str>, table: &str) -> Result<String> {
        match schema {
            Some(s) if !s.is_empty() => Ok(format!("{}.{}", self.quote(s)?, self.quote(table)?)),
            _ => self.quote(table),
        }
    }

    /// Strip this style's quoting from a raw identifier, if present.
    pub fn unquote<'a>(&self, name: &'a str) -> &'a str {
        let (open, close) = match self {
            QuoteStyle::Backtick => ('`', '`'),
            QuoteStyle::DoubleQuote => ('"', '"'),
            QuoteStyle::Bracket => ('[', ']'),
        };
        name.strip_prefix(open)
            .and_then(|s| s.strip_suffix(close))
            .unwrap_or(name)
    }
}

/// Validate an identifier for security issues.
///
/// Rejects empty names, null bytes, and names over the engine-portable
/// maximum length.
pub fn validate_identifier(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(SchemaError::Config(
            "Identifier cannot be empty".to_string(),
        ));
    }

    if name.contains('\0') {
        return Err(SchemaError::Config(format!(
            "Identifier contains null byte (possible injection attempt): {:?}",
            name
        )));
    }

    if name.len() > MAX_IDENTIFIER_LENGTH {
        return Err(SchemaError::Config(format!(
            "Identifier exceeds maximum length of {} bytes (got {} bytes): {:?}",
            MAX_IDENTIFIER_LENGTH,
            name.len(),
            name
        )));
    }

    Ok(())
}

/// Split a possibly schema-qualified name into (schema, table).
///
/// Quoting is not interpreted here; callers pass unquoted names.
pub fn split_qualified(name: &str) -> (Option<&str>, &str) {
    match name.split_once('.') {
        Some((schema, table)) if !schema.is_empty() => (Some(schema), table),
        _ => (None, name),
    }
}
