//! Abstract-type translation for SQLite.
//!
//! SQLite's type affinity makes most of this cosmetic, but the declared
//! types still matter for round-tripping through introspection.

use crate::core::descriptor::{AbstractType, ColumnDescriptor};
use crate::core::traits::TypeTranslator;
use crate::error::{Result, SchemaError};

pub struct SqliteTranslator;

impl TypeTranslator for SqliteTranslator {
    fn engine(&self) -> &'static str {
        "sqlite"
    }

    fn translate_simple_column_types(&self, col: &mut ColumnDescriptor) -> Result<()> {
        if col.db_type.is_some() {
            return Ok(());
        }
        let intent = col.abstract_type()?;
        let base = match intent {
            AbstractType::Id => {
                col.auto_increment = true;
                col.is_primary_key = true;
                col.allow_null = false;
                "integer"
            }
            AbstractType::Reference
            | AbstractType::UserId
            | AbstractType::UserIdOnCreate
            | AbstractType::UserIdOnUpdate
            | AbstractType::Integer
            | AbstractType::BigInt
            | AbstractType::Boolean => "integer",
            AbstractType::String => "varchar",
            AbstractType::Text => "text",
            AbstractType::Float | AbstractType::Double => "real",
            AbstractType::Decimal | AbstractType::Money => {
                if col.length.is_none() {
                    col.length = Some(19);
                }
                if col.decimals.is_none() {
                    col.decimals = Some(4);
                }
                "numeric"
            }
            AbstractType::Binary => "blob",
            AbstractType::Date => "date",
            AbstractType::Time => "time",
            AbstractType::DateTime
            | AbstractType::Timestamp
            | AbstractType::TimestampOnCreate
            | AbstractType::TimestampOnUpdate => "datetime",
        };
        col.db_type = Some(base.to_string());
        Ok(())
    }

    fn validate_column_settings(&self, col: &mut ColumnDescriptor) -> Result<()> {
        let db_type = col.db_type.as_deref().ok_or_else(|| SchemaError::Translation {
            type_name: col.type_name.clone(),
        })?;

        if !db_type.contains('(') {
            let extras = match db_type {
                "varchar" => Some(format!("({})", col.length.unwrap_or(255))),
                "numeric" => Some(format!(
                    "({},{})",
                    col.length.unwrap_or(10),
                    col.decimals.unwrap_or(0)
                )),
                _ => None,
            };
            if let Some(extras) = extras {
                col.db_type = Some(format!("{}{}", db_type, extras));
            }
        }

        match &col.default {
            Some(serde_json::Value::Bool(b)) => {
                col.default = Some(serde_json::Value::from(*b as i64));
            }
            Some(serde_json::Value::String(s)) if s.starts_with("0000-00-00") => {
                col.default = None;
            }
            _ => {}
        }
        Ok(())
    }

    fn to_abstract(&self, native_type: &str) -> AbstractType {
        let base = native_type
            .split('(')
            .next()
            .unwrap_or(native_type)
            .trim()
            .to_ascii_lowercase();
        match base.as_str() {
            "integer" | "int" | "tinyint" | "smallint" | "bigint" => AbstractType::Integer,
            "varchar" | "char" | "nvarchar" | "nchar" => AbstractType::String,
            "text" | "clob" => AbstractType::Text,
            "real" | "float" | "double" => AbstractType::Double,
            "numeric" | "decimal" => AbstractType::Decimal,
            "blob" => AbstractType::Binary,
            "boolean" | "bool" => AbstractType::Boolean,
            "date" => AbstractType::Date,
            "time" => AbstractType::Time,
            "datetime" | "timestamp" => AbstractType::DateTime,
            _ => AbstractType::String,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_intent() {
        let t = SqliteTranslator;
        let mut col = ColumnDescriptor::new("id", "id");
        t.translate_simple_column_types(&mut col).unwrap();
        t.validate_column_settings(&mut col).unwrap();
        assert_eq!(col.db_type.as_deref(), Some("integer"));
        assert!(col.auto_increment && col.is_primary_key);
    }

    #[test]
    fn test_string_sized() {
        let t = SqliteTranslator;
        let mut col = ColumnDescriptor::new("name", "string");
        col.length = Some(64);
        t.translate_simple_column_types(&mut col).unwrap();
        t.validate_column_settings(&mut col).unwrap();
        assert_eq!(col.db_type.as_deref(), Some("varchar(64)"));
    }

    #[test]
    fn test_idempotent() {
        let t = SqliteTranslator;
        let mut col = ColumnDescriptor::new("price", "money");
        t.translate_simple_column_types(&mut col).unwrap();
        t.validate_column_settings(&mut col).unwrap();
        let snapshot = col.db_type.clone();
        t.translate_simple_column_types(&mut col).unwrap();
        t.validate_column_settings(&mut col).unwrap();
        assert_eq!(col.db_type, snapshot);
    }
}
