//! Abstract-type translation for MySQL.

use serde_json::Value;

use crate::core::descriptor::{AbstractType, ColumnDescriptor};
use crate::core::traits::TypeTranslator;
use crate::error::{Result, SchemaError};

pub struct MySqlTranslator;

impl TypeTranslator for MySqlTranslator {
    fn engine(&self) -> &'static str {
        "mysql"
    }

    fn translate_simple_column_types(&self, col: &mut ColumnDescriptor) -> Result<()> {
        // A pre-set native type bypasses translation entirely.
        if col.db_type.is_some() {
            return Ok(());
        }
        let intent = col.abstract_type()?;
        let base = match intent {
            AbstractType::Id => {
                col.auto_increment = true;
                col.is_primary_key = true;
                col.allow_null = false;
                "int"
            }
            AbstractType::Reference
            | AbstractType::UserId
            | AbstractType::UserIdOnCreate
            | AbstractType::UserIdOnUpdate
            | AbstractType::Integer => "int",
            AbstractType::BigInt => "bigint",
            AbstractType::String => {
                if col.fixed_length {
                    "char"
                } else {
                    "varchar"
                }
            }
            AbstractType::Text => "text",
            AbstractType::Float => "float",
            AbstractType::Double => "double",
            AbstractType::Decimal => "decimal",
            AbstractType::Money => {
                if col.length.is_none() {
                    col.length = Some(19);
                }
                if col.decimals.is_none() {
                    col.decimals = Some(4);
                }
                "decimal"
            }
            AbstractType::Boolean => {
                col.length = Some(1);
                "tinyint"
            }
            AbstractType::Binary => {
                if col.fixed_length {
                    "binary"
                } else {
                    "varbinary"
                }
            }
            AbstractType::Date => "date",
            AbstractType::Time => "time",
            AbstractType::DateTime => "datetime",
            AbstractType::Timestamp
            | AbstractType::TimestampOnCreate
            | AbstractType::TimestampOnUpdate => "timestamp",
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
                "varchar" | "char" => Some(format!("({})", col.length.unwrap_or(255))),
                "varbinary" | "binary" => Some(format!("({})", col.length.unwrap_or(255))),
                "decimal" => Some(format!(
                    "({},{})",
                    col.length.unwrap_or(10),
                    col.decimals.unwrap_or(0)
                )),
                "tinyint" => Some(format!("({})", col.length.unwrap_or(1))),
                _ => None,
            };
            if let Some(extras) = extras {
                col.db_type = Some(format!("{}{}", db_type, extras));
            }
        }

        // Boolean defaults become 0/1; legacy zero-dates are dropped.
        match &col.default {
            Some(Value::Bool(b)) => {
                col.default = Some(Value::from(*b as i64));
            }
            Some(Value::String(s)) if s.starts_with("0000-00-00") => {
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
            "int" | "integer" | "smallint" | "mediumint" => AbstractType::Integer,
            "bigint" => AbstractType::BigInt,
            "tinyint" | "bit" | "bool" | "boolean" => AbstractType::Boolean,
            "varchar" | "char" => AbstractType::String,
            "text" | "tinytext" | "mediumtext" | "longtext" | "enum" | "set" | "json" => {
                AbstractType::Text
            }
            "float" => AbstractType::Float,
            "double" | "double precision" => AbstractType::Double,
            "decimal" | "numeric" => AbstractType::Decimal,
            "binary" | "varbinary" | "blob" | "tinyblob" | "mediumblob" | "longblob" => {
                AbstractType::Binary
            }
            "date" => AbstractType::Date,
            "time" => AbstractType::Time,
            "datetime" => AbstractType::DateTime,
            "timestamp" => AbstractType::Timestamp,
            _ => AbstractType::String,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn translate(col: &mut ColumnDescriptor) {
        let t = MySqlTranslator;
        t.translate_simple_column_types(col).unwrap();
        t.validate_column_settings(col).unwrap();
    }

    #[test]
    fn test_id_intent() {
        let mut col = ColumnDescriptor::new("id", "id");
        translate(&mut col);
        assert_eq!(col.db_type.as_deref(), Some("int"));
        assert!(col.auto_increment);
        assert!(col.is_primary_key);
        assert!(!col.allow_null);
    }

    #[test]
    fn test_string_gets_length() {
        let mut col = ColumnDescriptor::new("name", "string");
        col.length = Some(64);
        translate(&mut col);
        assert_eq!(col.db_type.as_deref(), Some("varchar(64)"));

        let mut defaulted = ColumnDescriptor::new("name", "string");
        translate(&mut defaulted);
        assert_eq!(defaulted.db_type.as_deref(), Some("varchar(255)"));
    }

    #[test]
    fn test_money_defaults() {
        let mut col = ColumnDescriptor::new("price", "money");
        translate(&mut col);
        assert_eq!(col.db_type.as_deref(), Some("decimal(19,4)"));
    }

    #[test]
    fn test_translation_is_idempotent() {
        let t = MySqlTranslator;
        let mut col = ColumnDescriptor::new("flag", "boolean");
        translate(&mut col);
        let first = col.clone();
        t.translate_simple_column_types(&mut col).unwrap();
        t.validate_column_settings(&mut col).unwrap();
        assert_eq!(col.db_type, first.db_type);
        assert_eq!(col.length, first.length);
    }

    #[test]
    fn test_preset_db_type_bypasses_translation() {
        let mut col = ColumnDescriptor::new("geo", "string");
        col.db_type = Some("point".to_string());
        translate(&mut col);
        assert_eq!(col.db_type.as_deref(), Some("point"));
    }

    #[test]
    fn test_default_normalization() {
        let mut col = ColumnDescriptor::new("active", "boolean");
        col.default = Some(serde_json::Value::Bool(true));
        translate(&mut col);
        assert_eq!(col.default, Some(serde_json::Value::from(1)));

        let mut stamped = ColumnDescriptor::new("seen_at", "datetime");
        stamped.default = Some(serde_json::Value::from("0000-00-00 00:00:00"));
        translate(&mut stamped);
        assert!(stamped.default.is_none());
    }

    #[test]
    fn test_reverse_mapping() {
        let t = MySqlTranslator;
        assert_eq!(t.to_abstract("varchar(255)"), AbstractType::String);
        assert_eq!(t.to_abstract("TINYINT(1)"), AbstractType::Boolean);
        assert_eq!(t.to_abstract("geometry"), AbstractType::String);
    }
}
