//! Abstract-type translation for PostgreSQL.

use serde_json::Value;

use crate::core::descriptor::{AbstractType, ColumnDescriptor};
use crate::core::traits::TypeTranslator;
use crate::error::{Result, SchemaError};

pub struct PgTranslator;

impl TypeTranslator for PgTranslator {
    fn engine(&self) -> &'static str {
        "postgres"
    }

    fn translate_simple_column_types(&self, col: &mut ColumnDescriptor) -> Result<()> {
        if col.db_type.is_some() {
            return Ok(());
        }
        let intent = col.abstract_type()?;
        let base = match intent {
            AbstractType::Id => {
                // serial carries the identity; no suffix clause needed.
                col.auto_increment = true;
                col.is_primary_key = true;
                col.allow_null = false;
                "serial"
            }
            AbstractType::Reference
            | AbstractType::UserId
            | AbstractType::UserIdOnCreate
            | AbstractType::UserIdOnUpdate
            | AbstractType::Integer => "integer",
            AbstractType::BigInt => "bigint",
            AbstractType::String => {
                if col.fixed_length {
                    "char"
                } else {
                    "varchar"
                }
            }
            AbstractType::Text => "text",
            AbstractType::Float => "real",
            AbstractType::Double => "double precision",
            AbstractType::Decimal => "numeric",
            AbstractType::Money => {
                if col.length.is_none() {
                    col.length = Some(19);
                }
                if col.decimals.is_none() {
                    col.decimals = Some(4);
                }
                "numeric"
            }
            AbstractType::Boolean => "boolean",
            AbstractType::Binary => "bytea",
            AbstractType::Date => "date",
            AbstractType::Time => "time",
            AbstractType::DateTime
            | AbstractType::Timestamp
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
                "numeric" | "decimal" => Some(format!(
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
            // Postgres booleans take TRUE/FALSE, including numeric spellings
            // from other engines' payloads.
            Some(Value::Number(n))
                if col.db_type.as_deref() == Some("boolean") =>
            {
                col.default = Some(Value::Bool(n.as_i64().unwrap_or(0) != 0));
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
            "integer" | "int" | "int4" | "smallint" | "int2" => AbstractType::Integer,
            "bigint" | "int8" => AbstractType::BigInt,
            "serial" | "serial4" => AbstractType::Id,
            "bigserial" | "serial8" => AbstractType::Id,
            "boolean" | "bool" => AbstractType::Boolean,
            "character varying" | "varchar" | "character" | "char" | "bpchar" | "uuid" => {
                AbstractType::String
            }
            "text" | "json" | "jsonb" | "xml" => AbstractType::Text,
            "real" | "float4" => AbstractType::Float,
            "double precision" | "float8" => AbstractType::Double,
            "numeric" | "decimal" | "money" => AbstractType::Decimal,
            "bytea" => AbstractType::Binary,
            "date" => AbstractType::Date,
            "time" | "time without time zone" | "time with time zone" => AbstractType::Time,
            "timestamp" | "timestamp without time zone" | "timestamp with time zone"
            | "timestamptz" => AbstractType::Timestamp,
            _ => AbstractType::String,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn translate(col: &mut ColumnDescriptor) {
        let t = PgTranslator;
        t.translate_simple_column_types(col).unwrap();
        t.validate_column_settings(col).unwrap();
    }

    #[test]
    fn test_id_becomes_serial() {
        let mut col = ColumnDescriptor::new("id", "id");
        translate(&mut col);
        assert_eq!(col.db_type.as_deref(), Some("serial"));
        assert!(col.is_primary_key);
    }

    #[test]
    fn test_boolean_default_spelling() {
        let mut col = ColumnDescriptor::new("active", "boolean");
        col.default = Some(serde_json::Value::from(1));
        translate(&mut col);
        assert_eq!(col.db_type.as_deref(), Some("boolean"));
        assert_eq!(col.default, Some(serde_json::Value::Bool(true)));
    }

    #[test]
    fn test_translation_is_idempotent() {
        let t = PgTranslator;
        let mut col = ColumnDescriptor::new("price", "money");
        translate(&mut col);
        assert_eq!(col.db_type.as_deref(), Some("numeric(19,4)"));
        t.translate_simple_column_types(&mut col).unwrap();
        t.validate_column_settings(&mut col).unwrap();
        assert_eq!(col.db_type.as_deref(), Some("numeric(19,4)"));
    }

    #[test]
    fn test_reverse_mapping() {
        let t = PgTranslator;
        assert_eq!(
            t.to_abstract("character varying(64)"),
            AbstractType::String
        );
        assert_eq!(
            t.to_abstract("timestamp without time zone"),
            AbstractType::Timestamp
        );
        assert_eq!(t.to_abstract("tsvector"), AbstractType::String);
    }
}
