//! Abstract-type translation for SQL Anywhere.

use crate::core::descriptor::{AbstractType, ColumnDescriptor};
use crate::core::traits::TypeTranslator;
use crate::error::{Result, SchemaError};

pub struct SqlAnyTranslator;

impl TypeTranslator for SqlAnyTranslator {
    fn engine(&self) -> &'static str {
        "sqlanywhere"
    }

    fn translate_simple_column_types(&self, col: &mut ColumnDescriptor) -> Result<()> {
        if col.db_type.is_some() {
            return Ok(());
        }
        let intent = col.abstract_type()?;
        let base = match intent {
            AbstractType::Id => {
                // Identity rides on DEFAULT AUTOINCREMENT, not the type.
                col.auto_increment = true;
                col.is_primary_key = true;
                col.allow_null = false;
                "integer"
            }
            AbstractType::Reference
            | AbstractType::UserId
            | AbstractType::UserIdOnCreate
            | AbstractType::UserIdOnUpdate
            | AbstractType::Integer => "integer",
            AbstractType::BigInt => "bigint",
            AbstractType::String => {
                if col.supports_multibyte {
                    if col.fixed_length {
                        "nchar"
                    } else {
                        "nvarchar"
                    }
                } else if col.fixed_length {
                    "char"
                } else {
                    "varchar"
                }
            }
            AbstractType::Text => "long varchar",
            AbstractType::Float => "float",
            AbstractType::Double => "double",
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
            AbstractType::Boolean => "bit",
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
                "varchar" | "char" | "nvarchar" | "nchar" | "varbinary" | "binary" => {
                    Some(format!("({})", col.length.unwrap_or(255)))
                }
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
            "integer" | "int" | "smallint" | "tinyint" => AbstractType::Integer,
            "bigint" => AbstractType::BigInt,
            "bit" => AbstractType::Boolean,
            "varchar" | "char" | "nvarchar" | "nchar" | "uniqueidentifier" => AbstractType::String,
            "long varchar" | "long nvarchar" | "text" | "xml" => AbstractType::Text,
            "float" | "real" => AbstractType::Float,
            "double" => AbstractType::Double,
            "numeric" | "decimal" | "money" | "smallmoney" => AbstractType::Decimal,
            "binary" | "varbinary" | "long binary" | "image" => AbstractType::Binary,
            "date" => AbstractType::Date,
            "time" => AbstractType::Time,
            "datetime" | "smalldatetime" => AbstractType::DateTime,
            "timestamp" => AbstractType::Timestamp,
            _ => AbstractType::String,
        }
    }
}
