//! Vendor-neutral column and table descriptors supplied by callers.
//!
//! These are the shapes that cross the engine boundary on the write path:
//! a caller describes a column with an abstract intent (`id`, `fk`,
//! `timestamp_on_create`, …) and the per-engine type translator rewrites it
//! into a native type before the DDL builder renders it.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SchemaError};

/// Abstract column intent, translated per engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AbstractType {
    /// Auto-incrementing primary key.
    Id,
    /// Foreign-key reference column.
    Reference,
    /// Reference to the owning user.
    UserId,
    /// User reference stamped on insert.
    UserIdOnCreate,
    /// User reference stamped on update.
    UserIdOnUpdate,
    String,
    Text,
    Integer,
    BigInt,
    Float,
    Double,
    Decimal,
    Money,
    Boolean,
    Binary,
    Date,
    Time,
    DateTime,
    Timestamp,
    /// Timestamp stamped on insert.
    TimestampOnCreate,
    /// Timestamp stamped on update.
    TimestampOnUpdate,
}

impl AbstractType {
    /// Parse a caller-supplied type string, accepting common aliases.
    pub fn parse(s: &str) -> Result<Self> {
        let normalized = s.trim().to_ascii_lowercase();
        let t = match normalized.as_str() {
            "id" | "pk" | "primary key" => AbstractType::Id,
            "reference" | "fk" | "foreign key" => AbstractType::Reference,
            "user_id" => AbstractType::UserId,
            "user_id_on_create" => AbstractType::UserIdOnCreate,
            "user_id_on_update" => AbstractType::UserIdOnUpdate,
            "string" | "varchar" | "char" => AbstractType::String,
            "text" | "longtext" | "clob" => AbstractType::Text,
            "integer" | "int" => AbstractType::Integer,
            "bigint" | "long" => AbstractType::BigInt,
            "float" | "real" => AbstractType::Float,
            "double" => AbstractType::Double,
            "decimal" | "numeric" => AbstractType::Decimal,
            "money" | "currency" => AbstractType::Money,
            "boolean" | "bool" => AbstractType::Boolean,
            "binary" | "blob" | "varbinary" => AbstractType::Binary,
            "date" => AbstractType::Date,
            "time" => AbstractType::Time,
            "datetime" => AbstractType::DateTime,
            "timestamp" => AbstractType::Timestamp,
            "timestamp_on_create" => AbstractType::TimestampOnCreate,
            "timestamp_on_update" => AbstractType::TimestampOnUpdate,
            _ => {
                return Err(SchemaError::Translation {
                    type_name: s.to_string(),
                })
            }
        };
        Ok(t)
    }

    /// Canonical spelling used in descriptors and client payloads.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            AbstractType::Id => "id",
            AbstractType::Reference => "reference",
            AbstractType::UserId => "user_id",
            AbstractType::UserIdOnCreate => "user_id_on_create",
            AbstractType::UserIdOnUpdate => "user_id_on_update",
            AbstractType::String => "string",
            AbstractType::Text => "text",
            AbstractType::Integer => "integer",
            AbstractType::BigInt => "bigint",
            AbstractType::Float => "float",
            AbstractType::Double => "double",
            AbstractType::Decimal => "decimal",
            AbstractType::Money => "money",
            AbstractType::Boolean => "boolean",
            AbstractType::Binary => "binary",
            AbstractType::Date => "date",
            AbstractType::Time => "time",
            AbstractType::DateTime => "datetime",
            AbstractType::Timestamp => "timestamp",
            AbstractType::TimestampOnCreate => "timestamp_on_create",
            AbstractType::TimestampOnUpdate => "timestamp_on_update",
        }
    }

    /// Whether this intent implies an integer reference column.
    #[must_use]
    pub fn is_user_or_reference(&self) -> bool {
        matches!(
            self,
            AbstractType::Reference
                | AbstractType::UserId
                | AbstractType::UserIdOnCreate
                | AbstractType::UserIdOnUpdate
        )
    }

    /// Whether this intent is server-stamped on insert/update rather than
    /// client-supplied.
    #[must_use]
    pub fn is_auto_stamped(&self) -> bool {
        matches!(
            self,
            AbstractType::TimestampOnCreate
                | AbstractType::TimestampOnUpdate
                | AbstractType::UserIdOnCreate
                | AbstractType::UserIdOnUpdate
        )
    }

    /// Whether this intent carries a length (string/binary family).
    #[must_use]
    pub fn is_sized(&self) -> bool {
        matches!(
            self,
            AbstractType::String | AbstractType::Binary
        )
    }

    /// Whether this intent carries precision/scale.
    #[must_use]
    pub fn is_exact_numeric(&self) -> bool {
        matches!(self, AbstractType::Decimal | AbstractType::Money)
    }
}

impl std::fmt::Display for AbstractType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Caller-supplied vendor-neutral column description.
///
/// The same shape is used for `create table`, `update table`, and
/// `create field` operations. Serde aliases cover the two spellings the
/// gateway accepts for sizes (`length`/`precision`, `decimals`/`scale`).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ColumnDescriptor {
    /// Column name.
    pub name: String,

    /// Abstract type intent (e.g. "id", "fk", "string").
    #[serde(rename = "type")]
    pub type_name: String,

    /// Engine-native type. Empty until the type translator fills it in;
    /// callers may pre-set it to bypass translation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub db_type: Option<String>,

    /// Character/byte length for sized types.
    #[serde(default, alias = "precision", skip_serializing_if = "Option::is_none")]
    pub length: Option<u32>,

    /// Scale for exact numeric types.
    #[serde(default, alias = "scale", skip_serializing_if = "Option::is_none")]
    pub decimals: Option<u32>,

    /// Whether NULL is allowed.
    #[serde(default = "default_true")]
    pub allow_null: bool,

    /// Default value: a JSON literal, or the string form of an expression.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,

    #[serde(default)]
    pub auto_increment: bool,

    #[serde(default)]
    pub is_primary_key: bool,

    #[serde(default)]
    pub is_unique: bool,

    #[serde(default)]
    pub is_index: bool,

    #[serde(default)]
    pub is_foreign_key: bool,

    /// Referenced table for foreign keys.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ref_table: Option<String>,

    /// Referenced column for foreign keys.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ref_field: Option<String>,

    /// Fixed-length character/binary storage (CHAR rather than VARCHAR).
    #[serde(default)]
    pub fixed_length: bool,

    /// Request a multibyte-capable character type where the engine
    /// distinguishes one (NCHAR/NVARCHAR).
    #[serde(default)]
    pub supports_multibyte: bool,

    /// Column comment, carried into DDL where the engine supports it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

fn default_true() -> bool {
    true
}

impl ColumnDescriptor {
    /// Create a descriptor with just a name and abstract type.
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            allow_null: true,
            ..Default::default()
        }
    }

    /// Parse the abstract intent of this descriptor.
    pub fn abstract_type(&self) -> Result<AbstractType> {
        AbstractType::parse(&self.type_name)
    }

    /// Check constraint combinations that are invalid on every engine.
    ///
    /// Runs before any SQL is generated.
    pub fn check_constraints(&self) -> Result<()> {
        if self.is_primary_key && self.is_unique {
            return Err(SchemaError::ConstraintDefinition(format!(
                "Column '{}' cannot be both primary key and unique key",
                self.name
            )));
        }
        if self.is_foreign_key && self.ref_table.as_deref().unwrap_or("").is_empty() {
            return Err(SchemaError::ConstraintDefinition(format!(
                "Foreign key column '{}' requires a ref_table",
                self.name
            )));
        }
        Ok(())
    }
}

/// Caller-supplied table description for `update_schema`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TableDescriptor {
    /// Table name, optionally schema-qualified.
    pub name: String,

    /// Column definitions in declaration order.
    #[serde(default, alias = "field")]
    pub fields: Vec<ColumnDescriptor>,

    /// Display label override, forwarded to the extras overlay.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    /// Description, forwarded to the extras overlay.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_abstract_type_aliases() {
        assert_eq!(AbstractType::parse("fk").unwrap(), AbstractType::Reference);
        assert_eq!(AbstractType::parse("pk").unwrap(), AbstractType::Id);
        assert_eq!(AbstractType::parse("BOOL").unwrap(), AbstractType::Boolean);
        assert_eq!(
            AbstractType::parse("currency").unwrap(),
            AbstractType::Money
        );
        assert!(AbstractType::parse("flux_capacitor").is_err());
    }

    #[test]
    fn test_abstract_type_round_trip() {
        for t in [
            AbstractType::Id,
            AbstractType::Reference,
            AbstractType::TimestampOnCreate,
            AbstractType::Money,
        ] {
            assert_eq!(AbstractType::parse(t.as_str()).unwrap(), t);
        }
    }

    #[test]
    fn test_pk_unique_conflict_rejected() {
        let mut col = ColumnDescriptor::new("id", "id");
        col.is_primary_key = true;
        col.is_unique = true;
        let err = col.check_constraints().unwrap_err();
        assert!(matches!(
            err,
            SchemaError::ConstraintDefinition(_)
        ));
    }

    #[test]
    fn test_fk_requires_ref_table() {
        let mut col = ColumnDescriptor::new("owner_id", "fk");
        col.is_foreign_key = true;
        assert!(col.check_constraints().is_err());
        col.ref_table = Some("users".to_string());
        assert!(col.check_constraints().is_ok());
    }

    #[test]
    fn test_descriptor_serde_aliases() {
        let json = r#"{
            "name": "price",
            "type": "decimal",
            "precision": 10,
            "scale": 2,
            "allow_null": false
        }"#;
        let col: ColumnDescriptor = serde_json::from_str(json).unwrap();
        assert_eq!(col.length, Some(10));
        assert_eq!(col.decimals, Some(2));
        assert!(!col.allow_null);
    }
}
