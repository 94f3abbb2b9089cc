//! SQLite DDL rendering.
//!
//! SQLite's ALTER TABLE surface is narrow: columns cannot be altered or
//! dropped, constraints cannot be added after creation. Those operations
//! fail loudly rather than emitting SQL that the engine would reject.

use crate::core::descriptor::{ColumnDescriptor, TableDescriptor};
use crate::core::identifier::QuoteStyle;
use crate::core::schema::TableName;
use crate::core::traits::DdlBuilder;
use crate::error::{Result, SchemaError};

pub struct SqliteDdl;

impl DdlBuilder for SqliteDdl {
    fn engine(&self) -> &'static str {
        "sqlite"
    }

    fn quote_style(&self) -> QuoteStyle {
        QuoteStyle::DoubleQuote
    }

    fn identity_suffix(&self, _col: &ColumnDescriptor) -> Option<String> {
        None
    }

    // Identity columns collapse to the rowid alias form.
    fn column_definition(&self, col: &ColumnDescriptor) -> Result<String> {
        if col.auto_increment && col.is_primary_key {
            col.check_constraints()?;
            return Ok(format!(
                "{} integer NOT NULL PRIMARY KEY AUTOINCREMENT",
                self.quote(&col.name)?
            ));
        }
        let mut def = default_column_definition(self, col)?;
        if col.is_foreign_key {
            let ref_table = TableName::parse(col.ref_table.as_deref().unwrap_or_default());
            def.push_str(&format!(
                " REFERENCES {} ({})",
                self.qualify(&ref_table)?,
                self.quote(col.ref_field.as_deref().unwrap_or("id"))?
            ));
        }
        Ok(def)
    }

    // Foreign keys are inline REFERENCES clauses; only secondary indexes
    // trail the CREATE TABLE.
    fn create_table(&self, table: &TableDescriptor) -> Result<Vec<String>> {
        let name = TableName::parse(&table.name);
        let mut defs = Vec::with_capacity(table.fields.len());
        let pk_cols: Vec<&str> = table
            .fields
            .iter()
            .filter(|c| c.is_primary_key)
            .map(|c| c.name.as_str())
            .collect();
        let composite = pk_cols.len() > 1;

        for col in &table.fields {
            let mut c = col.clone();
            if composite && c.is_primary_key {
                c.is_primary_key = false;
                c.allow_null = false;
            }
            defs.push(format!("  {}", self.column_definition(&c)?));
        }
        if composite {
            let quoted: Result<Vec<String>> = pk_cols.iter().map(|c| self.quote(c)).collect();
            defs.push(format!("  PRIMARY KEY ({})", quoted?.join(", ")));
        }

        let mut stmts = vec![format!(
            "CREATE TABLE {} (\n{}\n)",
            self.qualify(&name)?,
            defs.join(",\n")
        )];
        for col in &table.fields {
            if col.is_index && !col.is_primary_key && !col.is_unique {
                let index = format!("ix_{}_{}", name.name, col.name);
                stmts.push(self.create_index(&name, &index, &[&col.name], false)?);
            }
        }
        Ok(stmts)
    }

    fn alter_column(&self, _table: &TableName, _col: &ColumnDescriptor) -> Result<Vec<String>> {
        Err(SchemaError::unsupported("sqlite", "ALTER COLUMN"))
    }

    fn drop_column(&self, _table: &TableName, _column: &str) -> Result<String> {
        Err(SchemaError::unsupported("sqlite", "DROP COLUMN"))
    }

    fn rename_column(
        &self,
        _table: &TableName,
        _column: &str,
        _new_name: &str,
        _definition: Option<&ColumnDescriptor>,
    ) -> Result<String> {
        Err(SchemaError::unsupported("sqlite", "RENAME COLUMN"))
    }

    fn add_primary_key(&self, _table: &TableName, _columns: &[&str]) -> Result<String> {
        Err(SchemaError::unsupported("sqlite", "ADD PRIMARY KEY"))
    }

    fn drop_primary_key(&self, _table: &TableName) -> Result<String> {
        Err(SchemaError::unsupported("sqlite", "DROP PRIMARY KEY"))
    }

    fn add_foreign_key(
        &self,
        _table: &TableName,
        _constraint: &str,
        _column: &str,
        _ref_table: &TableName,
        _ref_column: &str,
    ) -> Result<String> {
        Err(SchemaError::unsupported(
            "sqlite",
            "ADD FOREIGN KEY after table creation",
        ))
    }

    fn drop_foreign_key(&self, _table: &TableName, _constraint: &str) -> Result<String> {
        Err(SchemaError::unsupported("sqlite", "DROP FOREIGN KEY"))
    }

    // No TRUNCATE statement; DELETE is the accepted equivalent.
    fn truncate_table(&self, table: &TableName) -> Result<String> {
        Ok(format!("DELETE FROM {}", self.qualify(table)?))
    }
}

/// The trait's default column rendering, reachable despite the override.
fn default_column_definition(ddl: &SqliteDdl, col: &ColumnDescriptor) -> Result<String> {
    col.check_constraints()?;
    let db_type = col.db_type.as_deref().ok_or_else(|| SchemaError::Translation {
        type_name: col.type_name.clone(),
    })?;
    let mut def = format!("{} {}", ddl.quote(&col.name)?, db_type);
    if !col.allow_null || col.is_primary_key {
        def.push_str(" NOT NULL");
    }
    if !col.auto_increment {
        if let Some(default) = &col.default {
            def.push_str(" DEFAULT ");
            def.push_str(&ddl.default_literal(default));
        }
    }
    if col.is_unique {
        def.push_str(" UNIQUE");
    } else if col.is_primary_key {
        def.push_str(" PRIMARY KEY");
    }
    Ok(def)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::traits::TypeTranslator;
    use crate::engines::sqlite::SqliteTranslator;

    fn translated(name: &str, type_name: &str) -> ColumnDescriptor {
        let mut col = ColumnDescriptor::new(name, type_name);
        let t = SqliteTranslator;
        t.translate_simple_column_types(&mut col).unwrap();
        t.validate_column_settings(&mut col).unwrap();
        col
    }

    #[test]
    fn test_id_rowid_alias_form() {
        let ddl = SqliteDdl;
        let def = ddl.column_definition(&translated("id", "id")).unwrap();
        assert_eq!(def, "\"id\" integer NOT NULL PRIMARY KEY AUTOINCREMENT");
    }

    #[test]
    fn test_create_table_inlines_references() {
        let ddl = SqliteDdl;
        let mut owner = translated("owner_id", "fk");
        owner.is_foreign_key = true;
        owner.ref_table = Some("users".to_string());
        owner.ref_field = Some("id".to_string());

        let table = TableDescriptor {
            name: "widgets".to_string(),
            fields: vec![
                translated("id", "id"),
                translated("name", "string"),
                owner,
            ],
            label: None,
            description: None,
        };
        let stmts = ddl.create_table(&table).unwrap();
        assert_eq!(stmts.len(), 1);
        assert!(stmts[0].contains("\"owner_id\" integer REFERENCES \"users\" (\"id\")"));
        assert!(!stmts[0].contains("ADD CONSTRAINT"));
    }

    #[test]
    fn test_unsupported_operations_error() {
        let ddl = SqliteDdl;
        let t = TableName::bare("widgets");
        assert!(matches!(
            ddl.drop_column(&t, "name"),
            Err(SchemaError::Unsupported { engine: "sqlite", .. })
        ));
        assert!(matches!(
            ddl.rename_column(&t, "a", "b", None),
            Err(SchemaError::Unsupported { .. })
        ));
        assert!(matches!(
            ddl.add_foreign_key(&t, "fk", "c", &TableName::bare("users"), "id"),
            Err(SchemaError::Unsupported { .. })
        ));
        assert!(matches!(
            ddl.alter_column(&t, &translated("name", "string")),
            Err(SchemaError::Unsupported { .. })
        ));
    }

    #[test]
    fn test_truncate_is_delete() {
        let ddl = SqliteDdl;
        assert_eq!(
            ddl.truncate_table(&TableName::bare("widgets")).unwrap(),
            "DELETE FROM \"widgets\""
        );
    }
}
