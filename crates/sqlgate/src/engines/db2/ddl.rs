//! DB2 DDL rendering.

use crate::core::descriptor::ColumnDescriptor;
use crate::core::identifier::QuoteStyle;
use crate::core::schema::TableName;
use crate::core::traits::DdlBuilder;
use crate::error::{Result, SchemaError};

pub struct Db2Ddl;

impl DdlBuilder for Db2Ddl {
    fn engine(&self) -> &'static str {
        "db2"
    }

    fn quote_style(&self) -> QuoteStyle {
        QuoteStyle::DoubleQuote
    }

    fn identity_suffix(&self, _col: &ColumnDescriptor) -> Option<String> {
        Some("GENERATED ALWAYS AS IDENTITY".to_string())
    }

    fn alter_column(&self, table: &TableName, col: &ColumnDescriptor) -> Result<Vec<String>> {
        let table_sql = self.qualify(table)?;
        let column_sql = self.quote(&col.name)?;
        let db_type = col.db_type.as_deref().ok_or_else(|| SchemaError::Translation {
            type_name: col.type_name.clone(),
        })?;

        let mut stmts = vec![format!(
            "ALTER TABLE {} ALTER COLUMN {} SET DATA TYPE {}",
            table_sql, column_sql, db_type
        )];
        if col.allow_null {
            stmts.push(format!(
                "ALTER TABLE {} ALTER COLUMN {} DROP NOT NULL",
                table_sql, column_sql
            ));
        } else {
            stmts.push(format!(
                "ALTER TABLE {} ALTER COLUMN {} SET NOT NULL",
                table_sql, column_sql
            ));
        }
        if let Some(default) = &col.default {
            stmts.push(format!(
                "ALTER TABLE {} ALTER COLUMN {} SET DEFAULT {}",
                table_sql,
                column_sql,
                self.default_literal(default)
            ));
        }
        Ok(stmts)
    }

    fn truncate_table(&self, table: &TableName) -> Result<String> {
        Ok(format!(
            "TRUNCATE TABLE {} IMMEDIATE",
            self.qualify(table)?
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::traits::TypeTranslator;
    use crate::engines::db2::Db2Translator;

    fn translated(name: &str, type_name: &str) -> ColumnDescriptor {
        let mut col = ColumnDescriptor::new(name, type_name);
        let t = Db2Translator;
        t.translate_simple_column_types(&mut col).unwrap();
        t.validate_column_settings(&mut col).unwrap();
        col
    }

    #[test]
    fn test_identity_column_definition() {
        let ddl = Db2Ddl;
        let def = ddl.column_definition(&translated("id", "id")).unwrap();
        assert_eq!(
            def,
            "\"id\" integer NOT NULL GENERATED ALWAYS AS IDENTITY PRIMARY KEY"
        );
    }

    #[test]
    fn test_alter_column_set_data_type() {
        let ddl = Db2Ddl;
        let mut col = translated("name", "string");
        col.allow_null = false;
        let stmts = ddl.alter_column(&TableName::bare("widgets"), &col).unwrap();
        assert_eq!(
            stmts[0],
            "ALTER TABLE \"widgets\" ALTER COLUMN \"name\" SET DATA TYPE varchar(255)"
        );
        assert_eq!(
            stmts[1],
            "ALTER TABLE \"widgets\" ALTER COLUMN \"name\" SET NOT NULL"
        );
    }

    #[test]
    fn test_truncate_immediate() {
        let ddl = Db2Ddl;
        assert_eq!(
            ddl.truncate_table(&TableName::bare("widgets")).unwrap(),
            "TRUNCATE TABLE \"widgets\" IMMEDIATE"
        );
    }
}
