//! PostgreSQL DDL rendering.

use crate::core::descriptor::ColumnDescriptor;
use crate::core::identifier::QuoteStyle;
use crate::core::schema::TableName;
use crate::core::traits::DdlBuilder;
use crate::error::Result;

pub struct PgDdl;

impl DdlBuilder for PgDdl {
    fn engine(&self) -> &'static str {
        "postgres"
    }

    fn quote_style(&self) -> QuoteStyle {
        QuoteStyle::DoubleQuote
    }

    fn boolean_literal(&self, value: bool) -> &'static str {
        if value {
            "TRUE"
        } else {
            "FALSE"
        }
    }

    // serial/identity lives in the type; nothing to append.
    fn identity_suffix(&self, _col: &ColumnDescriptor) -> Option<String> {
        None
    }

    fn alter_column(&self, table: &TableName, col: &ColumnDescriptor) -> Result<Vec<String>> {
        let table_sql = self.qualify(table)?;
        let column_sql = self.quote(&col.name)?;
        let db_type = col.db_type.as_deref().ok_or_else(|| {
            crate::error::SchemaError::Translation {
                type_name: col.type_name.clone(),
            }
        })?;

        let mut stmts = vec![format!(
            "ALTER TABLE {} ALTER COLUMN {} TYPE {}",
            table_sql, column_sql, db_type
        )];
        stmts.push(format!(
            "ALTER TABLE {} ALTER COLUMN {} {} NOT NULL",
            table_sql,
            column_sql,
            if col.allow_null { "DROP" } else { "SET" }
        ));
        match &col.default {
            Some(default) => stmts.push(format!(
                "ALTER TABLE {} ALTER COLUMN {} SET DEFAULT {}",
                table_sql,
                column_sql,
                self.default_literal(default)
            )),
            None => stmts.push(format!(
                "ALTER TABLE {} ALTER COLUMN {} DROP DEFAULT",
                table_sql, column_sql
            )),
        }
        Ok(stmts)
    }

    fn drop_primary_key(&self, table: &TableName) -> Result<String> {
        // Default pkey constraint name convention.
        Ok(format!(
            "ALTER TABLE {} DROP CONSTRAINT {}",
            self.qualify(table)?,
            self.quote(&format!("{}_pkey", table.name))?
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::traits::TypeTranslator;
    use crate::engines::postgres::PgTranslator;

    fn translated(name: &str, type_name: &str) -> ColumnDescriptor {
        let mut col = ColumnDescriptor::new(name, type_name);
        let t = PgTranslator;
        t.translate_simple_column_types(&mut col).unwrap();
        t.validate_column_settings(&mut col).unwrap();
        col
    }

    #[test]
    fn test_id_column_definition() {
        let ddl = PgDdl;
        let def = ddl.column_definition(&translated("id", "id")).unwrap();
        assert_eq!(def, "\"id\" serial NOT NULL PRIMARY KEY");
    }

    #[test]
    fn test_boolean_default_literal() {
        let ddl = PgDdl;
        let mut col = translated("active", "boolean");
        col.allow_null = false;
        col.default = Some(serde_json::Value::Bool(true));
        let def = ddl.column_definition(&col).unwrap();
        assert_eq!(def, "\"active\" boolean NOT NULL DEFAULT TRUE");
    }

    #[test]
    fn test_alter_column_statements() {
        let ddl = PgDdl;
        let mut col = translated("name", "string");
        col.allow_null = false;
        let stmts = ddl.alter_column(&TableName::bare("widgets"), &col).unwrap();
        assert_eq!(
            stmts,
            vec![
                "ALTER TABLE \"widgets\" ALTER COLUMN \"name\" TYPE varchar(255)",
                "ALTER TABLE \"widgets\" ALTER COLUMN \"name\" SET NOT NULL",
                "ALTER TABLE \"widgets\" ALTER COLUMN \"name\" DROP DEFAULT",
            ]
        );
    }

    #[test]
    fn test_drop_primary_key_uses_pkey_convention() {
        let ddl = PgDdl;
        let sql = ddl.drop_primary_key(&TableName::bare("widgets")).unwrap();
        assert_eq!(sql, "ALTER TABLE \"widgets\" DROP CONSTRAINT \"widgets_pkey\"");
    }
}
