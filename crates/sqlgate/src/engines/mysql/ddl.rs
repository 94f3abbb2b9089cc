//! MySQL DDL rendering.

use crate::core::descriptor::ColumnDescriptor;
use crate::core::identifier::QuoteStyle;
use crate::core::schema::TableName;
use crate::core::traits::DdlBuilder;
use crate::error::Result;

pub struct MySqlDdl;

impl DdlBuilder for MySqlDdl {
    fn engine(&self) -> &'static str {
        "mysql"
    }

    fn quote_style(&self) -> QuoteStyle {
        QuoteStyle::Backtick
    }

    fn identity_suffix(&self, _col: &ColumnDescriptor) -> Option<String> {
        Some("AUTO_INCREMENT".to_string())
    }

    fn alter_column(&self, table: &TableName, col: &ColumnDescriptor) -> Result<Vec<String>> {
        Ok(vec![format!(
            "ALTER TABLE {} MODIFY COLUMN {}",
            self.qualify(table)?,
            self.column_definition(col)?
        )])
    }

    // Pre-8.0 servers need CHANGE with the full definition; use it whenever
    // the caller can supply one.
    fn rename_column(
        &self,
        table: &TableName,
        column: &str,
        new_name: &str,
        definition: Option<&ColumnDescriptor>,
    ) -> Result<String> {
        match definition {
            Some(def) => {
                let mut renamed = def.clone();
                renamed.name = new_name.to_string();
                Ok(format!(
                    "ALTER TABLE {} CHANGE {} {}",
                    self.qualify(table)?,
                    self.quote(column)?,
                    self.column_definition(&renamed)?
                ))
            }
            None => Ok(format!(
                "ALTER TABLE {} RENAME COLUMN {} TO {}",
                self.qualify(table)?,
                self.quote(column)?,
                self.quote(new_name)?
            )),
        }
    }

    fn drop_foreign_key(&self, table: &TableName, constraint: &str) -> Result<String> {
        Ok(format!(
            "ALTER TABLE {} DROP FOREIGN KEY {}",
            self.qualify(table)?,
            self.quote(constraint)?
        ))
    }

    fn drop_index(&self, table: &TableName, index_name: &str) -> Result<String> {
        Ok(format!(
            "DROP INDEX {} ON {}",
            self.quote(index_name)?,
            self.qualify(table)?
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::descriptor::TableDescriptor;
    use crate::core::traits::TypeTranslator;
    use crate::engines::mysql::MySqlTranslator;

    fn translated(name: &str, type_name: &str) -> ColumnDescriptor {
        let mut col = ColumnDescriptor::new(name, type_name);
        let t = MySqlTranslator;
        t.translate_simple_column_types(&mut col).unwrap();
        t.validate_column_settings(&mut col).unwrap();
        col
    }

    #[test]
    fn test_id_column_definition_order() {
        let ddl = MySqlDdl;
        let def = ddl.column_definition(&translated("id", "id")).unwrap();
        assert_eq!(def, "`id` int NOT NULL AUTO_INCREMENT PRIMARY KEY");
    }

    #[test]
    fn test_create_table_with_fk_and_index() {
        let ddl = MySqlDdl;
        let mut owner = translated("owner_id", "fk");
        owner.is_foreign_key = true;
        owner.ref_table = Some("users".to_string());
        owner.ref_field = Some("id".to_string());
        let mut name = translated("name", "string");
        name.is_index = true;

        let table = TableDescriptor {
            name: "widgets".to_string(),
            fields: vec![translated("id", "id"), name, owner],
            label: None,
            description: None,
        };

        let stmts = ddl.create_table(&table).unwrap();
        assert!(stmts[0].starts_with("CREATE TABLE `widgets` ("));
        assert!(stmts[0].contains("`name` varchar(255)"));
        assert!(stmts
            .iter()
            .any(|s| s.contains("ADD CONSTRAINT `fk_widgets_owner_id` FOREIGN KEY (`owner_id`) REFERENCES `users` (`id`)")));
        assert!(stmts
            .iter()
            .any(|s| s.starts_with("CREATE INDEX `ix_widgets_name` ON `widgets`")));
    }

    #[test]
    fn test_composite_primary_key_moves_to_table_level() {
        let ddl = MySqlDdl;
        let mut a = translated("order_id", "integer");
        a.is_primary_key = true;
        let mut b = translated("item_id", "integer");
        b.is_primary_key = true;

        let table = TableDescriptor {
            name: "order_items".to_string(),
            fields: vec![a, b],
            label: None,
            description: None,
        };
        let stmts = ddl.create_table(&table).unwrap();
        assert!(stmts[0].contains("PRIMARY KEY (`order_id`, `item_id`)"));
        assert_eq!(stmts[0].matches("PRIMARY KEY").count(), 1);
    }

    #[test]
    fn test_rename_column_with_definition_uses_change() {
        let ddl = MySqlDdl;
        let def = translated("title", "string");
        let sql = ddl
            .rename_column(&TableName::bare("posts"), "title", "headline", Some(&def))
            .unwrap();
        assert_eq!(
            sql,
            "ALTER TABLE `posts` CHANGE `title` `headline` varchar(255)"
        );
    }

    #[test]
    fn test_drop_foreign_key_syntax() {
        let ddl = MySqlDdl;
        let sql = ddl
            .drop_foreign_key(&TableName::bare("widgets"), "fk_widgets_owner_id")
            .unwrap();
        assert_eq!(
            sql,
            "ALTER TABLE `widgets` DROP FOREIGN KEY `fk_widgets_owner_id`"
        );
    }
}
