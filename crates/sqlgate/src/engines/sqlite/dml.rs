//! SQLite DML rendering.

use crate::core::identifier::QuoteStyle;
use crate::core::schema::TableName;
use crate::core::traits::{DmlBuilder, InsertCommand, KeyRetrieval};
use crate::error::Result;

pub struct SqliteDml;

impl DmlBuilder for SqliteDml {
    fn engine(&self) -> &'static str {
        "sqlite"
    }

    fn quote_style(&self) -> QuoteStyle {
        QuoteStyle::DoubleQuote
    }

    fn apply_limit(&self, sql: &str, limit: Option<u64>, offset: u64) -> String {
        match (limit, offset) {
            (Some(limit), 0) => format!("{} LIMIT {}", sql, limit),
            (Some(limit), offset) => format!("{} LIMIT {} OFFSET {}", sql, limit, offset),
            (None, offset) if offset > 0 => format!("{} LIMIT -1 OFFSET {}", sql, offset),
            (None, _) => sql.to_string(),
        }
    }

    fn build_insert(
        &self,
        table: &TableName,
        columns: &[&str],
        pk_column: Option<&str>,
    ) -> Result<InsertCommand> {
        let quoted: Result<Vec<String>> = columns.iter().map(|c| self.quote(c)).collect();
        let placeholders: Vec<&str> = columns.iter().map(|_| "?").collect();
        Ok(InsertCommand {
            sql: format!(
                "INSERT INTO {} ({}) VALUES ({})",
                self.qualify(table)?,
                quoted?.join(", "),
                placeholders.join(", ")
            ),
            key: match pk_column {
                Some(_) => {
                    KeyRetrieval::PostInsertQuery("SELECT last_insert_rowid()".to_string())
                }
                None => KeyRetrieval::None,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limit_offset() {
        let dml = SqliteDml;
        assert_eq!(
            dml.apply_limit("SELECT * FROM \"t\"", Some(10), 20),
            "SELECT * FROM \"t\" LIMIT 10 OFFSET 20"
        );
        assert_eq!(
            dml.apply_limit("SELECT * FROM \"t\"", None, 5),
            "SELECT * FROM \"t\" LIMIT -1 OFFSET 5"
        );
    }

    #[test]
    fn test_insert_post_query() {
        let dml = SqliteDml;
        let cmd = dml
            .build_insert(&TableName::bare("widgets"), &["name", "owner_id"], Some("id"))
            .unwrap();
        assert_eq!(
            cmd.sql,
            "INSERT INTO \"widgets\" (\"name\", \"owner_id\") VALUES (?, ?)"
        );
        assert_eq!(
            cmd.key,
            KeyRetrieval::PostInsertQuery("SELECT last_insert_rowid()".to_string())
        );
    }
}
