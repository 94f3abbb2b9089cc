//! SQL Anywhere DML rendering.

use crate::core::identifier::QuoteStyle;
use crate::core::schema::TableName;
use crate::core::traits::{DmlBuilder, InsertCommand, KeyRetrieval};
use crate::error::Result;

pub struct SqlAnyDml;

impl DmlBuilder for SqlAnyDml {
    fn engine(&self) -> &'static str {
        "sqlanywhere"
    }

    fn quote_style(&self) -> QuoteStyle {
        QuoteStyle::DoubleQuote
    }

    // Pagination is injected into the SELECT keyword itself:
    // SELECT TOP n START AT o+1 ...
    fn apply_limit(&self, sql: &str, limit: Option<u64>, offset: u64) -> String {
        let clause = match (limit, offset) {
            (Some(limit), 0) => format!("TOP {}", limit),
            (Some(limit), offset) => format!("TOP {} START AT {}", limit, offset + 1),
            (None, offset) if offset > 0 => {
                format!("TOP ALL START AT {}", offset + 1)
            }
            (None, _) => return sql.to_string(),
        };
        match sql.strip_prefix("SELECT ") {
            Some(rest) => format!("SELECT {} {}", clause, rest),
            None => sql.to_string(),
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
                Some(_) => KeyRetrieval::PostInsertQuery("SELECT @@IDENTITY".to_string()),
                None => KeyRetrieval::None,
            },
        })
    }

    fn supports_row_value_in(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::traits::SelectOptions;

    #[test]
    fn test_top_start_at() {
        let dml = SqlAnyDml;
        assert_eq!(
            dml.apply_limit("SELECT * FROM \"t\"", Some(10), 0),
            "SELECT TOP 10 * FROM \"t\""
        );
        assert_eq!(
            dml.apply_limit("SELECT * FROM \"t\"", Some(10), 20),
            "SELECT TOP 10 START AT 21 * FROM \"t\""
        );
    }

    #[test]
    fn test_select_integration() {
        let dml = SqlAnyDml;
        let sql = dml
            .build_select(&SelectOptions {
                table: TableName::bare("widgets"),
                columns: vec!["id".to_string()],
                order_by: Some("\"id\"".to_string()),
                limit: Some(5),
                offset: 5,
                ..Default::default()
            })
            .unwrap();
        assert_eq!(
            sql,
            "SELECT TOP 5 START AT 6 \"id\" FROM \"widgets\" ORDER BY \"id\""
        );
    }

    #[test]
    fn test_insert_identity_post_query() {
        let dml = SqlAnyDml;
        let cmd = dml
            .build_insert(&TableName::bare("widgets"), &["name"], Some("id"))
            .unwrap();
        assert_eq!(
            cmd.key,
            KeyRetrieval::PostInsertQuery("SELECT @@IDENTITY".to_string())
        );
    }
}
