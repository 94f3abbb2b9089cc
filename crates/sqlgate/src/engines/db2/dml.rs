//! DB2 DML rendering.
//!
//! No native OFFSET on the targeted level: offset pagination wraps the
//! query in a `ROW_NUMBER()` window.

use crate::core::identifier::QuoteStyle;
use crate::core::schema::TableName;
use crate::core::traits::{DmlBuilder, InsertCommand, KeyRetrieval};
use crate::error::Result;

pub struct Db2Dml;

impl DmlBuilder for Db2Dml {
    fn engine(&self) -> &'static str {
        "db2"
    }

    fn quote_style(&self) -> QuoteStyle {
        QuoteStyle::DoubleQuote
    }

    fn apply_limit(&self, sql: &str, limit: Option<u64>, offset: u64) -> String {
        if offset == 0 {
            return match limit {
                Some(limit) => format!("{} FETCH FIRST {} ROWS ONLY", sql, limit),
                None => sql.to_string(),
            };
        }
        let upper = match limit {
            Some(limit) => format!("row_num_ BETWEEN {} AND {}", offset + 1, offset + limit),
            None => format!("row_num_ > {}", offset),
        };
        format!(
            "SELECT * FROM (SELECT inner_.*, ROW_NUMBER() OVER () AS row_num_ \
             FROM ({}) AS inner_) AS ranked_ WHERE {}",
            sql, upper
        )
    }

    fn build_insert(
        &self,
        table: &TableName,
        columns: &[&str],
        pk_column: Option<&str>,
    ) -> Result<InsertCommand> {
        let quoted: Result<Vec<String>> = columns.iter().map(|c| self.quote(c)).collect();
        let placeholders: Vec<&str> = columns.iter().map(|_| "?").collect();
        let insert = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            self.qualify(table)?,
            quoted?.join(", "),
            placeholders.join(", ")
        );
        Ok(match pk_column {
            Some(pk) => InsertCommand {
                sql: format!(
                    "SELECT {} FROM FINAL TABLE ({})",
                    self.quote(pk)?,
                    insert
                ),
                key: KeyRetrieval::InlineResult,
            },
            None => InsertCommand {
                sql: insert,
                key: KeyRetrieval::None,
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
    use crate::core::value::SqlValue;

    #[test]
    fn test_fetch_first_without_offset() {
        let dml = Db2Dml;
        assert_eq!(
            dml.apply_limit("SELECT * FROM \"t\"", Some(10), 0),
            "SELECT * FROM \"t\" FETCH FIRST 10 ROWS ONLY"
        );
    }

    #[test]
    fn test_window_rewrite_with_offset() {
        let dml = Db2Dml;
        let sql = dml.apply_limit("SELECT * FROM \"t\"", Some(10), 20);
        assert!(sql.contains("ROW_NUMBER() OVER ()"));
        assert!(sql.contains("row_num_ BETWEEN 21 AND 30"));
    }

    #[test]
    fn test_insert_final_table() {
        let dml = Db2Dml;
        let cmd = dml
            .build_insert(&TableName::bare("widgets"), &["name"], Some("id"))
            .unwrap();
        assert_eq!(
            cmd.sql,
            "SELECT \"id\" FROM FINAL TABLE (INSERT INTO \"widgets\" (\"name\") VALUES (?))"
        );
        assert_eq!(cmd.key, KeyRetrieval::InlineResult);
    }

    #[test]
    fn test_composite_in_concat_rewrite() {
        let dml = Db2Dml;
        let sql = dml
            .composite_key_in(
                &["order_id", "item_id"],
                &[
                    vec![SqlValue::I64(1), SqlValue::I64(2)],
                    vec![SqlValue::I64(3), SqlValue::I64(4)],
                ],
            )
            .unwrap();
        assert!(sql.contains("||"));
        assert!(sql.contains("'1,2'"));
        assert!(sql.contains("'3,4'"));
        assert!(!sql.contains("(\"order_id\", \"item_id\") IN"));
    }
}
