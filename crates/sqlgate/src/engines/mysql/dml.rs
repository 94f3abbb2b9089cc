//! MySQL DML rendering.

use crate::core::identifier::QuoteStyle;
use crate::core::schema::TableName;
use crate::core::traits::{DmlBuilder, InsertCommand, KeyRetrieval, UpdateOptions};
use crate::error::Result;

pub struct MySqlDml;

impl DmlBuilder for MySqlDml {
    fn engine(&self) -> &'static str {
        "mysql"
    }

    fn quote_style(&self) -> QuoteStyle {
        QuoteStyle::Backtick
    }

    fn apply_limit(&self, sql: &str, limit: Option<u64>, offset: u64) -> String {
        match (limit, offset) {
            (Some(limit), 0) => format!("{} LIMIT {}", sql, limit),
            (Some(limit), offset) => format!("{} LIMIT {}, {}", sql, offset, limit),
            // MySQL has no offset-without-limit form; the documented idiom
            // is an all-rows limit.
            (None, offset) if offset > 0 => {
                format!("{} LIMIT {}, 18446744073709551615", sql, offset)
            }
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
                Some(_) => KeyRetrieval::PostInsertQuery("SELECT LAST_INSERT_ID()".to_string()),
                None => KeyRetrieval::None,
            },
        })
    }

    // MySQL multi-table UPDATE places joins between the table and SET.
    fn build_update(&self, opts: &UpdateOptions) -> Result<String> {
        let mut sql = format!("UPDATE {}", self.qualify(&opts.table)?);
        if let Some(alias) = &opts.alias {
            sql.push(' ');
            sql.push_str(&self.quote(alias)?);
        }
        sql.push_str(&self.render_joins(&opts.joins)?);
        sql.push_str(" SET ");
        sql.push_str(&self.render_set_list(&opts.columns)?);
        if let Some(where_clause) = &opts.where_clause {
            if !where_clause.is_empty() {
                sql.push_str(" WHERE ");
                sql.push_str(where_clause);
            }
        }
        Ok(sql)
    }
}
