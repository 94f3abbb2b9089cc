//! PostgreSQL DML rendering.

use crate::core::identifier::QuoteStyle;
use crate::core::schema::TableName;
use crate::core::traits::{DmlBuilder, InsertCommand, KeyRetrieval, UpdateOptions};
use crate::error::Result;

pub struct PgDml;

impl DmlBuilder for PgDml {
    fn engine(&self) -> &'static str {
        "postgres"
    }

    fn quote_style(&self) -> QuoteStyle {
        QuoteStyle::DoubleQuote
    }

    fn param_placeholder(&self, index: usize) -> String {
        format!("${}", index)
    }

    fn apply_limit(&self, sql: &str, limit: Option<u64>, offset: u64) -> String {
        let mut out = sql.to_string();
        if let Some(limit) = limit {
            out.push_str(&format!(" LIMIT {}", limit));
        }
        if offset > 0 {
            out.push_str(&format!(" OFFSET {}", offset));
        }
        out
    }

    fn build_insert(
        &self,
        table: &TableName,
        columns: &[&str],
        pk_column: Option<&str>,
    ) -> Result<InsertCommand> {
        let quoted: Result<Vec<String>> = columns.iter().map(|c| self.quote(c)).collect();
        let placeholders: Vec<String> = (1..=columns.len())
            .map(|i| self.param_placeholder(i))
            .collect();
        let mut sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            self.qualify(table)?,
            quoted?.join(", "),
            placeholders.join(", ")
        );
        let key = match pk_column {
            Some(pk) => {
                sql.push_str(" RETURNING ");
                sql.push_str(&self.quote(pk)?);
                KeyRetrieval::InlineResult
            }
            None => KeyRetrieval::None,
        };
        Ok(InsertCommand { sql, key })
    }

    // Postgres joined UPDATE uses a FROM clause after SET.
    fn build_update(&self, opts: &UpdateOptions) -> Result<String> {
        let mut sql = format!("UPDATE {}", self.qualify(&opts.table)?);
        if let Some(alias) = &opts.alias {
            sql.push(' ');
            sql.push_str(&self.quote(alias)?);
        }
        sql.push_str(" SET ");
        sql.push_str(&self.render_set_list(&opts.columns)?);

        let mut conditions: Vec<String> = Vec::new();
        if !opts.joins.is_empty() {
            let mut from_parts = Vec::with_capacity(opts.joins.len());
            for join in &opts.joins {
                let mut part = self.qualify(&join.table)?;
                if let Some(alias) = &join.alias {
                    part.push(' ');
                    part.push_str(&self.quote(alias)?);
                }
                from_parts.push(part);
                conditions.push(join.on.clone());
            }
            sql.push_str(" FROM ");
            sql.push_str(&from_parts.join(", "));
        }
        if let Some(where_clause) = &opts.where_clause {
            if !where_clause.is_empty() {
                conditions.push(where_clause.clone());
            }
        }
        if !conditions.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&conditions.join(" AND "));
        }
        Ok(sql)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::traits::JoinClause;

    #[test]
    fn test_numbered_placeholders() {
        let dml = PgDml;
        assert_eq!(dml.param_placeholder(1), "$1");
        assert_eq!(dml.param_placeholder(12), "$12");
    }

    #[test]
    fn test_limit_offset() {
        let dml = PgDml;
        assert_eq!(
            dml.apply_limit("SELECT * FROM \"t\"", Some(10), 20),
            "SELECT * FROM \"t\" LIMIT 10 OFFSET 20"
        );
        assert_eq!(
            dml.apply_limit("SELECT * FROM \"t\"", None, 20),
            "SELECT * FROM \"t\" OFFSET 20"
        );
    }

    #[test]
    fn test_insert_returning() {
        let dml = PgDml;
        let cmd = dml
            .build_insert(&TableName::bare("widgets"), &["name", "owner_id"], Some("id"))
            .unwrap();
        assert_eq!(
            cmd.sql,
            "INSERT INTO \"widgets\" (\"name\", \"owner_id\") VALUES ($1, $2) RETURNING \"id\""
        );
        assert_eq!(cmd.key, KeyRetrieval::InlineResult);
    }

    #[test]
    fn test_update_from_after_set() {
        let dml = PgDml;
        let sql = dml
            .build_update(&UpdateOptions {
                table: TableName::bare("widgets"),
                alias: Some("w".to_string()),
                columns: vec!["status".to_string()],
                joins: vec![JoinClause {
                    kind: "JOIN".to_string(),
                    table: TableName::bare("users"),
                    alias: Some("u".to_string()),
                    on: "\"u\".\"id\" = \"w\".\"owner_id\"".to_string(),
                }],
                where_clause: Some("\"u\".\"active\"".to_string()),
            })
            .unwrap();
        assert_eq!(
            sql,
            "UPDATE \"widgets\" \"w\" SET \"status\" = $1 FROM \"users\" \"u\" \
             WHERE \"u\".\"id\" = \"w\".\"owner_id\" AND \"u\".\"active\""
        );
    }
}
