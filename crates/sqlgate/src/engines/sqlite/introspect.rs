//! SQLite metadata introspection via `sqlite_master` and PRAGMA.
//!
//! PRAGMA arguments cannot be bound, so validated table names are quoted
//! inline.

use async_trait::async_trait;
use serde_json::json;

use crate::core::identifier::QuoteStyle;
use crate::core::schema::{
    ColumnSchema, FkEdge, FunctionSchema, PrimaryKey, ProcedureSchema, TableName, TableSchema,
};
use crate::core::traits::{Executor, Introspector, TypeTranslator};
use crate::core::value::SqlValue;
use crate::error::Result;

use super::types::SqliteTranslator;

pub struct SqliteIntrospector;

const QUOTE: QuoteStyle = QuoteStyle::DoubleQuote;

#[async_trait]
impl Introspector for SqliteIntrospector {
    async fn schema_names(&self, exec: &dyn Executor) -> Result<Vec<String>> {
        let rows = exec.query("PRAGMA database_list", &[]).await?;
        Ok(rows.iter().filter_map(|r| r.get_text("name")).collect())
    }

    async fn table_names(
        &self,
        exec: &dyn Executor,
        _schema: Option<&str>,
        include_views: bool,
    ) -> Result<Vec<TableName>> {
        let mut sql = String::from(
            "SELECT name FROM sqlite_master WHERE name NOT LIKE 'sqlite_%'",
        );
        if include_views {
            sql.push_str(" AND type IN ('table', 'view')");
        } else {
            sql.push_str(" AND type = 'table'");
        }
        sql.push_str(" ORDER BY name");

        let rows = exec.query(&sql, &[]).await?;
        Ok(rows
            .iter()
            .filter_map(|r| r.get_text("name"))
            .map(TableName::bare)
            .collect())
    }

    async fn describe_table(
        &self,
        exec: &dyn Executor,
        name: &TableName,
    ) -> Result<Option<TableSchema>> {
        let quoted = QUOTE.quote(&name.name)?;
        let rows = exec
            .query(&format!("PRAGMA table_info({})", quoted), &[])
            .await?;
        if rows.is_empty() {
            return Ok(None);
        }

        let kind_rows = exec
            .query(
                "SELECT type FROM sqlite_master WHERE name = ?",
                &[SqlValue::from(name.name.as_str())],
            )
            .await?;
        let is_view = kind_rows
            .first()
            .and_then(|r| r.get_text("type"))
            .map(|t| t.eq_ignore_ascii_case("view"))
            .unwrap_or(false);

        let mut table = TableSchema::new(TableName::bare(&name.name), quoted.clone());
        table.is_view = is_view;

        let translator = SqliteTranslator;
        let mut pk: Vec<(i64, String)> = Vec::new();

        for row in &rows {
            let Some(col_name) = row.get_text("name") else {
                continue;
            };
            let db_type = row.get_text("type").unwrap_or_default();
            let mut col = ColumnSchema::new(&col_name, QUOTE.quote(&col_name)?, &db_type);
            col.abstract_type = translator.to_abstract(&db_type);
            col.allow_null = row.get_i64("notnull").unwrap_or(0) == 0;
            if let Some(default) = row.get_text("dflt_value") {
                let trimmed = default.trim_matches('\'').to_string();
                col.default = Some(if default.starts_with('\'') {
                    json!(trimmed)
                } else if default.chars().all(|c| c.is_ascii_digit() || c == '-' || c == '.') {
                    json!(default)
                } else {
                    json!({ "expression": default })
                });
            }
            let pk_rank = row.get_i64("pk").unwrap_or(0);
            if pk_rank > 0 {
                col.is_primary_key = true;
                pk.push((pk_rank, col_name.clone()));
                // Single-column integer primary keys are rowid aliases.
                if db_type.eq_ignore_ascii_case("integer") {
                    col.auto_increment = true;
                    col.abstract_type = crate::core::descriptor::AbstractType::Id;
                }
            }
            table.columns.insert(col);
        }

        pk.sort_by_key(|(rank, _)| *rank);
        if pk.len() > 1 {
            // Composite keys are not rowid aliases; undo the single-key marks.
            for (_, col_name) in &pk {
                if let Some(col) = table.columns.get_mut(col_name) {
                    col.auto_increment = false;
                    if col.abstract_type == crate::core::descriptor::AbstractType::Id {
                        col.abstract_type = crate::core::descriptor::AbstractType::Integer;
                    }
                }
            }
        }
        table.primary_key = PrimaryKey::from_columns(pk.into_iter().map(|(_, c)| c).collect());

        // Unique/index flags from the index list.
        let index_rows = exec
            .query(&format!("PRAGMA index_list({})", quoted), &[])
            .await?;
        for index_row in &index_rows {
            let Some(index_name) = index_row.get_text("name") else {
                continue;
            };
            let unique = index_row.get_i64("unique").unwrap_or(0) == 1;
            let info = exec
                .query(
                    &format!("PRAGMA index_info({})", QUOTE.quote(&index_name)?),
                    &[],
                )
                .await?;
            if info.len() != 1 {
                continue;
            }
            if let Some(col_name) = info[0].get_text("name") {
                if let Some(col) = table.columns.get_mut(&col_name) {
                    if unique && !col.is_primary_key {
                        col.is_unique = true;
                    } else if !unique {
                        col.is_index = true;
                    }
                }
            }
        }
        Ok(Some(table))
    }

    async fn foreign_keys(
        &self,
        exec: &dyn Executor,
        schema: Option<&str>,
    ) -> Result<Vec<FkEdge>> {
        let mut edges = Vec::new();
        for table in self.table_names(exec, schema, false).await? {
            let rows = exec
                .query(
                    &format!("PRAGMA foreign_key_list({})", QUOTE.quote(&table.name)?),
                    &[],
                )
                .await?;
            for row in &rows {
                let Some(ref_table) = row.get_text("table") else {
                    continue;
                };
                let Some(column) = row.get_text("from") else {
                    continue;
                };
                // "to" is NULL when referencing the parent's primary key.
                let ref_column = row.get_text("to").unwrap_or_else(|| "id".to_string());
                edges.push(FkEdge {
                    constraint: format!("fk_{}_{}", table.name, column),
                    table: TableName::bare(&table.name),
                    column,
                    ref_table: TableName::bare(ref_table),
                    ref_column,
                });
            }
        }
        Ok(edges)
    }

    async fn procedure_names(
        &self,
        _exec: &dyn Executor,
        _schema: Option<&str>,
    ) -> Result<Vec<ProcedureSchema>> {
        // No stored routines in SQLite.
        Ok(Vec::new())
    }

    async fn function_names(
        &self,
        _exec: &dyn Executor,
        _schema: Option<&str>,
    ) -> Result<Vec<FunctionSchema>> {
        Ok(Vec::new())
    }
}
