//! MySQL metadata introspection via `information_schema`.

use async_trait::async_trait;
use serde_json::json;

use crate::core::identifier::QuoteStyle;
use crate::core::schema::{
    ColumnSchema, FkEdge, FunctionSchema, PrimaryKey, ProcedureSchema, TableName, TableSchema,
};
use crate::core::traits::{Executor, Introspector, TypeTranslator};
use crate::core::value::SqlValue;
use crate::error::Result;

use super::types::MySqlTranslator;

pub struct MySqlIntrospector;

const QUOTE: QuoteStyle = QuoteStyle::Backtick;

fn schema_param(schema: Option<&str>) -> SqlValue {
    match schema {
        Some(s) => SqlValue::from(s),
        None => SqlValue::Null,
    }
}

#[async_trait]
impl Introspector for MySqlIntrospector {
    async fn schema_names(&self, exec: &dyn Executor) -> Result<Vec<String>> {
        let rows = exec
            .query(
                "SELECT schema_name FROM information_schema.schemata \
                 WHERE schema_name NOT IN ('information_schema', 'mysql', 'performance_schema', 'sys') \
                 ORDER BY schema_name",
                &[],
            )
            .await?;
        Ok(rows
            .iter()
            .filter_map(|r| r.get_text("schema_name"))
            .collect())
    }

    async fn table_names(
        &self,
        exec: &dyn Executor,
        schema: Option<&str>,
        include_views: bool,
    ) -> Result<Vec<TableName>> {
        let mut sql = String::from(
            "SELECT table_name, table_schema FROM information_schema.tables \
             WHERE table_schema = COALESCE(?, DATABASE())",
        );
        if !include_views {
            sql.push_str(" AND table_type = 'BASE TABLE'");
        }
        sql.push_str(" ORDER BY table_name");

        let rows = exec.query(&sql, &[schema_param(schema)]).await?;
        Ok(rows
            .iter()
            .filter_map(|r| {
                let name = r.get_text("table_name")?;
                Some(match schema {
                    Some(s) => TableName::qualified(s, name),
                    None => TableName::bare(name),
                })
            })
            .collect())
    }

    async fn describe_table(
        &self,
        exec: &dyn Executor,
        name: &TableName,
    ) -> Result<Option<TableSchema>> {
        let rows = exec
            .query(
                "SELECT column_name, data_type, column_type, is_nullable, column_default, \
                        extra, character_maximum_length, numeric_precision, numeric_scale, \
                        column_key, column_comment \
                 FROM information_schema.columns \
                 WHERE table_schema = COALESCE(?, DATABASE()) AND table_name = ? \
                 ORDER BY ordinal_position",
                &[schema_param(name.schema.as_deref()), SqlValue::from(name.name.as_str())],
            )
            .await?;
        if rows.is_empty() {
            return Ok(None);
        }

        let view_rows = exec
            .query(
                "SELECT table_type FROM information_schema.tables \
                 WHERE table_schema = COALESCE(?, DATABASE()) AND table_name = ?",
                &[schema_param(name.schema.as_deref()), SqlValue::from(name.name.as_str())],
            )
            .await?;
        let is_view = view_rows
            .first()
            .and_then(|r| r.get_text("table_type"))
            .map(|t| t.eq_ignore_ascii_case("VIEW"))
            .unwrap_or(false);

        let raw_name = QUOTE.qualify(name.schema.as_deref(), &name.name)?;
        let mut table = TableSchema::new(name.clone(), raw_name);
        table.is_view = is_view;

        let translator = MySqlTranslator;
        let mut pk_columns = Vec::new();

        for row in &rows {
            let Some(col_name) = row.get_text("column_name") else {
                continue;
            };
            let db_type = row
                .get_text("column_type")
                .or_else(|| row.get_text("data_type"))
                .unwrap_or_default();
            let mut col = ColumnSchema::new(&col_name, QUOTE.quote(&col_name)?, &db_type);

            col.abstract_type = translator.to_abstract(
                &row.get_text("data_type").unwrap_or_else(|| db_type.clone()),
            );
            col.allow_null = row
                .get_text("is_nullable")
                .map(|v| v.eq_ignore_ascii_case("YES"))
                .unwrap_or(true);
            col.length = row
                .get_i64("character_maximum_length")
                .map(|n| n as u32);
            col.precision = row.get_i64("numeric_precision").map(|n| n as u32);
            col.scale = row.get_i64("numeric_scale").map(|n| n as u32);
            col.auto_increment = row
                .get_text("extra")
                .map(|e| e.to_ascii_lowercase().contains("auto_increment"))
                .unwrap_or(false);
            col.comment = row.get_text("column_comment").filter(|c| !c.is_empty());

            if let Some(default) = row.get_text("column_default") {
                col.default = Some(if default.to_ascii_uppercase().contains("CURRENT_TIMESTAMP") {
                    json!({ "expression": default })
                } else {
                    json!(default)
                });
            }

            match row.get_text("column_key").as_deref() {
                Some("PRI") => {
                    col.is_primary_key = true;
                    pk_columns.push(col_name.clone());
                }
                Some("UNI") => col.is_unique = true,
                Some("MUL") => col.is_index = true,
                _ => {}
            }
            if col.auto_increment && col.is_primary_key {
                col.abstract_type = crate::core::descriptor::AbstractType::Id;
            }

            table.columns.insert(col);
        }
        table.primary_key = PrimaryKey::from_columns(pk_columns);
        Ok(Some(table))
    }

    async fn foreign_keys(
        &self,
        exec: &dyn Executor,
        schema: Option<&str>,
    ) -> Result<Vec<FkEdge>> {
        let rows = exec
            .query(
                "SELECT constraint_name, table_name, column_name, \
                        referenced_table_name, referenced_column_name \
                 FROM information_schema.key_column_usage \
                 WHERE table_schema = COALESCE(?, DATABASE()) \
                   AND referenced_table_name IS NOT NULL \
                 ORDER BY constraint_name, ordinal_position",
                &[schema_param(schema)],
            )
            .await?;

        Ok(rows
            .iter()
            .filter_map(|row| {
                Some(FkEdge {
                    constraint: row.get_text("constraint_name")?,
                    table: TableName::bare(row.get_text("table_name")?),
                    column: row.get_text("column_name")?,
                    ref_table: TableName::bare(row.get_text("referenced_table_name")?),
                    ref_column: row.get_text("referenced_column_name")?,
                })
            })
            .collect())
    }

    async fn procedure_names(
        &self,
        exec: &dyn Executor,
        schema: Option<&str>,
    ) -> Result<Vec<ProcedureSchema>> {
        let rows = exec
            .query(
                "SELECT routine_name FROM information_schema.routines \
                 WHERE routine_schema = COALESCE(?, DATABASE()) AND routine_type = 'PROCEDURE' \
                 ORDER BY routine_name",
                &[schema_param(schema)],
            )
            .await?;
        rows.iter()
            .filter_map(|r| r.get_text("routine_name"))
            .map(|name| {
                Ok(ProcedureSchema {
                    raw_name: QUOTE.qualify(schema, &name)?,
                    name: match schema {
                        Some(s) => TableName::qualified(s, name),
                        None => TableName::bare(name),
                    },
                })
            })
            .collect()
    }

    async fn function_names(
        &self,
        exec: &dyn Executor,
        schema: Option<&str>,
    ) -> Result<Vec<FunctionSchema>> {
        let rows = exec
            .query(
                "SELECT routine_name, data_type FROM information_schema.routines \
                 WHERE routine_schema = COALESCE(?, DATABASE()) AND routine_type = 'FUNCTION' \
                 ORDER BY routine_name",
                &[schema_param(schema)],
            )
            .await?;
        rows.iter()
            .filter_map(|r| Some((r.get_text("routine_name")?, r.get_text("data_type"))))
            .map(|(name, return_type)| {
                Ok(FunctionSchema {
                    raw_name: QUOTE.qualify(schema, &name)?,
                    name: match schema {
                        Some(s) => TableName::qualified(s, name),
                        None => TableName::bare(name),
                    },
                    return_type,
                })
            })
            .collect()
    }
}
