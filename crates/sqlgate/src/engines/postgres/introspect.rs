//! PostgreSQL metadata introspection via `information_schema` and
//! `pg_catalog`.

use async_trait::async_trait;
use serde_json::json;

use crate::core::identifier::QuoteStyle;
use crate::core::schema::{
    ColumnSchema, FkEdge, FunctionSchema, PrimaryKey, ProcedureSchema, TableName, TableSchema,
};
use crate::core::traits::{Executor, Introspector, TypeTranslator};
use crate::core::value::SqlValue;
use crate::error::Result;

use super::types::PgTranslator;

pub struct PgIntrospector;

const QUOTE: QuoteStyle = QuoteStyle::DoubleQuote;

fn schema_or_public(schema: Option<&str>) -> SqlValue {
    SqlValue::from(schema.unwrap_or("public"))
}

#[async_trait]
impl Introspector for PgIntrospector {
    async fn schema_names(&self, exec: &dyn Executor) -> Result<Vec<String>> {
        let rows = exec
            .query(
                "SELECT nspname FROM pg_catalog.pg_namespace \
                 WHERE nspname NOT LIKE 'pg\\_%' AND nspname <> 'information_schema' \
                 ORDER BY nspname",
                &[],
            )
            .await?;
        Ok(rows.iter().filter_map(|r| r.get_text("nspname")).collect())
    }

    async fn table_names(
        &self,
        exec: &dyn Executor,
        schema: Option<&str>,
        include_views: bool,
    ) -> Result<Vec<TableName>> {
        let mut sql = String::from(
            "SELECT table_name FROM information_schema.tables WHERE table_schema = $1",
        );
        if !include_views {
            sql.push_str(" AND table_type = 'BASE TABLE'");
        }
        sql.push_str(" ORDER BY table_name");

        let rows = exec.query(&sql, &[schema_or_public(schema)]).await?;
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
        let schema = schema_or_public(name.schema.as_deref());
        let rows = exec
            .query(
                "SELECT column_name, data_type, is_nullable, column_default, \
                        character_maximum_length, numeric_precision, numeric_scale \
                 FROM information_schema.columns \
                 WHERE table_schema = $1 AND table_name = $2 \
                 ORDER BY ordinal_position",
                &[schema.clone(), SqlValue::from(name.name.as_str())],
            )
            .await?;
        if rows.is_empty() {
            return Ok(None);
        }

        let type_rows = exec
            .query(
                "SELECT table_type FROM information_schema.tables \
                 WHERE table_schema = $1 AND table_name = $2",
                &[schema.clone(), SqlValue::from(name.name.as_str())],
            )
            .await?;
        let is_view = type_rows
            .first()
            .and_then(|r| r.get_text("table_type"))
            .map(|t| t.eq_ignore_ascii_case("VIEW"))
            .unwrap_or(false);

        let pk_rows = exec
            .query(
                "SELECT kcu.column_name \
                 FROM information_schema.table_constraints tc \
                 JOIN information_schema.key_column_usage kcu \
                   ON kcu.constraint_name = tc.constraint_name \
                  AND kcu.table_schema = tc.table_schema \
                 WHERE tc.constraint_type = 'PRIMARY KEY' \
                   AND tc.table_schema = $1 AND tc.table_name = $2 \
                 ORDER BY kcu.ordinal_position",
                &[schema, SqlValue::from(name.name.as_str())],
            )
            .await?;
        let pk_columns: Vec<String> = pk_rows
            .iter()
            .filter_map(|r| r.get_text("column_name"))
            .collect();

        let raw_name = QUOTE.qualify(name.schema.as_deref(), &name.name)?;
        let mut table = TableSchema::new(name.clone(), raw_name);
        table.is_view = is_view;

        let translator = PgTranslator;
        for row in &rows {
            let Some(col_name) = row.get_text("column_name") else {
                continue;
            };
            let db_type = row.get_text("data_type").unwrap_or_default();
            let mut col = ColumnSchema::new(&col_name, QUOTE.quote(&col_name)?, &db_type);
            col.abstract_type = translator.to_abstract(&db_type);
            col.allow_null = row
                .get_text("is_nullable")
                .map(|v| v.eq_ignore_ascii_case("YES"))
                .unwrap_or(true);
            col.length = row.get_i64("character_maximum_length").map(|n| n as u32);
            col.precision = row.get_i64("numeric_precision").map(|n| n as u32);
            col.scale = row.get_i64("numeric_scale").map(|n| n as u32);

            if let Some(default) = row.get_text("column_default") {
                if let Some(seq) = default
                    .strip_prefix("nextval('")
                    .and_then(|rest| rest.split('\'').next())
                {
                    col.auto_increment = true;
                    table.sequence_name = Some(seq.to_string());
                } else if default.contains('(') || default.to_ascii_uppercase().contains("CURRENT") {
                    col.default = Some(json!({ "expression": default }));
                } else {
                    col.default = Some(json!(default));
                }
            }

            if pk_columns.iter().any(|p| p.eq_ignore_ascii_case(&col_name)) {
                col.is_primary_key = true;
                if col.auto_increment {
                    col.abstract_type = crate::core::descriptor::AbstractType::Id;
                }
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
                "SELECT tc.constraint_name, tc.table_name, kcu.column_name, \
                        ccu.table_name AS ref_table, ccu.column_name AS ref_column \
                 FROM information_schema.table_constraints tc \
                 JOIN information_schema.key_column_usage kcu \
                   ON kcu.constraint_name = tc.constraint_name \
                  AND kcu.table_schema = tc.table_schema \
                 JOIN information_schema.constraint_column_usage ccu \
                   ON ccu.constraint_name = tc.constraint_name \
                  AND ccu.table_schema = tc.table_schema \
                 WHERE tc.constraint_type = 'FOREIGN KEY' AND tc.table_schema = $1 \
                 ORDER BY tc.constraint_name, kcu.ordinal_position",
                &[schema_or_public(schema)],
            )
            .await?;

        Ok(rows
            .iter()
            .filter_map(|row| {
                Some(FkEdge {
                    constraint: row.get_text("constraint_name")?,
                    table: TableName::bare(row.get_text("table_name")?),
                    column: row.get_text("column_name")?,
                    ref_table: TableName::bare(row.get_text("ref_table")?),
                    ref_column: row.get_text("ref_column")?,
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
                "SELECT p.proname FROM pg_catalog.pg_proc p \
                 JOIN pg_catalog.pg_namespace n ON n.oid = p.pronamespace \
                 WHERE n.nspname = $1 AND p.prokind = 'p' \
                 ORDER BY p.proname",
                &[schema_or_public(schema)],
            )
            .await?;
        rows.iter()
            .filter_map(|r| r.get_text("proname"))
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
                "SELECT p.proname, pg_catalog.format_type(p.prorettype, NULL) AS return_type \
                 FROM pg_catalog.pg_proc p \
                 JOIN pg_catalog.pg_namespace n ON n.oid = p.pronamespace \
                 WHERE n.nspname = $1 AND p.prokind = 'f' \
                 ORDER BY p.proname",
                &[schema_or_public(schema)],
            )
            .await?;
        rows.iter()
            .filter_map(|r| Some((r.get_text("proname")?, r.get_text("return_type"))))
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
