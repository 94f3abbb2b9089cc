//! SQL Anywhere metadata introspection via the `SYS.*` catalog views.

use async_trait::async_trait;
use serde_json::json;

use crate::core::identifier::QuoteStyle;
use crate::core::schema::{
    ColumnSchema, FkEdge, FunctionSchema, PrimaryKey, ProcedureSchema, TableName, TableSchema,
};
use crate::core::traits::{Executor, Introspector, TypeTranslator};
use crate::core::value::SqlValue;
use crate::error::Result;

use super::types::SqlAnyTranslator;

pub struct SqlAnyIntrospector;

const QUOTE: QuoteStyle = QuoteStyle::DoubleQuote;

#[async_trait]
impl Introspector for SqlAnyIntrospector {
    async fn schema_names(&self, exec: &dyn Executor) -> Result<Vec<String>> {
        let rows = exec
            .query(
                "SELECT user_name FROM sys.sysuser \
                 WHERE user_name NOT IN ('SYS', 'dbo', 'rs_systabgroup') \
                 ORDER BY user_name",
                &[],
            )
            .await?;
        Ok(rows.iter().filter_map(|r| r.get_text("user_name")).collect())
    }

    async fn table_names(
        &self,
        exec: &dyn Executor,
        schema: Option<&str>,
        include_views: bool,
    ) -> Result<Vec<TableName>> {
        let mut sql = String::from(
            "SELECT t.table_name, t.table_type FROM sys.systable t \
             JOIN sys.sysuser u ON u.user_id = t.creator \
             WHERE u.user_name = COALESCE(?, USER)",
        );
        if include_views {
            sql.push_str(" AND t.table_type IN ('BASE', 'VIEW')");
        } else {
            sql.push_str(" AND t.table_type = 'BASE'");
        }
        sql.push_str(" ORDER BY t.table_name");

        let param = match schema {
            Some(s) => SqlValue::from(s),
            None => SqlValue::Null,
        };
        let rows = exec.query(&sql, &[param]).await?;
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
                "SELECT c.column_name, d.domain_name, c.width, c.scale, c.nulls, \
                        c.\"default\" AS default_value, c.pkey, t.table_type \
                 FROM sys.syscolumn c \
                 JOIN sys.systable t ON t.table_id = c.table_id \
                 JOIN sys.sysdomain d ON d.domain_id = c.domain_id \
                 WHERE t.table_name = ? \
                 ORDER BY c.column_id",
                &[SqlValue::from(name.name.as_str())],
            )
            .await?;
        if rows.is_empty() {
            return Ok(None);
        }

        let raw_name = QUOTE.qualify(name.schema.as_deref(), &name.name)?;
        let mut table = TableSchema::new(name.clone(), raw_name);
        table.is_view = rows
            .first()
            .and_then(|r| r.get_text("table_type"))
            .map(|t| t.eq_ignore_ascii_case("VIEW"))
            .unwrap_or(false);

        let translator = SqlAnyTranslator;
        let mut pk_columns = Vec::new();

        for row in &rows {
            let Some(col_name) = row.get_text("column_name") else {
                continue;
            };
            let db_type = row.get_text("domain_name").unwrap_or_default();
            let mut col = ColumnSchema::new(&col_name, QUOTE.quote(&col_name)?, &db_type);
            col.abstract_type = translator.to_abstract(&db_type);
            col.allow_null = row
                .get_text("nulls")
                .map(|v| v.eq_ignore_ascii_case("Y"))
                .unwrap_or(true);
            col.length = row.get_i64("width").map(|n| n as u32);
            col.scale = row.get_i64("scale").map(|n| n as u32);

            if let Some(default) = row.get_text("default_value") {
                if default.eq_ignore_ascii_case("autoincrement") {
                    col.auto_increment = true;
                } else if default.contains('(') || default.to_ascii_uppercase().contains("CURRENT")
                {
                    col.default = Some(json!({ "expression": default }));
                } else {
                    col.default = Some(json!(default.trim_matches('\'').to_string()));
                }
            }
            if row
                .get_text("pkey")
                .map(|v| v.eq_ignore_ascii_case("Y"))
                .unwrap_or(false)
            {
                col.is_primary_key = true;
                pk_columns.push(col_name.clone());
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
        _schema: Option<&str>,
    ) -> Result<Vec<FkEdge>> {
        let rows = exec
            .query(
                "SELECT fk.role AS constraint_name, ft.table_name, \
                        fc.column_name, pt.table_name AS ref_table, \
                        pc.column_name AS ref_column \
                 FROM sys.sysforeignkey fk \
                 JOIN sys.systable ft ON ft.table_id = fk.foreign_table_id \
                 JOIN sys.systable pt ON pt.table_id = fk.primary_table_id \
                 JOIN sys.sysfkcol col \
                   ON col.foreign_table_id = fk.foreign_table_id \
                  AND col.foreign_key_id = fk.foreign_key_id \
                 JOIN sys.syscolumn fc \
                   ON fc.table_id = col.foreign_table_id \
                  AND fc.column_id = col.foreign_column_id \
                 JOIN sys.syscolumn pc \
                   ON pc.table_id = fk.primary_table_id \
                  AND pc.column_id = col.primary_column_id \
                 ORDER BY fk.role",
                &[],
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
                "SELECT p.proc_name FROM sys.sysprocedure p \
                 JOIN sys.sysuser u ON u.user_id = p.creator \
                 WHERE u.user_name = COALESCE(?, USER) \
                   AND p.proc_defn NOT LIKE 'create function%' \
                 ORDER BY p.proc_name",
                &[match schema {
                    Some(s) => SqlValue::from(s),
                    None => SqlValue::Null,
                }],
            )
            .await?;
        rows.iter()
            .filter_map(|r| r.get_text("proc_name"))
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
                "SELECT p.proc_name FROM sys.sysprocedure p \
                 JOIN sys.sysuser u ON u.user_id = p.creator \
                 WHERE u.user_name = COALESCE(?, USER) \
                   AND p.proc_defn LIKE 'create function%' \
                 ORDER BY p.proc_name",
                &[match schema {
                    Some(s) => SqlValue::from(s),
                    None => SqlValue::Null,
                }],
            )
            .await?;
        rows.iter()
            .filter_map(|r| r.get_text("proc_name"))
            .map(|name| {
                Ok(FunctionSchema {
                    raw_name: QUOTE.qualify(schema, &name)?,
                    name: match schema {
                        Some(s) => TableName::qualified(s, name),
                        None => TableName::bare(name),
                    },
                    return_type: None,
                })
            })
            .collect()
    }
}
