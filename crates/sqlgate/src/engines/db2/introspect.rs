//! DB2 metadata introspection.
//!
//! Two catalog layouts exist in the wild: SYSCAT views on LUW and QSYS2
//! views on iSeries. The layout is detected once per connection by probing
//! QSYS2 and memoized; probe failure is read as "capability absent" (LUW),
//! which can mask a transient connectivity error — accepted and documented.

use async_trait::async_trait;
use tokio::sync::OnceCell;

use crate::core::identifier::QuoteStyle;
use crate::core::schema::{
    ColumnSchema, FkEdge, FunctionSchema, PrimaryKey, ProcedureSchema, TableName, TableSchema,
};
use crate::core::traits::{Executor, Introspector, TypeTranslator};
use crate::core::value::SqlValue;
use crate::error::Result;

use super::types::Db2Translator;

/// Detected catalog layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Db2Variant {
    Luw,
    ISeries,
}

pub struct Db2Introspector {
    variant: OnceCell<Db2Variant>,
}

const QUOTE: QuoteStyle = QuoteStyle::DoubleQuote;

fn schema_param(schema: Option<&str>) -> SqlValue {
    match schema {
        Some(s) => SqlValue::from(s.to_ascii_uppercase()),
        None => SqlValue::Null,
    }
}

impl Db2Introspector {
    #[must_use]
    pub fn new() -> Self {
        Self {
            variant: OnceCell::new(),
        }
    }

    /// Probe once, memoize for the connection's lifetime.
    pub async fn variant(&self, exec: &dyn Executor) -> Db2Variant {
        *self
            .variant
            .get_or_init(|| async {
                let probe = exec
                    .query(
                        "SELECT 1 FROM QSYS2.SYSTABLES FETCH FIRST 1 ROW ONLY",
                        &[],
                    )
                    .await;
                let variant = if probe.is_ok() {
                    Db2Variant::ISeries
                } else {
                    Db2Variant::Luw
                };
                tracing::debug!(?variant, "Detected DB2 catalog layout");
                variant
            })
            .await
    }
}

impl Default for Db2Introspector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Introspector for Db2Introspector {
    async fn schema_names(&self, exec: &dyn Executor) -> Result<Vec<String>> {
        let sql = match self.variant(exec).await {
            Db2Variant::Luw => {
                "SELECT TRIM(schemaname) AS schemaname FROM syscat.schemata \
                 WHERE schemaname NOT LIKE 'SYS%' ORDER BY schemaname"
            }
            Db2Variant::ISeries => {
                "SELECT TRIM(schema_name) AS schemaname FROM QSYS2.SYSSCHEMAS \
                 WHERE schema_name NOT LIKE 'Q%' ORDER BY schema_name"
            }
        };
        let rows = exec.query(sql, &[]).await?;
        Ok(rows
            .iter()
            .filter_map(|r| r.get_text("schemaname"))
            .collect())
    }

    async fn table_names(
        &self,
        exec: &dyn Executor,
        schema: Option<&str>,
        include_views: bool,
    ) -> Result<Vec<TableName>> {
        // The type column is named differently per catalog, and the filter
        // must reference the real column, not a select alias.
        let (mut sql, type_col) = match self.variant(exec).await {
            Db2Variant::Luw => (
                String::from(
                    "SELECT TRIM(tabname) AS table_name FROM syscat.tables \
                     WHERE tabschema = COALESCE(?, CURRENT SCHEMA)",
                ),
                "type",
            ),
            Db2Variant::ISeries => (
                String::from(
                    "SELECT TRIM(table_name) AS table_name FROM QSYS2.SYSTABLES \
                     WHERE table_schema = COALESCE(?, CURRENT SCHEMA)",
                ),
                "table_type",
            ),
        };
        if include_views {
            sql.push_str(&format!(" AND {type_col} IN ('T', 'V')"));
        } else {
            sql.push_str(&format!(" AND {type_col} = 'T'"));
        }
        sql.push_str(" ORDER BY 1");

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
        let variant = self.variant(exec).await;
        let sql = match variant {
            Db2Variant::Luw => {
                "SELECT TRIM(colname) AS colname, TRIM(typename) AS typename, length, scale, \
                        nulls, \"DEFAULT\" AS default_value, identity, keyseq, remarks \
                 FROM syscat.columns \
                 WHERE tabschema = COALESCE(?, CURRENT SCHEMA) AND tabname = ? \
                 ORDER BY colno"
            }
            Db2Variant::ISeries => {
                "SELECT TRIM(column_name) AS colname, TRIM(data_type) AS typename, \
                        length, numeric_scale AS scale, is_nullable AS nulls, \
                        column_default AS default_value, is_identity AS identity, \
                        NULL AS keyseq, column_text AS remarks \
                 FROM QSYS2.SYSCOLUMNS \
                 WHERE table_schema = COALESCE(?, CURRENT SCHEMA) AND table_name = ? \
                 ORDER BY ordinal_position"
            }
        };
        let table_key = name.name.to_ascii_uppercase();
        let rows = exec
            .query(
                sql,
                &[
                    schema_param(name.schema.as_deref()),
                    SqlValue::from(table_key.as_str()),
                ],
            )
            .await?;
        if rows.is_empty() {
            return Ok(None);
        }

        let raw_name = QUOTE.qualify(name.schema.as_deref(), &name.name)?;
        let mut table = TableSchema::new(name.clone(), raw_name);

        let translator = Db2Translator;
        let mut pk: Vec<(i64, String)> = Vec::new();

        for row in &rows {
            let Some(col_name) = row.get_text("colname") else {
                continue;
            };
            let db_type = row.get_text("typename").unwrap_or_default();
            let mut col = ColumnSchema::new(&col_name, QUOTE.quote(&col_name)?, &db_type);
            col.abstract_type = translator.to_abstract(&db_type);
            col.allow_null = row
                .get_text("nulls")
                .map(|v| matches!(v.as_str(), "Y" | "YES"))
                .unwrap_or(true);
            col.length = row.get_i64("length").map(|n| n as u32);
            col.scale = row.get_i64("scale").map(|n| n as u32);
            col.auto_increment = row
                .get_text("identity")
                .map(|v| matches!(v.as_str(), "Y" | "YES"))
                .unwrap_or(false);
            col.comment = row.get_text("remarks").filter(|c| !c.is_empty());
            if let Some(default) = row.get_text("default_value") {
                col.default = Some(if default.contains('(') || default.contains("CURRENT") {
                    serde_json::json!({ "expression": default })
                } else {
                    serde_json::json!(default.trim_matches('\'').to_string())
                });
            }
            if let Some(seq) = row.get_i64("keyseq") {
                if seq > 0 {
                    col.is_primary_key = true;
                    pk.push((seq, col_name.clone()));
                }
            }
            if col.auto_increment && col.is_primary_key {
                col.abstract_type = crate::core::descriptor::AbstractType::Id;
            }
            table.columns.insert(col);
        }

        // iSeries exposes key order through SYSKEYCST instead of a column
        // attribute.
        if pk.is_empty() && variant == Db2Variant::ISeries {
            let key_rows = exec
                .query(
                    "SELECT TRIM(k.column_name) AS colname, k.ordinal_position \
                     FROM QSYS2.SYSKEYCST k \
                     JOIN QSYS2.SYSCST c \
                       ON c.constraint_name = k.constraint_name \
                      AND c.constraint_schema = k.constraint_schema \
                     WHERE c.constraint_type = 'PRIMARY KEY' \
                       AND k.table_schema = COALESCE(?, CURRENT SCHEMA) AND k.table_name = ? \
                     ORDER BY k.ordinal_position",
                    &[
                        schema_param(name.schema.as_deref()),
                        SqlValue::from(table_key.as_str()),
                    ],
                )
                .await?;
            for row in &key_rows {
                if let Some(col_name) = row.get_text("colname") {
                    if let Some(col) = table.columns.get_mut(&col_name) {
                        col.is_primary_key = true;
                    }
                    pk.push((row.get_i64("ordinal_position").unwrap_or(0), col_name));
                }
            }
        }

        pk.sort_by_key(|(seq, _)| *seq);
        table.primary_key = PrimaryKey::from_columns(pk.into_iter().map(|(_, c)| c).collect());
        Ok(Some(table))
    }

    async fn foreign_keys(
        &self,
        exec: &dyn Executor,
        schema: Option<&str>,
    ) -> Result<Vec<FkEdge>> {
        let sql = match self.variant(exec).await {
            Db2Variant::Luw => {
                "SELECT TRIM(r.constname) AS constraint_name, TRIM(r.tabname) AS table_name, \
                        TRIM(k.colname) AS column_name, TRIM(r.reftabname) AS ref_table, \
                        TRIM(rk.colname) AS ref_column \
                 FROM syscat.references r \
                 JOIN syscat.keycoluse k \
                   ON k.constname = r.constname AND k.tabschema = r.tabschema \
                 JOIN syscat.keycoluse rk \
                   ON rk.constname = r.refkeyname AND rk.tabschema = r.reftabschema \
                  AND rk.colseq = k.colseq \
                 WHERE r.tabschema = COALESCE(?, CURRENT SCHEMA) \
                 ORDER BY r.constname, k.colseq"
            }
            Db2Variant::ISeries => {
                "SELECT TRIM(fk.constraint_name) AS constraint_name, \
                        TRIM(fk.table_name) AS table_name, \
                        TRIM(fk.column_name) AS column_name, \
                        TRIM(pk.table_name) AS ref_table, \
                        TRIM(pk.column_name) AS ref_column \
                 FROM QSYS2.SYSKEYCST fk \
                 JOIN QSYS2.SYSREFCST r \
                   ON r.constraint_name = fk.constraint_name \
                  AND r.constraint_schema = fk.constraint_schema \
                 JOIN QSYS2.SYSKEYCST pk \
                   ON pk.constraint_name = r.unique_constraint_name \
                  AND pk.constraint_schema = r.unique_constraint_schema \
                  AND pk.ordinal_position = fk.ordinal_position \
                 WHERE fk.table_schema = COALESCE(?, CURRENT SCHEMA) \
                 ORDER BY fk.constraint_name, fk.ordinal_position"
            }
        };
        let rows = exec.query(sql, &[schema_param(schema)]).await?;
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
        let sql = match self.variant(exec).await {
            Db2Variant::Luw => {
                "SELECT TRIM(routinename) AS routine_name FROM syscat.routines \
                 WHERE routineschema = COALESCE(?, CURRENT SCHEMA) AND routinetype = 'P' \
                 ORDER BY routinename"
            }
            Db2Variant::ISeries => {
                "SELECT TRIM(routine_name) AS routine_name FROM QSYS2.SYSROUTINES \
                 WHERE routine_schema = COALESCE(?, CURRENT SCHEMA) \
                   AND routine_type = 'PROCEDURE' \
                 ORDER BY routine_name"
            }
        };
        let rows = exec.query(sql, &[schema_param(schema)]).await?;
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
        let sql = match self.variant(exec).await {
            Db2Variant::Luw => {
                "SELECT TRIM(routinename) AS routine_name, TRIM(return_typename) AS return_type \
                 FROM syscat.routines \
                 WHERE routineschema = COALESCE(?, CURRENT SCHEMA) AND routinetype = 'F' \
                 ORDER BY routinename"
            }
            Db2Variant::ISeries => {
                "SELECT TRIM(routine_name) AS routine_name, NULL AS return_type \
                 FROM QSYS2.SYSROUTINES \
                 WHERE routine_schema = COALESCE(?, CURRENT SCHEMA) \
                   AND routine_type = 'FUNCTION' \
                 ORDER BY routine_name"
            }
        };
        let rows = exec.query(sql, &[schema_param(schema)]).await?;
        rows.iter()
            .filter_map(|r| Some((r.get_text("routine_name")?, r.get_text("return_type"))))
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

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::core::value::{Row, RoutineParam};
    use crate::error::SchemaError;

    /// Records every query; the QSYS2 probe succeeds or fails per `iseries`.
    struct CatalogExecutor {
        iseries: bool,
        queries: Mutex<Vec<String>>,
    }

    impl CatalogExecutor {
        fn new(iseries: bool) -> Self {
            Self {
                iseries,
                queries: Mutex::new(Vec::new()),
            }
        }

        fn queries(&self) -> Vec<String> {
            self.queries.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Executor for CatalogExecutor {
        async fn ping(&self) -> Result<()> {
            Ok(())
        }
        async fn query(&self, sql: &str, _params: &[SqlValue]) -> Result<Vec<Row>> {
            self.queries.lock().unwrap().push(sql.to_string());
            if sql.contains("FETCH FIRST 1 ROW ONLY") {
                return if self.iseries {
                    Ok(vec![Row::from_pairs([("1", SqlValue::from(1i64))])])
                } else {
                    Err(SchemaError::execution("SQL0204N QSYS2.SYSTABLES undefined"))
                };
            }
            Ok(Vec::new())
        }
        async fn query_multi(&self, sql: &str, params: &[SqlValue]) -> Result<Vec<Vec<Row>>> {
            Ok(vec![self.query(sql, params).await?])
        }
        async fn execute(&self, sql: &str, _params: &[SqlValue]) -> Result<u64> {
            self.queries.lock().unwrap().push(sql.to_string());
            Ok(0)
        }
        async fn call(&self, _sql: &str, _params: &mut [RoutineParam]) -> Result<Vec<Vec<Row>>> {
            Ok(Vec::new())
        }
        async fn begin(&self) -> Result<()> {
            Ok(())
        }
        async fn commit(&self) -> Result<()> {
            Ok(())
        }
        async fn rollback(&self) -> Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_luw_table_listing_filters_on_type() {
        let exec = CatalogExecutor::new(false);
        let intro = Db2Introspector::new();
        intro.table_names(&exec, None, false).await.unwrap();

        let listing = exec.queries().pop().unwrap();
        assert!(listing.contains("syscat.tables"), "{listing}");
        assert!(listing.contains("AND type = 'T'"), "{listing}");
    }

    // QSYS2.SYSTABLES has no TYPE column; the filter must use table_type
    // and must not lean on a select alias.
    #[tokio::test]
    async fn test_iseries_table_listing_filters_on_table_type() {
        let exec = CatalogExecutor::new(true);
        let intro = Db2Introspector::new();
        intro.table_names(&exec, Some("APP"), false).await.unwrap();

        let listing = exec.queries().pop().unwrap();
        assert!(listing.contains("QSYS2.SYSTABLES"), "{listing}");
        assert!(listing.contains("AND table_type = 'T'"), "{listing}");
        assert!(!listing.contains(" AS type"), "{listing}");
    }

    #[tokio::test]
    async fn test_iseries_view_listing_widens_type_filter() {
        let exec = CatalogExecutor::new(true);
        let intro = Db2Introspector::new();
        intro.table_names(&exec, None, true).await.unwrap();

        let listing = exec.queries().pop().unwrap();
        assert!(listing.contains("AND table_type IN ('T', 'V')"), "{listing}");
    }

    #[tokio::test]
    async fn test_variant_probe_runs_once() {
        let exec = CatalogExecutor::new(true);
        let intro = Db2Introspector::new();
        assert_eq!(intro.variant(&exec).await, Db2Variant::ISeries);
        assert_eq!(intro.variant(&exec).await, Db2Variant::ISeries);

        let probes = exec
            .queries()
            .iter()
            .filter(|q| q.contains("FETCH FIRST 1 ROW ONLY"))
            .count();
        assert_eq!(probes, 1);
    }
}
