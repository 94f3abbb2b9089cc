//! Core traits for the schema abstraction and query-building engine.
//!
//! This module defines the strategy seams selected per engine at
//! connection-construction time:
//!
//! - [`Executor`]: the narrow driver boundary (SQL text out, rows back)
//! - [`TypeTranslator`]: abstract column intents → native types
//! - [`Introspector`]: system-catalog metadata discovery
//! - [`DdlBuilder`]: per-engine DDL rendering
//! - [`DmlBuilder`]: per-engine parameterized DML rendering
//! - [`RoutineCaller`]: stored procedure/function invocation conventions
//!
//! The DDL/DML traits carry template-method defaults for the ANSI-ish common
//! case; each engine overrides only its dialect quirks.

use async_trait::async_trait;

use crate::error::{Result, SchemaError};

use super::descriptor::{AbstractType, ColumnDescriptor, TableDescriptor};
use super::identifier::QuoteStyle;
use super::schema::{FkEdge, FunctionSchema, ProcedureSchema, TableName, TableSchema};
use super::value::{CallResult, RoutineParam, Row, SqlValue};

/// The driver boundary.
///
/// The engine owns no wire protocol: it hands SQL text plus a parameter
/// vector to an `Executor` supplied by the host and receives rows back.
/// One executor serves one logical connection; callers needing concurrency
/// run multiple connections.
#[async_trait]
pub trait Executor: Send + Sync {
    /// Cheap liveness/requirement probe (used by `check_requirements`).
    async fn ping(&self) -> Result<()>;

    /// Run a statement expected to produce a single result set.
    async fn query(&self, sql: &str, params: &[SqlValue]) -> Result<Vec<Row>>;

    /// Run a statement that may produce multiple result sets, iterating
    /// "next result" until exhausted.
    async fn query_multi(&self, sql: &str, params: &[SqlValue]) -> Result<Vec<Vec<Row>>>;

    /// Run a statement without a result set; returns affected row count.
    async fn execute(&self, sql: &str, params: &[SqlValue]) -> Result<u64>;

    /// Invoke a routine with natively bound OUT/INOUT parameters.
    ///
    /// Only engines whose driver can bind output parameters route through
    /// here; OUT/INOUT values must be written back into `params`. The
    /// default fails, which is correct for drivers without the capability —
    /// those engines emulate via session variables instead.
    async fn call(&self, sql: &str, params: &mut [RoutineParam]) -> Result<Vec<Vec<Row>>> {
        let _ = (sql, params);
        Err(SchemaError::RoutineInvocation(
            "driver does not support natively bound output parameters".to_string(),
        ))
    }

    /// Start a transaction (used by `update_schema` when rollback is requested).
    async fn begin(&self) -> Result<()>;

    /// Commit the current transaction.
    async fn commit(&self) -> Result<()>;

    /// Roll back the current transaction.
    async fn rollback(&self) -> Result<()>;
}

/// Abstract-intent → native-type translation. Two-phase, idempotent.
pub trait TypeTranslator: Send + Sync {
    /// Engine identifier (e.g. "mysql").
    fn engine(&self) -> &'static str;

    /// Rewrite an abstract intent into the engine's base type and default
    /// modifiers. Applying this to an already-translated descriptor is a
    /// no-op.
    fn translate_simple_column_types(&self, col: &mut ColumnDescriptor) -> Result<()>;

    /// Fill in type extras (length/precision/scale parentheses) and
    /// normalize defaults (legacy zero-dates, boolean literals) for the
    /// engine. Idempotent.
    fn validate_column_settings(&self, col: &mut ColumnDescriptor) -> Result<()>;

    /// Best-effort reverse mapping from a native type string to an abstract
    /// type. Unknown types map to a generic scalar rather than failing.
    fn to_abstract(&self, native_type: &str) -> AbstractType;
}

/// System-catalog metadata discovery for one engine.
///
/// Absence is a normal result: a missing table yields `Ok(None)`, never an
/// error.
#[async_trait]
pub trait Introspector: Send + Sync {
    /// List schema/catalog names visible on the connection.
    async fn schema_names(&self, exec: &dyn Executor) -> Result<Vec<String>>;

    /// List table (and optionally view) names in a schema. `None` means the
    /// connection's default schema.
    async fn table_names(
        &self,
        exec: &dyn Executor,
        schema: Option<&str>,
        include_views: bool,
    ) -> Result<Vec<TableName>>;

    /// Describe one table: columns, primary key, identity. Relations are
    /// filled in later from the schema-wide edge list.
    async fn describe_table(
        &self,
        exec: &dyn Executor,
        name: &TableName,
    ) -> Result<Option<TableSchema>>;

    /// All foreign-key edges in a schema (child column → parent column).
    async fn foreign_keys(&self, exec: &dyn Executor, schema: Option<&str>)
        -> Result<Vec<FkEdge>>;

    /// List stored procedures in a schema.
    async fn procedure_names(
        &self,
        exec: &dyn Executor,
        schema: Option<&str>,
    ) -> Result<Vec<ProcedureSchema>>;

    /// List stored functions in a schema.
    async fn function_names(
        &self,
        exec: &dyn Executor,
        schema: Option<&str>,
    ) -> Result<Vec<FunctionSchema>>;
}

/// Per-engine DDL rendering.
///
/// Template-method defaults cover the ANSI common case; engines override
/// their quirks. Unsupported shapes fail with
/// [`SchemaError::Unsupported`] naming the engine and operation — never a
/// silent no-op.
pub trait DdlBuilder: Send + Sync {
    /// Engine identifier (e.g. "sqlite").
    fn engine(&self) -> &'static str;

    /// Identifier quoting convention.
    fn quote_style(&self) -> QuoteStyle;

    /// Quote a bare identifier.
    fn quote(&self, name: &str) -> Result<String> {
        self.quote_style().quote(name)
    }

    /// Quote a qualified table name.
    fn qualify(&self, table: &TableName) -> Result<String> {
        self.quote_style()
            .qualify(table.schema.as_deref(), &table.name)
    }

    /// Identity clause appended after DEFAULT for auto-increment columns
    /// (e.g. `AUTO_INCREMENT`, `GENERATED ALWAYS AS IDENTITY`). `None` when
    /// the identity lives in the type itself (serial) or in DEFAULT.
    fn identity_suffix(&self, col: &ColumnDescriptor) -> Option<String>;

    /// Engine literal for a boolean default.
    fn boolean_literal(&self, value: bool) -> &'static str {
        if value {
            "1"
        } else {
            "0"
        }
    }

    /// Render a default value as an engine literal. Objects of the form
    /// `{"expression": "..."}` pass through unquoted.
    fn default_literal(&self, value: &serde_json::Value) -> String {
        use serde_json::Value;
        match value {
            Value::Null => "NULL".to_string(),
            Value::Bool(b) => self.boolean_literal(*b).to_string(),
            Value::Number(n) => n.to_string(),
            Value::String(s) => format!("'{}'", s.replace('\'', "''")),
            Value::Object(map) => match map.get("expression").and_then(Value::as_str) {
                Some(expr) => expr.to_string(),
                None => "NULL".to_string(),
            },
            Value::Array(_) => "NULL".to_string(),
        }
    }

    /// Render one column definition in the fixed order:
    /// type+extras, NOT NULL, DEFAULT, identity, UNIQUE/PRIMARY KEY.
    ///
    /// Constraint conflicts (primary+unique) are rejected here, before any
    /// SQL leaves the builder.
    fn column_definition(&self, col: &ColumnDescriptor) -> Result<String> {
        col.check_constraints()?;
        let db_type = col.db_type.as_deref().ok_or_else(|| SchemaError::Translation {
            type_name: col.type_name.clone(),
        })?;

        let mut def = format!("{} {}", self.quote(&col.name)?, db_type);

        if !col.allow_null || col.is_primary_key {
            def.push_str(" NOT NULL");
        }
        if !col.auto_increment {
            if let Some(default) = &col.default {
                def.push_str(" DEFAULT ");
                def.push_str(&self.default_literal(default));
            }
        }
        if col.auto_increment {
            if let Some(suffix) = self.identity_suffix(col) {
                def.push(' ');
                def.push_str(&suffix);
            }
        }
        if col.is_unique {
            def.push_str(" UNIQUE");
        } else if col.is_primary_key {
            def.push_str(" PRIMARY KEY");
        }
        Ok(def)
    }

    /// Render CREATE TABLE plus any trailing constraint/index statements.
    ///
    /// Foreign keys are emitted as separate ALTER statements by default;
    /// engines that only accept inline REFERENCES override this.
    fn create_table(&self, table: &TableDescriptor) -> Result<Vec<String>> {
        let name = TableName::parse(&table.name);
        let mut defs = Vec::with_capacity(table.fields.len());
        let mut pk_cols: Vec<&str> = Vec::new();
        for col in &table.fields {
            if col.is_primary_key {
                pk_cols.push(col.name.as_str());
            }
            defs.push(format!("  {}", self.column_definition(col)?));
        }

        // Composite keys move to a table-level constraint; strip the inline
        // PRIMARY KEY suffix in that case by re-rendering through a copy.
        if pk_cols.len() > 1 {
            defs.clear();
            for col in &table.fields {
                let mut c = col.clone();
                c.is_primary_key = false;
                c.allow_null = false;
                defs.push(format!("  {}", self.column_definition(&c)?));
            }
            let quoted: Result<Vec<String>> =
                pk_cols.iter().map(|c| self.quote(c)).collect();
            defs.push(format!("  PRIMARY KEY ({})", quoted?.join(", ")));
        }

        let mut stmts = vec![format!(
            "CREATE TABLE {} (\n{}\n)",
            self.qualify(&name)?,
            defs.join(",\n")
        )];

        for col in &table.fields {
            if col.is_foreign_key {
                let ref_table = col.ref_table.as_deref().unwrap_or_default();
                let ref_field = col.ref_field.as_deref().unwrap_or("id");
                let constraint = format!("fk_{}_{}", name.name, col.name);
                stmts.push(self.add_foreign_key(
                    &name,
                    &constraint,
                    &col.name,
                    &TableName::parse(ref_table),
                    ref_field,
                )?);
            }
            if col.is_index && !col.is_primary_key && !col.is_unique {
                let index = format!("ix_{}_{}", name.name, col.name);
                stmts.push(self.create_index(&name, &index, &[&col.name], false)?);
            }
        }
        Ok(stmts)
    }

    /// ALTER TABLE ... ADD COLUMN.
    fn add_column(&self, table: &TableName, col: &ColumnDescriptor) -> Result<String> {
        Ok(format!(
            "ALTER TABLE {} ADD COLUMN {}",
            self.qualify(table)?,
            self.column_definition(col)?
        ))
    }

    /// Change an existing column's definition. May render several statements.
    fn alter_column(&self, table: &TableName, col: &ColumnDescriptor) -> Result<Vec<String>>;

    /// ALTER TABLE ... DROP COLUMN.
    fn drop_column(&self, table: &TableName, column: &str) -> Result<String> {
        Ok(format!(
            "ALTER TABLE {} DROP COLUMN {}",
            self.qualify(table)?,
            self.quote(column)?
        ))
    }

    /// Rename a table.
    fn rename_table(&self, table: &TableName, new_name: &str) -> Result<String> {
        Ok(format!(
            "ALTER TABLE {} RENAME TO {}",
            self.qualify(table)?,
            self.quote(new_name)?
        ))
    }

    /// Rename a column. Engines that require the full definition in the
    /// rename statement receive it in `definition`.
    fn rename_column(
        &self,
        table: &TableName,
        column: &str,
        new_name: &str,
        definition: Option<&ColumnDescriptor>,
    ) -> Result<String> {
        let _ = definition;
        Ok(format!(
            "ALTER TABLE {} RENAME COLUMN {} TO {}",
            self.qualify(table)?,
            self.quote(column)?,
            self.quote(new_name)?
        ))
    }

    /// ALTER TABLE ... ADD PRIMARY KEY.
    fn add_primary_key(&self, table: &TableName, columns: &[&str]) -> Result<String> {
        let quoted: Result<Vec<String>> = columns.iter().map(|c| self.quote(c)).collect();
        Ok(format!(
            "ALTER TABLE {} ADD PRIMARY KEY ({})",
            self.qualify(table)?,
            quoted?.join(", ")
        ))
    }

    /// ALTER TABLE ... DROP PRIMARY KEY.
    fn drop_primary_key(&self, table: &TableName) -> Result<String> {
        Ok(format!(
            "ALTER TABLE {} DROP PRIMARY KEY",
            self.qualify(table)?
        ))
    }

    /// ALTER TABLE ... ADD CONSTRAINT ... FOREIGN KEY.
    fn add_foreign_key(
        &self,
        table: &TableName,
        constraint: &str,
        column: &str,
        ref_table: &TableName,
        ref_column: &str,
    ) -> Result<String> {
        Ok(format!(
            "ALTER TABLE {} ADD CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({})",
            self.qualify(table)?,
            self.quote(constraint)?,
            self.quote(column)?,
            self.qualify(ref_table)?,
            self.quote(ref_column)?
        ))
    }

    /// ALTER TABLE ... DROP CONSTRAINT.
    fn drop_foreign_key(&self, table: &TableName, constraint: &str) -> Result<String> {
        Ok(format!(
            "ALTER TABLE {} DROP CONSTRAINT {}",
            self.qualify(table)?,
            self.quote(constraint)?
        ))
    }

    /// CREATE [UNIQUE] INDEX.
    fn create_index(
        &self,
        table: &TableName,
        index_name: &str,
        columns: &[&str],
        unique: bool,
    ) -> Result<String> {
        let quoted: Result<Vec<String>> = columns.iter().map(|c| self.quote(c)).collect();
        Ok(format!(
            "CREATE {}INDEX {} ON {} ({})",
            if unique { "UNIQUE " } else { "" },
            self.quote(index_name)?,
            self.qualify(table)?,
            quoted?.join(", ")
        ))
    }

    /// DROP INDEX.
    fn drop_index(&self, table: &TableName, index_name: &str) -> Result<String> {
        let _ = table;
        Ok(format!("DROP INDEX {}", self.quote(index_name)?))
    }

    /// DROP TABLE.
    fn drop_table(&self, table: &TableName) -> Result<String> {
        Ok(format!("DROP TABLE {}", self.qualify(table)?))
    }

    /// TRUNCATE TABLE (or the engine's equivalent).
    fn truncate_table(&self, table: &TableName) -> Result<String> {
        Ok(format!("TRUNCATE TABLE {}", self.qualify(table)?))
    }
}

/// A JOIN clause for SELECT/UPDATE building.
#[derive(Debug, Clone)]
pub struct JoinClause {
    /// Join keyword(s): "JOIN", "LEFT JOIN", ...
    pub kind: String,
    pub table: TableName,
    pub alias: Option<String>,
    /// Raw ON condition (already quoted by the caller).
    pub on: String,
}

/// Options for building a SELECT statement.
#[derive(Debug, Clone, Default)]
pub struct SelectOptions {
    pub table: TableName,
    pub alias: Option<String>,
    /// Unquoted column names; empty selects `*`.
    pub columns: Vec<String>,
    pub joins: Vec<JoinClause>,
    /// Raw WHERE condition with placeholders already positioned.
    pub where_clause: Option<String>,
    pub group_by: Option<String>,
    pub order_by: Option<String>,
    pub limit: Option<u64>,
    pub offset: u64,
}

/// How the generated primary key comes back after an INSERT.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyRetrieval {
    /// No generated key, or caller doesn't need it.
    None,
    /// Run this query after the insert on the same connection.
    PostInsertQuery(String),
    /// The insert statement itself returns a row containing the key
    /// (RETURNING clause or a wrapping SELECT ... FROM FINAL TABLE).
    InlineResult,
}

/// A rendered INSERT plus its key-retrieval strategy.
#[derive(Debug, Clone)]
pub struct InsertCommand {
    pub sql: String,
    pub key: KeyRetrieval,
}

/// Options for building an UPDATE statement.
#[derive(Debug, Clone, Default)]
pub struct UpdateOptions {
    pub table: TableName,
    pub alias: Option<String>,
    /// Unquoted column names receiving placeholder values, in order.
    pub columns: Vec<String>,
    pub joins: Vec<JoinClause>,
    pub where_clause: Option<String>,
}

/// Per-engine parameterized DML rendering.
pub trait DmlBuilder: Send + Sync {
    /// Engine identifier.
    fn engine(&self) -> &'static str;

    /// Identifier quoting convention.
    fn quote_style(&self) -> QuoteStyle;

    /// Quote a bare identifier.
    fn quote(&self, name: &str) -> Result<String> {
        self.quote_style().quote(name)
    }

    /// Quote a qualified table name.
    fn qualify(&self, table: &TableName) -> Result<String> {
        self.quote_style()
            .qualify(table.schema.as_deref(), &table.name)
    }

    /// Parameter placeholder for the given 1-based index.
    fn param_placeholder(&self, index: usize) -> String {
        let _ = index;
        "?".to_string()
    }

    /// Apply the engine's pagination to a rendered SELECT.
    ///
    /// For limit L and offset O the result must return rows ranked
    /// [O+1, O+L] by the query's ordering.
    fn apply_limit(&self, sql: &str, limit: Option<u64>, offset: u64) -> String;

    /// Render the FROM-side join text for SELECT.
    fn render_joins(&self, joins: &[JoinClause]) -> Result<String> {
        let mut out = String::new();
        for join in joins {
            out.push(' ');
            out.push_str(&join.kind);
            out.push(' ');
            out.push_str(&self.qualify(&join.table)?);
            if let Some(alias) = &join.alias {
                out.push(' ');
                out.push_str(&self.quote(alias)?);
            }
            out.push_str(" ON ");
            out.push_str(&join.on);
        }
        Ok(out)
    }

    /// Build a parameterized SELECT.
    fn build_select(&self, opts: &SelectOptions) -> Result<String> {
        let cols = if opts.columns.is_empty() {
            "*".to_string()
        } else {
            let quoted: Result<Vec<String>> =
                opts.columns.iter().map(|c| self.quote(c)).collect();
            quoted?.join(", ")
        };

        let mut sql = format!("SELECT {} FROM {}", cols, self.qualify(&opts.table)?);
        if let Some(alias) = &opts.alias {
            sql.push(' ');
            sql.push_str(&self.quote(alias)?);
        }
        sql.push_str(&self.render_joins(&opts.joins)?);
        if let Some(where_clause) = &opts.where_clause {
            if !where_clause.is_empty() {
                sql.push_str(" WHERE ");
                sql.push_str(where_clause);
            }
        }
        if let Some(group_by) = &opts.group_by {
            sql.push_str(" GROUP BY ");
            sql.push_str(group_by);
        }
        if let Some(order_by) = &opts.order_by {
            sql.push_str(" ORDER BY ");
            sql.push_str(order_by);
        }
        if opts.limit.is_some() || opts.offset > 0 {
            sql = self.apply_limit(&sql, opts.limit, opts.offset);
        }
        Ok(sql)
    }

    /// Build a parameterized INSERT and its key-retrieval strategy.
    fn build_insert(
        &self,
        table: &TableName,
        columns: &[&str],
        pk_column: Option<&str>,
    ) -> Result<InsertCommand>;

    /// Build a parameterized UPDATE, relocating JOIN clauses to wherever
    /// this engine's syntax requires.
    fn build_update(&self, opts: &UpdateOptions) -> Result<String> {
        if !opts.joins.is_empty() {
            return Err(SchemaError::unsupported(
                self.engine(),
                "UPDATE with JOIN",
            ));
        }
        let mut sql = format!("UPDATE {}", self.qualify(&opts.table)?);
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

    /// `col = placeholder` assignments for UPDATE.
    fn render_set_list(&self, columns: &[String]) -> Result<String> {
        let mut parts = Vec::with_capacity(columns.len());
        for (i, col) in columns.iter().enumerate() {
            parts.push(format!(
                "{} = {}",
                self.quote(col)?,
                self.param_placeholder(i + 1)
            ));
        }
        Ok(parts.join(", "))
    }

    /// Build a COUNT statement. When an alias is in play (joined counts),
    /// the primary-key expression is quoted defensively and qualified with
    /// the alias.
    fn build_count(
        &self,
        table: &TableName,
        alias: Option<&str>,
        pk_columns: &[&str],
        where_clause: Option<&str>,
    ) -> Result<String> {
        let count_expr = match (alias, pk_columns) {
            (Some(a), [single]) => {
                format!("COUNT(DISTINCT {}.{})", self.quote(a)?, self.quote(single)?)
            }
            _ => "COUNT(*)".to_string(),
        };
        let mut sql = format!("SELECT {} FROM {}", count_expr, self.qualify(table)?);
        if let Some(a) = alias {
            sql.push(' ');
            sql.push_str(&self.quote(a)?);
        }
        if let Some(where_clause) = where_clause {
            if !where_clause.is_empty() {
                sql.push_str(" WHERE ");
                sql.push_str(where_clause);
            }
        }
        Ok(sql)
    }

    /// Whether row-value `IN ((a,b), ...)` predicates are native.
    fn supports_row_value_in(&self) -> bool {
        true
    }

    /// String-concatenation operator used by the composite-IN rewrite.
    fn concat_operator(&self) -> &'static str {
        "||"
    }

    /// Build an `IN (...)` predicate over a composite key.
    ///
    /// Engines without native row-value IN compare a concatenation of the
    /// key columns against concatenated tuple literals.
    fn composite_key_in(&self, columns: &[&str], tuples: &[Vec<SqlValue>]) -> Result<String> {
        if columns.is_empty() || tuples.is_empty() {
            return Err(SchemaError::ConstraintDefinition(
                "composite key predicate requires columns and tuples".to_string(),
            ));
        }
        for tuple in tuples {
            if tuple.len() != columns.len() {
                return Err(SchemaError::ConstraintDefinition(format!(
                    "composite key tuple arity {} does not match {} columns",
                    tuple.len(),
                    columns.len()
                )));
            }
        }

        if columns.len() == 1 {
            let values: Vec<String> = tuples.iter().map(|t| t[0].to_sql_literal()).collect();
            return Ok(format!(
                "{} IN ({})",
                self.quote(columns[0])?,
                values.join(", ")
            ));
        }

        if self.supports_row_value_in() {
            let quoted: Result<Vec<String>> = columns.iter().map(|c| self.quote(c)).collect();
            let rows: Vec<String> = tuples
                .iter()
                .map(|t| {
                    let vals: Vec<String> = t.iter().map(SqlValue::to_sql_literal).collect();
                    format!("({})", vals.join(", "))
                })
                .collect();
            Ok(format!(
                "({}) IN ({})",
                quoted?.join(", "),
                rows.join(", ")
            ))
        } else {
            // Concatenated-tuple rewrite for engines without row-value IN.
            let op = self.concat_operator();
            let quoted: Result<Vec<String>> = columns.iter().map(|c| self.quote(c)).collect();
            let key_expr = quoted?.join(&format!(" {} ',' {} ", op, op));
            let values: Vec<String> = tuples
                .iter()
                .map(|t| {
                    let joined = t
                        .iter()
                        .map(|v| match v {
                            SqlValue::Text(s) => s.replace('\'', "''"),
                            other => other.to_sql_literal().trim_matches('\'').to_string(),
                        })
                        .collect::<Vec<_>>()
                        .join(",");
                    format!("'{}'", joined)
                })
                .collect();
            Ok(format!("({}) IN ({})", key_expr, values.join(", ")))
        }
    }
}

/// Stored procedure/function invocation for one engine.
#[async_trait]
pub trait RoutineCaller: Send + Sync {
    /// Invoke a stored procedure. OUT/INOUT values are written back into
    /// `params`; all result sets are collected in order.
    async fn call_procedure(
        &self,
        exec: &dyn Executor,
        name: &str,
        params: &mut [RoutineParam],
    ) -> Result<CallResult>;

    /// Invoke a stored function.
    async fn call_function(
        &self,
        exec: &dyn Executor,
        name: &str,
        params: &mut [RoutineParam],
    ) -> Result<CallResult>;
}
