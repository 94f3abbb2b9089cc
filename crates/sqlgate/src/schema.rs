//! The `Schema` façade: one object per connection bundling the five engine
//! strategies, the memoized introspection cache, and the extras overlay.
//!
//! Cache discipline: a table's introspected schema is memoized for the
//! Schema's lifetime and discarded (not marked stale) the moment a DDL
//! operation touching it succeeds. The foreign-key edge list is memoized
//! per schema name for relationship inference.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::RwLock;

use crate::config::ConnectionConfig;
use crate::core::coerce;
use crate::core::descriptor::{ColumnDescriptor, TableDescriptor};
use crate::core::schema::{
    FkEdge, FunctionSchema, PrimaryKey, ProcedureSchema, RelationKind, TableName, TableSchema,
};
use crate::core::traits::Executor;
use crate::core::value::{CallResult, RoutineParam, SqlValue};
use crate::engines::{EngineKind, EngineStrategies};
use crate::error::{Result, SchemaError};
use crate::extras::ExtrasOverlay;
use crate::relations;

pub struct Schema {
    kind: EngineKind,
    executor: Arc<dyn Executor>,
    strategies: EngineStrategies,
    default_schema: Option<String>,
    overlay: Arc<ExtrasOverlay>,
    tables: RwLock<HashMap<String, Arc<TableSchema>>>,
    fk_edges: RwLock<HashMap<String, Arc<Vec<FkEdge>>>>,
}

impl Schema {
    pub(crate) fn new(
        kind: EngineKind,
        executor: Arc<dyn Executor>,
        config: &ConnectionConfig,
        overlay: Arc<ExtrasOverlay>,
    ) -> Self {
        Self {
            kind,
            executor,
            strategies: kind.strategies(),
            default_schema: config.default_schema.clone(),
            overlay,
            tables: RwLock::new(HashMap::new()),
            fk_edges: RwLock::new(HashMap::new()),
        }
    }

    /// Engine this schema speaks to.
    #[must_use]
    pub fn engine(&self) -> EngineKind {
        self.kind
    }

    /// The shared extras overlay.
    #[must_use]
    pub fn extras(&self) -> &ExtrasOverlay {
        &self.overlay
    }

    /// The engine's DML builder, for hosts composing their own queries.
    #[must_use]
    pub fn dml(&self) -> &dyn crate::core::traits::DmlBuilder {
        self.strategies.dml.as_ref()
    }

    /// The engine's DDL builder.
    #[must_use]
    pub fn ddl(&self) -> &dyn crate::core::traits::DdlBuilder {
        self.strategies.ddl.as_ref()
    }

    fn schema_or_default<'a>(&'a self, schema: Option<&'a str>) -> Option<&'a str> {
        schema.or(self.default_schema.as_deref())
    }

    fn edge_key(&self, schema: Option<&str>) -> String {
        self.schema_or_default(schema)
            .unwrap_or("")
            .to_ascii_lowercase()
    }

    async fn edges_for(&self, schema: Option<&str>, refresh: bool) -> Result<Arc<Vec<FkEdge>>> {
        let key = self.edge_key(schema);
        if !refresh {
            if let Some(edges) = self.fk_edges.read().await.get(&key) {
                return Ok(Arc::clone(edges));
            }
        }
        let edges = Arc::new(
            self.strategies
                .introspector
                .foreign_keys(self.executor.as_ref(), self.schema_or_default(schema))
                .await?,
        );
        self.fk_edges
            .write()
            .await
            .insert(key, Arc::clone(&edges));
        Ok(edges)
    }

    async fn discard_table(&self, name: &TableName) {
        self.tables.write().await.remove(&name.cache_key());
        // FK edges may have changed shape along with the table.
        self.fk_edges.write().await.clear();
    }

    /// Schema/catalog names visible on this connection.
    pub async fn get_schema_names(&self) -> Result<Vec<String>> {
        self.strategies
            .introspector
            .schema_names(self.executor.as_ref())
            .await
    }

    /// Table names in the given (or default) schema.
    pub async fn get_table_names(
        &self,
        schema: Option<&str>,
        include_views: bool,
    ) -> Result<Vec<TableName>> {
        self.strategies
            .introspector
            .table_names(
                self.executor.as_ref(),
                self.schema_or_default(schema),
                include_views,
            )
            .await
    }

    /// Full description of one table, memoized.
    ///
    /// A missing table is `Ok(None)`, never an error. `refresh` bypasses
    /// and replaces the cached entry.
    pub async fn get_table(
        &self,
        name: &TableName,
        refresh: bool,
    ) -> Result<Option<Arc<TableSchema>>> {
        let key = name.cache_key();
        if !refresh {
            if let Some(table) = self.tables.read().await.get(&key) {
                return Ok(Some(Arc::clone(table)));
            }
        }

        let described = self
            .strategies
            .introspector
            .describe_table(self.executor.as_ref(), name)
            .await?;
        let Some(mut table) = described else {
            return Ok(None);
        };

        let edges = self.edges_for(name.schema.as_deref(), refresh).await?;
        relations::apply_relations(&mut table, &edges);
        self.overlay.merge_into(&mut table).await;

        let table = Arc::new(table);
        self.tables.write().await.insert(key, Arc::clone(&table));
        Ok(Some(table))
    }

    /// Primary key shape of a table, if the table exists.
    pub async fn primary_key_of(&self, name: &TableName) -> Result<Option<PrimaryKey>> {
        Ok(self
            .get_table(name, false)
            .await?
            .map(|t| t.primary_key.clone()))
    }

    /// Stored procedure names.
    pub async fn get_procedure_names(&self, schema: Option<&str>) -> Result<Vec<ProcedureSchema>> {
        self.strategies
            .introspector
            .procedure_names(self.executor.as_ref(), self.schema_or_default(schema))
            .await
    }

    /// Stored function names.
    pub async fn get_function_names(&self, schema: Option<&str>) -> Result<Vec<FunctionSchema>> {
        self.strategies
            .introspector
            .function_names(self.executor.as_ref(), self.schema_or_default(schema))
            .await
    }

    /// Look up one procedure by name; absent is `Ok(None)`.
    pub async fn get_procedure(&self, name: &str) -> Result<Option<ProcedureSchema>> {
        let (schema, bare) = crate::core::identifier::split_qualified(name);
        Ok(self
            .get_procedure_names(schema)
            .await?
            .into_iter()
            .find(|p| p.name.name.eq_ignore_ascii_case(bare)))
    }

    /// Look up one function by name; absent is `Ok(None)`.
    pub async fn get_function(&self, name: &str) -> Result<Option<FunctionSchema>> {
        let (schema, bare) = crate::core::identifier::split_qualified(name);
        Ok(self
            .get_function_names(schema)
            .await?
            .into_iter()
            .find(|f| f.name.name.eq_ignore_ascii_case(bare)))
    }

    fn translate_fields(&self, fields: &[ColumnDescriptor]) -> Result<Vec<ColumnDescriptor>> {
        let mut translated = Vec::with_capacity(fields.len());
        for field in fields {
            let mut field = field.clone();
            self.strategies
                .translator
                .translate_simple_column_types(&mut field)?;
            self.strategies
                .translator
                .validate_column_settings(&mut field)?;
            field.check_constraints()?;
            translated.push(field);
        }
        Ok(translated)
    }

    /// Create or merge a set of tables.
    ///
    /// Missing tables are created. Existing tables are merged column-wise
    /// when `allow_merge` is set and skipped otherwise. `rollback` wraps
    /// the whole batch in a transaction. Returns every executed statement.
    pub async fn update_schema(
        &self,
        tables: &[TableDescriptor],
        allow_merge: bool,
        allow_delete: bool,
        rollback: bool,
    ) -> Result<Vec<String>> {
        if rollback {
            self.executor.begin().await?;
        }
        let result = self
            .update_schema_inner(tables, allow_merge, allow_delete)
            .await;
        match result {
            Ok(executed) => {
                if rollback {
                    self.executor.commit().await?;
                }
                Ok(executed)
            }
            Err(err) => {
                if rollback {
                    if let Err(rb) = self.executor.rollback().await {
                        tracing::warn!(error = %rb, "Rollback after failed schema update also failed");
                    }
                }
                Err(err)
            }
        }
    }

    async fn update_schema_inner(
        &self,
        tables: &[TableDescriptor],
        allow_merge: bool,
        allow_delete: bool,
    ) -> Result<Vec<String>> {
        let mut executed = Vec::new();
        for descriptor in tables {
            let name = TableName::parse(&descriptor.name);
            let existing = self.get_table(&name, true).await?;

            match existing {
                None => {
                    let mut translated = descriptor.clone();
                    translated.fields = self.translate_fields(&descriptor.fields)?;
                    let stmts = self.strategies.ddl.create_table(&translated)?;
                    for stmt in &stmts {
                        tracing::info!(table = %name.dotted(), sql = %stmt, "Creating table");
                        self.executor.execute(stmt, &[]).await?;
                    }
                    executed.extend(stmts);
                }
                Some(_) if allow_merge => {
                    let stmts = self
                        .update_fields(&name, &descriptor.fields, true, allow_delete)
                        .await?;
                    executed.extend(stmts);
                }
                Some(_) => {
                    tracing::debug!(table = %name.dotted(), "Table exists; merge not requested");
                }
            }

            if let Some(label) = &descriptor.label {
                self.overlay
                    .set_table_extras(crate::extras::TableExtras {
                        table: name.name.clone(),
                        label: Some(label.clone()),
                        description: descriptor.description.clone(),
                    })
                    .await;
            }
            self.discard_table(&name).await;
        }
        Ok(executed)
    }

    /// Merge a field list into an existing table.
    ///
    /// New columns are added; changed columns are altered when
    /// `allow_update` is set; columns absent from `fields` are dropped when
    /// `allow_delete` is set (the primary key is never dropped this way).
    pub async fn update_fields(
        &self,
        table: &TableName,
        fields: &[ColumnDescriptor],
        allow_update: bool,
        allow_delete: bool,
    ) -> Result<Vec<String>> {
        let existing = self
            .get_table(table, true)
            .await?
            .ok_or_else(|| SchemaError::not_found("table", table.dotted()))?;
        let translated = self.translate_fields(fields)?;
        let mut executed = Vec::new();

        for field in &translated {
            match existing.columns.get(&field.name) {
                None => {
                    let stmt = self.strategies.ddl.add_column(table, field)?;
                    tracing::info!(table = %table.dotted(), column = %field.name, "Adding column");
                    self.executor.execute(&stmt, &[]).await?;
                    executed.push(stmt);
                }
                Some(current) if allow_update => {
                    let differs = field
                        .db_type
                        .as_deref()
                        .map(|t| !t.eq_ignore_ascii_case(&current.db_type))
                        .unwrap_or(false)
                        || field.allow_null != current.allow_null;
                    if differs {
                        let stmts = self.strategies.ddl.alter_column(table, field)?;
                        for stmt in &stmts {
                            tracing::info!(table = %table.dotted(), column = %field.name, "Altering column");
                            self.executor.execute(stmt, &[]).await?;
                        }
                        executed.extend(stmts);
                    }
                }
                Some(_) => {}
            }
        }

        if allow_delete {
            let keep: Vec<&str> = translated.iter().map(|f| f.name.as_str()).collect();
            let mut dropped = Vec::new();
            for column in existing.columns.iter() {
                if column.is_primary_key {
                    continue;
                }
                if !keep.iter().any(|k| k.eq_ignore_ascii_case(&column.name)) {
                    let stmt = self.strategies.ddl.drop_column(table, &column.name)?;
                    tracing::info!(table = %table.dotted(), column = %column.name, "Dropping column");
                    self.executor.execute(&stmt, &[]).await?;
                    executed.push(stmt);
                    dropped.push(column.name.clone());
                }
            }
            if !dropped.is_empty() {
                let dropped_refs: Vec<&str> = dropped.iter().map(String::as_str).collect();
                self.overlay
                    .fields_dropped(&table.name, &dropped_refs)
                    .await;
            }
        }

        self.discard_table(table).await;
        Ok(executed)
    }

    /// Drop a table and invalidate everything attached to it.
    pub async fn drop_table(&self, table: &TableName) -> Result<()> {
        let stmt = self.strategies.ddl.drop_table(table)?;
        tracing::info!(table = %table.dotted(), "Dropping table");
        self.executor.execute(&stmt, &[]).await?;
        self.discard_table(table).await;
        self.overlay.tables_dropped(&[table.name.as_str()]).await;
        Ok(())
    }

    /// Drop a single column.
    pub async fn drop_column(&self, table: &TableName, column: &str) -> Result<()> {
        let stmt = self.strategies.ddl.drop_column(table, column)?;
        tracing::info!(table = %table.dotted(), column = %column, "Dropping column");
        self.executor.execute(&stmt, &[]).await?;
        self.discard_table(table).await;
        self.overlay.fields_dropped(&table.name, &[column]).await;
        Ok(())
    }

    /// Drop a relationship by its conventional name.
    ///
    /// Virtual relationships disappear from the overlay; foreign-key-backed
    /// `belongs_to`/`has_many` relations drop the underlying constraint on
    /// the child table.
    pub async fn drop_relationship(&self, table: &TableName, relation_name: &str) -> Result<()> {
        let schema = self
            .get_table(table, false)
            .await?
            .ok_or_else(|| SchemaError::not_found("table", table.dotted()))?;
        let relation = schema
            .relation(relation_name)
            .ok_or_else(|| SchemaError::not_found("relationship", relation_name.to_string()))?
            .clone();

        if relation.is_virtual {
            self.overlay
                .remove_relation_extras(&table.name, relation_name)
                .await;
            self.discard_table(table).await;
            return Ok(());
        }
        if relation.kind == RelationKind::ManyMany {
            return Err(SchemaError::unsupported(
                self.strategies.ddl.engine(),
                "dropping a many-to-many relationship (drop the junction table's keys instead)",
            ));
        }

        // The constraint lives on the child side of the edge.
        let (child, child_column) = match relation.kind {
            RelationKind::BelongsTo => (table.clone(), relation.local_column.clone()),
            _ => (relation.target.clone(), relation.target_column.clone()),
        };
        let edges = self.edges_for(table.schema.as_deref(), false).await?;
        let edge = edges
            .iter()
            .find(|e| e.table.matches(&child) && e.column.eq_ignore_ascii_case(&child_column))
            .ok_or_else(|| SchemaError::not_found("foreign key", relation_name.to_string()))?;

        let stmt = self
            .strategies
            .ddl
            .drop_foreign_key(&edge.table, &edge.constraint)?;
        tracing::info!(constraint = %edge.constraint, "Dropping foreign key");
        self.executor.execute(&stmt, &[]).await?;
        self.discard_table(table).await;
        self.discard_table(&child).await;
        Ok(())
    }

    /// Invoke a stored procedure; OUT values are written back into `params`.
    pub async fn call_procedure(
        &self,
        name: &str,
        params: &mut [RoutineParam],
    ) -> Result<CallResult> {
        self.strategies
            .routines
            .call_procedure(self.executor.as_ref(), name, params)
            .await
    }

    /// Invoke a stored function.
    pub async fn call_function(
        &self,
        name: &str,
        params: &mut [RoutineParam],
    ) -> Result<CallResult> {
        self.strategies
            .routines
            .call_function(self.executor.as_ref(), name, params)
            .await
    }

    /// Quote a possibly qualified table name in the engine's style.
    pub fn quote_table_name(&self, name: &str) -> Result<String> {
        let parsed = TableName::parse(name);
        self.kind
            .quote_style()
            .qualify(parsed.schema.as_deref(), &parsed.name)
    }

    /// Quote a column name in the engine's style.
    pub fn quote_column_name(&self, name: &str) -> Result<String> {
        self.kind.quote_style().quote(name)
    }

    /// Coerce a client JSON value for binding against a column.
    pub async fn parse_value_for_set(
        &self,
        table: &TableName,
        column: &str,
        value: &Value,
    ) -> Result<SqlValue> {
        let schema = self
            .get_table(table, false)
            .await?
            .ok_or_else(|| SchemaError::not_found("table", table.dotted()))?;
        let col = schema
            .columns
            .get(column)
            .ok_or_else(|| SchemaError::not_found("column", column.to_string()))?;
        coerce::parse_value_for_set(col, value)
    }

    /// Coerce a JSON value to a typed parameter for a known column schema.
    pub fn typecast_to_native(
        &self,
        column: &crate::core::schema::ColumnSchema,
        value: &Value,
    ) -> Result<SqlValue> {
        coerce::parse_value_for_set(column, value)
    }

    /// Convert a result value to its client-facing JSON form.
    #[must_use]
    pub fn typecast_to_client(&self, value: &SqlValue) -> Value {
        value.to_json()
    }

    /// Server-side timestamp for `*_on_create` / `*_on_update` columns.
    ///
    /// Both column families stamp from the same clock, so `is_update` does
    /// not change the value; it keeps call sites explicit about which
    /// family they are stamping.
    #[must_use]
    pub fn get_timestamp_for_set(&self, _is_update: bool) -> SqlValue {
        coerce::timestamp_for_set()
    }
}
