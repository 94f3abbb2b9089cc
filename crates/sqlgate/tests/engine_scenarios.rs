//! End-to-end engine scenarios against a scripted executor.
//!
//! These tests drive the public `Connection`/`Schema` surface with canned
//! catalog responses, verifying introspection, relationship inference,
//! extras merging, DDL batching, and routine invocation conventions
//! without a live database.

use std::sync::Arc;
use std::sync::Mutex;

use async_trait::async_trait;
use sqlgate::{
    ColumnDescriptor, Connection, ConnectionConfig, Executor, FieldExtras, PrimaryKey, RelationKind,
    Result, Row, RoutineParam, SchemaError, SqlValue, TableDescriptor, TableName,
};

/// Executor returning canned rows for the first matching SQL substring and
/// recording every statement it sees.
#[derive(Default)]
struct ScriptedExecutor {
    script: Vec<(&'static str, Vec<Row>)>,
    log: Mutex<Vec<String>>,
}

impl ScriptedExecutor {
    fn new(script: Vec<(&'static str, Vec<Row>)>) -> Self {
        Self {
            script,
            log: Mutex::new(Vec::new()),
        }
    }

    fn rows_for(&self, sql: &str) -> Vec<Row> {
        self.script
            .iter()
            .find(|(pattern, _)| sql.contains(pattern))
            .map(|(_, rows)| rows.clone())
            .unwrap_or_default()
    }

    fn log_entries(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }
}

#[async_trait]
impl Executor for ScriptedExecutor {
    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    async fn query(&self, sql: &str, _params: &[SqlValue]) -> Result<Vec<Row>> {
        self.log.lock().unwrap().push(sql.to_string());
        Ok(self.rows_for(sql))
    }

    async fn query_multi(&self, sql: &str, _params: &[SqlValue]) -> Result<Vec<Vec<Row>>> {
        self.log.lock().unwrap().push(sql.to_string());
        let rows = self.rows_for(sql);
        if rows.is_empty() {
            Ok(Vec::new())
        } else {
            Ok(vec![rows])
        }
    }

    async fn execute(&self, sql: &str, _params: &[SqlValue]) -> Result<u64> {
        self.log.lock().unwrap().push(sql.to_string());
        Ok(0)
    }

    async fn begin(&self) -> Result<()> {
        self.log.lock().unwrap().push("BEGIN".to_string());
        Ok(())
    }

    async fn commit(&self) -> Result<()> {
        self.log.lock().unwrap().push("COMMIT".to_string());
        Ok(())
    }

    async fn rollback(&self) -> Result<()> {
        self.log.lock().unwrap().push("ROLLBACK".to_string());
        Ok(())
    }
}

fn table_info_row(name: &str, db_type: &str, notnull: i64, pk: i64) -> Row {
    Row::from_pairs([
        ("name", SqlValue::from(name)),
        ("type", SqlValue::from(db_type)),
        ("notnull", SqlValue::I64(notnull)),
        ("dflt_value", SqlValue::Null),
        ("pk", SqlValue::I64(pk)),
    ])
}

/// A SQLite catalog with `users` and `widgets`, where
/// `widgets.owner_id → users.id`.
fn sqlite_fixture() -> Arc<ScriptedExecutor> {
    Arc::new(ScriptedExecutor::new(vec![
        (
            "PRAGMA table_info(\"widgets\")",
            vec![
                table_info_row("id", "INTEGER", 1, 1),
                table_info_row("name", "TEXT", 1, 0),
                table_info_row("owner_id", "INTEGER", 0, 0),
            ],
        ),
        (
            "PRAGMA table_info(\"users\")",
            vec![
                table_info_row("id", "INTEGER", 1, 1),
                table_info_row("email", "TEXT", 1, 0),
            ],
        ),
        (
            "PRAGMA foreign_key_list(\"widgets\")",
            vec![Row::from_pairs([
                ("table", SqlValue::from("users")),
                ("from", SqlValue::from("owner_id")),
                ("to", SqlValue::from("id")),
            ])],
        ),
        (
            "FROM sqlite_master WHERE name = ?",
            vec![Row::from_pairs([("type", SqlValue::from("table"))])],
        ),
        (
            "FROM sqlite_master WHERE name NOT LIKE",
            vec![
                Row::from_pairs([("name", SqlValue::from("users"))]),
                Row::from_pairs([("name", SqlValue::from("widgets"))]),
            ],
        ),
    ]))
}

async fn sqlite_connection(exec: Arc<ScriptedExecutor>) -> Connection {
    Connection::new(ConnectionConfig::new("sqlite", "app.db"), exec).unwrap()
}

// =============================================================================
// Introspection and Relationship Inference
// =============================================================================

#[tokio::test]
async fn test_sqlite_table_introspection_end_to_end() {
    let exec = sqlite_fixture();
    let conn = sqlite_connection(Arc::clone(&exec)).await;
    let schema = conn.schema().await;

    let widgets = schema
        .get_table(&TableName::bare("widgets"), false)
        .await
        .unwrap()
        .expect("widgets should exist");

    assert_eq!(widgets.primary_key, PrimaryKey::Single("id".to_string()));
    assert_eq!(widgets.label, "Widgets");
    let id = widgets.columns.get("id").unwrap();
    assert!(id.auto_increment, "integer pk is a rowid alias");

    let owner = widgets.columns.get("owner_id").unwrap();
    assert!(owner.is_foreign_key);
    assert_eq!(owner.ref_table.as_deref(), Some("users"));

    let relation = widgets.relation("users_by_owner_id").unwrap();
    assert_eq!(relation.kind, RelationKind::BelongsTo);
    assert!(!relation.is_virtual);
}

#[tokio::test]
async fn test_relationship_symmetry_on_parent_side() {
    let conn = sqlite_connection(sqlite_fixture()).await;
    let schema = conn.schema().await;

    let users = schema
        .get_table(&TableName::bare("users"), false)
        .await
        .unwrap()
        .unwrap();

    let relation = users.relation("widgets_by_owner_id").unwrap();
    assert_eq!(relation.kind, RelationKind::HasMany);
    assert_eq!(relation.target.name, "widgets");
}

#[tokio::test]
async fn test_get_table_is_memoized_until_refresh() {
    let exec = sqlite_fixture();
    let conn = sqlite_connection(Arc::clone(&exec)).await;
    let schema = conn.schema().await;

    let name = TableName::bare("widgets");
    schema.get_table(&name, false).await.unwrap().unwrap();
    let queries_after_first = exec.log_entries().len();

    schema.get_table(&name, false).await.unwrap().unwrap();
    assert_eq!(
        exec.log_entries().len(),
        queries_after_first,
        "cached read must not touch the catalog"
    );

    schema.get_table(&name, true).await.unwrap().unwrap();
    assert!(exec.log_entries().len() > queries_after_first);
}

#[tokio::test]
async fn test_missing_table_is_none_not_error() {
    let conn = sqlite_connection(sqlite_fixture()).await;
    let schema = conn.schema().await;
    let absent = schema
        .get_table(&TableName::bare("nonexistent"), false)
        .await
        .unwrap();
    assert!(absent.is_none());
}

// =============================================================================
// Extras Overlay
// =============================================================================

#[tokio::test]
async fn test_extras_decorate_introspected_table() {
    let conn = sqlite_connection(sqlite_fixture()).await;
    let schema = conn.schema().await;

    schema
        .extras()
        .set_field_extras(FieldExtras {
            table: "widgets".to_string(),
            field: "name".to_string(),
            label: Some("Widget Name".to_string()),
            description: Some("Display name".to_string()),
        })
        .await;

    let widgets = schema
        .get_table(&TableName::bare("widgets"), true)
        .await
        .unwrap()
        .unwrap();
    let name = widgets.columns.get("name").unwrap();
    assert_eq!(name.label, "Widget Name");
    assert_eq!(name.comment.as_deref(), Some("Display name"));
}

#[tokio::test]
async fn test_drop_column_notifies_overlay() {
    let exec = Arc::new(ScriptedExecutor::default());
    let conn = Connection::new(
        ConnectionConfig::new("mysql", "mysql://u:p@h/db"),
        exec.clone(),
    )
    .unwrap();
    let schema = conn.schema().await;

    schema
        .extras()
        .set_field_extras(FieldExtras {
            table: "orders".to_string(),
            field: "legacy_flag".to_string(),
            label: Some("Legacy".to_string()),
            description: None,
        })
        .await;

    schema
        .drop_column(&TableName::bare("orders"), "legacy_flag")
        .await
        .unwrap();

    let log = exec.log_entries();
    assert!(log
        .iter()
        .any(|sql| sql == "ALTER TABLE `orders` DROP COLUMN `legacy_flag`"));
    assert!(
        schema.extras().field_extras(&["orders"]).await.is_empty(),
        "dropping a column must invalidate its extras"
    );
}

// =============================================================================
// DDL Batches
// =============================================================================

#[tokio::test]
async fn test_update_schema_creates_missing_table_in_transaction() {
    let exec = Arc::new(ScriptedExecutor::default());
    let conn = Connection::new(
        ConnectionConfig::new("postgres", "postgres://u:p@h/db"),
        exec.clone(),
    )
    .unwrap();
    let schema = conn.schema().await;

    let mut name = ColumnDescriptor::new("name", "string");
    name.allow_null = false;
    let table = TableDescriptor {
        name: "widgets".to_string(),
        fields: vec![ColumnDescriptor::new("id", "id"), name],
        label: None,
        description: None,
    };

    let executed = schema
        .update_schema(&[table], false, false, true)
        .await
        .unwrap();

    assert_eq!(executed.len(), 1);
    assert!(executed[0].starts_with("CREATE TABLE \"widgets\""));
    assert!(executed[0].contains("\"id\" serial NOT NULL PRIMARY KEY"));
    assert!(executed[0].contains("\"name\" varchar(255) NOT NULL"));

    let log = exec.log_entries();
    assert_eq!(log.first().map(String::as_str), Some("BEGIN"));
    assert_eq!(log.last().map(String::as_str), Some("COMMIT"));
}

#[tokio::test]
async fn test_drop_relationship_removes_foreign_key() {
    let exec = sqlite_fixture();
    let conn = sqlite_connection(Arc::clone(&exec)).await;
    let schema = conn.schema().await;

    // SQLite cannot drop constraints; the error names the engine rather
    // than silently no-opping.
    let err = schema
        .drop_relationship(&TableName::bare("widgets"), "users_by_owner_id")
        .await
        .unwrap_err();
    assert!(matches!(err, SchemaError::Unsupported { .. }));
}

// =============================================================================
// Routine Invocation
// =============================================================================

#[tokio::test]
async fn test_mysql_session_variable_procedure_call() {
    let exec = Arc::new(ScriptedExecutor::new(vec![(
        "SELECT @total AS total",
        vec![Row::from_pairs([("@total", SqlValue::I64(42))])],
    )]));
    let conn = Connection::new(
        ConnectionConfig::new("mysql", "mysql://u:p@h/db"),
        exec.clone(),
    )
    .unwrap();
    let schema = conn.schema().await;

    let mut params = vec![RoutineParam::input("x", 5i64), RoutineParam::output("total")];
    schema.call_procedure("tally", &mut params).await.unwrap();

    assert_eq!(params[1].value, SqlValue::I64(42));

    let log = exec.log_entries();
    assert!(log.iter().any(|sql| sql == "SET @total = NULL"));
    assert!(log.iter().any(|sql| sql == "CALL `tally`(?, @total)"));
}

#[tokio::test]
async fn test_sqlite_routines_unsupported() {
    let conn = sqlite_connection(sqlite_fixture()).await;
    let schema = conn.schema().await;
    let err = schema
        .call_procedure("anything", &mut [])
        .await
        .unwrap_err();
    assert!(matches!(err, SchemaError::Unsupported { .. }));
}

// =============================================================================
// Value Coercion Through the Façade
// =============================================================================

#[tokio::test]
async fn test_parse_value_for_set_uses_column_type() {
    let conn = sqlite_connection(sqlite_fixture()).await;
    let schema = conn.schema().await;

    let value = schema
        .parse_value_for_set(
            &TableName::bare("widgets"),
            "owner_id",
            &serde_json::json!("17"),
        )
        .await
        .unwrap();
    assert_eq!(value, SqlValue::I64(17));

    let err = schema
        .parse_value_for_set(
            &TableName::bare("widgets"),
            "no_such_column",
            &serde_json::json!(1),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, SchemaError::NotFound { .. }));
}

#[tokio::test]
async fn test_timestamp_for_set_is_datetime_for_both_families() {
    let conn = sqlite_connection(sqlite_fixture()).await;
    let schema = conn.schema().await;

    assert!(matches!(
        schema.get_timestamp_for_set(false),
        SqlValue::DateTime(_)
    ));
    assert!(matches!(
        schema.get_timestamp_for_set(true),
        SqlValue::DateTime(_)
    ));
}
