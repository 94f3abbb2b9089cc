//! Connection: config + executor + lazily built [`Schema`].
//!
//! The connection owns no wire protocol. The host supplies an [`Executor`]
//! for the configured engine; the connection layers engine selection, the
//! requirement probe, file-backed storage setup, and the schema façade on
//! top of it.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::OnceCell;

use crate::config::ConnectionConfig;
use crate::core::traits::Executor;
use crate::engines::EngineKind;
use crate::error::{Result, SchemaError};
use crate::extras::ExtrasOverlay;
use crate::schema::Schema;

pub struct Connection {
    config: ConnectionConfig,
    kind: EngineKind,
    executor: Arc<dyn Executor>,
    overlay: Arc<ExtrasOverlay>,
    schema: OnceCell<Arc<Schema>>,
}

impl Connection {
    /// Build a connection from a validated config and a host-supplied
    /// executor. The config is adapted in place (file-backed DSN
    /// resolution) before anything touches the database.
    pub fn new(mut config: ConnectionConfig, executor: Arc<dyn Executor>) -> Result<Self> {
        config.validate()?;
        let kind = EngineKind::parse(&config.engine)?;
        adapt_config(&mut config, kind)?;
        let overlay = Arc::new(ExtrasOverlay::new(config.extras.ttl()));
        Ok(Self {
            config,
            kind,
            executor,
            overlay,
            schema: OnceCell::new(),
        })
    }

    /// Engine selected from the config.
    #[must_use]
    pub fn engine(&self) -> EngineKind {
        self.kind
    }

    /// Human-readable driver label, e.g. "PostgreSQL".
    #[must_use]
    pub fn driver_label(&self) -> &'static str {
        self.kind.label()
    }

    /// Example DSN for this engine, shown in configuration errors.
    #[must_use]
    pub fn sample_dsn(&self) -> &'static str {
        self.kind.sample_dsn()
    }

    /// The adapted configuration this connection runs with.
    #[must_use]
    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// The shared extras overlay (also reachable through the schema).
    #[must_use]
    pub fn extras(&self) -> &ExtrasOverlay {
        &self.overlay
    }

    /// Probe the connection once, mapping any failure to a `Requirement`
    /// error naming the engine.
    pub async fn check_requirements(&self) -> Result<()> {
        self.executor.ping().await.map_err(|err| {
            SchemaError::requirement(
                self.kind.name(),
                format!("connection probe failed: {} (sample DSN: {})", err, self.sample_dsn()),
            )
        })
    }

    /// Whether the requirement probe passes, without surfacing the error.
    pub async fn requirements_met(&self) -> bool {
        self.check_requirements().await.is_ok()
    }

    /// The schema façade, built on first use and shared thereafter.
    pub async fn schema(&self) -> Arc<Schema> {
        let schema = self
            .schema
            .get_or_init(|| async {
                Arc::new(Schema::new(
                    self.kind,
                    Arc::clone(&self.executor),
                    &self.config,
                    Arc::clone(&self.overlay),
                ))
            })
            .await;
        Arc::clone(schema)
    }
}

/// Normalize a config for its engine before first use.
///
/// File-backed engines get their relative DSN resolved against
/// `storage_root`, creating the directory when missing. Server engines
/// pass through untouched.
pub fn adapt_config(config: &mut ConnectionConfig, kind: EngineKind) -> Result<()> {
    if !kind.is_file_backed() {
        return Ok(());
    }
    let path = PathBuf::from(&config.dsn);
    if path.is_absolute() {
        return Ok(());
    }
    let Some(root) = &config.storage_root else {
        return Ok(());
    };
    std::fs::create_dir_all(root).map_err(|err| SchemaError::StorageUnavailable {
        path: root.display().to_string(),
        message: err.to_string(),
    })?;
    let resolved = root.join(&path);
    tracing::debug!(dsn = %resolved.display(), "Resolved file-backed DSN");
    config.dsn = resolved.display().to_string();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use crate::core::value::{Row, SqlValue};

    struct NullExecutor;

    #[async_trait]
    impl Executor for NullExecutor {
        async fn ping(&self) -> Result<()> {
            Err(SchemaError::execution("no server"))
        }
        async fn query(&self, _sql: &str, _params: &[SqlValue]) -> Result<Vec<Row>> {
            Ok(Vec::new())
        }
        async fn query_multi(&self, _sql: &str, _params: &[SqlValue]) -> Result<Vec<Vec<Row>>> {
            Ok(Vec::new())
        }
        async fn execute(&self, _sql: &str, _params: &[SqlValue]) -> Result<u64> {
            Ok(0)
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

    #[test]
    fn test_unknown_engine_rejected() {
        let config = ConnectionConfig::new("oracle", "whatever");
        assert!(Connection::new(config, Arc::new(NullExecutor)).is_err());
    }

    #[test]
    fn test_adapt_config_resolves_sqlite_path() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("storage");
        let mut config = ConnectionConfig::new("sqlite", "app.db");
        config.storage_root = Some(root.clone());

        adapt_config(&mut config, EngineKind::Sqlite).unwrap();
        assert!(root.is_dir());
        assert_eq!(config.dsn, root.join("app.db").display().to_string());
    }

    #[test]
    fn test_adapt_config_leaves_server_engines_alone() {
        let mut config = ConnectionConfig::new("mysql", "mysql://u:p@h/db");
        adapt_config(&mut config, EngineKind::MySql).unwrap();
        assert_eq!(config.dsn, "mysql://u:p@h/db");
    }

    #[tokio::test]
    async fn test_requirement_probe_names_engine() {
        let config = ConnectionConfig::new("postgres", "postgres://u:p@h/db");
        let conn = Connection::new(config, Arc::new(NullExecutor)).unwrap();
        assert!(!conn.requirements_met().await);
        let err = conn.check_requirements().await.unwrap_err();
        match err {
            SchemaError::Requirement { engine, .. } => assert_eq!(engine, "postgres"),
            other => panic!("unexpected error: {other}"),
        }
    }
}
