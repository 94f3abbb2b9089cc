//! Connection configuration loading and validation.
//!
//! Config is plain serde data, loadable from YAML or built in code, and
//! immutable once a `Connection` is constructed from it — changing any field
//! requires a new `Connection`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SchemaError};

/// Extras-overlay tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtrasConfig {
    /// Cache TTL in seconds for overlay entries.
    #[serde(default = "default_extras_ttl_secs")]
    pub ttl_secs: u64,
}

fn default_extras_ttl_secs() -> u64 {
    300
}

impl Default for ExtrasConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_extras_ttl_secs(),
        }
    }
}

impl ExtrasConfig {
    /// TTL as a [`Duration`].
    #[must_use]
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

/// Resolved configuration for one connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Engine name: "mysql", "postgres", "sqlite", "db2", "sqlanywhere".
    pub engine: String,

    /// Driver DSN. For file-backed engines this is a file path, possibly
    /// relative (resolved against `storage_root` by `adapt_config`).
    pub dsn: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    /// Schema to introspect when the caller passes none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_schema: Option<String>,

    /// Restrict name listings to the default schema.
    #[serde(default = "default_true")]
    pub default_schema_only: bool,

    /// Managed storage directory for file-backed engines. Created on first
    /// connection if missing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_root: Option<PathBuf>,

    /// Per-engine driver options (e.g. dump file paths for TDS-derived
    /// drivers), passed through to the executor untouched.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub options: HashMap<String, String>,

    #[serde(default)]
    pub extras: ExtrasConfig,
}

fn default_true() -> bool {
    true
}

impl ConnectionConfig {
    /// Minimal config for an engine and DSN.
    pub fn new(engine: impl Into<String>, dsn: impl Into<String>) -> Self {
        Self {
            engine: engine.into(),
            dsn: dsn.into(),
            user: None,
            password: None,
            default_schema: None,
            default_schema_only: true,
            storage_root: None,
            options: HashMap::new(),
            extras: ExtrasConfig::default(),
        }
    }

    /// Check fields that are invalid for every engine.
    pub fn validate(&self) -> Result<()> {
        if self.engine.trim().is_empty() {
            return Err(SchemaError::Config("engine must not be empty".to_string()));
        }
        if self.dsn.trim().is_empty() {
            return Err(SchemaError::Config("dsn must not be empty".to_string()));
        }
        Ok(())
    }
}

/// Load a connection config from a YAML file.
pub fn load_config(path: &Path) -> Result<ConnectionConfig> {
    let contents = std::fs::read_to_string(path)?;
    let config: ConnectionConfig = serde_yaml::from_str(&contents)?;
    config.validate()?;
    tracing::debug!(engine = %config.engine, "Loaded connection config");
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_yaml() {
        let yaml = r#"
engine: sqlite
dsn: app.db
"#;
        let config: ConnectionConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.engine, "sqlite");
        assert!(config.default_schema_only);
        assert_eq!(config.extras.ttl_secs, 300);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_full_yaml() {
        let yaml = r#"
engine: db2
dsn: "DATABASE=sample;HOSTNAME=db;PORT=50000"
user: admin
password: secret
default_schema: SALES
default_schema_only: false
options:
  dump_path: /tmp/tds.dump
extras:
  ttl_secs: 60
"#;
        let config: ConnectionConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.default_schema.as_deref(), Some("SALES"));
        assert!(!config.default_schema_only);
        assert_eq!(config.options.get("dump_path").unwrap(), "/tmp/tds.dump");
        assert_eq!(config.extras.ttl(), Duration::from_secs(60));
    }

    #[test]
    fn test_validate_rejects_empty_dsn() {
        let config = ConnectionConfig::new("mysql", "  ");
        assert!(matches!(
            config.validate(),
            Err(SchemaError::Config(_))
        ));
    }

    #[test]
    fn test_load_config_missing_file() {
        let err = load_config(Path::new("/nonexistent/config.yaml")).unwrap_err();
        assert!(matches!(err, SchemaError::Io(_)));
    }
}
