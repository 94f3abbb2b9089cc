//! Error types for the schema engine.

use thiserror::Error;

/// Main error type for schema discovery and SQL generation.
///
/// "Not found" during introspection is deliberately NOT an error: lookups
/// return `Ok(None)` so callers cannot confuse a missing table with a hard
/// failure. [`SchemaError::NotFound`] is reserved for operations that
/// require the object to exist (e.g. dropping a column of a missing table).
#[derive(Error, Debug)]
pub enum SchemaError {
    /// The underlying driver/extension is unavailable or the connection
    /// failed its requirement probe.
    #[error("Driver requirement not met for {engine}: {message}")]
    Requirement { engine: String, message: String },

    /// A table, column, procedure, or function that an operation requires
    /// does not exist.
    #[error("{kind} '{name}' not found")]
    NotFound { kind: &'static str, name: String },

    /// The engine cannot perform the requested DDL/DML shape.
    #[error("{engine} does not support {operation}")]
    Unsupported {
        engine: &'static str,
        operation: String,
    },

    /// Invalid constraint combination in a column or table definition.
    #[error("Constraint definition error: {0}")]
    ConstraintDefinition(String),

    /// An abstract column type could not be translated for the engine.
    #[error("Unrecognized column type '{type_name}'")]
    Translation { type_name: String },

    /// Stored procedure/function invocation failed (parameter binding or
    /// result-set mismatch).
    #[error("Routine invocation error: {0}")]
    RoutineInvocation(String),

    /// A managed storage path could not be created or accessed.
    #[error("Storage unavailable at {path}: {message}")]
    StorageUnavailable { path: String, message: String },

    /// Configuration error (bad DSN, unknown engine, invalid identifier).
    #[error("Configuration error: {0}")]
    Config(String),

    /// The executor reported a failure running a statement.
    #[error("Execution error: {0}")]
    Execution(String),

    /// IO error (file-backed engines, config loading).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML serialization/deserialization error.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl SchemaError {
    /// Create an `Unsupported` error naming the engine and operation.
    pub fn unsupported(engine: &'static str, operation: impl Into<String>) -> Self {
        SchemaError::Unsupported {
            engine,
            operation: operation.into(),
        }
    }

    /// Create a `NotFound` error for a missing schema object.
    pub fn not_found(kind: &'static str, name: impl Into<String>) -> Self {
        SchemaError::NotFound {
            kind,
            name: name.into(),
        }
    }

    /// Create a `Requirement` error.
    pub fn requirement(engine: impl Into<String>, message: impl Into<String>) -> Self {
        SchemaError::Requirement {
            engine: engine.into(),
            message: message.into(),
        }
    }

    /// Create an `Execution` error from any displayable driver error.
    pub fn execution(message: impl std::fmt::Display) -> Self {
        SchemaError::Execution(message.to_string())
    }

    /// Format error with the full source chain.
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }
}

/// Result type alias for schema engine operations.
pub type Result<T> = std::result::Result<T, SchemaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_names_engine_and_operation() {
        let err = SchemaError::unsupported("sqlite", "drop column");
        assert_eq!(err.to_string(), "sqlite does not support drop column");
    }

    #[test]
    fn test_not_found_message() {
        let err = SchemaError::not_found("table", "widgets");
        assert_eq!(err.to_string(), "table 'widgets' not found");
    }
}
