use crate::validation::ValidationError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error on '{table}' during {operation}: {source}")]
    Database {
        table: String,
        operation: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("Storage error on '{table}' during {operation}: {message}")]
    Backend {
        table: String,
        operation: String,
        message: String,
    },

    #[error("Validation error on '{table}.{field}': {message}")]
    Validation {
        table: String,
        field: String,
        message: String,
    },

    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(#[from] ValidationError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Record of '{table}' has no value for primary key '{primary_key}'")]
    MissingPrimaryKey { table: String, primary_key: String },

    #[error("Unsupported operation: {0}")]
    Unsupported(String),
}

impl StoreError {
    /// Wrap a driver error raised while running `operation` against `table`
    pub fn database_operation(table: &str, operation: &str, source: sqlx::Error) -> Self {
        Self::Database {
            table: table.to_string(),
            operation: operation.to_string(),
            source,
        }
    }

    /// Failure reported by a non-SQL storage backend
    pub fn backend(table: &str, operation: &str, message: impl Into<String>) -> Self {
        Self::Backend {
            table: table.to_string(),
            operation: operation.to_string(),
            message: message.into(),
        }
    }

    pub fn validation(table: &str, field: &str, message: impl Into<String>) -> Self {
        Self::Validation {
            table: table.to_string(),
            field: field.to_string(),
            message: message.into(),
        }
    }
}
