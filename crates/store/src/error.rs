use common::ErrorKind;
use thiserror::Error;

/// Errors that can occur when reading or writing the stores.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The addressed record does not exist.
    #[error("{entity} {key} not found")]
    NotFound { entity: &'static str, key: String },

    /// A unique field already holds this value.
    #[error("{entity} with {field} {value:?} already exists")]
    Duplicate {
        entity: &'static str,
        field: &'static str,
        value: String,
    },

    /// A generated unique value collided with an existing record.
    #[error("{entity} {key} conflicts with an existing record")]
    Conflict { entity: &'static str, key: String },

    /// A database error occurred.
    #[error("failed to {operation}: {source}")]
    Database {
        operation: &'static str,
        #[source]
        source: sqlx::Error,
    },

    /// A database migration error occurred.
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A stored JSON column could not be encoded or decoded.
    #[error("failed to {operation}: {source}")]
    Serialization {
        operation: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// The backend refused the operation (in-memory fault injection).
    #[error("failed to {operation}: store unavailable")]
    Unavailable { operation: &'static str },
}

impl StoreError {
    pub fn not_found(entity: &'static str, key: impl ToString) -> Self {
        StoreError::NotFound {
            entity,
            key: key.to_string(),
        }
    }

    /// Returns a mapper that attaches `operation` to a driver error.
    ///
    /// A missing row becomes [`StoreError::NotFound`].
    pub fn database(operation: &'static str) -> impl FnOnce(sqlx::Error) -> StoreError {
        move |source| match source {
            sqlx::Error::RowNotFound => StoreError::NotFound {
                entity: "record",
                key: operation.to_string(),
            },
            source => StoreError::Database { operation, source },
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            StoreError::NotFound { .. } => ErrorKind::NotFound,
            StoreError::Duplicate { .. } => ErrorKind::InvalidInput,
            StoreError::Conflict { .. }
            | StoreError::Database { .. }
            | StoreError::Migration(_)
            | StoreError::Serialization { .. }
            | StoreError::Unavailable { .. } => ErrorKind::Internal,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
