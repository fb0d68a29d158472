// ==========================================
// Space Stowage - Repository error types
// ==========================================
// thiserror derive; rusqlite errors map through From
// ==========================================

use thiserror::Error;

use crate::engine::error::EngineError;

#[derive(Error, Debug)]
pub enum RepositoryError {
    // ===== State / concurrency =====
    #[error("conflict: {message}")]
    Conflict { message: String },

    #[error("lock acquisition failed: {0}")]
    LockError(String),

    // ===== Lookup =====
    #[error("not found: {entity} with id={id}")]
    NotFound { entity: String, id: String },

    // ===== Database =====
    #[error("database connection failed: {0}")]
    DatabaseConnectionError(String),

    #[error("database transaction failed: {0}")]
    DatabaseTransactionError(String),

    #[error("database query failed: {0}")]
    DatabaseQueryError(String),

    #[error("unique constraint violated: {0}")]
    UniqueConstraintViolation(String),

    // ===== Data quality =====
    #[error("validation failed: {0}")]
    ValidationError(String),

    #[error("invalid value (field={field}): {message}")]
    FieldValueError { field: String, message: String },

    // ===== Spatial invariant (from the index) =====
    #[error(transparent)]
    Spatial(#[from] EngineError),

    // ===== Generic =====
    #[error("internal error: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl RepositoryError {
    pub fn not_found(entity: &str, id: &str) -> Self {
        RepositoryError::NotFound {
            entity: entity.to_string(),
            id: id.to_string(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        RepositoryError::Conflict {
            message: message.into(),
        }
    }
}

impl From<rusqlite::Error> for RepositoryError {
    fn from(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::SqliteFailure(_, Some(msg)) => {
                if msg.contains("UNIQUE") {
                    RepositoryError::UniqueConstraintViolation(msg)
                } else {
                    RepositoryError::DatabaseQueryError(msg)
                }
            }
            rusqlite::Error::QueryReturnedNoRows => RepositoryError::NotFound {
                entity: "Unknown".to_string(),
                id: "Unknown".to_string(),
            },
            _ => RepositoryError::DatabaseQueryError(err.to_string()),
        }
    }
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;
