// ==========================================
// Space Stowage - API error types
// ==========================================
// Stable kind (code) + human-readable message for every failure.
// Repository / engine errors are translated here, never leaked raw.
// ==========================================

use crate::engine::error::EngineError;
use crate::repository::error::RepositoryError;
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // Caller input
    // ==========================================
    #[error("validation failed: {0}")]
    ValidationError(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid range: {0}")]
    InvalidRange(String),

    #[error("item not stowed: {0}")]
    ItemNotStowed(String),

    // ==========================================
    // Spatial invariant
    // ==========================================
    #[error("{message}")]
    Overlap {
        message: String,
        container_id: String,
        conflicting_item_id: String,
    },

    #[error("{message}")]
    OutOfBounds { message: String, container_id: String },

    #[error("not reserved: {0}")]
    NotReserved(String),

    // ==========================================
    // Feasibility
    // ==========================================
    #[error("no capacity for item {item_id}: requires volume {required_volume}, attempted [{}]", attempted_containers.join(", "))]
    NoCapacity {
        item_id: String,
        required_volume: f64,
        attempted_containers: Vec<String>,
    },

    #[error("return capacity exceeded in {container_id}: lightest waste item {item_id} has mass {mass} (max {max_mass})")]
    Capacity {
        container_id: String,
        item_id: String,
        mass: f64,
        volume: f64,
        max_mass: f64,
    },

    // ==========================================
    // Concurrency
    // ==========================================
    #[error("conflict: {0}")]
    Conflict(String),

    // ==========================================
    // Infrastructure
    // ==========================================
    #[error("database error: {0}")]
    DatabaseError(String),

    #[error("internal error: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ApiError {
    /// Stable machine-readable kind.
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::ValidationError(_) => "VALIDATION_ERROR",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::InvalidRange(_) => "INVALID_RANGE_ERROR",
            ApiError::ItemNotStowed(_) => "ITEM_NOT_STOWED_ERROR",
            ApiError::Overlap { .. } => "OVERLAP_ERROR",
            ApiError::OutOfBounds { .. } => "OUT_OF_BOUNDS_ERROR",
            ApiError::NotReserved(_) => "NOT_RESERVED_ERROR",
            ApiError::NoCapacity { .. } => "NO_CAPACITY_ERROR",
            ApiError::Capacity { .. } => "CAPACITY_ERROR",
            ApiError::Conflict(_) => "CONFLICT_ERROR",
            ApiError::DatabaseError(_) => "DATABASE_ERROR",
            ApiError::InternalError(_) | ApiError::Other(_) => "INTERNAL_ERROR",
        }
    }

    /// Structured context the caller needs to adjust the request.
    pub fn details(&self) -> Option<serde_json::Value> {
        match self {
            ApiError::NoCapacity {
                item_id,
                required_volume,
                attempted_containers,
            } => Some(json!({
                "itemId": item_id,
                "requiredVolume": required_volume,
                "attemptedContainers": attempted_containers,
            })),
            ApiError::Capacity {
                container_id,
                item_id,
                mass,
                volume,
                max_mass,
            } => Some(json!({
                "containerId": container_id,
                "itemId": item_id,
                "mass": mass,
                "volume": volume,
                "maxWeight": max_mass,
            })),
            ApiError::Overlap {
                container_id,
                conflicting_item_id,
                ..
            } => Some(json!({
                "containerId": container_id,
                "conflictingItemId": conflicting_item_id,
            })),
            ApiError::OutOfBounds { container_id, .. } => Some(json!({
                "containerId": container_id,
            })),
            _ => None,
        }
    }

    /// Caller mistakes, as opposed to server faults.
    pub fn is_client_error(&self) -> bool {
        !matches!(
            self,
            ApiError::DatabaseError(_) | ApiError::InternalError(_) | ApiError::Other(_)
        )
    }
}

// ==========================================
// From EngineError
// ==========================================
impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        let message = err.to_string();
        match err {
            EngineError::Overlap {
                container_id,
                conflicting_item_id,
                ..
            } => ApiError::Overlap {
                message,
                container_id,
                conflicting_item_id,
            },
            EngineError::OutOfBounds { container_id, .. } => {
                ApiError::OutOfBounds { message, container_id }
            }
            EngineError::NotReserved { .. } => ApiError::NotReserved(message),
            EngineError::NoCapacity {
                item_id,
                required_volume,
                attempted_containers,
            } => ApiError::NoCapacity {
                item_id,
                required_volume,
                attempted_containers,
            },
            EngineError::Capacity {
                container_id,
                item_id,
                mass,
                volume,
                max_mass,
            } => ApiError::Capacity {
                container_id,
                item_id,
                mass,
                volume,
                max_mass,
            },
            EngineError::ItemNotStowed { .. } => ApiError::ItemNotStowed(message),
            EngineError::InvalidRange(msg) => ApiError::InvalidRange(msg),
            EngineError::Validation(msg) => ApiError::ValidationError(msg),
        }
    }
}

// ==========================================
// From RepositoryError
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::Conflict { message } => ApiError::Conflict(message),
            RepositoryError::LockError(msg) => {
                ApiError::InternalError(format!("lock acquisition failed: {}", msg))
            }
            RepositoryError::NotFound { entity, id } => {
                ApiError::NotFound(format!("{} {} does not exist", entity, id))
            }
            RepositoryError::DatabaseConnectionError(msg)
            | RepositoryError::DatabaseTransactionError(msg)
            | RepositoryError::DatabaseQueryError(msg) => ApiError::DatabaseError(msg),
            RepositoryError::UniqueConstraintViolation(msg) => ApiError::ValidationError(msg),
            RepositoryError::ValidationError(msg) => ApiError::ValidationError(msg),
            RepositoryError::FieldValueError { field, message } => {
                ApiError::ValidationError(format!("field {}: {}", field, message))
            }
            RepositoryError::Spatial(engine_err) => ApiError::from(engine_err),
            RepositoryError::InternalError(msg) => ApiError::InternalError(msg),
            RepositoryError::Other(err) => ApiError::Other(err),
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
