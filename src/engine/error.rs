// ==========================================
// Space Stowage - Engine error types
// ==========================================
// Spatial invariant violations are always rejected, never auto-corrected.
// ==========================================

use thiserror::Error;

use crate::domain::geometry::BoundingBox;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("overlap: item {item_id} at {requested} intersects {conflicting_item_id} in container {container_id}")]
    Overlap {
        container_id: String,
        item_id: String,
        conflicting_item_id: String,
        requested: BoundingBox,
    },

    #[error("out of bounds: item {item_id} at {requested} exceeds container {container_id}")]
    OutOfBounds {
        container_id: String,
        item_id: String,
        requested: BoundingBox,
    },

    #[error("not reserved: item {item_id} holds no reservation in container {container_id}")]
    NotReserved { container_id: String, item_id: String },

    #[error("no capacity for item {item_id}: needs {required_volume} volume, tried containers [{}]", attempted_containers.join(", "))]
    NoCapacity {
        item_id: String,
        required_volume: f64,
        attempted_containers: Vec<String>,
    },

    #[error("return capacity exceeded for container {container_id}: lightest waste item {item_id} ({mass} mass, {volume} volume), max mass {max_mass}")]
    Capacity {
        container_id: String,
        item_id: String,
        mass: f64,
        volume: f64,
        max_mass: f64,
    },

    #[error("item {item_id} is not stowed (state={state})")]
    ItemNotStowed { item_id: String, state: String },

    #[error("invalid range: {0}")]
    InvalidRange(String),

    #[error("validation failed: {0}")]
    Validation(String),
}

pub type EngineResult<T> = Result<T, EngineError>;
