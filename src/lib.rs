// ==========================================
// Space Stowage - Core library
// ==========================================
// Placement, retrieval, waste return and day simulation for
// spacecraft cargo containers.
// Stack: Rust + SQLite (audit log) + axum (HTTP surface)
// ==========================================

// ==========================================
// Module declarations
// ==========================================

// Domain layer - entities and value objects
pub mod domain;

// Engine layer - pure planning algorithms
pub mod engine;

// Repository layer - owned stores + audit log
pub mod repository;

// Configuration layer
pub mod config;

// Database infrastructure (connection init / PRAGMAs / schema)
pub mod db;

// Logging
pub mod logging;

// Operation timing
pub mod perf;

// API layer - request/response operations
pub mod api;

// Application layer - state wiring + HTTP
pub mod app;

// ==========================================
// Re-exports
// ==========================================

pub use domain::{
    ActionType, BoundingBox, Container, Coordinates, Dimensions, Item, ItemDescriptor, ItemState,
    LogEntry, LogFilter, PlacementPlan, PlacementRecommendation, PlanStep, ReturnManifest,
    ReturnPlan, StepAction, WasteItem, WasteReason,
};

pub use engine::{
    DaySimulator, EngineError, PlacementPlanner, PlacementScorer, RetrievalPlanner,
    ReturnPlanBuilder, SpatialIndex, WasteIdentifier,
};

pub use api::{
    ApiError, ApiResult, InventoryApi, LogApi, PlacementApi, RetrievalApi, SimulationApi, WasteApi,
};

pub use config::{ScoringWeights, StowageConfig};

// ==========================================
// Constants
// ==========================================

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub const APP_NAME: &str = "Space Stowage";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
