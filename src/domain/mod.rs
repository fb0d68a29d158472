// ==========================================
// Space Stowage - Domain layer
// ==========================================
// Entities, value objects and lifecycle enums.
// No locking, no persistence, no engine logic.
// ==========================================

pub mod action_log;
pub mod container;
pub mod geometry;
pub mod item;
pub mod plan;
pub mod types;
pub mod waste;

pub use action_log::{ActionType, LogEntry, LogFilter};
pub use container::Container;
pub use geometry::{BoundingBox, Coordinates, Dimensions, GEOMETRY_EPSILON};
pub use item::{Item, ItemDescriptor, ItemPlacement, MAX_PRIORITY, MIN_PRIORITY};
pub use plan::{
    PlacementPlan, PlacementRecommendation, PlanStep, RearrangementStep, RetrievalStep,
    StepSequence, STAGING_AREA_ID,
};
pub use types::{ItemState, StepAction, WasteReason};
pub use waste::{ManifestItem, ReturnManifest, ReturnPlan, WasteItem};
