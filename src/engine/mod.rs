// ==========================================
// Space Stowage - Engine layer
// ==========================================
// Pure algorithms over domain values.
// No SQL, no locks. Rejections carry a reason.
// ==========================================

pub mod day_simulator;
pub mod error;
pub mod placement;
pub mod retrieval;
pub mod return_plan;
pub mod scoring;
pub mod spatial_index;
pub mod waste;

pub use day_simulator::{DaySimulator, ItemRef, SimulationChanges, SimulationOutcome, UsedItem};
pub use error::{EngineError, EngineResult};
pub use placement::{ContainerView, PlacementPlanner, ScoredCandidate};
pub use retrieval::RetrievalPlanner;
pub use return_plan::ReturnPlanBuilder;
pub use scoring::{PlacementScorer, ScoreTerms};
pub use spatial_index::{CandidatePosition, SpatialIndex};
pub use waste::WasteIdentifier;
