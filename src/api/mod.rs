// ==========================================
// Space Stowage - API layer
// ==========================================
// Request/response operations called by the HTTP layer.
// Validation, lock acquisition, log append, all-or-nothing commit.
// ==========================================

pub mod dto;
pub mod error;
pub mod inventory_api;
pub mod log_api;
pub mod placement_api;
pub mod retrieval_api;
pub mod simulation_api;
pub mod validator;
pub mod waste_api;

pub use error::{ApiError, ApiResult};
pub use inventory_api::InventoryApi;
pub use log_api::LogApi;
pub use placement_api::PlacementApi;
pub use retrieval_api::RetrievalApi;
pub use simulation_api::SimulationApi;
pub use waste_api::WasteApi;
