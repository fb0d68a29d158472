// ==========================================
// Space Stowage - Application layer
// ==========================================
// AppState wiring and the HTTP surface.
// ==========================================

pub mod http;
pub mod state;

pub use http::{router, SharedState};
pub use state::{get_default_db_path, start_date_from_env, AppState};
