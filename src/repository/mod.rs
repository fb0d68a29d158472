// ==========================================
// Space Stowage - Repository layer
// ==========================================
// Owned stores and the SQLite audit log.
// No business rules; parameterized SQL only.
// ==========================================

pub mod action_log_repo;
pub mod error;
pub mod inventory_store;

pub use action_log_repo::ActionLogRepository;
pub use error::{RepositoryError, RepositoryResult};
pub use inventory_store::{
    ArrangementEntry, ContainerSnapshot, InventoryStore, ReadSession, StagedChanges, WriteSession,
};
