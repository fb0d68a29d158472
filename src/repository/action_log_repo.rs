// ==========================================
// Space Stowage - Audit log repository
// ==========================================
// Table: action_log (seq AUTOINCREMENT = global append order)
// Append-only: no update, no delete.
// ==========================================

mod core;
mod queries;


pub use core::ActionLogRepository;

/// Storage format of `action_log.timestamp`; sorts lexicographically.
pub(crate) const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";
