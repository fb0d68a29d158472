// ==========================================
// Space Stowage - Configuration layer
// ==========================================
// Reproducible planning constants with defaults,
// overrides stored in config_kv.
// ==========================================

pub mod config_manager;
pub mod stowage_config;

pub use config_manager::{config_keys, ConfigManager, ConfigResult};
pub use stowage_config::{ScoringWeights, StowageConfig};
