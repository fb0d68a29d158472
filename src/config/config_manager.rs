// ==========================================
// Space Stowage - Config manager
// ==========================================
// Storage: config_kv table (key-value + scope)
// Overrides are read once per AppState; missing keys use defaults.
// ==========================================

use crate::config::stowage_config::{ScoringWeights, StowageConfig};
use crate::db::open_sqlite_connection;
use rusqlite::{params, Connection};
use serde_json::json;
use std::collections::BTreeMap;
use std::error::Error;
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

pub type ConfigResult<T> = Result<T, Box<dyn Error + Send + Sync>>;

// ==========================================
// ConfigManager
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    pub fn new(db_path: &str) -> ConfigResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        crate::db::init_schema(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Share an existing connection. PRAGMAs are re-applied (idempotent).
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> ConfigResult<Self> {
        {
            let conn_guard = conn.lock().map_err(|e| format!("lock failed: {}", e))?;
            crate::db::configure_sqlite_connection(&conn_guard)?;
        }

        Ok(Self { conn })
    }

    /// Value of `key` in the global scope.
    pub fn get_global_config_value(&self, key: &str) -> ConfigResult<Option<String>> {
        let conn = self.conn.lock().map_err(|e| format!("lock failed: {}", e))?;

        let result = conn.query_row(
            "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(Box::new(e)),
        }
    }

    /// Insert or replace a global override.
    pub fn upsert_global_config_value(&self, key: &str, value: &str) -> ConfigResult<()> {
        let conn = self.conn.lock().map_err(|e| format!("lock failed: {}", e))?;
        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value) VALUES ('global', ?1, ?2)
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
            params![key, value],
        )?;
        Ok(())
    }

    /// All global overrides as a JSON object string.
    pub fn get_config_snapshot(&self) -> ConfigResult<String> {
        let conn = self.conn.lock().map_err(|e| format!("lock failed: {}", e))?;

        let mut stmt =
            conn.prepare("SELECT key, value FROM config_kv WHERE scope_id = 'global' ORDER BY key")?;

        let mut config_map: BTreeMap<String, String> = BTreeMap::new();
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        for row in rows {
            let (key, value) = row?;
            config_map.insert(key, value);
        }

        Ok(serde_json::to_string(&json!(config_map))?)
    }

    fn parsed_or<T: FromStr + Copy + std::fmt::Display>(&self, key: &str, default: T) -> ConfigResult<T> {
        match self.get_global_config_value(key)? {
            None => Ok(default),
            Some(raw) => match raw.trim().parse::<T>() {
                Ok(v) => Ok(v),
                Err(_) => {
                    warn!(key, value = %raw, default = %default, "unparsable config value, using default");
                    Ok(default)
                }
            },
        }
    }

    /// Defaults overlaid with every parsable override.
    pub fn load_stowage_config(&self) -> ConfigResult<StowageConfig> {
        let defaults = StowageConfig::default();
        let weights = ScoringWeights {
            utilization: self.parsed_or(config_keys::WEIGHT_UTILIZATION, defaults.weights.utilization)?,
            accessibility: self
                .parsed_or(config_keys::WEIGHT_ACCESSIBILITY, defaults.weights.accessibility)?,
            depth_penalty: self
                .parsed_or(config_keys::WEIGHT_DEPTH_PENALTY, defaults.weights.depth_penalty)?,
            zone_match: self.parsed_or(config_keys::WEIGHT_ZONE_MATCH, defaults.weights.zone_match)?,
        };
        let config = StowageConfig {
            weights,
            rearrangement_max_candidates: self.parsed_or(
                config_keys::REARRANGEMENT_MAX_CANDIDATES,
                defaults.rearrangement_max_candidates,
            )?,
            max_recommendations: self
                .parsed_or(config_keys::MAX_RECOMMENDATIONS, defaults.max_recommendations)?,
            non_destructive_retrieval: self.parsed_or(
                config_keys::NON_DESTRUCTIVE_RETRIEVAL,
                defaults.non_destructive_retrieval,
            )?,
            geometry_epsilon: defaults.geometry_epsilon,
        };
        info!(
            w1 = config.weights.utilization,
            w2 = config.weights.accessibility,
            w3 = config.weights.depth_penalty,
            w4 = config.weights.zone_match,
            rearrangement_max_candidates = config.rearrangement_max_candidates,
            "stowage config loaded"
        );
        Ok(config)
    }
}

// ==========================================
// Config keys
// ==========================================
pub mod config_keys {
    // Placement scoring weights
    pub const WEIGHT_UTILIZATION: &str = "placement.weight.utilization";
    pub const WEIGHT_ACCESSIBILITY: &str = "placement.weight.accessibility";
    pub const WEIGHT_DEPTH_PENALTY: &str = "placement.weight.depth_penalty";
    pub const WEIGHT_ZONE_MATCH: &str = "placement.weight.zone_match";

    // Search bounds
    pub const REARRANGEMENT_MAX_CANDIDATES: &str = "rearrangement.max_candidates";
    pub const MAX_RECOMMENDATIONS: &str = "placement.max_recommendations";

    pub const NON_DESTRUCTIVE_RETRIEVAL: &str = "retrieval.non_destructive";
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> ConfigManager {
        let conn = crate::db::open_in_memory().unwrap();
        ConfigManager::from_connection(Arc::new(Mutex::new(conn))).unwrap()
    }

    #[test]
    fn test_defaults_without_overrides() {
        let config = manager().load_stowage_config().unwrap();
        assert_eq!(config, StowageConfig::default());
    }

    #[test]
    fn test_overrides_and_bad_values() {
        let mgr = manager();
        mgr.upsert_global_config_value(config_keys::WEIGHT_ZONE_MATCH, "80")
            .unwrap();
        mgr.upsert_global_config_value(config_keys::REARRANGEMENT_MAX_CANDIDATES, "many")
            .unwrap();
        mgr.upsert_global_config_value(config_keys::NON_DESTRUCTIVE_RETRIEVAL, "false")
            .unwrap();

        let config = mgr.load_stowage_config().unwrap();
        assert_eq!(config.weights.zone_match, 80.0);
        assert_eq!(
            config.rearrangement_max_candidates,
            StowageConfig::DEFAULT_REARRANGEMENT_MAX_CANDIDATES
        );
        assert!(!config.non_destructive_retrieval);

        let snapshot: BTreeMap<String, String> =
            serde_json::from_str(&mgr.get_config_snapshot().unwrap()).unwrap();
        assert_eq!(snapshot.len(), 3);
        assert_eq!(snapshot[config_keys::WEIGHT_ZONE_MATCH], "80");
    }
}
