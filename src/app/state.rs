// ==========================================
// Space Stowage - Application state
// ==========================================
// One shared SQLite connection (audit log + config overrides),
// one in-memory inventory store, one instance of every API.
// ==========================================

use std::sync::{Arc, Mutex};

use chrono::NaiveDate;
use rusqlite::Connection;

use crate::api::{InventoryApi, LogApi, PlacementApi, RetrievalApi, SimulationApi, WasteApi};
use crate::config::{ConfigManager, StowageConfig};
use crate::repository::action_log_repo::ActionLogRepository;
use crate::repository::inventory_store::InventoryStore;

pub const DB_PATH_ENV: &str = "SPACE_STOWAGE_DB_PATH";
pub const START_DATE_ENV: &str = "SPACE_STOWAGE_START_DATE";

pub struct AppState {
    pub db_path: String,
    pub config: StowageConfig,
    pub store: Arc<InventoryStore>,
    pub action_log_repo: Arc<ActionLogRepository>,
    pub config_manager: Arc<ConfigManager>,

    pub placement_api: Arc<PlacementApi>,
    pub retrieval_api: Arc<RetrievalApi>,
    pub waste_api: Arc<WasteApi>,
    pub simulation_api: Arc<SimulationApi>,
    pub log_api: Arc<LogApi>,
    pub inventory_api: Arc<InventoryApi>,
}

impl AppState {
    /// File-backed state.
    ///
    /// # Arguments
    /// - db_path: SQLite file for the audit log and config overrides
    ///
    /// # Returns
    /// - Err(String): the database could not be opened or initialized
    pub fn new(db_path: String) -> Result<Self, String> {
        tracing::info!(db_path = %db_path, "initializing AppState");
        let conn = crate::db::open_sqlite_connection(&db_path)
            .map_err(|e| format!("cannot open database {}: {}", db_path, e))?;
        crate::db::init_schema(&conn).map_err(|e| format!("schema init failed: {}", e))?;
        Self::from_connection(db_path, conn, start_date_from_env())
    }

    /// Volatile state for tests and demos.
    pub fn in_memory(start_date: NaiveDate) -> Result<Self, String> {
        let conn = crate::db::open_in_memory()
            .map_err(|e| format!("cannot open in-memory database: {}", e))?;
        Self::from_connection(":memory:".to_string(), conn, start_date)
    }

    fn from_connection(
        db_path: String,
        mut conn: Connection,
        start_date: NaiveDate,
    ) -> Result<Self, String> {
        crate::perf::install_sqlite_tracing(&mut conn);
        let conn = Arc::new(Mutex::new(conn));

        // ==========================================
        // Repository layer
        // ==========================================
        let config_manager = Arc::new(
            ConfigManager::from_connection(conn.clone())
                .map_err(|e| format!("cannot create ConfigManager: {}", e))?,
        );
        let config = config_manager
            .load_stowage_config()
            .map_err(|e| format!("cannot load stowage config: {}", e))?;
        let action_log_repo = Arc::new(ActionLogRepository::new(conn));
        let store = Arc::new(InventoryStore::new(start_date, config.geometry_epsilon));

        // ==========================================
        // API layer
        // ==========================================
        let placement_api = Arc::new(PlacementApi::new(
            store.clone(),
            action_log_repo.clone(),
            config,
        ));
        let retrieval_api = Arc::new(RetrievalApi::new(
            store.clone(),
            action_log_repo.clone(),
            config,
        ));
        let waste_api = Arc::new(WasteApi::new(store.clone(), action_log_repo.clone(), config));
        let simulation_api = Arc::new(SimulationApi::new(store.clone(), action_log_repo.clone()));
        let log_api = Arc::new(LogApi::new(action_log_repo.clone()));
        let inventory_api = Arc::new(InventoryApi::new(store.clone()));

        tracing::info!(current_date = %start_date, "AppState ready");
        Ok(Self {
            db_path,
            config,
            store,
            action_log_repo,
            config_manager,
            placement_api,
            retrieval_api,
            waste_api,
            simulation_api,
            log_api,
            inventory_api,
        })
    }
}

/// `SPACE_STOWAGE_START_DATE` (YYYY-MM-DD), else today (UTC).
pub fn start_date_from_env() -> NaiveDate {
    let today = chrono::Utc::now().date_naive();
    match std::env::var(START_DATE_ENV) {
        Ok(raw) => match NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d") {
            Ok(date) => date,
            Err(e) => {
                tracing::warn!(value = %raw, error = %e, "invalid start date, using today");
                today
            }
        },
        Err(_) => today,
    }
}

/// `SPACE_STOWAGE_DB_PATH` when set, else a file under the user data dir.
pub fn get_default_db_path() -> String {
    use std::path::PathBuf;

    if let Ok(path) = std::env::var(DB_PATH_ENV) {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./space_stowage.db");
    if let Some(data_dir) = dirs::data_dir() {
        let dir = data_dir.join("space-stowage");
        if std::fs::create_dir_all(&dir).is_ok() {
            path = dir.join("space_stowage.db");
        }
    }
    path.to_string_lossy().to_string()
}
