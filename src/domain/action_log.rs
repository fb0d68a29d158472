// ==========================================
// Space Stowage - Audit log domain model
// ==========================================
// Append-only: every mutating operation writes one entry,
// entries are never updated or deleted.
// ==========================================

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;
use std::str::FromStr;

// ==========================================
// ActionType
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionType {
    Placement,
    Retrieval,
    Rearrangement,
    Disposal,
    Simulation,
}

impl ActionType {
    /// Storage representation (action_log.action_type column).
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::Placement => "placement",
            ActionType::Retrieval => "retrieval",
            ActionType::Rearrangement => "rearrangement",
            ActionType::Disposal => "disposal",
            ActionType::Simulation => "simulation",
        }
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "placement" => Ok(ActionType::Placement),
            "retrieval" => Ok(ActionType::Retrieval),
            "rearrangement" => Ok(ActionType::Rearrangement),
            "disposal" => Ok(ActionType::Disposal),
            "simulation" => Ok(ActionType::Simulation),
            other => Err(format!("unknown action type: {}", other)),
        }
    }
}

// ==========================================
// LogEntry
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub log_id: String,
    /// Global append order; assigned by the repository on insert.
    pub seq: i64,
    pub timestamp: NaiveDateTime,
    pub action_type: ActionType,
    pub user_id: String,
    pub item_id: Option<String>,
    pub container_id: Option<String>,
    pub details: JsonValue,
}

impl LogEntry {
    pub fn new(action_type: ActionType, user_id: &str) -> Self {
        Self {
            log_id: uuid::Uuid::new_v4().to_string(),
            seq: 0,
            timestamp: chrono::Utc::now().naive_utc(),
            action_type,
            user_id: user_id.to_string(),
            item_id: None,
            container_id: None,
            details: JsonValue::Object(Default::default()),
        }
    }

    pub fn with_item(mut self, item_id: &str) -> Self {
        self.item_id = Some(item_id.to_string());
        self
    }

    pub fn with_container(mut self, container_id: &str) -> Self {
        self.container_id = Some(container_id.to_string());
        self
    }

    /// Caller-supplied action time; keeps `now` when absent.
    pub fn at(mut self, timestamp: Option<NaiveDateTime>) -> Self {
        if let Some(ts) = timestamp {
            self.timestamp = ts;
        }
        self
    }

    /// Serialize any payload into the details column.
    pub fn with_details<T: Serialize>(mut self, details: &T) -> Self {
        if let Ok(value) = serde_json::to_value(details) {
            self.details = value;
        }
        self
    }
}

// ==========================================
// LogFilter - query criteria (all optional, AND-combined)
// ==========================================
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogFilter {
    pub start_date: Option<NaiveDateTime>,
    pub end_date: Option<NaiveDateTime>,
    pub item_id: Option<String>,
    pub user_id: Option<String>,
    pub action_type: Option<ActionType>,
}
