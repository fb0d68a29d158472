// ==========================================
// Space Stowage - Request / response DTOs
// ==========================================
// Wire field names are camelCase. Responses carry only the payload;
// the HTTP layer adds the success envelope.
// ==========================================

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::domain::container::Container;
use crate::domain::geometry::BoundingBox;
use crate::domain::item::{Item, ItemDescriptor};
use crate::domain::plan::{PlacementRecommendation, RearrangementStep, RetrievalStep};
use crate::domain::types::ItemState;
use crate::domain::waste::{ReturnManifest, WasteItem};
use crate::engine::day_simulator::SimulationChanges;

/// Acting user when the request names none.
pub const SYSTEM_USER: &str = "system";

// ==========================================
// Placement
// ==========================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacementResponse {
    pub recommendations: Vec<PlacementRecommendation>,
    pub rearrangements: Vec<RearrangementStep>,
    pub zone_fallback: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmPlacementRequest {
    pub item_id: String,
    pub container_id: String,
    pub position: BoundingBox,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub timestamp: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmPlacementResponse {
    pub item_id: String,
    pub container_id: String,
    pub position: BoundingBox,
    /// Items relocated by an executed rearrangement.
    pub moved_items: Vec<String>,
}

// ==========================================
// Search / retrieve / place
// ==========================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchQuery {
    #[serde(default)]
    pub item_id: Option<String>,
    #[serde(default)]
    pub item_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemDetail {
    pub item_id: String,
    pub name: String,
    pub state: ItemState,
    pub priority: u8,
    pub mass: f64,
    pub expiry_date: Option<NaiveDate>,
    pub uses_remaining: Option<u32>,
    pub container_id: Option<String>,
    pub zone: Option<String>,
    pub position: Option<BoundingBox>,
}

impl ItemDetail {
    pub fn from_item(item: &Item, zone: Option<String>) -> Self {
        Self {
            item_id: item.item_id.clone(),
            name: item.name.clone(),
            state: item.state,
            priority: item.priority,
            mass: item.mass,
            expiry_date: item.expiry_date,
            uses_remaining: item.uses_remaining,
            container_id: item.container_id().map(str::to_string),
            zone,
            position: item.position().copied(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub found: bool,
    pub item: Option<ItemDetail>,
    pub retrieval_steps: Vec<RetrievalStep>,
}

impl SearchResponse {
    pub fn not_found() -> Self {
        Self {
            found: false,
            item: None,
            retrieval_steps: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrieveRequest {
    pub item_id: String,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub timestamp: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrieveResponse {
    pub item_id: String,
    pub from_container: String,
    pub retrieval_steps: Vec<RetrievalStep>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceRequest {
    pub item_id: String,
    pub container_id: String,
    pub position: BoundingBox,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub timestamp: Option<NaiveDateTime>,
}

// ==========================================
// Waste / return
// ==========================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WasteIdentifyResponse {
    pub waste_items: Vec<WasteItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReturnPlanRequest {
    pub undocking_container_id: String,
    pub undocking_date: NaiveDate,
    pub max_weight: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteUndockingRequest {
    pub undocking_container_id: String,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub timestamp: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteUndockingResponse {
    pub items_removed: usize,
    pub manifest: ReturnManifest,
}

// ==========================================
// Simulation
// ==========================================

/// Item reference by id or by name; id wins when both are given.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemUsageRef {
    #[serde(default)]
    pub item_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulateRequest {
    #[serde(default)]
    pub num_of_days: Option<i64>,
    #[serde(default)]
    pub to_date: Option<NaiveDate>,
    /// Plain id list.
    #[serde(default)]
    pub items_used: Vec<String>,
    #[serde(default)]
    pub items_to_be_used_per_day: Vec<ItemUsageRef>,
    #[serde(default)]
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulateResponse {
    pub new_date: NaiveDate,
    pub changes: SimulationChanges,
}

// ==========================================
// Registration / snapshots
// ==========================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddContainersRequest {
    pub containers: Vec<Container>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddItemsRequest {
    pub items: Vec<ItemDescriptor>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisteredResponse {
    pub registered: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentDateResponse {
    pub current_date: NaiveDate,
}
