// ==========================================
// Space Stowage - Waste and return manifest
// ==========================================

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::geometry::BoundingBox;
use crate::domain::plan::{PlanStep, RetrievalStep};
use crate::domain::types::WasteReason;

// ==========================================
// WasteItem
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WasteItem {
    pub item_id: String,
    pub name: String,
    /// Expired when both conditions hold.
    pub reason: WasteReason,
    /// Both Expired and Depleted hold.
    pub also_depleted: bool,
    pub container_id: Option<String>,
    pub position: Option<BoundingBox>,
}

// ==========================================
// ReturnManifest - derived totals, never edited directly
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestItem {
    pub item_id: String,
    pub name: String,
    pub reason: WasteReason,
    pub volume: f64,
    pub mass: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReturnManifest {
    pub undocking_container_id: String,
    pub undocking_date: NaiveDate,
    pub return_items: Vec<ManifestItem>,
    pub total_volume: f64,
    pub total_mass: f64,
}

impl ReturnManifest {
    pub fn new(
        undocking_container_id: &str,
        undocking_date: NaiveDate,
        return_items: Vec<ManifestItem>,
    ) -> Self {
        let total_volume = return_items.iter().map(|i| i.volume).sum();
        let total_mass = return_items.iter().map(|i| i.mass).sum();
        Self {
            undocking_container_id: undocking_container_id.to_string(),
            undocking_date,
            return_items,
            total_volume,
            total_mass,
        }
    }

    pub fn empty(undocking_container_id: &str, undocking_date: NaiveDate) -> Self {
        Self::new(undocking_container_id, undocking_date, Vec::new())
    }

    pub fn contains(&self, item_id: &str) -> bool {
        self.return_items.iter().any(|i| i.item_id == item_id)
    }
}

// ==========================================
// ReturnPlan - relocation steps + manifest
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReturnPlan {
    /// One `move` step per selected item not already in the undocking container.
    pub return_plan: Vec<PlanStep>,
    /// Blocker handling needed to extract each moved item, in execution order.
    pub retrieval_steps: Vec<RetrievalStep>,
    pub return_manifest: ReturnManifest,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manifest_totals_are_derived() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        let manifest = ReturnManifest::new(
            "U1",
            date,
            vec![
                ManifestItem {
                    item_id: "A".to_string(),
                    name: "a".to_string(),
                    reason: WasteReason::Expired,
                    volume: 10.0,
                    mass: 2.0,
                },
                ManifestItem {
                    item_id: "B".to_string(),
                    name: "b".to_string(),
                    reason: WasteReason::Depleted,
                    volume: 5.0,
                    mass: 3.5,
                },
            ],
        );
        assert_eq!(manifest.total_volume, 15.0);
        assert_eq!(manifest.total_mass, 5.5);
        assert!(manifest.contains("B"));
        assert!(ReturnManifest::empty("U1", date).return_items.is_empty());
    }
}
