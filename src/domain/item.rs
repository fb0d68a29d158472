// ==========================================
// Space Stowage - Item entity
// ==========================================
// Lifecycle: see domain::types::ItemState
// Waste is a reclassification only; the placement is kept until disposal.
// ==========================================

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::geometry::{BoundingBox, Dimensions};
use crate::domain::types::{ItemState, WasteReason};

pub const MIN_PRIORITY: u8 = 1;
pub const MAX_PRIORITY: u8 = 100;

// ==========================================
// ItemPlacement - where a stowed item sits
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemPlacement {
    pub container_id: String,
    pub position: BoundingBox,
}

// ==========================================
// ItemDescriptor - caller-supplied item data
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemDescriptor {
    pub item_id: String,
    pub name: String,
    #[serde(flatten)]
    pub dimensions: Dimensions,
    pub mass: f64,
    pub priority: u8,
    #[serde(default)]
    pub expiry_date: Option<NaiveDate>,
    /// Absent means unlimited uses.
    #[serde(default)]
    pub usage_limit: Option<u32>,
    #[serde(default)]
    pub preferred_zone: Option<String>,
}

// ==========================================
// Item
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub item_id: String,
    pub name: String,
    #[serde(flatten)]
    pub dimensions: Dimensions,
    pub mass: f64,
    pub priority: u8,
    pub expiry_date: Option<NaiveDate>,
    pub usage_limit: Option<u32>,
    pub uses_remaining: Option<u32>,
    pub preferred_zone: Option<String>,
    pub state: ItemState,
    pub placement: Option<ItemPlacement>,
}

impl Item {
    /// New Unplaced item; uses_remaining starts at the usage limit.
    pub fn from_descriptor(descriptor: ItemDescriptor) -> Self {
        Self {
            item_id: descriptor.item_id,
            name: descriptor.name,
            dimensions: descriptor.dimensions,
            mass: descriptor.mass,
            priority: descriptor.priority,
            expiry_date: descriptor.expiry_date,
            usage_limit: descriptor.usage_limit,
            uses_remaining: descriptor.usage_limit,
            preferred_zone: descriptor.preferred_zone,
            state: ItemState::Unplaced,
            placement: None,
        }
    }

    pub fn volume(&self) -> f64 {
        self.dimensions.volume()
    }

    /// Physically inside a container (Stowed, or Waste still in place).
    pub fn is_stowed(&self) -> bool {
        self.placement.is_some() && matches!(self.state, ItemState::Stowed | ItemState::Waste)
    }

    pub fn container_id(&self) -> Option<&str> {
        self.placement.as_ref().map(|p| p.container_id.as_str())
    }

    pub fn position(&self) -> Option<&BoundingBox> {
        self.placement.as_ref().map(|p| &p.position)
    }

    pub fn is_expired(&self, current_date: NaiveDate) -> bool {
        self.expiry_date.map(|d| d <= current_date).unwrap_or(false)
    }

    pub fn is_depleted(&self) -> bool {
        self.uses_remaining == Some(0)
    }

    /// Reporting reason; Expired wins when both hold.
    pub fn waste_reason(&self, current_date: NaiveDate) -> Option<WasteReason> {
        if self.is_expired(current_date) {
            Some(WasteReason::Expired)
        } else if self.is_depleted() {
            Some(WasteReason::Depleted)
        } else {
            None
        }
    }

    /// Consume one use. Never goes below zero; unlimited items are unaffected.
    pub fn consume_use(&mut self) {
        if let Some(uses) = self.uses_remaining {
            self.uses_remaining = Some(uses.saturating_sub(1));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(expiry: Option<NaiveDate>, usage_limit: Option<u32>) -> ItemDescriptor {
        ItemDescriptor {
            item_id: "I1".to_string(),
            name: "Food Packet".to_string(),
            dimensions: Dimensions::new(10.0, 10.0, 20.0),
            mass: 5.0,
            priority: 80,
            expiry_date: expiry,
            usage_limit,
            preferred_zone: Some("Crew Quarters".to_string()),
        }
    }

    #[test]
    fn test_expiry_is_inclusive() {
        let expiry = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        let item = Item::from_descriptor(descriptor(Some(expiry), None));
        assert!(!item.is_expired(NaiveDate::from_ymd_opt(2024, 12, 31).unwrap()));
        assert!(item.is_expired(expiry));
    }

    #[test]
    fn test_consume_use_floors_at_zero() {
        let mut item = Item::from_descriptor(descriptor(None, Some(1)));
        item.consume_use();
        item.consume_use();
        assert_eq!(item.uses_remaining, Some(0));
        assert!(item.is_depleted());

        let mut unlimited = Item::from_descriptor(descriptor(None, None));
        unlimited.consume_use();
        assert_eq!(unlimited.uses_remaining, None);
        assert!(!unlimited.is_depleted());
    }

    #[test]
    fn test_expired_ranks_over_depleted() {
        let expiry = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        let mut item = Item::from_descriptor(descriptor(Some(expiry), Some(1)));
        item.consume_use();
        assert_eq!(item.waste_reason(expiry), Some(WasteReason::Expired));
        assert_eq!(
            item.waste_reason(NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()),
            Some(WasteReason::Depleted)
        );
    }
}
