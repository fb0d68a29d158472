// ==========================================
// Space Stowage - Waste identifier
// ==========================================
// Pure: item set + current date -> WasteItem list, ordered by item id.
// Expired: expiry_date <= current_date
// Depleted: uses_remaining == Some(0)
// ==========================================

use chrono::NaiveDate;

use crate::domain::item::Item;
use crate::domain::types::{ItemState, WasteReason};
use crate::domain::waste::WasteItem;

pub struct WasteIdentifier;

impl WasteIdentifier {
    /// Waste entry for a single item, None when the item is still usable
    /// or already disposed.
    pub fn classify(item: &Item, current_date: NaiveDate) -> Option<WasteItem> {
        if item.state == ItemState::Disposed {
            return None;
        }
        let reason = item.waste_reason(current_date)?;
        Some(WasteItem {
            item_id: item.item_id.clone(),
            name: item.name.clone(),
            reason,
            also_depleted: reason == WasteReason::Expired && item.is_depleted(),
            container_id: item.container_id().map(str::to_string),
            position: item.position().copied(),
        })
    }

    pub fn identify<'i, I>(items: I, current_date: NaiveDate) -> Vec<WasteItem>
    where
        I: IntoIterator<Item = &'i Item>,
    {
        let mut waste: Vec<WasteItem> = items
            .into_iter()
            .filter_map(|item| Self::classify(item, current_date))
            .collect();
        waste.sort_by(|a, b| a.item_id.cmp(&b.item_id));
        waste
    }
}
