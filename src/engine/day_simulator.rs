// ==========================================
// Space Stowage - Day simulator
// ==========================================
// Per iteration, in order:
//   1. consume one use of every listed item that is Stowed
//   2. current_date += 1 day
//   3. reclassify; report only items crossing a threshold this iteration
// Crossing items become Waste and keep their placement.
// ==========================================
// Not idempotent: uses only decrease and time only moves forward.
// ==========================================

use std::collections::{BTreeMap, BTreeSet};

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::domain::item::Item;
use crate::domain::types::ItemState;
use crate::engine::error::{EngineError, EngineResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsedItem {
    pub item_id: String,
    pub name: String,
    /// After the last use in this run; None for unlimited items.
    pub remaining_uses: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemRef {
    pub item_id: String,
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationChanges {
    pub items_used: Vec<UsedItem>,
    pub items_expired: Vec<ItemRef>,
    pub items_out_of_uses: Vec<ItemRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationOutcome {
    pub previous_date: NaiveDate,
    pub new_date: NaiveDate,
    pub days: u32,
    pub changes: SimulationChanges,
    /// Every item moved to Waste by this run.
    #[serde(skip)]
    pub newly_wasted: Vec<String>,
}

pub struct DaySimulator;

impl DaySimulator {
    /// Advance `current_date` by `days`, mutating `items` in place.
    #[instrument(skip(items, items_used_per_day), fields(
        current_date = %current_date,
        used_count = items_used_per_day.len()
    ))]
    pub fn advance(
        items: &mut BTreeMap<String, Item>,
        current_date: NaiveDate,
        days: i64,
        items_used_per_day: &[String],
    ) -> EngineResult<SimulationOutcome> {
        if days < 1 {
            return Err(EngineError::InvalidRange(format!(
                "number of days must be at least 1, got {}",
                days
            )));
        }
        let days = u32::try_from(days)
            .map_err(|_| EngineError::InvalidRange(format!("number of days too large: {}", days)))?;
        if current_date.checked_add_days(Days::new(u64::from(days))).is_none() {
            return Err(EngineError::InvalidRange(format!(
                "advancing {} days from {} leaves the calendar range",
                days, current_date
            )));
        }

        // De-duplicated, first occurrence order.
        let mut seen = BTreeSet::new();
        let used_today: Vec<&String> = items_used_per_day
            .iter()
            .filter(|id| seen.insert(id.as_str()))
            .collect();

        let mut changes = SimulationChanges::default();
        let mut used_slot: BTreeMap<String, usize> = BTreeMap::new();
        let mut newly_wasted = Vec::new();
        let mut date = current_date;

        for _ in 0..days {
            let was_expired: BTreeSet<String> = items
                .values()
                .filter(|i| i.is_expired(date))
                .map(|i| i.item_id.clone())
                .collect();
            let was_depleted: BTreeSet<String> = items
                .values()
                .filter(|i| i.is_depleted())
                .map(|i| i.item_id.clone())
                .collect();

            for id in &used_today {
                let Some(item) = items.get_mut(id.as_str()) else {
                    debug!(item_id = %id, "unknown item in usage list, skipped");
                    continue;
                };
                if item.state != ItemState::Stowed {
                    continue;
                }
                item.consume_use();
                let entry = UsedItem {
                    item_id: item.item_id.clone(),
                    name: item.name.clone(),
                    remaining_uses: item.uses_remaining,
                };
                match used_slot.get(&item.item_id) {
                    Some(&slot) => changes.items_used[slot] = entry,
                    None => {
                        used_slot.insert(item.item_id.clone(), changes.items_used.len());
                        changes.items_used.push(entry);
                    }
                }
            }

            date = date.succ_opt().ok_or_else(|| {
                EngineError::InvalidRange(format!("no day after {}", date))
            })?;

            for item in items.values_mut() {
                if item.state == ItemState::Disposed {
                    continue;
                }
                let expired_now = item.is_expired(date) && !was_expired.contains(&item.item_id);
                let depleted_now = item.is_depleted() && !was_depleted.contains(&item.item_id);
                if expired_now {
                    changes.items_expired.push(ItemRef {
                        item_id: item.item_id.clone(),
                        name: item.name.clone(),
                    });
                }
                if depleted_now {
                    changes.items_out_of_uses.push(ItemRef {
                        item_id: item.item_id.clone(),
                        name: item.name.clone(),
                    });
                }
                if item.waste_reason(date).is_some() && item.state != ItemState::Waste {
                    item.state = ItemState::Waste;
                    newly_wasted.push(item.item_id.clone());
                }
            }
        }

        info!(
            previous_date = %current_date,
            new_date = %date,
            used = changes.items_used.len(),
            expired = changes.items_expired.len(),
            out_of_uses = changes.items_out_of_uses.len(),
            "days simulated"
        );
        Ok(SimulationOutcome {
            previous_date: current_date,
            new_date: date,
            days,
            changes,
            newly_wasted,
        })
    }
}
