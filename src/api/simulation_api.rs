// ==========================================
// Space Stowage - Day simulation API
// ==========================================
// Runs under the global write section: no placement or retrieval
// interleaves with a day advance.
// ==========================================

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{Days, NaiveDate};
use serde_json::json;
use tracing::instrument;

use crate::api::dto::{CurrentDateResponse, SimulateRequest, SimulateResponse, SYSTEM_USER};
use crate::api::error::{ApiError, ApiResult};
use crate::domain::action_log::{ActionType, LogEntry};
use crate::engine::day_simulator::DaySimulator;
use crate::engine::error::{EngineError, EngineResult};
use crate::repository::action_log_repo::ActionLogRepository;
use crate::repository::inventory_store::InventoryStore;

pub struct SimulationApi {
    store: Arc<InventoryStore>,
    action_log_repo: Arc<ActionLogRepository>,
}

impl SimulationApi {
    pub fn new(store: Arc<InventoryStore>, action_log_repo: Arc<ActionLogRepository>) -> Self {
        Self {
            store,
            action_log_repo,
        }
    }

    pub fn current_date(&self) -> ApiResult<CurrentDateResponse> {
        Ok(CurrentDateResponse {
            current_date: self.store.current_date()?,
        })
    }

    /// Advance the mission date.
    ///
    /// # Arguments
    /// - request.numOfDays | request.toDate: exactly one
    /// - request.itemsUsed / itemsToBeUsedPerDay: items consumed once per simulated day
    ///
    /// # Returns
    /// - Ok(SimulateResponse): new date and the threshold crossings of this run
    #[instrument(skip(self, request), fields(
        num_of_days = ?request.num_of_days,
        to_date = ?request.to_date
    ))]
    pub fn simulate(&self, request: SimulateRequest) -> ApiResult<SimulateResponse> {
        if request.num_of_days.is_some() == request.to_date.is_some() {
            return Err(ApiError::ValidationError(
                "exactly one of numOfDays or toDate is required".to_string(),
            ));
        }
        let used_ids = self.resolve_usage(&request)?;
        let user_id = request.user_id.as_deref().unwrap_or(SYSTEM_USER);

        let outcome = self.store.advance_session(|items, date| {
            let days = days_to_advance(request.num_of_days, request.to_date, *date)?;
            let outcome = DaySimulator::advance(items, *date, days, &used_ids)?;

            let mut entry = LogEntry::new(ActionType::Simulation, user_id).with_details(&json!({
                "previousDate": outcome.previous_date,
                "newDate": outcome.new_date,
                "days": outcome.days,
                "itemsUsed": outcome.changes.items_used.len(),
                "itemsExpired": outcome.changes.items_expired.len(),
                "itemsOutOfUses": outcome.changes.items_out_of_uses.len(),
                "newlyWasted": outcome.newly_wasted,
            }));
            self.action_log_repo.insert(&mut entry)?;

            *date = outcome.new_date;
            Ok(outcome)
        })?;

        Ok(SimulateResponse {
            new_date: outcome.new_date,
            changes: outcome.changes,
        })
    }

    /// Item ids from both usage lists, first occurrence order.
    fn resolve_usage(&self, request: &SimulateRequest) -> ApiResult<Vec<String>> {
        let mut ids = Vec::new();
        for id in &request.items_used {
            ids.push(self.store.get_item(id)?.item_id);
        }
        for usage in &request.items_to_be_used_per_day {
            match (usage.item_id.as_deref(), usage.name.as_deref()) {
                (Some(id), _) => ids.push(self.store.get_item(id)?.item_id),
                (None, Some(name)) => {
                    let item = self.store.find_item_by_name(name)?.ok_or_else(|| {
                        ApiError::NotFound(format!("no item named {}", name))
                    })?;
                    ids.push(item.item_id);
                }
                (None, None) => {
                    return Err(ApiError::ValidationError(
                        "usage entry needs itemId or name".to_string(),
                    ))
                }
            }
        }
        let mut seen = BTreeSet::new();
        ids.retain(|id| seen.insert(id.clone()));
        Ok(ids)
    }
}

fn days_to_advance(
    num_of_days: Option<i64>,
    to_date: Option<NaiveDate>,
    current_date: NaiveDate,
) -> EngineResult<i64> {
    match (num_of_days, to_date) {
        (Some(days), _) => {
            let in_range = u64::try_from(days)
                .ok()
                .and_then(|d| current_date.checked_add_days(Days::new(d)))
                .is_some();
            if days >= 1 && !in_range {
                return Err(EngineError::InvalidRange(format!(
                    "numOfDays {} from {} leaves the calendar range",
                    days, current_date
                )));
            }
            Ok(days)
        }
        (None, Some(to)) => {
            let days = (to - current_date).num_days();
            if days < 1 {
                return Err(EngineError::InvalidRange(format!(
                    "toDate {} must be after the current date {}",
                    to, current_date
                )));
            }
            Ok(days)
        }
        (None, None) => Err(EngineError::Validation(
            "numOfDays or toDate is required".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::geometry::{Dimensions, GEOMETRY_EPSILON};
    use crate::domain::item::ItemDescriptor;
    use crate::domain::types::ItemState;
    use std::sync::Mutex;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn setup(start: NaiveDate) -> SimulationApi {
        let store = Arc::new(InventoryStore::new(start, GEOMETRY_EPSILON));
        let conn = crate::db::open_in_memory().unwrap();
        let log = Arc::new(ActionLogRepository::new(Arc::new(Mutex::new(conn))));
        SimulationApi::new(store, log)
    }

    fn add(api: &SimulationApi, id: &str, expiry: Option<NaiveDate>, uses: Option<u32>) {
        api.store
            .add_item(ItemDescriptor {
                item_id: id.to_string(),
                name: format!("{} kit", id),
                dimensions: Dimensions::new(1.0, 1.0, 1.0),
                mass: 1.0,
                priority: 10,
                expiry_date: expiry,
                usage_limit: uses,
                preferred_zone: None,
            })
            .unwrap();
    }

    #[test]
    fn test_to_date_reports_expiry_once() {
        let api = setup(ymd(2024, 12, 30));
        add(&api, "I3", Some(ymd(2025, 1, 1)), None);
        let response = api
            .simulate(SimulateRequest {
                to_date: Some(ymd(2025, 1, 2)),
                ..SimulateRequest::default()
            })
            .unwrap();
        assert_eq!(response.new_date, ymd(2025, 1, 2));
        assert_eq!(response.changes.items_expired.len(), 1);
        assert_eq!(api.store.get_item("I3").unwrap().state, ItemState::Waste);
        assert_eq!(api.current_date().unwrap().current_date, ymd(2025, 1, 2));
        assert_eq!(
            api.action_log_repo
                .count_by_action_type(ActionType::Simulation)
                .unwrap(),
            1
        );
    }

    #[test]
    fn test_both_or_neither_bound_is_rejected() {
        let api = setup(ymd(2025, 1, 1));
        assert!(api.simulate(SimulateRequest::default()).is_err());
        let both = SimulateRequest {
            num_of_days: Some(1),
            to_date: Some(ymd(2025, 1, 5)),
            ..SimulateRequest::default()
        };
        assert_eq!(api.simulate(both).unwrap_err().code(), "VALIDATION_ERROR");
    }

    #[test]
    fn test_past_date_and_zero_days_are_invalid_ranges() {
        let api = setup(ymd(2025, 1, 10));
        let past = api
            .simulate(SimulateRequest {
                to_date: Some(ymd(2025, 1, 10)),
                ..SimulateRequest::default()
            })
            .unwrap_err();
        assert_eq!(past.code(), "INVALID_RANGE_ERROR");
        let zero = api
            .simulate(SimulateRequest {
                num_of_days: Some(0),
                ..SimulateRequest::default()
            })
            .unwrap_err();
        assert_eq!(zero.code(), "INVALID_RANGE_ERROR");
        assert_eq!(api.current_date().unwrap().current_date, ymd(2025, 1, 10));
        assert_eq!(api.action_log_repo.count().unwrap(), 0);
    }

    #[test]
    fn test_unknown_usage_reference_is_not_found() {
        let api = setup(ymd(2025, 1, 1));
        let err = api
            .simulate(SimulateRequest {
                num_of_days: Some(1),
                items_used: vec!["GHOST".to_string()],
                ..SimulateRequest::default()
            })
            .unwrap_err();
        assert_eq!(err.code(), "NOT_FOUND");
    }
}
