// ==========================================
// Space Stowage - Waste / return API
// ==========================================
// identify:          pure preview against the current date
// return_plan:       mass-capped manifest for one undocking container
// complete_undocking: dispose every manifest item, one disposal log each
// ==========================================

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use serde_json::json;
use tracing::{info, instrument};

use crate::api::dto::{
    CompleteUndockingRequest, CompleteUndockingResponse, ReturnPlanRequest, WasteIdentifyResponse,
    SYSTEM_USER,
};
use crate::api::error::{ApiError, ApiResult};
use crate::api::validator::Violations;
use crate::config::StowageConfig;
use crate::domain::action_log::{ActionType, LogEntry};
use crate::domain::waste::ReturnPlan;
use crate::engine::return_plan::ReturnPlanBuilder;
use crate::engine::waste::WasteIdentifier;
use crate::repository::action_log_repo::ActionLogRepository;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::inventory_store::InventoryStore;

pub struct WasteApi {
    store: Arc<InventoryStore>,
    action_log_repo: Arc<ActionLogRepository>,
    builder: ReturnPlanBuilder,
    /// Latest return plan per undocking container.
    pending: Mutex<BTreeMap<String, ReturnPlan>>,
}

impl WasteApi {
    pub fn new(
        store: Arc<InventoryStore>,
        action_log_repo: Arc<ActionLogRepository>,
        config: StowageConfig,
    ) -> Self {
        Self {
            store,
            action_log_repo,
            builder: ReturnPlanBuilder::new(config),
            pending: Mutex::new(BTreeMap::new()),
        }
    }

    /// Every non-disposed item that is expired or out of uses, by id.
    pub fn identify(&self) -> ApiResult<WasteIdentifyResponse> {
        let waste_items = self.store.read_session(|session| {
            WasteIdentifier::identify(session.items().values(), session.current_date())
        })?;
        Ok(WasteIdentifyResponse { waste_items })
    }

    /// Build (and remember) the return plan for an undocking container.
    ///
    /// # Returns
    /// - Ok(ReturnPlan): relocation steps, retrieval steps, manifest with mass <= maxWeight
    /// - Err(Capacity): not even the lightest waste item fits under maxWeight
    #[instrument(skip(self, request), fields(
        undocking_container_id = %request.undocking_container_id,
        max_weight = request.max_weight
    ))]
    pub fn return_plan(&self, request: ReturnPlanRequest) -> ApiResult<ReturnPlan> {
        let mut v = Violations::new();
        v.require_id("undockingContainerId", &request.undocking_container_id);
        v.into_result()?;

        let plan = self.store.read_session(|session| -> ApiResult<ReturnPlan> {
            let undocking = session.view(&request.undocking_container_id).ok_or_else(|| {
                ApiError::NotFound(format!(
                    "Container {} does not exist",
                    request.undocking_container_id
                ))
            })?;
            let waste = WasteIdentifier::identify(session.items().values(), session.current_date());
            Ok(self.builder.build(
                undocking,
                request.undocking_date,
                request.max_weight,
                &waste,
                session.items(),
            )?)
        })??;

        self.pending
            .lock()
            .map_err(|e| ApiError::InternalError(format!("pending return plans lock: {}", e)))?
            .insert(request.undocking_container_id.clone(), plan.clone());

        info!(
            items = plan.return_manifest.return_items.len(),
            total_mass = plan.return_manifest.total_mass,
            "return plan prepared"
        );
        Ok(plan)
    }

    /// Dispose every item on the container's last return manifest.
    ///
    /// Each item must still exist, still be waste and still sit where it
    /// was when this call read it; otherwise nothing is disposed.
    #[instrument(skip(self, request), fields(undocking_container_id = %request.undocking_container_id))]
    pub fn complete_undocking(
        &self,
        request: CompleteUndockingRequest,
    ) -> ApiResult<CompleteUndockingResponse> {
        let mut v = Violations::new();
        v.require_id("undockingContainerId", &request.undocking_container_id);
        v.into_result()?;

        let plan = self
            .pending
            .lock()
            .map_err(|e| ApiError::InternalError(format!("pending return plans lock: {}", e)))?
            .get(&request.undocking_container_id)
            .cloned()
            .ok_or_else(|| {
                ApiError::NotFound(format!(
                    "no return plan prepared for container {}",
                    request.undocking_container_id
                ))
            })?;
        let manifest = plan.return_manifest;

        // Current location of every manifest item, read before locking.
        let mut observed: BTreeMap<String, Option<String>> = BTreeMap::new();
        for entry in &manifest.return_items {
            let item = self.store.get_item(&entry.item_id).map_err(|e| match e {
                RepositoryError::NotFound { .. } => ApiError::Conflict(format!(
                    "item {} no longer exists; rebuild the return plan",
                    entry.item_id
                )),
                other => other.into(),
            })?;
            observed.insert(entry.item_id.clone(), item.container_id().map(str::to_string));
        }
        let mut lock_ids: Vec<&str> = vec![request.undocking_container_id.as_str()];
        lock_ids.extend(observed.values().flatten().map(String::as_str));

        let user_id = request.user_id.as_deref().unwrap_or(SYSTEM_USER);
        let removed = self.store.write_session(&lock_ids, |session| -> RepositoryResult<usize> {
            let current_date = session.current_date();
            let mut staged = session.stage();
            let mut entries = Vec::with_capacity(manifest.return_items.len());

            for entry in &manifest.return_items {
                let item = session.items().get(&entry.item_id).ok_or_else(|| {
                    RepositoryError::conflict(format!("item {} no longer exists", entry.item_id))
                })?;
                let expected = observed.get(&entry.item_id).cloned().flatten();
                if item.container_id() != expected.as_deref() {
                    return Err(RepositoryError::conflict(format!(
                        "item {} moved since it was read",
                        entry.item_id
                    )));
                }
                let Some(waste) = WasteIdentifier::classify(item, current_date) else {
                    return Err(RepositoryError::conflict(format!(
                        "item {} is no longer waste",
                        entry.item_id
                    )));
                };
                let from_container = item.container_id().map(str::to_string);
                staged.dispose(session, &entry.item_id)?;
                entries.push(
                    LogEntry::new(ActionType::Disposal, user_id)
                        .at(request.timestamp)
                        .with_item(&entry.item_id)
                        .with_container(&request.undocking_container_id)
                        .with_details(&json!({
                            "reason": waste.reason,
                            "mass": entry.mass,
                            "volume": entry.volume,
                            "fromContainer": from_container,
                            "undockingDate": manifest.undocking_date,
                        })),
                );
            }

            self.action_log_repo.batch_insert(&mut entries)?;
            session.apply(staged);
            Ok(entries.len())
        })?;

        if let Ok(mut pending) = self.pending.lock() {
            pending.remove(&request.undocking_container_id);
        }
        info!(items_removed = removed, "undocking completed");

        Ok(CompleteUndockingResponse {
            items_removed: removed,
            manifest,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::container::Container;
    use crate::domain::geometry::{BoundingBox, Coordinates, Dimensions, GEOMETRY_EPSILON};
    use crate::domain::item::ItemDescriptor;
    use chrono::NaiveDate;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, d).unwrap()
    }

    fn setup() -> WasteApi {
        let store = Arc::new(InventoryStore::new(date(10), GEOMETRY_EPSILON));
        store
            .add_container(Container::new("S", "Storage", 100.0, 100.0, 100.0))
            .unwrap();
        store
            .add_container(Container::new("U", "Airlock", 100.0, 100.0, 100.0))
            .unwrap();
        let conn = crate::db::open_in_memory().unwrap();
        let log = Arc::new(ActionLogRepository::new(Arc::new(Mutex::new(conn))));
        let api = WasteApi::new(store, log, StowageConfig::default());

        for (i, (id, mass, expiry)) in [("OLD", 4.0, Some(date(1))), ("NEW", 2.0, None)]
            .into_iter()
            .enumerate()
        {
            api.store
                .add_item(ItemDescriptor {
                    item_id: id.to_string(),
                    name: id.to_lowercase(),
                    dimensions: Dimensions::new(10.0, 10.0, 10.0),
                    mass,
                    priority: 10,
                    expiry_date: expiry,
                    usage_limit: None,
                    preferred_zone: None,
                })
                .unwrap();
            let position = BoundingBox::at(
                Coordinates::new(i as f64 * 10.0, 0.0, 0.0),
                &Dimensions::new(10.0, 10.0, 10.0),
            );
            api.store
                .write_session(&["S"], |session| {
                    let mut staged = session.stage();
                    staged.stow(session, id, "S", position)?;
                    session.apply(staged);
                    Ok(())
                })
                .unwrap();
        }
        api
    }

    #[test]
    fn test_identify_is_stable() {
        let api = setup();
        let first = api.identify().unwrap().waste_items;
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].item_id, "OLD");
        assert_eq!(api.identify().unwrap().waste_items, first);
    }

    #[test]
    fn test_return_plan_then_undock_disposes() {
        let api = setup();
        let plan = api
            .return_plan(ReturnPlanRequest {
                undocking_container_id: "U".to_string(),
                undocking_date: date(20),
                max_weight: 10.0,
            })
            .unwrap();
        assert_eq!(plan.return_plan.len(), 1);
        assert_eq!(plan.return_manifest.total_mass, 4.0);

        let done = api
            .complete_undocking(CompleteUndockingRequest {
                undocking_container_id: "U".to_string(),
                user_id: None,
                timestamp: None,
            })
            .unwrap();
        assert_eq!(done.items_removed, 1);
        assert!(api.store.get_item("OLD").is_err());
        assert_eq!(
            api.action_log_repo
                .count_by_action_type(ActionType::Disposal)
                .unwrap(),
            1
        );
    }

    #[test]
    fn test_capacity_error_when_too_heavy() {
        let api = setup();
        let err = api
            .return_plan(ReturnPlanRequest {
                undocking_container_id: "U".to_string(),
                undocking_date: date(20),
                max_weight: 1.0,
            })
            .unwrap_err();
        assert_eq!(err.code(), "CAPACITY_ERROR");
        assert!(api
            .complete_undocking(CompleteUndockingRequest {
                undocking_container_id: "U".to_string(),
                user_id: None,
                timestamp: None,
            })
            .is_err());
    }
}
