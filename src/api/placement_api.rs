// ==========================================
// Space Stowage - Placement API
// ==========================================
// recommend: plan against a consistent snapshot, remember the plan.
// confirm:   re-validate under the container locks, then reserve,
//            log and apply in one all-or-nothing section.
// ==========================================

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use chrono::NaiveDateTime;
use serde_json::json;
use tracing::{info, instrument, warn};

use crate::api::dto::{ConfirmPlacementRequest, ConfirmPlacementResponse, PlacementResponse, SYSTEM_USER};
use crate::api::error::{ApiError, ApiResult};
use crate::api::validator::{validate_item_descriptor, validate_position, Violations};
use crate::config::StowageConfig;
use crate::domain::action_log::{ActionType, LogEntry};
use crate::domain::geometry::BoundingBox;
use crate::domain::item::ItemDescriptor;
use crate::domain::plan::{PlacementPlan, RearrangementStep};
use crate::domain::types::StepAction;
use crate::engine::error::EngineError;
use crate::engine::placement::PlacementPlanner;
use crate::repository::action_log_repo::ActionLogRepository;
use crate::repository::error::RepositoryError;
use crate::repository::inventory_store::InventoryStore;

// ==========================================
// PlacementApi
// ==========================================
pub struct PlacementApi {
    store: Arc<InventoryStore>,
    action_log_repo: Arc<ActionLogRepository>,
    planner: PlacementPlanner,
    /// Last plan handed out per item, consumed by confirm.
    pending: Mutex<BTreeMap<String, PlacementPlan>>,
}

impl PlacementApi {
    pub fn new(
        store: Arc<InventoryStore>,
        action_log_repo: Arc<ActionLogRepository>,
        config: StowageConfig,
    ) -> Self {
        Self {
            store,
            action_log_repo,
            planner: PlacementPlanner::new(config),
            pending: Mutex::new(BTreeMap::new()),
        }
    }

    /// Ranked placement recommendations for an item.
    ///
    /// # Arguments
    /// - descriptor: item data; unknown or still Unplaced items are registered from it
    ///
    /// # Returns
    /// - Ok(PlacementResponse): best first; `rearrangements` set when items must move first
    /// - Err(NoCapacity): neither direct placement nor a bounded rearrangement exists
    #[instrument(skip(self, descriptor), fields(item_id = %descriptor.item_id))]
    pub fn recommend(&self, descriptor: ItemDescriptor) -> ApiResult<PlacementResponse> {
        validate_item_descriptor(&descriptor)?;
        let item = self.store.register_for_placement(descriptor)?;
        if item.is_stowed() {
            return Err(ApiError::ValidationError(format!(
                "item {} is already stowed in {}; retrieve it before asking for a new placement",
                item.item_id,
                item.container_id().unwrap_or_default()
            )));
        }

        let plan = self
            .store
            .read_session(|session| self.planner.plan(&item, &session.views(), session.items()))??;

        self.pending
            .lock()
            .map_err(|e| ApiError::InternalError(format!("pending plans lock: {}", e)))?
            .insert(item.item_id.clone(), plan.clone());

        Ok(PlacementResponse {
            recommendations: plan.recommendations,
            rearrangements: plan.rearrangements,
            zone_fallback: plan.zone_fallback,
        })
    }

    /// Commit a chosen placement. When it matches the item's pending
    /// rearrangement plan, the relocation moves are executed first.
    #[instrument(skip(self, request), fields(item_id = %request.item_id, container_id = %request.container_id))]
    pub fn confirm(&self, request: ConfirmPlacementRequest) -> ApiResult<ConfirmPlacementResponse> {
        let mut v = Violations::new();
        v.require_id("itemId", &request.item_id);
        v.require_id("containerId", &request.container_id);
        v.into_result()?;

        let plan = self.matching_plan(&request.item_id, &request.container_id, &request.position)?;
        let moves: Vec<RearrangementStep> = plan
            .as_ref()
            .map(|p| p.rearrangements.clone())
            .unwrap_or_default();

        let moved_items = commit_placement(
            &self.store,
            &self.action_log_repo,
            PlacementCommit {
                item_id: &request.item_id,
                container_id: &request.container_id,
                position: request.position,
                user_id: request.user_id.as_deref().unwrap_or(SYSTEM_USER),
                timestamp: request.timestamp,
                moves: &moves,
                planned: plan.is_some(),
            },
        )?;

        if let Ok(mut pending) = self.pending.lock() {
            pending.remove(&request.item_id);
        }

        Ok(ConfirmPlacementResponse {
            item_id: request.item_id,
            container_id: request.container_id,
            position: request.position,
            moved_items,
        })
    }

    fn matching_plan(
        &self,
        item_id: &str,
        container_id: &str,
        position: &BoundingBox,
    ) -> ApiResult<Option<PlacementPlan>> {
        let eps = self.store.epsilon();
        let pending = self
            .pending
            .lock()
            .map_err(|e| ApiError::InternalError(format!("pending plans lock: {}", e)))?;
        Ok(pending.get(item_id).and_then(|plan| {
            plan.recommendations
                .iter()
                .any(|r| r.container_id == container_id && r.position.approx_eq(position, eps))
                .then(|| plan.clone())
        }))
    }
}

// ==========================================
// Shared commit path (confirm + post-retrieval place)
// ==========================================

pub(crate) struct PlacementCommit<'a> {
    pub item_id: &'a str,
    pub container_id: &'a str,
    pub position: BoundingBox,
    pub user_id: &'a str,
    pub timestamp: Option<NaiveDateTime>,
    /// Relocations to execute before the final placement.
    pub moves: &'a [RearrangementStep],
    /// Position came from a recommendation; a collision now means the
    /// state changed after planning.
    pub planned: bool,
}

/// Returns the ids of relocated items.
pub(crate) fn commit_placement(
    store: &InventoryStore,
    action_log_repo: &ActionLogRepository,
    commit: PlacementCommit<'_>,
) -> ApiResult<Vec<String>> {
    let observed = store.get_item(commit.item_id)?;
    if !observed.state.is_placeable() {
        return Err(ApiError::ValidationError(format!(
            "item {} cannot be placed in state {}",
            observed.item_id, observed.state
        )));
    }
    validate_position(&commit.position, &observed.dimensions, store.epsilon())?;

    let mut lock_ids: Vec<&str> = vec![commit.container_id];
    if let Some(current) = observed.container_id() {
        lock_ids.push(current);
    }
    for step in commit.moves.iter().filter(|s| s.action == StepAction::Move) {
        lock_ids.extend(step.from_container.as_deref());
        lock_ids.extend(step.to_container.as_deref());
    }

    let eps = store.epsilon();
    let moved = store.write_session(&lock_ids, |session| {
        let current = session.item(commit.item_id)?;
        if current.placement != observed.placement || current.state != observed.state {
            return Err(RepositoryError::conflict(format!(
                "item {} changed since it was read; re-plan",
                commit.item_id
            )));
        }
        let from_container = current.container_id().map(str::to_string);

        let mut staged = session.stage();
        let mut entries = Vec::new();
        let mut moved = Vec::new();

        // Every mover leaves its box before any of them is re-stowed: the
        // planner computed destinations with all movers released.
        let mut relocations = Vec::new();
        for step in commit.moves.iter().filter(|s| s.action == StepAction::Move) {
            let mover = session.item(&step.item_id).map_err(|_| {
                RepositoryError::conflict(format!("item {} no longer exists", step.item_id))
            })?;
            let still_there = mover.container_id() == step.from_container.as_deref()
                && match (mover.position(), step.from_position.as_ref()) {
                    (Some(a), Some(b)) => a.approx_eq(b, eps),
                    _ => false,
                };
            if !still_there {
                return Err(RepositoryError::conflict(format!(
                    "item {} moved since the rearrangement was planned",
                    step.item_id
                )));
            }
            let (Some(to_container), Some(to_position)) =
                (step.to_container.as_deref(), step.to_position)
            else {
                return Err(RepositoryError::InternalError(format!(
                    "rearrangement step {} has no destination",
                    step.step
                )));
            };
            staged.unstow(session, &step.item_id, mover.state)?;
            relocations.push((step, to_container, to_position));
        }
        if current.placement.is_some() {
            staged.unstow(session, commit.item_id, current.state)?;
        }

        for (step, to_container, to_position) in relocations {
            staged.stow(session, &step.item_id, to_container, to_position)?;
            entries.push(
                LogEntry::new(ActionType::Rearrangement, commit.user_id)
                    .at(commit.timestamp)
                    .with_item(&step.item_id)
                    .with_container(to_container)
                    .with_details(&json!({
                        "step": step.step,
                        "forItemId": commit.item_id,
                        "fromContainer": step.from_container,
                        "fromPosition": step.from_position,
                        "toContainer": to_container,
                        "toPosition": to_position,
                    })),
            );
            moved.push(step.item_id.clone());
        }

        staged
            .stow(session, commit.item_id, commit.container_id, commit.position)
            .map_err(|e| match e {
                RepositoryError::Spatial(EngineError::Overlap { conflicting_item_id, .. })
                    if commit.planned =>
                {
                    RepositoryError::conflict(format!(
                        "recommended position is now occupied by {}; re-plan",
                        conflicting_item_id
                    ))
                }
                other => other,
            })?;

        let zone = session
            .view(commit.container_id)
            .map(|v| v.container.zone.clone());
        entries.push(
            LogEntry::new(ActionType::Placement, commit.user_id)
                .at(commit.timestamp)
                .with_item(commit.item_id)
                .with_container(commit.container_id)
                .with_details(&json!({
                    "position": commit.position,
                    "zone": zone,
                    "fromContainer": from_container,
                    "rearranged": moved.len(),
                })),
        );

        action_log_repo.batch_insert(&mut entries)?;
        session.apply(staged);
        Ok(moved)
    });

    match &moved {
        Ok(moved) => info!(
            item_id = commit.item_id,
            container_id = commit.container_id,
            moved = moved.len(),
            "placement committed"
        ),
        Err(e) => warn!(item_id = commit.item_id, error = %e, "placement rejected"),
    }
    moved.map_err(ApiError::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::container::Container;
    use crate::domain::geometry::{Coordinates, Dimensions, GEOMETRY_EPSILON};
    use crate::domain::types::ItemState;
    use chrono::NaiveDate;

    fn api() -> PlacementApi {
        let store = Arc::new(InventoryStore::new(
            NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            GEOMETRY_EPSILON,
        ));
        store
            .add_container(Container::new("C", "A", 100.0, 100.0, 100.0))
            .unwrap();
        let conn = crate::db::open_in_memory().unwrap();
        let log = Arc::new(ActionLogRepository::new(Arc::new(Mutex::new(conn))));
        PlacementApi::new(store, log, StowageConfig::default())
    }

    fn cube(id: &str, size: f64) -> ItemDescriptor {
        ItemDescriptor {
            item_id: id.to_string(),
            name: format!("Cube {}", id),
            dimensions: Dimensions::new(size, size, size),
            mass: 1.0,
            priority: 90,
            expiry_date: None,
            usage_limit: None,
            preferred_zone: Some("A".to_string()),
        }
    }

    #[test]
    fn test_recommend_then_confirm_stows_item() {
        let api = api();
        let response = api.recommend(cube("I1", 50.0)).unwrap();
        let best = response.recommendations[0].clone();
        assert_eq!(best.position.start_coordinates.depth, 0.0);

        api.confirm(ConfirmPlacementRequest {
            item_id: "I1".to_string(),
            container_id: best.container_id.clone(),
            position: best.position,
            user_id: Some("crew-1".to_string()),
            timestamp: None,
        })
        .unwrap();

        let item = api.store.get_item("I1").unwrap();
        assert_eq!(item.state, ItemState::Stowed);
        assert_eq!(api.action_log_repo.count().unwrap(), 1);
    }

    #[test]
    fn test_recommend_rejects_stowed_item() {
        let api = api();
        let best = api.recommend(cube("I1", 10.0)).unwrap().recommendations[0].clone();
        api.confirm(ConfirmPlacementRequest {
            item_id: "I1".to_string(),
            container_id: best.container_id,
            position: best.position,
            user_id: None,
            timestamp: None,
        })
        .unwrap();
        let err = api.recommend(cube("I1", 10.0)).unwrap_err();
        assert_eq!(err.code(), "VALIDATION_ERROR");
    }

    #[test]
    fn test_stale_recommendation_is_a_conflict() {
        let api = api();
        let first = api.recommend(cube("I1", 50.0)).unwrap().recommendations[0].clone();
        let second = api.recommend(cube("I2", 50.0)).unwrap().recommendations[0].clone();
        assert!(first.position.approx_eq(&second.position, GEOMETRY_EPSILON));

        api.confirm(ConfirmPlacementRequest {
            item_id: "I1".to_string(),
            container_id: first.container_id,
            position: first.position,
            user_id: None,
            timestamp: None,
        })
        .unwrap();
        let err = api
            .confirm(ConfirmPlacementRequest {
                item_id: "I2".to_string(),
                container_id: second.container_id,
                position: second.position,
                user_id: None,
                timestamp: None,
            })
            .unwrap_err();
        assert_eq!(err.code(), "CONFLICT_ERROR");
        assert_eq!(api.action_log_repo.count().unwrap(), 1);
    }

    #[test]
    fn test_unplanned_collision_is_an_overlap() {
        let api = api();
        api.store.add_item(cube("I1", 10.0)).unwrap();
        api.store.add_item(cube("I2", 10.0)).unwrap();
        let dims = Dimensions::new(10.0, 10.0, 10.0);
        let at = |w: f64| BoundingBox::at(Coordinates::new(w, 0.0, 0.0), &dims);
        api.confirm(ConfirmPlacementRequest {
            item_id: "I1".to_string(),
            container_id: "C".to_string(),
            position: at(0.0),
            user_id: None,
            timestamp: None,
        })
        .unwrap();
        let err = api
            .confirm(ConfirmPlacementRequest {
                item_id: "I2".to_string(),
                container_id: "C".to_string(),
                position: at(5.0),
                user_id: None,
                timestamp: None,
            })
            .unwrap_err();
        assert_eq!(err.code(), "OVERLAP_ERROR");
    }
}
