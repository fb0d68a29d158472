// ==========================================
// Space Stowage - Retrieval API
// ==========================================
// search:   read-only, never logged.
// retrieve: take a stowed item out of its container.
// place:    put a retrieved item back (any container, explicit box).
// ==========================================

use std::sync::Arc;

use serde_json::json;
use tracing::{info, instrument};

use crate::api::dto::{
    ConfirmPlacementResponse, ItemDetail, PlaceRequest, RetrieveRequest, RetrieveResponse,
    SearchQuery, SearchResponse, SYSTEM_USER,
};
use crate::api::error::{ApiError, ApiResult};
use crate::api::placement_api::{commit_placement, PlacementCommit};
use crate::api::validator::Violations;
use crate::config::StowageConfig;
use crate::domain::action_log::{ActionType, LogEntry};
use crate::domain::item::Item;
use crate::domain::types::{ItemState, StepAction};
use crate::engine::retrieval::RetrievalPlanner;
use crate::repository::action_log_repo::ActionLogRepository;
use crate::repository::error::RepositoryError;
use crate::repository::inventory_store::InventoryStore;

pub struct RetrievalApi {
    store: Arc<InventoryStore>,
    action_log_repo: Arc<ActionLogRepository>,
    planner: RetrievalPlanner,
    non_destructive: bool,
}

impl RetrievalApi {
    pub fn new(
        store: Arc<InventoryStore>,
        action_log_repo: Arc<ActionLogRepository>,
        config: StowageConfig,
    ) -> Self {
        Self {
            store,
            action_log_repo,
            planner: RetrievalPlanner::new(config.geometry_epsilon),
            non_destructive: config.non_destructive_retrieval,
        }
    }

    /// Find an item by id or name (case-insensitive) and plan its extraction.
    ///
    /// Nothing found is `found: false`, not an error.
    pub fn search(&self, query: SearchQuery) -> ApiResult<SearchResponse> {
        let item_id = query.item_id.as_deref().map(str::trim).filter(|s| !s.is_empty());
        let item_name = query.item_name.as_deref().map(str::trim).filter(|s| !s.is_empty());

        let found = match (item_id, item_name) {
            (Some(id), _) => match self.store.get_item(id) {
                Ok(item) => Some(item),
                Err(RepositoryError::NotFound { .. }) => None,
                Err(e) => return Err(e.into()),
            },
            (None, Some(name)) => self.store.find_item_by_name(name)?,
            (None, None) => {
                return Err(ApiError::ValidationError(
                    "itemId or itemName is required".to_string(),
                ))
            }
        };
        let Some(found) = found else {
            return Ok(SearchResponse::not_found());
        };

        let response = self.store.read_session(|session| -> ApiResult<SearchResponse> {
            // Re-read: the item may have changed since the lookup.
            let Some(item) = session.items().get(&found.item_id) else {
                return Ok(SearchResponse::not_found());
            };
            let zone = item
                .container_id()
                .and_then(|c| session.view(c))
                .map(|v| v.container.zone.clone());
            let retrieval_steps = if item.is_stowed() {
                self.planner
                    .plan(item, session.items().values(), self.non_destructive)?
            } else {
                Vec::new()
            };
            Ok(SearchResponse {
                found: true,
                item: Some(ItemDetail::from_item(item, zone)),
                retrieval_steps,
            })
        })??;
        Ok(response)
    }

    /// Remove a stowed item from its container. The item becomes Retrieved
    /// (Waste items stay Waste) and its reservation is released.
    #[instrument(skip(self, request), fields(item_id = %request.item_id))]
    pub fn retrieve(&self, request: RetrieveRequest) -> ApiResult<RetrieveResponse> {
        let mut v = Violations::new();
        v.require_id("itemId", &request.item_id);
        v.into_result()?;

        let observed = self.store.get_item(&request.item_id)?;
        let Some(container_id) = observed.container_id().map(str::to_string) else {
            return Err(ApiError::ItemNotStowed(format!(
                "item {} is {}",
                observed.item_id, observed.state
            )));
        };
        if !observed.is_stowed() {
            return Err(ApiError::ItemNotStowed(format!(
                "item {} is {}",
                observed.item_id, observed.state
            )));
        }
        let user_id = request.user_id.as_deref().unwrap_or(SYSTEM_USER);

        let response = self.store.write_session(&[&container_id], |session| {
            let current = session.item(&request.item_id)?.clone();
            if current.placement != observed.placement {
                return Err(RepositoryError::conflict(format!(
                    "item {} moved since it was read",
                    request.item_id
                )));
            }
            let steps = self
                .planner
                .plan(&current, session.items().values(), self.non_destructive)?;

            let mut staged = session.stage();
            let mut entries = Vec::new();

            if !self.non_destructive {
                // Blockers set aside in staging are not put back.
                for step in steps
                    .iter()
                    .filter(|s| s.action == StepAction::Move && s.to_staging())
                {
                    let blocker_state = state_after_removal(session.item(&step.item_id)?);
                    staged.unstow(session, &step.item_id, blocker_state)?;
                    entries.push(
                        LogEntry::new(ActionType::Rearrangement, user_id)
                            .at(request.timestamp)
                            .with_item(&step.item_id)
                            .with_container(&container_id)
                            .with_details(&json!({
                                "toContainer": step.to_container,
                                "fromPosition": step.from_position,
                                "forItemId": request.item_id,
                            })),
                    );
                }
            }

            staged.unstow(session, &request.item_id, state_after_removal(&current))?;
            entries.push(
                LogEntry::new(ActionType::Retrieval, user_id)
                    .at(request.timestamp)
                    .with_item(&request.item_id)
                    .with_container(&container_id)
                    .with_details(&json!({
                        "fromPosition": current.position(),
                        "retrievalSteps": steps.len(),
                        "nonDestructive": self.non_destructive,
                    })),
            );

            self.action_log_repo.batch_insert(&mut entries)?;
            session.apply(staged);
            Ok(RetrieveResponse {
                item_id: request.item_id.clone(),
                from_container: container_id.clone(),
                retrieval_steps: steps,
            })
        })?;

        info!(
            item_id = %response.item_id,
            container_id = %response.from_container,
            steps = response.retrieval_steps.len(),
            "item retrieved"
        );
        Ok(response)
    }

    /// Put an item back at an explicit box.
    #[instrument(skip(self, request), fields(item_id = %request.item_id, container_id = %request.container_id))]
    pub fn place(&self, request: PlaceRequest) -> ApiResult<ConfirmPlacementResponse> {
        let mut v = Violations::new();
        v.require_id("itemId", &request.item_id);
        v.require_id("containerId", &request.container_id);
        v.into_result()?;

        let moved_items = commit_placement(
            &self.store,
            &self.action_log_repo,
            PlacementCommit {
                item_id: &request.item_id,
                container_id: &request.container_id,
                position: request.position,
                user_id: request.user_id.as_deref().unwrap_or(SYSTEM_USER),
                timestamp: request.timestamp,
                moves: &[],
                planned: false,
            },
        )?;

        Ok(ConfirmPlacementResponse {
            item_id: request.item_id,
            container_id: request.container_id,
            position: request.position,
            moved_items,
        })
    }
}

fn state_after_removal(item: &Item) -> ItemState {
    if item.state == ItemState::Waste {
        ItemState::Waste
    } else {
        ItemState::Retrieved
    }
}
