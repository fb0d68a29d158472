// ==========================================
// Space Stowage - Return plan builder
// ==========================================
// Greedy count-maximizing selection under a mass cap:
//   waste already in the undocking container first (kept in place),
//   then the rest by mass ascending (volume, id as tie-breaks).
// Candidates that break the mass cap or cannot be packed into the
// undocking container are skipped.
// Packing reuses placement scoring without the zone term.
// ==========================================

use std::collections::BTreeMap;

use chrono::NaiveDate;
use tracing::{info, instrument, warn};

use crate::config::stowage_config::StowageConfig;
use crate::domain::item::Item;
use crate::domain::plan::StepSequence;
use crate::domain::types::StepAction;
use crate::domain::waste::{ManifestItem, ReturnManifest, ReturnPlan, WasteItem};
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::placement::{rank_scored, ContainerView, ScoredCandidate};
use crate::engine::retrieval::RetrievalPlanner;
use crate::engine::scoring::PlacementScorer;
use crate::engine::spatial_index::SpatialIndex;

pub struct ReturnPlanBuilder {
    config: StowageConfig,
    scorer: PlacementScorer,
    retrieval: RetrievalPlanner,
}

impl ReturnPlanBuilder {
    pub fn new(config: StowageConfig) -> Self {
        Self {
            scorer: PlacementScorer::new(config.weights),
            retrieval: RetrievalPlanner::new(config.geometry_epsilon),
            config,
        }
    }

    /// Best packing position inside `index`, zone term excluded.
    fn pack_position(
        &self,
        item: &Item,
        undocking: &ContainerView<'_>,
        index: &SpatialIndex,
    ) -> Option<ScoredCandidate> {
        index
            .query(&item.dimensions, None)
            .into_iter()
            .map(|candidate| {
                let score = self.scorer.score(
                    &candidate,
                    &item.dimensions,
                    item.priority,
                    undocking.container.dimensions.depth,
                );
                ScoredCandidate {
                    candidate,
                    zone: undocking.container.zone.clone(),
                    score,
                }
            })
            .min_by(rank_scored)
    }

    #[instrument(skip(self, undocking, waste, items), fields(
        undocking_container_id = %undocking.container_id(),
        waste_count = waste.len()
    ))]
    pub fn build(
        &self,
        undocking: ContainerView<'_>,
        undocking_date: NaiveDate,
        max_mass: f64,
        waste: &[WasteItem],
        items: &BTreeMap<String, Item>,
    ) -> EngineResult<ReturnPlan> {
        if !max_mass.is_finite() || max_mass < 0.0 {
            return Err(EngineError::Validation(format!(
                "maxWeight must be a non-negative number, got {}",
                max_mass
            )));
        }
        let undocking_id = undocking.container_id();

        let mut candidates: Vec<(&WasteItem, &Item)> = waste
            .iter()
            .filter_map(|w| items.get(&w.item_id).map(|item| (w, item)))
            .collect();
        if candidates.is_empty() {
            return Ok(ReturnPlan {
                return_plan: Vec::new(),
                retrieval_steps: Vec::new(),
                return_manifest: ReturnManifest::empty(undocking_id, undocking_date),
            });
        }

        candidates.sort_by(|(_, a), (_, b)| {
            let a_in_place = a.container_id() == Some(undocking_id);
            let b_in_place = b.container_id() == Some(undocking_id);
            b_in_place
                .cmp(&a_in_place)
                .then_with(|| a.mass.total_cmp(&b.mass))
                .then_with(|| a.volume().total_cmp(&b.volume()))
                .then_with(|| a.item_id.cmp(&b.item_id))
        });

        let mut scratch = undocking.index.clone();
        let mut total_mass = 0.0;
        let mut manifest_items = Vec::new();
        let mut relocation = StepSequence::new();
        let mut moved: Vec<&Item> = Vec::new();

        for (waste_item, item) in &candidates {
            if total_mass + item.mass > max_mass {
                continue;
            }
            if item.container_id() != Some(undocking_id) {
                let Some(target) = self.pack_position(item, &undocking, &scratch) else {
                    continue;
                };
                if scratch
                    .reserve(&item.item_id, target.candidate.position)
                    .is_err()
                {
                    continue;
                }
                relocation.push(
                    StepAction::Move,
                    &item.item_id,
                    &item.name,
                    item.container_id(),
                    item.position().copied(),
                    Some(undocking_id),
                    Some(target.candidate.position),
                );
                moved.push(*item);
            }
            total_mass += item.mass;
            manifest_items.push(ManifestItem {
                item_id: item.item_id.clone(),
                name: item.name.clone(),
                reason: waste_item.reason,
                volume: item.volume(),
                mass: item.mass,
            });
        }

        if manifest_items.is_empty() {
            let lightest = candidates
                .iter()
                .map(|(_, item)| *item)
                .min_by(|a, b| {
                    a.mass
                        .total_cmp(&b.mass)
                        .then_with(|| a.volume().total_cmp(&b.volume()))
                })
                .unwrap_or(candidates[0].1);
            warn!(
                undocking_container_id = %undocking_id,
                item_id = %lightest.item_id,
                mass = lightest.mass,
                max_mass,
                "no waste item fits the return constraints"
            );
            return Err(EngineError::Capacity {
                container_id: undocking_id.to_string(),
                item_id: lightest.item_id.clone(),
                mass: lightest.mass,
                volume: lightest.volume(),
                max_mass,
            });
        }

        // Extraction of every relocated item from where it sits now.
        let mut retrieval = StepSequence::new();
        for item in &moved {
            if item.placement.is_none() {
                continue;
            }
            let steps = self.retrieval.plan(
                item,
                items.values(),
                self.config.non_destructive_retrieval,
            )?;
            for s in steps {
                retrieval.push(
                    s.action,
                    &s.item_id,
                    &s.item_name,
                    s.from_container.as_deref(),
                    s.from_position,
                    s.to_container.as_deref(),
                    s.to_position,
                );
            }
        }

        let manifest = ReturnManifest::new(undocking_id, undocking_date, manifest_items);
        info!(
            undocking_container_id = %undocking_id,
            selected = manifest.return_items.len(),
            candidates = candidates.len(),
            total_mass = manifest.total_mass,
            total_volume = manifest.total_volume,
            "return plan built"
        );
        Ok(ReturnPlan {
            return_plan: relocation.into_steps(),
            retrieval_steps: retrieval.into_steps(),
            return_manifest: manifest,
        })
    }
}

impl Default for ReturnPlanBuilder {
    fn default() -> Self {
        Self::new(StowageConfig::default())
    }
}
