// ==========================================
// Space Stowage - Placement planner
// ==========================================
// 1. Preferred-zone containers when one of them has room, else all (zone_fallback)
// 2. Candidate positions from each container's spatial index
// 3. Score, rank, keep the top max_recommendations
// 4. No candidate anywhere: bounded rearrangement search
// ==========================================
// Output is a proposal only. Nothing is reserved here.
// ==========================================

use std::cmp::Ordering;
use std::collections::BTreeMap;

use tracing::{debug, info, instrument};

use crate::config::stowage_config::StowageConfig;
use crate::domain::container::Container;
use crate::domain::item::Item;
use crate::domain::plan::{PlacementPlan, PlacementRecommendation, PlanStep, StepSequence};
use crate::domain::types::{ItemState, StepAction};
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::scoring::PlacementScorer;
use crate::engine::spatial_index::{compare_open_face_first, CandidatePosition, SpatialIndex};

/// Read-only pairing of a container with its current index.
#[derive(Debug, Clone, Copy)]
pub struct ContainerView<'a> {
    pub container: &'a Container,
    pub index: &'a SpatialIndex,
}

impl<'a> ContainerView<'a> {
    pub fn new(container: &'a Container, index: &'a SpatialIndex) -> Self {
        Self { container, index }
    }

    pub fn container_id(&self) -> &'a str {
        &self.container.container_id
    }
}

/// Candidate with its combined score.
#[derive(Debug, Clone)]
pub struct ScoredCandidate {
    pub candidate: CandidatePosition,
    pub zone: String,
    pub score: f64,
}

impl ScoredCandidate {
    pub fn into_recommendation(self, item_id: &str) -> PlacementRecommendation {
        PlacementRecommendation {
            item_id: item_id.to_string(),
            container_id: self.candidate.container_id,
            zone: self.zone,
            position: self.candidate.position,
            score: self.score,
        }
    }
}

/// Best score first, then open face first, then container id.
pub fn rank_scored(a: &ScoredCandidate, b: &ScoredCandidate) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| {
            compare_open_face_first(
                &a.candidate.position.start_coordinates,
                &b.candidate.position.start_coordinates,
            )
        })
        .then_with(|| a.candidate.container_id.cmp(&b.candidate.container_id))
}

// ==========================================
// PlacementPlanner
// ==========================================
pub struct PlacementPlanner {
    config: StowageConfig,
    scorer: PlacementScorer,
}

impl PlacementPlanner {
    pub fn new(config: StowageConfig) -> Self {
        Self {
            scorer: PlacementScorer::new(config.weights),
            config,
        }
    }

    pub fn scorer(&self) -> &PlacementScorer {
        &self.scorer
    }

    /// Scored candidates of one container, ranked best first.
    pub fn score_candidates(
        &self,
        item: &Item,
        container: &Container,
        index: &SpatialIndex,
    ) -> Vec<ScoredCandidate> {
        let mut scored: Vec<ScoredCandidate> = index
            .query(&item.dimensions, item.preferred_zone.as_deref())
            .into_iter()
            .map(|candidate| {
                let score = self.scorer.score(
                    &candidate,
                    &item.dimensions,
                    item.priority,
                    container.dimensions.depth,
                );
                ScoredCandidate {
                    candidate,
                    zone: container.zone.clone(),
                    score,
                }
            })
            .collect();
        scored.sort_by(rank_scored);
        scored
    }

    // ==========================================
    // Entry point
    // ==========================================

    /// Ranked recommendations for `item`, or a rearrangement plan when no
    /// container has room. `items` resolves ids held by the indexes.
    #[instrument(skip(self, containers, items), fields(
        item_id = %item.item_id,
        containers_count = containers.len()
    ))]
    pub fn plan(
        &self,
        item: &Item,
        containers: &[ContainerView<'_>],
        items: &BTreeMap<String, Item>,
    ) -> EngineResult<PlacementPlan> {
        if !item.dimensions.is_valid() {
            return Err(EngineError::Validation(format!(
                "item {} has non-positive dimensions {}",
                item.item_id, item.dimensions
            )));
        }

        let (eligible, zone_fallback) = self.eligible_containers(item, containers);
        if zone_fallback {
            info!(
                item_id = %item.item_id,
                preferred_zone = ?item.preferred_zone,
                "no container in preferred zone has room, considering all containers"
            );
        }

        let mut ranked: Vec<ScoredCandidate> = eligible
            .iter()
            .flat_map(|view| self.score_candidates(item, view.container, view.index))
            .collect();
        ranked.sort_by(rank_scored);
        ranked.truncate(self.config.max_recommendations.max(1));

        if !ranked.is_empty() {
            debug!(
                item_id = %item.item_id,
                recommendations = ranked.len(),
                "direct placement available"
            );
            return Ok(PlacementPlan {
                recommendations: ranked
                    .into_iter()
                    .map(|s| s.into_recommendation(&item.item_id))
                    .collect(),
                rearrangements: Vec::new(),
                zone_fallback,
            });
        }

        match self.search_rearrangement(item, containers, items) {
            Some((recommendation, steps)) => {
                info!(
                    item_id = %item.item_id,
                    container_id = %recommendation.container_id,
                    moves = steps.len().saturating_sub(1),
                    "rearrangement proposed"
                );
                Ok(PlacementPlan {
                    recommendations: vec![recommendation],
                    rearrangements: steps,
                    zone_fallback,
                })
            }
            None => Err(EngineError::NoCapacity {
                item_id: item.item_id.clone(),
                required_volume: item.volume(),
                attempted_containers: containers
                    .iter()
                    .map(|v| v.container_id().to_string())
                    .collect(),
            }),
        }
    }

    /// Zone-matching containers when any of them can fit the item.
    fn eligible_containers<'a>(
        &self,
        item: &Item,
        containers: &[ContainerView<'a>],
    ) -> (Vec<ContainerView<'a>>, bool) {
        let Some(zone) = item.preferred_zone.as_deref() else {
            return (containers.to_vec(), false);
        };
        let in_zone: Vec<ContainerView<'a>> = containers
            .iter()
            .filter(|v| v.container.zone == zone)
            .copied()
            .collect();
        if in_zone.iter().any(|v| v.index.can_fit(&item.dimensions)) {
            (in_zone, false)
        } else {
            (containers.to_vec(), true)
        }
    }

    // ==========================================
    // Rearrangement search
    // ==========================================

    /// Stowed items eligible to move, lowest priority first, capped.
    fn relocation_candidates<'i>(
        &self,
        item: &Item,
        containers: &[ContainerView<'_>],
        items: &'i BTreeMap<String, Item>,
    ) -> Vec<&'i Item> {
        let mut candidates: Vec<&Item> = containers
            .iter()
            .flat_map(|v| v.index.reservations().map(|(id, _)| id))
            .filter(|id| id.as_str() != item.item_id)
            .filter_map(|id| items.get(id))
            .filter(|other| other.state == ItemState::Stowed && other.placement.is_some())
            .collect();
        candidates.sort_by(|a, b| {
            a.priority
                .cmp(&b.priority)
                .then_with(|| a.item_id.cmp(&b.item_id))
        });
        candidates.truncate(self.config.rearrangement_max_candidates);
        candidates
    }

    fn search_rearrangement(
        &self,
        item: &Item,
        containers: &[ContainerView<'_>],
        items: &BTreeMap<String, Item>,
    ) -> Option<(PlacementRecommendation, Vec<PlanStep>)> {
        let relocatable = self.relocation_candidates(item, containers, items);
        if relocatable.is_empty() {
            return None;
        }
        let eps = self.config.geometry_epsilon;

        // Preferred zone first, then container id order.
        let mut targets: Vec<&ContainerView<'_>> = containers
            .iter()
            .filter(|v| item.dimensions.fits_within(&v.container.dimensions, eps))
            .collect();
        targets.sort_by_key(|v| !v.container.in_zone(item.preferred_zone.as_deref()));

        for target in targets {
            let local: Vec<&Item> = relocatable
                .iter()
                .copied()
                .filter(|c| c.container_id() == Some(target.container_id()))
                .collect();
            let mut freed = target.index.clone();

            for k in 0..local.len() {
                if freed.release(&local[k].item_id).is_err() {
                    break;
                }
                let prefix = &local[..=k];
                for position in self.score_candidates(item, target.container, &freed) {
                    let movers: Vec<&Item> = prefix
                        .iter()
                        .copied()
                        .filter(|m| {
                            m.position()
                                .map(|b| b.intersects(&position.candidate.position, eps))
                                .unwrap_or(false)
                        })
                        .collect();
                    if movers.is_empty() {
                        continue;
                    }
                    if let Some(steps) =
                        self.relocate_movers(item, target, &position, &movers, containers)
                    {
                        return Some((position.into_recommendation(&item.item_id), steps));
                    }
                }
            }
            debug!(
                item_id = %item.item_id,
                container_id = %target.container_id(),
                examined = local.len(),
                "no rearrangement found in container"
            );
        }
        None
    }

    /// Move every mover somewhere else with `item` already sitting at `position`.
    fn relocate_movers(
        &self,
        item: &Item,
        target: &ContainerView<'_>,
        position: &ScoredCandidate,
        movers: &[&Item],
        containers: &[ContainerView<'_>],
    ) -> Option<Vec<PlanStep>> {
        let mut scratch: BTreeMap<&str, SpatialIndex> = containers
            .iter()
            .map(|v| (v.container_id(), v.index.clone()))
            .collect();

        let target_index = scratch.get_mut(target.container_id())?;
        for mover in movers {
            target_index.release(&mover.item_id).ok()?;
        }
        target_index
            .reserve(&item.item_id, position.candidate.position)
            .ok()?;

        let mut steps = StepSequence::new();
        for mover in movers {
            let best = containers
                .iter()
                .filter_map(|v| {
                    let index = scratch.get(v.container_id())?;
                    self.score_candidates(mover, v.container, index)
                        .into_iter()
                        .next()
                })
                .min_by(rank_scored)?;

            scratch
                .get_mut(best.candidate.container_id.as_str())?
                .reserve(&mover.item_id, best.candidate.position)
                .ok()?;
            steps.push(
                StepAction::Move,
                &mover.item_id,
                &mover.name,
                mover.container_id(),
                mover.position().copied(),
                Some(&best.candidate.container_id),
                Some(best.candidate.position),
            );
        }

        steps.push(
            StepAction::Place,
            &item.item_id,
            &item.name,
            None,
            None,
            Some(target.container_id()),
            Some(position.candidate.position),
        );
        Some(steps.into_steps())
    }
}

impl Default for PlacementPlanner {
    fn default() -> Self {
        Self::new(StowageConfig::default())
    }
}
