// ==========================================
// Space Stowage - Retrieval planner
// ==========================================
// Blocker: same container, (width, height) footprint overlaps the target,
// start depth strictly nearer the open face than the target's.
// Steps: move blockers to staging (nearest first), remove target,
// then put blockers back in reverse order when non-destructive.
// ==========================================

use tracing::{debug, instrument};

use crate::domain::geometry::GEOMETRY_EPSILON;
use crate::domain::item::Item;
use crate::domain::plan::{RetrievalStep, StepSequence, STAGING_AREA_ID};
use crate::domain::types::StepAction;
use crate::engine::error::{EngineError, EngineResult};

pub struct RetrievalPlanner {
    eps: f64,
}

impl RetrievalPlanner {
    pub fn new(eps: f64) -> Self {
        Self { eps }
    }

    /// Items to move aside before `target` can come out, nearest to the face first.
    pub fn blockers<'i, I>(&self, target: &Item, occupants: I) -> EngineResult<Vec<&'i Item>>
    where
        I: IntoIterator<Item = &'i Item>,
    {
        let target_placement = match (&target.placement, target.is_stowed()) {
            (Some(p), true) => p,
            _ => {
                return Err(EngineError::ItemNotStowed {
                    item_id: target.item_id.clone(),
                    state: target.state.to_string(),
                })
            }
        };
        let target_box = &target_placement.position;

        let mut blocking: Vec<&Item> = occupants
            .into_iter()
            .filter(|other| other.item_id != target.item_id && other.is_stowed())
            .filter(|other| other.container_id() == Some(target_placement.container_id.as_str()))
            .filter(|other| {
                other.position().map_or(false, |b| {
                    b.overlaps_face_projection(target_box, self.eps)
                        && b.start_coordinates.depth < target_box.start_coordinates.depth - self.eps
                })
            })
            .collect();

        blocking.sort_by(|a, b| {
            let da = a.position().map_or(0.0, |p| p.start_coordinates.depth);
            let db = b.position().map_or(0.0, |p| p.start_coordinates.depth);
            da.total_cmp(&db).then_with(|| a.item_id.cmp(&b.item_id))
        });
        Ok(blocking)
    }

    #[instrument(skip(self, target, occupants), fields(item_id = %target.item_id))]
    pub fn plan<'i, I>(
        &self,
        target: &Item,
        occupants: I,
        non_destructive: bool,
    ) -> EngineResult<Vec<RetrievalStep>>
    where
        I: IntoIterator<Item = &'i Item>,
    {
        let blocking = self.blockers(target, occupants)?;
        let mut steps = StepSequence::new();

        for blocker in &blocking {
            steps.push(
                StepAction::Move,
                &blocker.item_id,
                &blocker.name,
                blocker.container_id(),
                blocker.position().copied(),
                Some(STAGING_AREA_ID),
                None,
            );
        }

        steps.push(
            StepAction::Remove,
            &target.item_id,
            &target.name,
            target.container_id(),
            target.position().copied(),
            None,
            None,
        );

        if non_destructive {
            for blocker in blocking.iter().rev() {
                steps.push(
                    StepAction::Place,
                    &blocker.item_id,
                    &blocker.name,
                    Some(STAGING_AREA_ID),
                    None,
                    blocker.container_id(),
                    blocker.position().copied(),
                );
            }
        }

        debug!(
            item_id = %target.item_id,
            blockers = blocking.len(),
            steps = steps.len(),
            "retrieval plan built"
        );
        Ok(steps.into_steps())
    }
}

impl Default for RetrievalPlanner {
    fn default() -> Self {
        Self::new(GEOMETRY_EPSILON)
    }
}
