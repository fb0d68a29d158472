// ==========================================
// Space Stowage - Plan value objects
// ==========================================
// Recommendations and ordered step lists produced by the planners.
// Plans are proposals: nothing changes until a confirm call commits them.
// ==========================================

use serde::{Deserialize, Serialize};

use crate::domain::geometry::BoundingBox;
use crate::domain::types::StepAction;

/// Pseudo-container used for temporary set-aside during retrieval.
pub const STAGING_AREA_ID: &str = "staging";

// ==========================================
// PlacementRecommendation
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacementRecommendation {
    pub item_id: String,
    pub container_id: String,
    pub zone: String,
    pub position: BoundingBox,
    /// Higher is better.
    pub score: f64,
}

// ==========================================
// PlanStep - shared vocabulary of retrieval / rearrangement / return steps
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanStep {
    pub step: u32,
    pub action: StepAction,
    pub item_id: String,
    pub item_name: String,
    pub from_container: Option<String>,
    pub from_position: Option<BoundingBox>,
    /// None when the item leaves or is put back in the same spot.
    pub to_container: Option<String>,
    pub to_position: Option<BoundingBox>,
}

pub type RetrievalStep = PlanStep;
pub type RearrangementStep = PlanStep;

impl PlanStep {
    pub fn to_staging(&self) -> bool {
        self.to_container.as_deref() == Some(STAGING_AREA_ID)
    }
}

/// Accumulates steps with consecutive numbering starting at 1.
#[derive(Debug, Default)]
pub struct StepSequence {
    steps: Vec<PlanStep>,
}

impl StepSequence {
    pub fn new() -> Self {
        Self::default()
    }

    #[allow(clippy::too_many_arguments)]
    pub fn push(
        &mut self,
        action: StepAction,
        item_id: &str,
        item_name: &str,
        from_container: Option<&str>,
        from_position: Option<BoundingBox>,
        to_container: Option<&str>,
        to_position: Option<BoundingBox>,
    ) {
        let step = self.steps.len() as u32 + 1;
        self.steps.push(PlanStep {
            step,
            action,
            item_id: item_id.to_string(),
            item_name: item_name.to_string(),
            from_container: from_container.map(str::to_string),
            from_position,
            to_container: to_container.map(str::to_string),
            to_position,
        });
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn into_steps(self) -> Vec<PlanStep> {
        self.steps
    }
}

// ==========================================
// PlacementPlan - answer of the placement planner
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacementPlan {
    /// Ranked best first. With a rearrangement this holds the single final placement.
    pub recommendations: Vec<PlacementRecommendation>,
    /// Relocation moves followed by the final `place` step; empty for direct placement.
    pub rearrangements: Vec<RearrangementStep>,
    /// No container in the preferred zone had room, all containers were considered.
    pub zone_fallback: bool,
}

impl PlacementPlan {
    pub fn best(&self) -> Option<&PlacementRecommendation> {
        self.recommendations.first()
    }

    pub fn needs_rearrangement(&self) -> bool {
        !self.rearrangements.is_empty()
    }
}
