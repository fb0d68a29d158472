// ==========================================
// Space Stowage - Placement scoring
// ==========================================
// score = w1 * utilization + w2 * accessibility
//       - w3 * depth_penalty + w4 * zone_match
// ==========================================

use crate::config::stowage_config::ScoringWeights;
use crate::domain::geometry::Dimensions;
use crate::domain::item::MAX_PRIORITY;
use crate::engine::spatial_index::CandidatePosition;

/// Per-term breakdown of a candidate score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreTerms {
    pub utilization: f64,
    pub accessibility: f64,
    pub depth_penalty: f64,
    pub zone_match: f64,
}

// ==========================================
// PlacementScorer
// ==========================================
#[derive(Debug, Clone, Copy)]
pub struct PlacementScorer {
    weights: ScoringWeights,
}

impl PlacementScorer {
    pub fn new(weights: ScoringWeights) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> &ScoringWeights {
        &self.weights
    }

    pub fn terms(
        &self,
        candidate: &CandidatePosition,
        item_dims: &Dimensions,
        priority: u8,
        container_depth: f64,
    ) -> ScoreTerms {
        let free_volume = candidate.free_space.volume();
        let utilization = if free_volume > 0.0 {
            (item_dims.volume() / free_volume).min(1.0)
        } else {
            0.0
        };

        let (start_depth, end_depth) = (
            candidate.position.start_coordinates.depth,
            candidate.position.end_coordinates.depth,
        );
        let (open_face_ratio, depth_penalty) = if container_depth > 0.0 {
            (1.0 - start_depth / container_depth, end_depth / container_depth)
        } else {
            (0.0, 0.0)
        };
        let accessibility = (f64::from(priority) / f64::from(MAX_PRIORITY)) * open_face_ratio;

        ScoreTerms {
            utilization,
            accessibility,
            depth_penalty,
            zone_match: if candidate.zone_match { 1.0 } else { 0.0 },
        }
    }

    pub fn score(
        &self,
        candidate: &CandidatePosition,
        item_dims: &Dimensions,
        priority: u8,
        container_depth: f64,
    ) -> f64 {
        self.combine(&self.terms(candidate, item_dims, priority, container_depth))
    }

    pub fn combine(&self, terms: &ScoreTerms) -> f64 {
        self.weights.utilization * terms.utilization
            + self.weights.accessibility * terms.accessibility
            - self.weights.depth_penalty * terms.depth_penalty
            + self.weights.zone_match * terms.zone_match
    }
}

impl Default for PlacementScorer {
    fn default() -> Self {
        Self::new(ScoringWeights::default())
    }
}
