// ==========================================
// Space Stowage - Engine configuration
// ==========================================
// Every constant that shapes a ranked result lives here so the
// recommendation order is reproducible across deployments.
// ==========================================

use serde::{Deserialize, Serialize};

use crate::domain::geometry::GEOMETRY_EPSILON;

/// Placement scoring weights.
///
/// `score = w1 * utilization + w2 * accessibility - w3 * depth_penalty + w4 * zone_match`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoringWeights {
    /// w1: item volume / volume of the free box it lands in.
    pub utilization: f64,
    /// w2: (priority / 100) * (1 - start_depth / container_depth).
    pub accessibility: f64,
    /// w3: end_depth / container_depth.
    pub depth_penalty: f64,
    /// w4: 1 when the container zone equals the preferred zone.
    pub zone_match: f64,
}

impl ScoringWeights {
    pub const DEFAULT_UTILIZATION: f64 = 40.0;
    pub const DEFAULT_ACCESSIBILITY: f64 = 30.0;
    pub const DEFAULT_DEPTH_PENALTY: f64 = 10.0;
    pub const DEFAULT_ZONE_MATCH: f64 = 50.0;
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            utilization: Self::DEFAULT_UTILIZATION,
            accessibility: Self::DEFAULT_ACCESSIBILITY,
            depth_penalty: Self::DEFAULT_DEPTH_PENALTY,
            zone_match: Self::DEFAULT_ZONE_MATCH,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StowageConfig {
    pub weights: ScoringWeights,
    /// Upper bound on stowed items examined as relocation candidates per request.
    pub rearrangement_max_candidates: usize,
    /// Length of the ranked recommendation list.
    pub max_recommendations: usize,
    /// Retrieval plans put blockers back unless the caller opts out.
    pub non_destructive_retrieval: bool,
    pub geometry_epsilon: f64,
}

impl StowageConfig {
    pub const DEFAULT_REARRANGEMENT_MAX_CANDIDATES: usize = 24;
    pub const DEFAULT_MAX_RECOMMENDATIONS: usize = 5;
}

impl Default for StowageConfig {
    fn default() -> Self {
        Self {
            weights: ScoringWeights::default(),
            rearrangement_max_candidates: Self::DEFAULT_REARRANGEMENT_MAX_CANDIDATES,
            max_recommendations: Self::DEFAULT_MAX_RECOMMENDATIONS,
            non_destructive_retrieval: true,
            geometry_epsilon: GEOMETRY_EPSILON,
        }
    }
}
