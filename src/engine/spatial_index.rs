// ==========================================
// Space Stowage - Spatial index (per container)
// ==========================================
// Free volume is kept as the set of maximal empty axis-aligned boxes.
// Reserving a box splits every free box it cuts into at most six
// guillotine pieces; boxes swallowed by another free box are pruned.
// Releasing rebuilds the free set from the remaining reservations.
// ==========================================
// Invariant: reservations are pairwise disjoint and inside bounds.
// ==========================================

use std::cmp::Ordering;
use std::collections::BTreeMap;

use tracing::debug;

use crate::domain::container::Container;
use crate::domain::geometry::{BoundingBox, Coordinates, Dimensions};
use crate::engine::error::{EngineError, EngineResult};

// ==========================================
// CandidatePosition
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub struct CandidatePosition {
    pub container_id: String,
    pub position: BoundingBox,
    /// Maximal free box the candidate is anchored in.
    pub free_space: BoundingBox,
    /// Container zone equals the zone hint of the query.
    pub zone_match: bool,
}

// ==========================================
// SpatialIndex
// ==========================================
#[derive(Debug, Clone)]
pub struct SpatialIndex {
    container_id: String,
    zone: String,
    bounds: BoundingBox,
    eps: f64,
    reservations: BTreeMap<String, BoundingBox>,
    free_spaces: Vec<BoundingBox>,
}

impl SpatialIndex {
    pub fn new(container: &Container, eps: f64) -> Self {
        let bounds = container.bounds();
        Self {
            container_id: container.container_id.clone(),
            zone: container.zone.clone(),
            bounds,
            eps,
            reservations: BTreeMap::new(),
            free_spaces: vec![bounds],
        }
    }

    pub fn container_id(&self) -> &str {
        &self.container_id
    }

    pub fn zone(&self) -> &str {
        &self.zone
    }

    pub fn bounds(&self) -> &BoundingBox {
        &self.bounds
    }

    pub fn epsilon(&self) -> f64 {
        self.eps
    }

    pub fn free_spaces(&self) -> &[BoundingBox] {
        &self.free_spaces
    }

    pub fn reservations(&self) -> impl Iterator<Item = (&String, &BoundingBox)> {
        self.reservations.iter()
    }

    pub fn position_of(&self, item_id: &str) -> Option<&BoundingBox> {
        self.reservations.get(item_id)
    }

    pub fn is_reserved(&self, item_id: &str) -> bool {
        self.reservations.contains_key(item_id)
    }

    pub fn len(&self) -> usize {
        self.reservations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reservations.is_empty()
    }

    pub fn used_volume(&self) -> f64 {
        self.reservations.values().map(BoundingBox::volume).sum()
    }

    /// Share of the container volume that is reserved, in [0, 1].
    pub fn utilization(&self) -> f64 {
        let total = self.bounds.volume();
        if total <= 0.0 {
            0.0
        } else {
            self.used_volume() / total
        }
    }

    // ==========================================
    // Query
    // ==========================================

    /// Candidate positions for an item of `dims`, ordered nearest to the open
    /// face first, then by (width, depth, height) of the start corner.
    pub fn query(&self, dims: &Dimensions, zone_hint: Option<&str>) -> Vec<CandidatePosition> {
        let zone_match = zone_hint.map(|z| z == self.zone).unwrap_or(false);
        let mut candidates: Vec<CandidatePosition> = self
            .free_spaces
            .iter()
            .filter(|space| dims.fits_within(&space.dimensions(), self.eps))
            .map(|space| CandidatePosition {
                container_id: self.container_id.clone(),
                position: BoundingBox::at(space.start_coordinates, dims),
                free_space: *space,
                zone_match,
            })
            .collect();

        candidates.sort_by(|a, b| {
            compare_open_face_first(&a.position.start_coordinates, &b.position.start_coordinates)
                .then_with(|| a.free_space.volume().total_cmp(&b.free_space.volume()))
        });
        // Same anchor from several free boxes: keep the tightest one (sorted first).
        candidates.dedup_by(|later, earlier| {
            later.position.approx_eq(&earlier.position, self.eps)
        });

        debug!(
            container_id = %self.container_id,
            item_dims = %dims,
            free_spaces = self.free_spaces.len(),
            candidates = candidates.len(),
            "spatial query"
        );
        candidates
    }

    /// At least one position exists for `dims`.
    pub fn can_fit(&self, dims: &Dimensions) -> bool {
        self.free_spaces
            .iter()
            .any(|space| dims.fits_within(&space.dimensions(), self.eps))
    }

    /// Validate a box against bounds and every reservation except `ignore`.
    pub fn check_free(&self, item_id: &str, position: &BoundingBox, ignore: &[&str]) -> EngineResult<()> {
        if !position.is_well_formed() || !self.bounds.contains(position, self.eps) {
            return Err(EngineError::OutOfBounds {
                container_id: self.container_id.clone(),
                item_id: item_id.to_string(),
                requested: *position,
            });
        }
        let conflict = self
            .reservations
            .iter()
            .filter(|(id, _)| id.as_str() != item_id && !ignore.contains(&id.as_str()))
            .find(|(_, existing)| existing.intersects(position, self.eps));
        if let Some((conflicting_item_id, _)) = conflict {
            return Err(EngineError::Overlap {
                container_id: self.container_id.clone(),
                item_id: item_id.to_string(),
                conflicting_item_id: conflicting_item_id.clone(),
                requested: *position,
            });
        }
        Ok(())
    }

    // ==========================================
    // Mutation
    // ==========================================

    /// Commit an allocation.
    pub fn reserve(&mut self, item_id: &str, position: BoundingBox) -> EngineResult<()> {
        if self.reservations.contains_key(item_id) {
            return Err(EngineError::Validation(format!(
                "item {} already reserved in container {}",
                item_id, self.container_id
            )));
        }
        self.check_free(item_id, &position, &[])?;
        self.reservations.insert(item_id.to_string(), position);
        self.carve(&position);
        Ok(())
    }

    /// Free the item's box and return it.
    pub fn release(&mut self, item_id: &str) -> EngineResult<BoundingBox> {
        let released = self
            .reservations
            .remove(item_id)
            .ok_or_else(|| EngineError::NotReserved {
                container_id: self.container_id.clone(),
                item_id: item_id.to_string(),
            })?;
        self.rebuild_free_spaces();
        Ok(released)
    }

    // ==========================================
    // Free-space maintenance
    // ==========================================

    fn rebuild_free_spaces(&mut self) {
        self.free_spaces = vec![self.bounds];
        let occupied: Vec<BoundingBox> = self.reservations.values().copied().collect();
        for bx in &occupied {
            self.carve(bx);
        }
    }

    fn carve(&mut self, occupied: &BoundingBox) {
        let eps = self.eps;
        let mut next = Vec::with_capacity(self.free_spaces.len() + 6);
        for space in self.free_spaces.drain(..) {
            if space.intersects(occupied, eps) {
                next.extend(split_around(&space, occupied, eps));
            } else {
                next.push(space);
            }
        }
        self.free_spaces = prune_contained(next, eps);
    }
}

/// Pieces of `space` outside `occupied`, one per side of the cut.
fn split_around(space: &BoundingBox, occupied: &BoundingBox, eps: f64) -> Vec<BoundingBox> {
    let (s0, s1) = (space.start_coordinates, space.end_coordinates);
    let (o0, o1) = (occupied.start_coordinates, occupied.end_coordinates);
    let mut pieces = Vec::with_capacity(6);

    if o0.width > s0.width + eps {
        pieces.push(BoundingBox::new(s0, Coordinates { width: o0.width, ..s1 }));
    }
    if o1.width < s1.width - eps {
        pieces.push(BoundingBox::new(Coordinates { width: o1.width, ..s0 }, s1));
    }
    if o0.depth > s0.depth + eps {
        pieces.push(BoundingBox::new(s0, Coordinates { depth: o0.depth, ..s1 }));
    }
    if o1.depth < s1.depth - eps {
        pieces.push(BoundingBox::new(Coordinates { depth: o1.depth, ..s0 }, s1));
    }
    if o0.height > s0.height + eps {
        pieces.push(BoundingBox::new(s0, Coordinates { height: o0.height, ..s1 }));
    }
    if o1.height < s1.height - eps {
        pieces.push(BoundingBox::new(Coordinates { height: o1.height, ..s0 }, s1));
    }
    pieces
}

/// Drop boxes contained in another box; exact duplicates keep the first.
fn prune_contained(spaces: Vec<BoundingBox>, eps: f64) -> Vec<BoundingBox> {
    let mut kept: Vec<BoundingBox> = Vec::with_capacity(spaces.len());
    for (i, candidate) in spaces.iter().enumerate() {
        let swallowed = spaces.iter().enumerate().any(|(j, other)| {
            i != j
                && other.contains(candidate, eps)
                && (!candidate.contains(other, eps) || j < i)
        });
        if !swallowed {
            kept.push(*candidate);
        }
    }
    kept
}

/// Open face first (smaller start depth), then width, then height.
pub fn compare_open_face_first(a: &Coordinates, b: &Coordinates) -> Ordering {
    a.depth
        .total_cmp(&b.depth)
        .then_with(|| a.width.total_cmp(&b.width))
        .then_with(|| a.height.total_cmp(&b.height))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::geometry::GEOMETRY_EPSILON;

    fn index(size: f64) -> SpatialIndex {
        SpatialIndex::new(&Container::new("C1", "A", size, size, size), GEOMETRY_EPSILON)
    }

    fn cube_at(w: f64, d: f64, h: f64, size: f64) -> BoundingBox {
        BoundingBox::at(Coordinates::new(w, d, h), &Dimensions::new(size, size, size))
    }

    #[test]
    fn test_open_face_order_is_depth_width_height() {
        let mut coords = vec![
            Coordinates::new(0.0, 10.0, 0.0),
            Coordinates::new(5.0, 0.0, 0.0),
            Coordinates::new(0.0, 0.0, 5.0),
            Coordinates::new(0.0, 0.0, 0.0),
        ];
        coords.sort_by(compare_open_face_first);
        assert_eq!(
            coords,
            vec![
                Coordinates::new(0.0, 0.0, 0.0),
                Coordinates::new(0.0, 0.0, 5.0),
                Coordinates::new(5.0, 0.0, 0.0),
                Coordinates::new(0.0, 10.0, 0.0),
            ]
        );
    }

    #[test]
    fn test_empty_container_offers_origin() {
        let idx = index(100.0);
        let candidates = idx.query(&Dimensions::new(50.0, 50.0, 50.0), Some("A"));
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].position.start_coordinates, Coordinates::ORIGIN);
        assert!(candidates[0].zone_match);
    }

    #[test]
    fn test_reserve_splits_free_space_into_maximal_boxes() {
        let mut idx = index(100.0);
        idx.reserve("I1", cube_at(0.0, 0.0, 0.0, 50.0)).unwrap();
        // Right slab, back slab and top slab remain.
        assert_eq!(idx.free_spaces().len(), 3);
        assert!(!idx.can_fit(&Dimensions::new(60.0, 60.0, 60.0)));
        assert!(idx.can_fit(&Dimensions::new(50.0, 100.0, 100.0)));
    }

    #[test]
    fn test_candidates_prefer_open_face() {
        let mut idx = index(100.0);
        idx.reserve("I1", cube_at(0.0, 0.0, 0.0, 50.0)).unwrap();
        let candidates = idx.query(&Dimensions::new(10.0, 10.0, 10.0), None);
        let depths: Vec<f64> = candidates
            .iter()
            .map(|c| c.position.start_coordinates.depth)
            .collect();
        let mut sorted = depths.clone();
        sorted.sort_by(f64::total_cmp);
        assert_eq!(depths, sorted);
        assert_eq!(candidates[0].position.start_coordinates.depth, 0.0);
    }

    #[test]
    fn test_reserve_rejects_overlap_and_out_of_bounds() {
        let mut idx = index(100.0);
        idx.reserve("I1", cube_at(0.0, 0.0, 0.0, 50.0)).unwrap();

        let overlap = idx.reserve("I2", cube_at(25.0, 25.0, 25.0, 50.0));
        assert!(matches!(overlap, Err(EngineError::Overlap { ref conflicting_item_id, .. }) if conflicting_item_id == "I1"));

        let outside = idx.reserve("I3", cube_at(60.0, 0.0, 0.0, 50.0));
        assert!(matches!(outside, Err(EngineError::OutOfBounds { .. })));
        assert_eq!(idx.len(), 1);
    }

    #[test]
    fn test_release_restores_full_space_and_is_checked() {
        let mut idx = index(100.0);
        idx.reserve("I1", cube_at(0.0, 0.0, 0.0, 50.0)).unwrap();
        let released = idx.release("I1").unwrap();
        assert_eq!(released, cube_at(0.0, 0.0, 0.0, 50.0));
        assert_eq!(idx.free_spaces(), &[*idx.bounds()]);

        let again = idx.release("I1");
        assert!(matches!(again, Err(EngineError::NotReserved { .. })));
    }

    #[test]
    fn test_every_candidate_can_be_reserved() {
        let mut idx = index(100.0);
        idx.reserve("A", cube_at(0.0, 0.0, 0.0, 40.0)).unwrap();
        idx.reserve("B", cube_at(40.0, 0.0, 0.0, 30.0)).unwrap();
        idx.reserve("C", cube_at(0.0, 40.0, 0.0, 20.0)).unwrap();
        let dims = Dimensions::new(25.0, 25.0, 25.0);
        for candidate in idx.query(&dims, None) {
            let mut scratch = idx.clone();
            scratch.reserve("NEW", candidate.position).unwrap();
        }
    }
}
