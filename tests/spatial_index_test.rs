// ==========================================
// Spatial index integration tests
// ==========================================
// Non-overlap invariant under fill / release cycles.
// ==========================================


#[cfg(test)]
mod spatial_index_test {
    use space_stowage::domain::{Dimensions, GEOMETRY_EPSILON};
    use space_stowage::engine::{EngineError, SpatialIndex};

    use crate::test_helpers::{container, cube_at};

    fn assert_disjoint(index: &SpatialIndex) {
        let boxes: Vec<_> = index.reservations().collect();
        for (id, b) in &boxes {
            assert!(index.bounds().contains(b, GEOMETRY_EPSILON), "{} out of bounds", id);
        }
        for i in 0..boxes.len() {
            for j in (i + 1)..boxes.len() {
                assert!(
                    !boxes[i].1.intersects(boxes[j].1, GEOMETRY_EPSILON),
                    "{} overlaps {}",
                    boxes[i].0,
                    boxes[j].0
                );
            }
        }
    }

    fn fill_with_cubes(index: &mut SpatialIndex, size: f64) -> usize {
        let dims = Dimensions::new(size, size, size);
        let mut placed = 0;
        loop {
            let candidates = index.query(&dims, None);
            let Some(first) = candidates.first() else {
                break;
            };
            index
                .reserve(&format!("I{:03}", placed), first.position)
                .unwrap();
            placed += 1;
        }
        placed
    }

    #[test]
    fn test_uniform_cubes_fill_container_completely() {
        let mut index = SpatialIndex::new(&container("C", "A", 100.0, 100.0, 100.0), GEOMETRY_EPSILON);
        let placed = fill_with_cubes(&mut index, 25.0);
        assert_eq!(placed, 64);
        assert!((index.utilization() - 1.0).abs() < 1e-9);
        assert!(index.free_spaces().is_empty());
        assert_disjoint(&index);
    }

    #[test]
    fn test_released_slot_is_offered_again() {
        let mut index = SpatialIndex::new(&container("C", "A", 100.0, 100.0, 100.0), GEOMETRY_EPSILON);
        fill_with_cubes(&mut index, 25.0);

        let freed = index.release("I010").unwrap();
        let candidates = index.query(&Dimensions::new(25.0, 25.0, 25.0), None);
        assert_eq!(candidates.len(), 1);
        assert!(candidates[0].position.approx_eq(&freed, GEOMETRY_EPSILON));

        index.reserve("NEW", candidates[0].position).unwrap();
        assert_disjoint(&index);
    }

    #[test]
    fn test_candidates_are_open_face_first() {
        let mut index = SpatialIndex::new(&container("C", "A", 50.0, 50.0, 50.0), GEOMETRY_EPSILON);
        index.reserve("A", cube_at(0.0, 0.0, 0.0, 10.0)).unwrap();
        let candidates = index.query(&Dimensions::new(10.0, 10.0, 10.0), Some("A"));
        assert!(!candidates.is_empty());
        assert!(candidates.iter().all(|c| c.zone_match));
        for pair in candidates.windows(2) {
            assert!(
                pair[0].position.start_coordinates.depth <= pair[1].position.start_coordinates.depth
            );
        }
        assert_eq!(candidates[0].position.start_coordinates.depth, 0.0);
    }

    #[test]
    fn test_rejections_never_change_state() {
        let mut index = SpatialIndex::new(&container("C", "A", 50.0, 50.0, 50.0), GEOMETRY_EPSILON);
        index.reserve("A", cube_at(0.0, 0.0, 0.0, 20.0)).unwrap();
        let before = index.clone();

        assert!(matches!(
            index.reserve("B", cube_at(10.0, 10.0, 10.0, 20.0)),
            Err(EngineError::Overlap { .. })
        ));
        assert!(matches!(
            index.reserve("B", cube_at(40.0, 0.0, 0.0, 20.0)),
            Err(EngineError::OutOfBounds { .. })
        ));
        assert!(matches!(
            index.release("GHOST"),
            Err(EngineError::NotReserved { .. })
        ));
        assert_eq!(index.len(), before.len());
        assert_eq!(index.free_spaces(), before.free_spaces());

        // Sharing a face is not an overlap.
        index.reserve("B", cube_at(20.0, 0.0, 0.0, 20.0)).unwrap();
        assert_disjoint(&index);
    }
}
