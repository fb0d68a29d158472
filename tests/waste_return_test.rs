// ==========================================
// Waste identification / return plan / undocking
// ==========================================


#[cfg(test)]
mod waste_return_test {
    use space_stowage::api::dto::{CompleteUndockingRequest, RetrieveRequest, ReturnPlanRequest};
    use space_stowage::api::ApiError;
    use space_stowage::app::AppState;
    use space_stowage::domain::{ActionType, StepAction, WasteReason};

    use crate::test_helpers::{container, cube_at, new_state, stow_directly, ymd, DescriptorBuilder};

    /// U: undocking module holding one expired item.
    /// S: storage with three waste items (mass 1, 2, 3) and one fresh item.
    fn setup() -> AppState {
        let state = new_state(ymd(2025, 3, 1));
        state.store.add_container(container("U", "Airlock", 40.0, 40.0, 40.0)).unwrap();
        state.store.add_container(container("S", "Storage", 100.0, 100.0, 100.0)).unwrap();

        let expired = ymd(2025, 3, 1);
        stow_directly(
            &state.store,
            DescriptorBuilder::new("W_IN").mass(8.0).expires(expired).build(),
            "U",
            cube_at(0.0, 0.0, 0.0, 10.0),
        );
        stow_directly(
            &state.store,
            DescriptorBuilder::new("W_A").mass(1.0).expires(expired).build(),
            "S",
            cube_at(0.0, 0.0, 0.0, 10.0),
        );
        stow_directly(
            &state.store,
            DescriptorBuilder::new("W_B").mass(2.0).uses(0).build(),
            "S",
            cube_at(20.0, 0.0, 0.0, 10.0),
        );
        stow_directly(
            &state.store,
            DescriptorBuilder::new("W_C").mass(3.0).expires(expired).build(),
            "S",
            cube_at(40.0, 0.0, 0.0, 10.0),
        );
        stow_directly(
            &state.store,
            DescriptorBuilder::new("FRESH").mass(0.5).expires(ymd(2026, 1, 1)).build(),
            "S",
            cube_at(60.0, 0.0, 0.0, 10.0),
        );
        state
    }

    fn plan_request(max_weight: f64) -> ReturnPlanRequest {
        ReturnPlanRequest {
            undocking_container_id: "U".to_string(),
            undocking_date: ymd(2025, 3, 10),
            max_weight,
        }
    }

    #[test]
    fn test_identify_lists_waste_by_id() {
        let state = setup();
        let waste = state.waste_api.identify().unwrap().waste_items;
        let ids: Vec<&str> = waste.iter().map(|w| w.item_id.as_str()).collect();
        assert_eq!(ids, vec!["W_A", "W_B", "W_C", "W_IN"]);
        let w_b = waste.iter().find(|w| w.item_id == "W_B").unwrap();
        assert_eq!(w_b.reason, WasteReason::Depleted);
        assert_eq!(w_b.container_id.as_deref(), Some("S"));
    }

    #[test]
    fn test_identify_is_idempotent() {
        let state = setup();
        let first = state.waste_api.identify().unwrap().waste_items;
        let second = state.waste_api.identify().unwrap().waste_items;
        assert_eq!(first, second);
        // A preview never reclassifies.
        assert_eq!(
            state.store.get_item("W_A").unwrap().state,
            space_stowage::domain::ItemState::Stowed
        );
    }

    #[test]
    fn test_manifest_mass_respects_every_cap() {
        let state = setup();
        for (cap, expected) in [(8.0, 1), (9.0, 2), (11.0, 3), (100.0, 4)] {
            let plan = state.waste_api.return_plan(plan_request(cap)).unwrap();
            let manifest = &plan.return_manifest;
            assert!(manifest.total_mass <= cap, "cap {} exceeded", cap);
            assert_eq!(manifest.return_items.len(), expected, "cap {}", cap);
            // Waste already in the undocking module always comes first.
            assert_eq!(manifest.return_items[0].item_id, "W_IN");
            assert!(!manifest.contains("FRESH"));
        }
    }

    #[test]
    fn test_only_foreign_items_get_move_steps() {
        let state = setup();
        let plan = state.waste_api.return_plan(plan_request(100.0)).unwrap();
        let moved: Vec<&str> = plan.return_plan.iter().map(|s| s.item_id.as_str()).collect();
        assert_eq!(moved, vec!["W_A", "W_B", "W_C"]);
        assert!(plan.return_plan.iter().all(|s| s.action == StepAction::Move));
        assert!(plan
            .return_plan
            .iter()
            .all(|s| s.to_container.as_deref() == Some("U")));
    }

    #[test]
    fn test_cap_below_lightest_item_is_capacity_error() {
        let state = setup();
        let err = state.waste_api.return_plan(plan_request(0.5)).unwrap_err();
        match err {
            ApiError::Capacity { item_id, max_mass, .. } => {
                assert_eq!(item_id, "W_A");
                assert_eq!(max_mass, 0.5);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_heavy_item_in_place_does_not_block_lighter_waste() {
        let state = setup();
        // W_IN (8) is over the cap; the lighter foreign items still go.
        let plan = state.waste_api.return_plan(plan_request(5.0)).unwrap();
        let ids: Vec<&str> = plan
            .return_manifest
            .return_items
            .iter()
            .map(|i| i.item_id.as_str())
            .collect();
        assert_eq!(ids, vec!["W_A", "W_B"]);
        assert_eq!(plan.return_manifest.total_mass, 3.0);
    }

    #[test]
    fn test_only_heavy_waste_in_place_with_light_waste_elsewhere() {
        let state = new_state(ymd(2025, 3, 1));
        state.store.add_container(container("U", "Airlock", 40.0, 40.0, 40.0)).unwrap();
        state.store.add_container(container("S", "Storage", 100.0, 100.0, 100.0)).unwrap();
        stow_directly(
            &state.store,
            DescriptorBuilder::new("heavy").mass(50.0).uses(0).build(),
            "U",
            cube_at(0.0, 0.0, 0.0, 10.0),
        );
        stow_directly(
            &state.store,
            DescriptorBuilder::new("light").mass(1.0).uses(0).build(),
            "S",
            cube_at(0.0, 0.0, 0.0, 10.0),
        );

        let plan = state.waste_api.return_plan(plan_request(10.0)).unwrap();
        let manifest = &plan.return_manifest;
        assert_eq!(manifest.return_items.len(), 1);
        assert!(manifest.contains("light"));
        assert!(!manifest.contains("heavy"));
        assert_eq!(plan.return_plan.len(), 1);
        assert_eq!(plan.return_plan[0].item_id, "light");
    }

    #[test]
    fn test_unknown_undocking_container_is_not_found() {
        let state = setup();
        let mut request = plan_request(10.0);
        request.undocking_container_id = "NOPE".to_string();
        let err = state.waste_api.return_plan(request).unwrap_err();
        assert_eq!(err.code(), "NOT_FOUND");
    }

    #[test]
    fn test_complete_undocking_disposes_manifest_items() {
        let state = setup();
        state.waste_api.return_plan(plan_request(11.0)).unwrap();
        let result = state
            .waste_api
            .complete_undocking(CompleteUndockingRequest {
                undocking_container_id: "U".to_string(),
                user_id: Some("crew-1".to_string()),
                timestamp: None,
            })
            .unwrap();
        assert_eq!(result.items_removed, 3);

        for id in ["W_IN", "W_A", "W_B"] {
            assert!(state.store.get_item(id).is_err(), "{} still present", id);
        }
        assert!(state.store.get_item("W_C").is_ok());
        assert!(state.store.get_item("FRESH").is_ok());
        assert_eq!(
            state
                .action_log_repo
                .count_by_action_type(ActionType::Disposal)
                .unwrap(),
            3
        );
        let arrangement = state.inventory_api.arrangement("U").unwrap();
        assert!(arrangement.is_empty());

        // The plan is consumed.
        let again = state
            .waste_api
            .complete_undocking(CompleteUndockingRequest {
                undocking_container_id: "U".to_string(),
                user_id: None,
                timestamp: None,
            })
            .unwrap_err();
        assert_eq!(again.code(), "NOT_FOUND");
    }

    #[test]
    fn test_moved_manifest_item_aborts_undocking() {
        let state = setup();
        state.waste_api.return_plan(plan_request(100.0)).unwrap();
        state
            .retrieval_api
            .retrieve(RetrieveRequest {
                item_id: "W_B".to_string(),
                user_id: None,
                timestamp: None,
            })
            .unwrap();

        let err = state
            .waste_api
            .complete_undocking(CompleteUndockingRequest {
                undocking_container_id: "U".to_string(),
                user_id: None,
                timestamp: None,
            })
            .unwrap_err();
        assert_eq!(err.code(), "CONFLICT_ERROR");
        for id in ["W_IN", "W_A", "W_B", "W_C"] {
            assert!(state.store.get_item(id).is_ok(), "{} was disposed", id);
        }
        assert_eq!(
            state
                .action_log_repo
                .count_by_action_type(ActionType::Disposal)
                .unwrap(),
            0
        );
    }
}
