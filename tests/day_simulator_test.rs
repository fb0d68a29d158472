// ==========================================
// Day simulation integration tests
// ==========================================
// Multiple runs against a shared state: crossings are reported once,
// uses never go negative, only Stowed items are consumed.
// ==========================================


#[cfg(test)]
mod day_simulator_test {
    use space_stowage::api::dto::{ItemUsageRef, RetrieveRequest, SimulateRequest};
    use space_stowage::app::AppState;
    use space_stowage::domain::{ActionType, ItemState, LogFilter, WasteReason};

    use crate::test_helpers::{container, cube_at, new_state, stow_directly, ymd, DescriptorBuilder};

    fn setup() -> AppState {
        let state = new_state(ymd(2024, 12, 30));
        state.store.add_container(container("C", "Galley", 50.0, 50.0, 50.0)).unwrap();
        stow_directly(
            &state.store,
            DescriptorBuilder::new("I3").name("Yogurt").expires(ymd(2025, 1, 1)).build(),
            "C",
            cube_at(0.0, 0.0, 0.0, 10.0),
        );
        stow_directly(
            &state.store,
            DescriptorBuilder::new("I4").name("Wipes").uses(1).build(),
            "C",
            cube_at(10.0, 0.0, 0.0, 10.0),
        );
        stow_directly(
            &state.store,
            DescriptorBuilder::new("I5").name("Filter").uses(3).build(),
            "C",
            cube_at(20.0, 0.0, 0.0, 10.0),
        );
        state
    }

    fn days(n: i64) -> SimulateRequest {
        SimulateRequest {
            num_of_days: Some(n),
            ..SimulateRequest::default()
        }
    }

    #[test]
    fn test_expiry_is_reported_exactly_once_across_runs() {
        let state = setup();
        let first = state.simulation_api.simulate(days(1)).unwrap();
        assert_eq!(first.new_date, ymd(2024, 12, 31));
        assert!(first.changes.items_expired.is_empty());

        let second = state.simulation_api.simulate(days(1)).unwrap();
        assert_eq!(second.new_date, ymd(2025, 1, 1));
        let expired: Vec<&str> = second
            .changes
            .items_expired
            .iter()
            .map(|i| i.item_id.as_str())
            .collect();
        assert_eq!(expired, vec!["I3"]);

        let third = state.simulation_api.simulate(days(5)).unwrap();
        assert!(third.changes.items_expired.is_empty());

        let item = state.store.get_item("I3").unwrap();
        assert_eq!(item.state, ItemState::Waste);
        // Waste keeps its place until disposal.
        assert_eq!(item.container_id(), Some("C"));
    }

    #[test]
    fn test_last_use_moves_item_to_waste() {
        let state = setup();
        let response = state
            .simulation_api
            .simulate(SimulateRequest {
                num_of_days: Some(1),
                items_to_be_used_per_day: vec![ItemUsageRef {
                    item_id: None,
                    name: Some("Wipes".to_string()),
                }],
                ..SimulateRequest::default()
            })
            .unwrap();
        assert_eq!(response.changes.items_used.len(), 1);
        assert_eq!(response.changes.items_used[0].remaining_uses, Some(0));
        assert_eq!(response.changes.items_out_of_uses[0].item_id, "I4");

        let waste = state.waste_api.identify().unwrap().waste_items;
        let i4 = waste.iter().find(|w| w.item_id == "I4").unwrap();
        assert_eq!(i4.reason, WasteReason::Depleted);
    }

    #[test]
    fn test_uses_never_negative_over_many_runs() {
        let state = setup();
        for _ in 0..4 {
            state
                .simulation_api
                .simulate(SimulateRequest {
                    num_of_days: Some(2),
                    items_used: vec!["I5".to_string(), "I5".to_string()],
                    ..SimulateRequest::default()
                })
                .unwrap();
        }
        let item = state.store.get_item("I5").unwrap();
        assert_eq!(item.uses_remaining, Some(0));
        assert_eq!(item.state, ItemState::Waste);
        assert_eq!(
            state
                .action_log_repo
                .count_by_action_type(ActionType::Simulation)
                .unwrap(),
            4
        );
    }

    #[test]
    fn test_retrieved_items_are_not_consumed() {
        let state = setup();
        state
            .retrieval_api
            .retrieve(RetrieveRequest {
                item_id: "I5".to_string(),
                user_id: Some("astro".to_string()),
                timestamp: None,
            })
            .unwrap();
        let response = state
            .simulation_api
            .simulate(SimulateRequest {
                num_of_days: Some(1),
                items_used: vec!["I5".to_string()],
                ..SimulateRequest::default()
            })
            .unwrap();
        assert!(response.changes.items_used.is_empty());
        assert_eq!(state.store.get_item("I5").unwrap().uses_remaining, Some(3));
    }

    #[test]
    fn test_to_date_in_the_past_leaves_state_untouched() {
        let state = setup();
        let err = state
            .simulation_api
            .simulate(SimulateRequest {
                to_date: Some(ymd(2024, 12, 1)),
                ..SimulateRequest::default()
            })
            .unwrap_err();
        assert_eq!(err.code(), "INVALID_RANGE_ERROR");
        assert_eq!(
            state.simulation_api.current_date().unwrap().current_date,
            ymd(2024, 12, 30)
        );
        let logs = state.log_api.query(LogFilter::default()).unwrap();
        assert!(logs.is_empty());
    }

    #[test]
    fn test_day_count_past_calendar_end_is_rejected() {
        let state = setup();
        let err = state.simulation_api.simulate(days(100_000_000)).unwrap_err();
        assert_eq!(err.code(), "INVALID_RANGE_ERROR");
        let err = state.simulation_api.simulate(days(i64::MAX)).unwrap_err();
        assert_eq!(err.code(), "INVALID_RANGE_ERROR");

        // The service keeps working afterwards.
        assert_eq!(
            state.simulation_api.current_date().unwrap().current_date,
            ymd(2024, 12, 30)
        );
        let response = state.simulation_api.simulate(days(1)).unwrap();
        assert_eq!(response.new_date, ymd(2024, 12, 31));
        assert_eq!(state.log_api.query(LogFilter::default()).unwrap().len(), 1);
    }
}
