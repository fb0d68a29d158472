// ==========================================
// File-backed state tests
// ==========================================
// Config overrides in config_kv shape the engine; the audit log
// survives a restart.
// ==========================================


#[cfg(test)]
mod persistence_test {
    use space_stowage::api::dto::{PlaceRequest, RetrieveRequest};
    use space_stowage::app::AppState;
    use space_stowage::config::{config_keys, ConfigManager};
    use space_stowage::domain::{ActionType, ItemState, LogFilter};

    use crate::test_helpers::{box_at, container, create_test_db, DescriptorBuilder};
    use space_stowage::domain::Dimensions;

    fn place(state: &AppState, id: &str, dims: (f64, f64, f64), at: (f64, f64, f64)) {
        state
            .inventory_api
            .add_items(vec![DescriptorBuilder::new(id).dims(dims.0, dims.1, dims.2).build()])
            .unwrap();
        state
            .retrieval_api
            .place(PlaceRequest {
                item_id: id.to_string(),
                container_id: "C".to_string(),
                position: box_at(at.0, at.1, at.2, Dimensions::new(dims.0, dims.1, dims.2)),
                user_id: Some("loader".to_string()),
                timestamp: None,
            })
            .unwrap();
    }

    #[test]
    fn test_overrides_shape_the_planner() {
        let (_tmp, db_path) = create_test_db().unwrap();
        let config = ConfigManager::new(&db_path).unwrap();
        config
            .upsert_global_config_value(config_keys::MAX_RECOMMENDATIONS, "2")
            .unwrap();
        config
            .upsert_global_config_value(config_keys::NON_DESTRUCTIVE_RETRIEVAL, "false")
            .unwrap();
        config
            .upsert_global_config_value(config_keys::WEIGHT_ZONE_MATCH, "not-a-number")
            .unwrap();

        let state = AppState::new(db_path).unwrap();
        assert_eq!(state.config.max_recommendations, 2);
        assert!(!state.config.non_destructive_retrieval);
        assert_eq!(state.config.weights.zone_match, 50.0);

        state
            .inventory_api
            .add_containers(vec![container("C", "A", 100.0, 100.0, 100.0)])
            .unwrap();
        place(&state, "BACK", (20.0, 20.0, 20.0), (0.0, 50.0, 0.0));
        place(&state, "FRONT", (20.0, 20.0, 20.0), (0.0, 0.0, 0.0));

        let plan = state
            .placement_api
            .recommend(DescriptorBuilder::new("NEW").cube(10.0).build())
            .unwrap();
        assert_eq!(plan.recommendations.len(), 2);

        // Destructive retrieval: the blocker is taken out, not put back.
        let response = state
            .retrieval_api
            .retrieve(RetrieveRequest {
                item_id: "BACK".to_string(),
                user_id: None,
                timestamp: None,
            })
            .unwrap();
        assert_eq!(response.retrieval_steps.len(), 2);
        assert_eq!(state.inventory_api.get_item("FRONT").unwrap().state, ItemState::Retrieved);
        assert!(state.inventory_api.arrangement("C").unwrap().is_empty());
        assert_eq!(
            state
                .action_log_repo
                .count_by_action_type(ActionType::Rearrangement)
                .unwrap(),
            1
        );
    }

    #[test]
    fn test_audit_log_survives_restart() {
        let (_tmp, db_path) = create_test_db().unwrap();
        {
            let state = AppState::new(db_path.clone()).unwrap();
            state
                .inventory_api
                .add_containers(vec![container("C", "A", 50.0, 50.0, 50.0)])
                .unwrap();
            place(&state, "P1", (10.0, 10.0, 10.0), (0.0, 0.0, 0.0));
            place(&state, "P2", (10.0, 10.0, 10.0), (10.0, 0.0, 0.0));
        }

        // Inventory is volatile; the log is not.
        let reopened = AppState::new(db_path).unwrap();
        assert!(reopened.inventory_api.list_items().unwrap().is_empty());
        let logs = reopened
            .log_api
            .query(LogFilter {
                user_id: Some("loader".to_string()),
                ..LogFilter::default()
            })
            .unwrap();
        let items: Vec<Option<&str>> = logs.iter().map(|e| e.item_id.as_deref()).collect();
        assert_eq!(items, vec![Some("P1"), Some("P2")]);
        assert_eq!(reopened.log_api.recent(1).unwrap()[0].item_id.as_deref(), Some("P2"));
    }
}
