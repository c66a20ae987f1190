// ==========================================
// 容量校验与审计记录集成测试
// ==========================================
// 职责: 从存储入口验证容量、编号连续性、跨仓库、移除记录等场景
// ==========================================


#[cfg(test)]
mod capacity_audit_test {
    use crate::test_helpers::{create_test_store, seed_hierarchy};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use warehouse_capacity::{HistoryAction, SessionView, ValidationError};

    // ==========================================
    // 容量
    // ==========================================

    #[test]
    fn test_second_placement_overflows_by_500() {
        let (_tmp, _path, store) = create_test_store().unwrap();
        let fx = seed_hierarchy(&store, "W1", 1);
        let picket = fx.pickets[0];

        let mut session = store.begin().unwrap();
        session.add_placement(picket, fx.cargo, dec!(3000)).unwrap();
        session.commit().unwrap();

        session.add_placement(picket, fx.cargo, dec!(2500)).unwrap();
        let err = session.commit().unwrap_err();
        match err.validation() {
            Some(ValidationError::OverCapacity {
                capacity,
                attempted,
                overflow,
                ..
            }) => {
                assert_eq!(*capacity, dec!(5000));
                assert_eq!(*attempted, dec!(5500));
                assert_eq!(format!("{:.3}", overflow), "500.000");
            }
            other => panic!("期望 OverCapacity, 实际: {:?}", other),
        }
        assert!(err.to_string().contains("500.000"));
        session.rollback();
        drop(session);

        let graph = store.snapshot().unwrap();
        let total: Decimal = graph
            .placements_of_picket(picket)
            .iter()
            .map(|p| p.weight)
            .sum();
        assert_eq!(total, dec!(3000));
    }

    #[test]
    fn test_round_trip_single_placement() {
        let (_tmp, _path, store) = create_test_store().unwrap();
        let fx = seed_hierarchy(&store, "W1", 1);

        let mut session = store.begin().unwrap();
        let placement = session
            .add_placement(fx.pickets[0], fx.cargo, dec!(4999.999))
            .unwrap();
        session.commit().unwrap();
        assert_eq!(session.picket_weight(fx.pickets[0]), dec!(4999.999));
        drop(session);

        let history = store.history_of_placement(placement).unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].action(), Some(HistoryAction::Add));
        assert_eq!(history[0].weight_change, Some(dec!(4999.999)));
        assert_eq!(history[0].current_total_weight, Some(dec!(4999.999)));
        assert_eq!(history[0].actor, "System");
        assert_eq!(history[0].warehouse, Some(fx.warehouse));
        assert_eq!(history[0].detail, "add: coal-W1");
        assert_eq!(
            history[0].picket_info.as_deref(),
            Some("picket W1/1 (site 1)")
        );
    }

    #[test]
    fn test_weight_change_records_delta() {
        let (_tmp, _path, store) = create_test_store().unwrap();
        let fx = seed_hierarchy(&store, "W1", 2);

        let mut session = store.begin().unwrap();
        session.add_placement(fx.pickets[0], fx.cargo, dec!(1000)).unwrap();
        let placement = session
            .add_placement(fx.pickets[1], fx.cargo, dec!(2000))
            .unwrap();
        session.commit().unwrap();

        session.set_placement_weight(placement, dec!(2600)).unwrap();
        session.commit().unwrap();
        drop(session);

        let history = store.history_of_placement(placement).unwrap();
        let change = history.last().unwrap();
        assert_eq!(change.action(), Some(HistoryAction::WeightChange));
        assert_eq!(change.weight_change, Some(dec!(600)));
        assert_eq!(change.current_total_weight, Some(dec!(3600)));
    }

    #[test]
    fn test_capacity_can_be_lowered_by_config() {
        let (_tmp, _path, store) = create_test_store().unwrap();
        let store = store.with_config(
            warehouse_capacity::EngineConfig::default().with_picket_capacity(dec!(100)),
        );
        let fx = seed_hierarchy(&store, "W1", 1);

        let mut session = store.begin().unwrap();
        session.add_placement(fx.pickets[0], fx.cargo, dec!(100.5)).unwrap();
        let err = session.commit().unwrap_err();
        assert!(matches!(
            err.validation(),
            Some(ValidationError::OverCapacity { .. })
        ));
        assert_eq!(session.site_capacity(fx.site), dec!(100));
    }

    // ==========================================
    // 移除
    // ==========================================

    #[test]
    fn test_remove_1200_from_3000() {
        let (_tmp, _path, store) = create_test_store().unwrap();
        let fx = seed_hierarchy(&store, "W1", 1);
        let picket = fx.pickets[0];

        let mut session = store.begin().unwrap();
        session.add_placement(picket, fx.cargo, dec!(1800)).unwrap();
        let removed = session.add_placement(picket, fx.cargo, dec!(1200)).unwrap();
        session.commit().unwrap();
        assert_eq!(session.picket_weight(picket), dec!(3000));

        session.delete_placement(removed).unwrap();
        session.commit().unwrap();
        drop(session);

        let history = store.history_of_placement(removed).unwrap();
        assert_eq!(history.len(), 2);
        let record = &history[1];
        assert_eq!(record.action_type, "remove");
        assert_eq!(record.weight_change, Some(dec!(-1200)));
        assert_eq!(record.current_total_weight, Some(dec!(1800)));
        // 落位已删除,历史记录仍保留
        assert!(!store.snapshot().unwrap().placements.contains_key(&removed));
    }

    #[test]
    fn test_unattached_picket_is_not_audited() {
        let (_tmp, _path, store) = create_test_store().unwrap();
        let mut session = store.begin().unwrap();
        let wh = session.create_warehouse("W1").unwrap();
        let picket = session.create_picket(wh, "1", None).unwrap();
        let cargo = session.create_cargo("coal").unwrap();
        session.add_placement(picket, cargo, dec!(10)).unwrap();
        session.commit().unwrap();
        drop(session);

        assert!(store.history().unwrap().is_empty());
    }

    // ==========================================
    // 场地编号与跨仓库
    // ==========================================

    #[test]
    fn test_non_contiguous_site_detaches_all() {
        let (_tmp, _path, store) = create_test_store().unwrap();
        let mut session = store.begin().unwrap();
        let wh = session.create_warehouse("W1").unwrap();
        let site = session.create_site(wh).unwrap();
        let p1 = session.create_picket(wh, "1", Some(site)).unwrap();
        let p2 = session.create_picket(wh, "2", Some(site)).unwrap();
        let err = session.create_picket(wh, "4", Some(site)).unwrap_err();

        match err.validation() {
            Some(ValidationError::NonContiguousGrouping {
                numbers, detached, ..
            }) => {
                assert_eq!(numbers, &vec![1, 2, 4]);
                assert_eq!(*detached, 3);
            }
            other => panic!("期望 NonContiguousGrouping, 实际: {:?}", other),
        }
        let graph = session.graph();
        assert!(graph.pickets.values().all(|p| p.site.is_none()));
        assert_eq!(graph.pickets.len(), 3);
        assert!(graph.pickets_of_site(site).is_empty());
        assert_eq!(session.display_number(site), None);

        // 解绑后的状态可以提交
        session.commit().unwrap();
        drop(session);
        let graph = store.snapshot().unwrap();
        assert_eq!(graph.pickets[&p1].site, None);
        assert_eq!(graph.pickets[&p2].site, None);
    }

    #[test]
    fn test_renumber_breaks_grouping() {
        let (_tmp, _path, store) = create_test_store().unwrap();
        let fx = seed_hierarchy(&store, "W1", 3);

        let mut session = store.begin().unwrap();
        assert_eq!(session.display_number(fx.site).as_deref(), Some("1-3"));
        session.set_picket_number(fx.pickets[2], "3").unwrap();
        session.set_picket_number(fx.pickets[2], "7").unwrap_err();
        assert!(session.graph().pickets_of_site(fx.site).is_empty());
    }

    #[test]
    fn test_cross_warehouse_assignment() {
        let (_tmp, _path, store) = create_test_store().unwrap();
        let w1 = seed_hierarchy(&store, "W1", 1);
        let w2 = seed_hierarchy(&store, "W2", 1);

        let mut session = store.begin().unwrap();
        session.assign_picket_to_site(w1.pickets[0], None).unwrap();
        let err = session
            .assign_picket_to_site(w1.pickets[0], Some(w2.site))
            .unwrap_err();
        match err.validation() {
            Some(ValidationError::CrossWarehouseAssignment {
                picket,
                picket_warehouse,
                site_warehouse,
            }) => {
                assert_eq!(picket, "W1/1");
                assert_eq!(picket_warehouse, "W1");
                assert_eq!(site_warehouse, "W2");
            }
            other => panic!("期望 CrossWarehouseAssignment, 实际: {:?}", other),
        }
        assert_eq!(session.graph().pickets[&w1.pickets[0]].site, None);
    }

    #[test]
    fn test_delete_site_keeps_pickets_and_history() {
        let (_tmp, _path, store) = create_test_store().unwrap();
        let fx = seed_hierarchy(&store, "W1", 2);

        let mut session = store.begin().unwrap();
        session.add_placement(fx.pickets[0], fx.cargo, dec!(5)).unwrap();
        session.commit().unwrap();
        session.delete_site(fx.site).unwrap();
        session.commit().unwrap();
        drop(session);

        let graph = store.snapshot().unwrap();
        assert!(graph.sites.is_empty());
        assert_eq!(graph.pickets.len(), 2);
        assert!(graph.pickets.values().all(|p| p.site.is_none()));

        let actions: Vec<_> = store
            .history_of_site(fx.site)
            .unwrap()
            .iter()
            .filter_map(|r| r.action())
            .collect();
        assert_eq!(
            actions,
            vec![
                HistoryAction::SiteCreated,
                HistoryAction::Add,
                HistoryAction::SiteRemoved
            ]
        );
    }

    // ==========================================
    // 字段规则
    // ==========================================

    #[test]
    fn test_duplicate_warehouse_number_rejected() {
        let (_tmp, _path, store) = create_test_store().unwrap();
        seed_hierarchy(&store, "W1", 1);

        let mut session = store.begin().unwrap();
        session.create_warehouse("W1").unwrap();
        let err = session.commit().unwrap_err();
        assert!(matches!(
            err.validation(),
            Some(ValidationError::UniquenessViolation { .. })
        ));
    }

    #[test]
    fn test_referenced_cargo_cannot_be_deleted() {
        let (_tmp, _path, store) = create_test_store().unwrap();
        let fx = seed_hierarchy(&store, "W1", 1);

        let mut session = store.begin().unwrap();
        session.add_placement(fx.pickets[0], fx.cargo, dec!(1)).unwrap();
        let err = session.delete_cargo(fx.cargo).unwrap_err();
        assert!(matches!(
            err.validation(),
            Some(ValidationError::StillReferenced { count: 1, .. })
        ));
    }

    #[test]
    fn test_actor_is_recorded() {
        let (_tmp, _path, store) = create_test_store().unwrap();
        let store = store.with_actor(std::sync::Arc::new(warehouse_capacity::FixedActor(
            "alice".to_string(),
        )));
        let fx = seed_hierarchy(&store, "W1", 1);

        let mut session = store.begin().unwrap();
        session.add_placement(fx.pickets[0], fx.cargo, dec!(1)).unwrap();
        session.commit().unwrap();
        drop(session);

        let by_alice = store.history_by_actor("alice").unwrap();
        assert_eq!(by_alice.len(), 2); // site created + add
        assert!(store.history_by_actor("System").unwrap().is_empty());
    }
}
