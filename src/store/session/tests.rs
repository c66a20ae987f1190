use crate::domain::history::HistoryAction;
use crate::engine::error::ValidationError;
use crate::engine::view::SessionView;
use crate::store::{Store, StoreError};
use rust_decimal_macros::dec;

fn store() -> Store {
    Store::open_in_memory().unwrap()
}

#[test]
fn test_commit_publishes_and_persists() {
    let store = store();
    let mut session = store.begin().unwrap();
    let wh = session.create_warehouse("W1").unwrap();
    let site = session.create_site(wh).unwrap();
    let picket = session.create_picket(wh, "1", Some(site)).unwrap();
    let cargo = session.create_cargo("coal").unwrap();
    let placement = session.add_placement(picket, cargo, dec!(3000)).unwrap();
    session.commit().unwrap();
    drop(session);

    let graph = store.snapshot().unwrap();
    assert_eq!(graph.placements[&placement].weight, dec!(3000));
    assert!(graph.history.is_empty());

    let history = store.history_of_site(site).unwrap();
    let actions: Vec<_> = history.iter().filter_map(|r| r.action()).collect();
    assert_eq!(actions, vec![HistoryAction::SiteCreated, HistoryAction::Add]);
}

#[test]
fn test_over_capacity_rejects_whole_commit() {
    let store = store();
    let mut session = store.begin().unwrap();
    let wh = session.create_warehouse("W1").unwrap();
    let site = session.create_site(wh).unwrap();
    let picket = session.create_picket(wh, "1", Some(site)).unwrap();
    let cargo = session.create_cargo("coal").unwrap();
    session.add_placement(picket, cargo, dec!(3000)).unwrap();
    session.commit().unwrap();

    let extra = session.add_placement(picket, cargo, dec!(2500)).unwrap();
    let err = session.commit().unwrap_err();
    match err.validation() {
        Some(ValidationError::OverCapacity { overflow, .. }) => assert_eq!(*overflow, dec!(500)),
        other => panic!("unexpected: {:?}", other),
    }
    // 失败的提交不写历史,工作副本保留待处理的落位
    assert!(session.pending_history().is_empty());
    assert!(session.graph().placements.contains_key(&extra));

    session.rollback();
    assert_eq!(session.picket_weight(picket), dec!(3000));
    drop(session);
    // site created + add
    assert_eq!(store.history().unwrap().len(), 2);
}

#[test]
fn test_nested_layers_audit_once() {
    let store = store();
    let mut session = store.begin().unwrap();
    let wh = session.create_warehouse("W1").unwrap();
    let site = session.create_site(wh).unwrap();
    let picket = session.create_picket(wh, "1", Some(site)).unwrap();
    let cargo = session.create_cargo("coal").unwrap();
    session.commit().unwrap();
    let before = store.engine_stats();

    session.begin_nested();
    session.begin_nested();
    session.begin_nested();
    assert_eq!(session.context().depth(), 3);
    let placement = session.add_placement(picket, cargo, dec!(1000)).unwrap();
    session.commit().unwrap();
    session.commit().unwrap();
    session.commit().unwrap();
    assert!(session.pending_history().is_empty());
    session.commit().unwrap();
    drop(session);

    let stats = store.engine_stats();
    assert_eq!(stats.save_invocations - before.save_invocations, 4);
    assert_eq!(stats.suppressed_invocations - before.suppressed_invocations, 3);
    assert_eq!(stats.capacity_checks - before.capacity_checks, 1);
    assert_eq!(store.history_of_placement(placement).unwrap().len(), 1);
}

#[test]
fn test_nested_rollback_discards_layer_only() {
    let store = store();
    let mut session = store.begin().unwrap();
    let wh = session.create_warehouse("W1").unwrap();

    session.begin_nested();
    session.create_cargo("coal").unwrap();
    session.rollback();

    assert_eq!(session.depth(), 0);
    assert!(session.graph().cargos.is_empty());
    assert!(session.graph().warehouses.contains_key(&wh));
}

#[test]
fn test_cross_warehouse_create_leaves_nothing() {
    let store = store();
    let mut session = store.begin().unwrap();
    let w1 = session.create_warehouse("W1").unwrap();
    let w2 = session.create_warehouse("W2").unwrap();
    let s2 = session.create_site(w2).unwrap();

    let err = session.create_picket(w1, "1", Some(s2)).unwrap_err();
    assert!(matches!(
        err.validation(),
        Some(ValidationError::CrossWarehouseAssignment { .. })
    ));
    assert!(session.graph().pickets.is_empty());
}

#[test]
fn test_reassign_revalidates_previous_site() {
    let store = store();
    let mut session = store.begin().unwrap();
    let wh = session.create_warehouse("W1").unwrap();
    let a = session.create_site(wh).unwrap();
    let b = session.create_site(wh).unwrap();
    session.create_picket(wh, "1", Some(a)).unwrap();
    let middle = session.create_picket(wh, "2", Some(a)).unwrap();
    session.create_picket(wh, "3", Some(a)).unwrap();
    assert_eq!(session.display_number(a).as_deref(), Some("1-3"));

    // 2 号移走后 A 剩 1、3,不连续: A 的桩位全部解绑
    let err = session.assign_picket_to_site(middle, Some(b)).unwrap_err();
    assert!(matches!(
        err.validation(),
        Some(ValidationError::NonContiguousGrouping { detached: 2, .. })
    ));
    assert!(session.graph().pickets_of_site(a).is_empty());
    assert_eq!(session.display_number(b).as_deref(), Some("2"));
}

#[test]
fn test_delete_picket_removes_placements() {
    let store = store();
    let mut session = store.begin().unwrap();
    let wh = session.create_warehouse("W1").unwrap();
    let site = session.create_site(wh).unwrap();
    let picket = session.create_picket(wh, "1", Some(site)).unwrap();
    let cargo = session.create_cargo("coal").unwrap();
    let placement = session.add_placement(picket, cargo, dec!(700)).unwrap();
    session.commit().unwrap();

    session.delete_picket(picket).unwrap();
    session.commit().unwrap();
    drop(session);

    let graph = store.snapshot().unwrap();
    assert!(graph.pickets.is_empty());
    assert!(graph.placements.is_empty());
    let removal = store.history_of_placement(placement).unwrap();
    assert_eq!(removal.last().and_then(|r| r.action()), Some(HistoryAction::Remove));
    assert_eq!(removal.last().and_then(|r| r.weight_change), Some(dec!(-700)));
}

#[test]
fn test_persisted_site_warehouse_is_immutable() {
    let store = store();
    let mut session = store.begin().unwrap();
    let w1 = session.create_warehouse("W1").unwrap();
    let w2 = session.create_warehouse("W2").unwrap();
    let site = session.create_site(w1).unwrap();

    // 新建场地在提交前可以改挂
    session.set_site_warehouse(site, w2).unwrap();
    session.set_site_warehouse(site, w1).unwrap();
    session.commit().unwrap();

    let err = session.set_site_warehouse(site, w2).unwrap_err();
    assert!(matches!(
        err.validation(),
        Some(ValidationError::ImmutableField { .. })
    ));
    assert!(session.pending_history().is_empty());
}

#[test]
fn test_legacy_site_assignment_records_transfer() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("legacy.db");
    let path = path.to_str().unwrap();

    let (site, w2) = {
        let store = Store::open(path).unwrap();
        let mut session = store.begin().unwrap();
        let w1 = session.create_warehouse("W1").unwrap();
        let w2 = session.create_warehouse("W2").unwrap();
        let site = session.create_site(w1).unwrap();
        session.commit().unwrap();
        (site, w2)
    };

    // 旧数据: 场地没有仓库
    let conn = rusqlite::Connection::open(path).unwrap();
    conn.execute("UPDATE site SET warehouse_id = NULL", []).unwrap();
    drop(conn);

    let store = Store::open(path).unwrap();
    let mut session = store.begin().unwrap();
    session.set_site_warehouse(site, w2).unwrap();
    session.commit().unwrap();
    drop(session);

    let history = store.history_of_site(site).unwrap();
    let transfer = history.last().unwrap();
    assert_eq!(transfer.action(), Some(HistoryAction::SiteTransfer));
    assert_eq!(transfer.detail, "site transfer from '' to 'W2'");
    assert_eq!(transfer.warehouse, Some(w2));
    assert_eq!(store.snapshot().unwrap().sites[&site].warehouse, Some(w2));
}

#[test]
fn test_delete_then_recreate_with_same_keys() {
    let store = store();
    let mut session = store.begin().unwrap();
    let wh = session.create_warehouse("W1").unwrap();
    let spare = session.create_warehouse("W2").unwrap();
    let site = session.create_site(wh).unwrap();
    let old_picket = session.create_picket(wh, "1", Some(site)).unwrap();
    let old_cargo = session.create_cargo("coal").unwrap();
    session.add_placement(old_picket, old_cargo, dec!(400)).unwrap();
    session.commit().unwrap();

    session.delete_picket(old_picket).unwrap();
    let picket = session.create_picket(wh, "1", Some(site)).unwrap();
    session.delete_cargo(old_cargo).unwrap();
    let cargo = session.create_cargo("coal").unwrap();
    session.delete_warehouse(spare).unwrap();
    let replacement = session.create_warehouse("W2").unwrap();
    session.add_placement(picket, cargo, dec!(250)).unwrap();
    session.commit().unwrap();
    drop(session);

    let graph = store.hierarchy().load_graph().unwrap();
    assert!(!graph.pickets.contains_key(&old_picket));
    assert_eq!(graph.pickets[&picket].site, Some(site));
    assert!(!graph.cargos.contains_key(&old_cargo));
    assert_eq!(graph.cargos[&cargo].name, "coal");
    assert!(!graph.warehouses.contains_key(&spare));
    assert_eq!(graph.warehouses[&replacement].number, "W2");
    assert_eq!(store.snapshot().unwrap().pickets.len(), 1);
}

#[test]
fn test_duplicate_extreme_numbers_are_non_contiguous() {
    let store = store();
    let mut session = store.begin().unwrap();
    let wh = session.create_warehouse("W1").unwrap();
    let site = session.create_site(wh).unwrap();
    session.create_picket(wh, "9223372036854775807", Some(site)).unwrap();

    let err = session
        .create_picket(wh, "9223372036854775807", Some(site))
        .unwrap_err();
    assert!(matches!(
        err.validation(),
        Some(ValidationError::NonContiguousGrouping { detached: 2, .. })
    ));
    assert!(session.graph().pickets_of_site(site).is_empty());
}

#[test]
fn test_add_then_delete_in_one_session_writes_no_history() {
    let store = store();
    let mut session = store.begin().unwrap();
    let wh = session.create_warehouse("W1").unwrap();
    let site = session.create_site(wh).unwrap();
    let picket = session.create_picket(wh, "1", Some(site)).unwrap();
    let cargo = session.create_cargo("coal").unwrap();
    session.commit().unwrap();
    let before = store.history().unwrap().len();

    let placement = session.add_placement(picket, cargo, dec!(100)).unwrap();
    session.delete_placement(placement).unwrap();
    let scratch = session.create_site(wh).unwrap();
    session.delete_site(scratch).unwrap();
    assert!(session.pending_history().is_empty());
    session.commit().unwrap();
    drop(session);

    assert!(store.history_of_placement(placement).unwrap().is_empty());
    assert!(store.history_of_site(scratch).unwrap().is_empty());
    assert_eq!(store.history().unwrap().len(), before);
}

#[test]
fn test_removal_reverses_persisted_weight() {
    let store = store();
    let mut session = store.begin().unwrap();
    let wh = session.create_warehouse("W1").unwrap();
    let site = session.create_site(wh).unwrap();
    let picket = session.create_picket(wh, "1", Some(site)).unwrap();
    let cargo = session.create_cargo("coal").unwrap();
    let placement = session.add_placement(picket, cargo, dec!(700)).unwrap();
    session.commit().unwrap();

    // 未提交的改重不进入历史,移除记录冲抵已持久化的重量
    session.set_placement_weight(placement, dec!(900)).unwrap();
    session.delete_placement(placement).unwrap();
    session.commit().unwrap();
    drop(session);

    let history = store.history_of_placement(placement).unwrap();
    let changes: Vec<_> = history.iter().filter_map(|r| r.weight_change).collect();
    assert_eq!(changes, vec![dec!(700), dec!(-700)]);
    assert_eq!(history.last().and_then(|r| r.current_total_weight), Some(dec!(0)));
}

#[test]
fn test_missing_entity_is_not_found() {
    let store = store();
    let mut session = store.begin().unwrap();
    let err = session
        .set_placement_weight(crate::domain::PlacementId::new(), dec!(1))
        .unwrap_err();
    assert!(matches!(err, StoreError::NotFound { .. }));
}
