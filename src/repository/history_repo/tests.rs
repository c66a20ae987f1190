use super::HistoryRecordRepository;
use crate::domain::history::{HistoryAction, HistoryRecord};
use crate::domain::types::{PlacementId, SiteId, WarehouseId};
use rusqlite::Connection;
use rust_decimal_macros::dec;
use std::sync::{Arc, Mutex};

fn setup_test_db() -> Arc<Mutex<Connection>> {
    let conn = crate::db::open_in_memory_connection().unwrap();
    crate::db::init_schema(&conn).unwrap();
    Arc::new(Mutex::new(conn))
}

fn make_record(action: HistoryAction, actor: &str, site: SiteId) -> HistoryRecord {
    HistoryRecord::new(action, actor.to_string(), format!("{}: coal", action.as_str()))
        .with_site(site, Some(WarehouseId::new()))
}

#[test]
fn test_insert_and_find_by_id() {
    let repo = HistoryRecordRepository::new(setup_test_db());
    let placement = PlacementId::new();
    let record = make_record(HistoryAction::Add, "alice", SiteId::new())
        .with_placement(placement)
        .with_weights(dec!(1200.5), dec!(3000))
        .with_picket_info("picket W1/3 (site 1-4)".to_string());

    assert_eq!(repo.insert(&record).unwrap(), 1);

    let found = repo.find_by_id(record.id).unwrap().unwrap();
    assert_eq!(found.action(), Some(HistoryAction::Add));
    assert_eq!(found.placement, Some(placement));
    assert_eq!(found.weight_change, Some(dec!(1200.5)));
    assert_eq!(found.current_total_weight, Some(dec!(3000)));
    assert_eq!(found.timestamp, record.timestamp);
    assert_eq!(found.picket_info.as_deref(), Some("picket W1/3 (site 1-4)"));
}

#[test]
fn test_find_by_id_missing() {
    let repo = HistoryRecordRepository::new(setup_test_db());
    let missing = make_record(HistoryAction::Add, "alice", SiteId::new());
    assert!(repo.find_by_id(missing.id).unwrap().is_none());
}

#[test]
fn test_find_by_site_keeps_write_order() {
    let repo = HistoryRecordRepository::new(setup_test_db());
    let site = SiteId::new();

    let actions = [
        HistoryAction::SiteCreated,
        HistoryAction::Add,
        HistoryAction::WeightChange,
        HistoryAction::Remove,
    ];
    for action in actions {
        repo.insert(&make_record(action, "alice", site)).unwrap();
    }
    repo.insert(&make_record(HistoryAction::Add, "bob", SiteId::new()))
        .unwrap();

    let records = repo.find_by_site(site).unwrap();
    let found: Vec<_> = records.iter().filter_map(|r| r.action()).collect();
    assert_eq!(found, actions.to_vec());
}

#[test]
fn test_find_by_actor_and_recent() {
    let repo = HistoryRecordRepository::new(setup_test_db());
    let site = SiteId::new();
    repo.insert(&make_record(HistoryAction::Add, "alice", site)).unwrap();
    repo.insert(&make_record(HistoryAction::Add, "bob", site)).unwrap();
    repo.insert(&make_record(HistoryAction::Remove, "alice", site)).unwrap();

    assert_eq!(repo.find_by_actor("alice").unwrap().len(), 2);
    assert_eq!(repo.count().unwrap(), 3);

    let recent = repo.find_recent(2).unwrap();
    assert_eq!(recent.len(), 2);
    assert_eq!(recent[0].action(), Some(HistoryAction::Remove));
    assert_eq!(recent[1].actor, "bob");
}

#[test]
fn test_append_all_in_transaction() {
    let conn = setup_test_db();
    let site = SiteId::new();
    {
        let mut guard = conn.lock().unwrap();
        let tx = guard.transaction().unwrap();
        let records = vec![
            make_record(HistoryAction::SiteCreated, "alice", site),
            make_record(HistoryAction::Add, "alice", site),
        ];
        assert_eq!(HistoryRecordRepository::append_all(&tx, &records).unwrap(), 2);
        tx.commit().unwrap();
    }

    let repo = HistoryRecordRepository::new(conn);
    assert_eq!(repo.find_all().unwrap().len(), 2);
}
