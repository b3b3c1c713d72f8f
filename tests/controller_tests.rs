//! Tests for the controller layer: edits, history, events and coalesced persistence.

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::panic
)]

use std::cell::RefCell;
use std::rc::Rc;

use xlgrid::controller::GridController;
use xlgrid::csv::{parse_delimited, Delimiter};
use xlgrid::persist::{MemoryRecordStore, PersistConfig, PersistState, RecordStore};
use xlgrid::{EventBus, GridError, GridEvent, SortAction, Table, TableConfig};

// ================================================================
// Test helpers
// ================================================================

fn persist_config() -> PersistConfig {
    PersistConfig {
        table_id: "sheet".into(),
        coalesce_ms: 100.0,
    }
}

fn recording_bus() -> (EventBus, Rc<RefCell<Vec<GridEvent>>>) {
    let bus = EventBus::new();
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    bus.subscribe(move |e| sink.borrow_mut().push(e.clone()));
    (bus, seen)
}

fn people() -> GridController {
    let data = b"name,age\nCleo,41\nAri,9\nBo,\nDee,100";
    let import = parse_delimited(data, Delimiter::Comma, true).unwrap();
    GridController::from_table(import.table, &persist_config(), EventBus::new())
}

fn names_in_view(ctl: &GridController) -> Vec<String> {
    let table = ctl.table();
    (0..table.occupied_rows())
        .map(|r| table.display_value(r, 0).unwrap().to_string())
        .collect()
}

// ================================================================
// Sorting through header clicks
// ================================================================

#[test]
fn test_three_state_header_cycle_on_numbers() {
    let mut ctl = people();
    assert_eq!(
        ctl.click_header(1).unwrap(),
        SortAction::Sort {
            column: 1,
            ascending: true
        }
    );
    assert_eq!(names_in_view(&ctl), vec!["Ari", "Cleo", "Dee", "Bo"]);

    ctl.click_header(1).unwrap();
    assert_eq!(names_in_view(&ctl), vec!["Dee", "Cleo", "Ari", "Bo"]);

    assert_eq!(ctl.click_header(1).unwrap(), SortAction::Reset);
    assert_eq!(names_in_view(&ctl), vec!["Cleo", "Ari", "Bo", "Dee"]);
}

#[test]
fn test_switching_columns_restarts_ascending() {
    let mut ctl = people();
    ctl.click_header(1).unwrap();
    ctl.click_header(1).unwrap();
    assert_eq!(
        ctl.click_header(0).unwrap(),
        SortAction::Sort {
            column: 0,
            ascending: true
        }
    );
    assert_eq!(names_in_view(&ctl), vec!["Ari", "Bo", "Cleo", "Dee"]);
}

#[test]
fn test_added_row_appears_at_view_tail_while_sorted() {
    let mut ctl = people();
    ctl.click_header(0).unwrap();
    let row = ctl.add_row(0.0).unwrap();
    ctl.set_cell(row, 0, "Aaron", 0.0).unwrap();
    assert_eq!(names_in_view(&ctl).last().map(String::as_str), Some("Aaron"));
    assert_eq!(ctl.table().view_row_of(row), Some(4));
}

// ================================================================
// Events
// ================================================================

#[test]
fn test_events_follow_operations() {
    let (bus, seen) = recording_bus();
    let mut ctl = GridController::new(
        &TableConfig {
            row_capacity: 2,
            column_count: 1,
            ..TableConfig::default()
        },
        &persist_config(),
        bus,
    )
    .unwrap();

    ctl.set_cell(0, 0, "a", 0.0).unwrap();
    ctl.add_row(0.0).unwrap();
    ctl.sort_by_column(0, true).unwrap();
    ctl.reset_order();

    let events = seen.borrow();
    assert_eq!(events.len(), 4);
    assert_eq!(
        events[0],
        GridEvent::CellChanged {
            row: 0,
            col: 0,
            old: String::new(),
            new: "a".into()
        }
    );
    assert_eq!(events[1], GridEvent::RowAdded { row: 2 });
    assert!(matches!(events[2], GridEvent::Sorted { rows: 3, .. }));
    assert_eq!(events[3], GridEvent::OrderReset);
}

#[test]
fn test_two_controllers_do_not_share_events() {
    let (bus_a, seen_a) = recording_bus();
    let (bus_b, seen_b) = recording_bus();
    let mut a = GridController::from_table(Table::with_shape(1, 1), &persist_config(), bus_a);
    let _b = GridController::from_table(Table::with_shape(1, 1), &persist_config(), bus_b);
    a.set_cell(0, 0, "x", 0.0).unwrap();
    assert_eq!(seen_a.borrow().len(), 1);
    assert!(seen_b.borrow().is_empty());
}

// ================================================================
// Persistence
// ================================================================

#[test]
fn test_burst_of_edits_writes_once() {
    let mut ctl = people();
    let mut store = MemoryRecordStore::new();
    for (i, name) in ["A", "B", "C", "D", "E"].iter().enumerate() {
        let now = f64::from(u32::try_from(i).unwrap()) * 20.0;
        ctl.set_cell(0, 0, name, now).unwrap();
        assert_eq!(ctl.flush(now, &mut store).unwrap(), None);
    }
    assert_eq!(ctl.persist_state(), PersistState::Pending);
    assert!(ctl.flush(180.0, &mut store).unwrap().is_some());
    assert_eq!(ctl.flush(400.0, &mut store).unwrap(), None);
    assert_eq!(ctl.persist_stats().writes, 1);

    let mut restored = GridController::from_table(
        Table::with_shape(0, 0),
        &persist_config(),
        EventBus::new(),
    );
    assert!(restored.load(&store).unwrap());
    assert_eq!(restored.table().value(0, 0).unwrap(), "E");
}

#[test]
fn test_sorting_alone_does_not_schedule_a_write() {
    let mut ctl = people();
    ctl.click_header(0).unwrap();
    assert_eq!(ctl.persist_state(), PersistState::Clean);
}

#[test]
fn test_restore_resets_sort_and_history() {
    let mut ctl = people();
    let mut store = MemoryRecordStore::new();
    ctl.set_cell(1, 0, "Ava", 0.0).unwrap();
    ctl.flush(1000.0, &mut store).unwrap();
    ctl.click_header(0).unwrap();

    assert!(ctl.load(&store).unwrap());
    assert!(ctl.table().display_order().is_identity());
    assert!(!ctl.table().sort_status().is_sorted());
    assert!(!ctl.history().can_undo());
    assert_eq!(ctl.table().value(1, 0).unwrap(), "Ava");
}

#[test]
fn test_record_for_other_table_is_rejected() {
    let mut writer = GridController::from_table(
        Table::with_shape(1, 1),
        &PersistConfig {
            table_id: "other".into(),
            coalesce_ms: 0.0,
        },
        EventBus::new(),
    );
    let mut store = MemoryRecordStore::new();
    writer.set_cell(0, 0, "x", 0.0).unwrap();
    writer.flush(0.0, &mut store).unwrap();
    let bytes = store.load("other").unwrap().unwrap();
    store.save("sheet", &bytes).unwrap();

    let mut ctl = people();
    assert!(matches!(
        ctl.load(&store),
        Err(GridError::MalformedSnapshot(_))
    ));
    assert_eq!(ctl.table().value(0, 0).unwrap(), "Cleo");
}

#[test]
fn test_cancelled_write_is_retried() {
    let mut ctl = people();
    ctl.set_cell(0, 0, "Zed", 0.0).unwrap();
    let (stale, _) = ctl.begin_persist(500.0).unwrap().unwrap();
    assert_eq!(
        ctl.persist_state(),
        PersistState::InFlight { queued: false }
    );

    ctl.cancel_persist();
    assert_eq!(ctl.persist_state(), PersistState::Pending);
    assert_eq!(ctl.persist_stats().cancelled, 1);
    assert!(!ctl.finish_persist(stale, Ok(10), 510.0));
    assert_eq!(ctl.persist_stats().writes, 0);

    let mut store = MemoryRecordStore::new();
    assert!(ctl.flush(520.0, &mut store).unwrap().is_some());
    assert_eq!(store.len(), 1);
    assert_eq!(ctl.persist_state(), PersistState::Clean);
}

#[test]
fn test_edits_during_write_collapse_into_one_followup() {
    let mut ctl = people();
    ctl.set_cell(0, 0, "A", 0.0).unwrap();
    let (first, _) = ctl.begin_persist(200.0).unwrap().unwrap();

    ctl.set_cell(0, 0, "B", 210.0).unwrap();
    ctl.set_cell(0, 0, "C", 220.0).unwrap();
    assert_eq!(ctl.persist_state(), PersistState::InFlight { queued: true });
    assert_eq!(ctl.begin_persist(1000.0).unwrap(), None);

    assert!(ctl.finish_persist(first, Ok(1), 1000.0));
    let (second, bytes) = ctl.begin_persist(1000.0).unwrap().unwrap();
    assert!(ctl.finish_persist(second, Ok(bytes.len()), 1010.0));
    assert_eq!(ctl.begin_persist(2000.0).unwrap(), None);
    assert_eq!(ctl.persist_stats().writes, 2);

    let mut store = MemoryRecordStore::new();
    store.save("sheet", &bytes).unwrap();
    let mut restored = people();
    assert!(restored.load(&store).unwrap());
    assert_eq!(restored.table().value(0, 0).unwrap(), "C");
}

#[test]
fn test_failed_write_is_reported_and_table_kept() {
    let (bus, seen) = recording_bus();
    let import = parse_delimited(b"name\nCleo", Delimiter::Comma, true).unwrap();
    let mut ctl = GridController::from_table(import.table, &persist_config(), bus);
    ctl.set_cell(0, 0, "Ava", 0.0).unwrap();
    let (ticket, _) = ctl.begin_persist(100.0).unwrap().unwrap();

    assert!(ctl.finish_persist(ticket, Err("QuotaExceededError".into()), 130.0));
    assert_eq!(
        seen.borrow().last(),
        Some(&GridEvent::PersistFailed {
            message: "QuotaExceededError".into()
        })
    );
    assert_eq!(ctl.persist_state(), PersistState::Pending);
    assert_eq!(
        ctl.persist_stats().last_error.as_deref(),
        Some("QuotaExceededError")
    );
    assert_eq!(ctl.table().value(0, 0).unwrap(), "Ava");
}
