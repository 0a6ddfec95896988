use std::sync::Arc;

use tiny_db::{
    execution::{Delete, Filter, Insert, OpIterator, SeqScan},
    predicate::{Op, Predicate},
    small_int_schema, Cell, Database, HeapFile, HeapPageID, Transaction,
    Tuple,
};

use crate::test_utils::{
    collect_tuples, new_data_path, new_random_heap_table, setup,
    TupleIterator,
};

#[test]
fn test_insert_operator_reports_count() {
    let _guard = setup();

    let schema = small_int_schema(2, "c");
    let table = Arc::new(
        HeapFile::new(&new_data_path("insert_op"), &schema).unwrap(),
    );
    Database::mut_catalog().add_table(Arc::clone(&table), "insert_op", "");

    let rows: Vec<Vec<Cell>> = (0..25)
        .map(|i| vec![Cell::Int(i), Cell::Int(i * 10)])
        .collect();
    let child = TupleIterator::new_from_rows(&schema, &rows);

    let tx = Transaction::new();
    let mut insert =
        Insert::new(&tx, Box::new(child), table.get_id()).unwrap();
    insert.open().unwrap();

    let report = insert.next().unwrap();
    assert_eq!(report.get_cell(0), Cell::Int(25));
    // the second fetch finds the operator exhausted
    assert!(!insert.has_next().unwrap());
    insert.close().unwrap();
    tx.commit().unwrap();

    let t2 = Transaction::new();
    let mut scan = SeqScan::new(&t2, table.get_id(), "").unwrap();
    scan.open().unwrap();
    assert_eq!(collect_tuples(&mut scan).len(), 25);
    scan.close().unwrap();
    t2.commit().unwrap();
}

#[test]
fn test_insert_rejects_mismatched_schema() {
    let _guard = setup();

    let schema = small_int_schema(2, "c");
    let table = Arc::new(
        HeapFile::new(&new_data_path("insert_bad"), &schema).unwrap(),
    );
    Database::mut_catalog().add_table(Arc::clone(&table), "insert_bad", "");

    let wrong = small_int_schema(3, "w");
    let child = TupleIterator::new(&wrong, Vec::new());

    let tx = Transaction::new();
    assert!(Insert::new(&tx, Box::new(child), table.get_id()).is_err());
    tx.commit().unwrap();
}

#[test]
fn test_insert_grows_the_file() {
    let _guard = setup();

    let mut cells = Vec::new();
    // single int column: 992 tuples per page
    let table = new_random_heap_table("grow", 1, 992 + 1, &mut cells);
    assert_eq!(table.num_pages(), 2);

    let tx = Transaction::new();
    let mut scan = SeqScan::new(&tx, table.get_id(), "").unwrap();
    scan.open().unwrap();
    assert_eq!(collect_tuples(&mut scan).len(), 992 + 1);
    scan.close().unwrap();
    tx.commit().unwrap();
}

/// The insert probe takes a read lock per inspected page; probes of full
/// pages must hand the lock back instead of dragging it to commit.
#[test]
fn test_probe_locks_are_released() {
    let _guard = setup();

    let mut cells = Vec::new();
    let table = new_random_heap_table("probe", 1, 992, &mut cells);
    assert_eq!(table.num_pages(), 1);

    let schema = small_int_schema(1, "");
    let tx = Transaction::new();
    let mut extra = Tuple::new_from_cells(&schema, &[Cell::Int(-1)]);
    Database::buffer_pool()
        .insert_tuple(&tx, table.get_id(), &mut extra)
        .unwrap();

    // page 0 was full: probed and released; page 1 holds the new tuple
    let pid0 = HeapPageID::new(table.get_id(), 0);
    let pid1 = HeapPageID::new(table.get_id(), 1);
    assert!(!Database::buffer_pool().holds_lock(&tx, &pid0));
    assert!(Database::buffer_pool().holds_lock(&tx, &pid1));
    assert_eq!(
        Database::concurrent_status().held_lock_kind(&tx, &pid1),
        Some(tiny_db::transaction::Lock::XLock)
    );

    tx.commit().unwrap();
}

#[test]
fn test_delete_operator() {
    let _guard = setup();

    let mut cells = Vec::new();
    let table = new_random_heap_table("delete_op", 1, 100, &mut cells);

    // delete the negative rows
    let tx = Transaction::new();
    let scan = SeqScan::new(&tx, table.get_id(), "").unwrap();
    let filter = Filter::new(
        Predicate::new(0, Op::LessThan, &Cell::Int(0)),
        Box::new(scan),
    );
    let mut delete = Delete::new(&tx, Box::new(filter));
    delete.open().unwrap();

    let expected_deleted =
        cells.iter().filter(|row| row[0] < 0).count() as i32;
    let report = delete.next().unwrap();
    assert_eq!(report.get_cell(0), Cell::Int(expected_deleted));
    delete.close().unwrap();
    tx.commit().unwrap();

    // only the non-negative rows remain
    let t2 = Transaction::new();
    let mut scan = SeqScan::new(&t2, table.get_id(), "").unwrap();
    scan.open().unwrap();
    let remaining = collect_tuples(&mut scan);
    assert_eq!(
        remaining.len(),
        cells.len() - expected_deleted as usize
    );
    for t in &remaining {
        match t.get_cell(0) {
            Cell::Int(v) => assert!(v >= 0),
            other => panic!("unexpected cell {:?}", other),
        }
    }
    scan.close().unwrap();
    t2.commit().unwrap();
}

/// Deleted slots are reused by later inserts.
#[test]
fn test_delete_then_insert_reuses_slots() {
    let _guard = setup();

    let mut cells = Vec::new();
    let table = new_random_heap_table("slot_reuse", 1, 992, &mut cells);
    assert_eq!(table.num_pages(), 1);

    let schema = small_int_schema(1, "");

    // remove everything
    let tx = Transaction::new();
    let scan = SeqScan::new(&tx, table.get_id(), "").unwrap();
    let mut delete = Delete::new(&tx, Box::new(scan));
    delete.open().unwrap();
    assert_eq!(delete.next().unwrap().get_cell(0), Cell::Int(992));
    delete.close().unwrap();
    tx.commit().unwrap();

    // the next insert lands on the emptied page, not a fresh one
    let t2 = Transaction::new();
    let mut t = Tuple::new_from_cells(&schema, &[Cell::Int(123)]);
    Database::buffer_pool()
        .insert_tuple(&t2, table.get_id(), &mut t)
        .unwrap();
    t2.commit().unwrap();
    assert_eq!(table.num_pages(), 1);
    assert_eq!(t.get_record_id().unwrap().get_pid().page_index, 0);
}
