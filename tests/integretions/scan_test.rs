use log::info;

use tiny_db::{
    execution::{OpIterator, SeqScan},
    Transaction,
};

use crate::test_utils::{new_random_heap_table, setup};

#[test]
fn test_small() {
    let _guard = setup();

    let column_sizes = [1, 2, 3, 4];
    let row_sizes = [0, 1, 2, 511, 512, 513, 1023, 1024, 1025];

    for columns in &column_sizes {
        for rows in &row_sizes {
            validate_scan(*columns, *rows);
        }
    }
}

fn validate_scan(columns: usize, rows: usize) {
    info!("start validate scan, columns: {}, rows: {}", columns, rows);

    let mut cells: Vec<Vec<i32>> = Vec::new();
    let table = new_random_heap_table("scan", columns, rows, &mut cells);

    let tx = Transaction::new();
    let mut scan = SeqScan::new(&tx, table.get_id(), "").unwrap();
    scan.open().unwrap();

    let mut row_index = 0;
    while scan.has_next().unwrap() {
        let actual = scan.next().unwrap();
        assert!(
            actual.equal_cells(&cells[row_index]),
            "row {} mismatch: {} vs {:?}",
            row_index,
            actual,
            cells[row_index]
        );
        row_index += 1;
    }
    assert_eq!(row_index, cells.len());

    scan.close().unwrap();
    tx.commit().unwrap();
}

#[test]
fn test_rewind() {
    let _guard = setup();

    let mut cells: Vec<Vec<i32>> = Vec::new();
    let rows = 1000;
    let table = new_random_heap_table("rewind", 2, rows, &mut cells);

    let tx = Transaction::new();
    let mut scan = SeqScan::new(&tx, table.get_id(), "").unwrap();
    scan.open().unwrap();

    for row_index in 0..100 {
        let actual = scan.next().unwrap();
        assert!(actual.equal_cells(&cells[row_index]));
    }

    scan.rewind().unwrap();

    let mut row_index = 0;
    while scan.has_next().unwrap() {
        let actual = scan.next().unwrap();
        assert!(actual.equal_cells(&cells[row_index]));
        row_index += 1;
    }
    assert_eq!(row_index, rows);

    scan.close().unwrap();
    tx.commit().unwrap();
}

#[test]
fn test_alias_prefixes_field_names() {
    let _guard = setup();

    let mut cells: Vec<Vec<i32>> = Vec::new();
    let table = new_random_heap_table("alias", 2, 1, &mut cells);

    let tx = Transaction::new();
    let scan = SeqScan::new(&tx, table.get_id(), "t").unwrap();
    let schema = scan.get_schema();
    for i in 0..schema.fields_count() {
        assert!(
            schema.get_field_name(i).starts_with("t."),
            "field {} not aliased: {}",
            i,
            schema.get_field_name(i)
        );
    }
    tx.commit().unwrap();
}

#[test]
fn test_exhausted_scan_fails_with_no_such_element() {
    let _guard = setup();

    let mut cells: Vec<Vec<i32>> = Vec::new();
    let table = new_random_heap_table("exhaust", 1, 2, &mut cells);

    let tx = Transaction::new();
    let mut scan = SeqScan::new(&tx, table.get_id(), "").unwrap();
    scan.open().unwrap();

    scan.next().unwrap();
    scan.next().unwrap();
    let err = scan.next().unwrap_err();
    assert_eq!(err.get_kind(), tiny_db::ErrorKind::NoSuchElement);

    scan.close().unwrap();
    tx.commit().unwrap();
}
