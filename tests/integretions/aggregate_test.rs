use std::collections::HashSet;

use tiny_db::{
    execution::{Aggregate, AggregateOp, OpIterator},
    small_int_schema, Cell, ErrorKind, Schema, Type,
};

use crate::test_utils::{collect_tuples, setup, TupleIterator};

fn grouped_schema() -> Schema {
    Schema::from_types(&[Type::String, Type::Int], &["g", "v"])
}

fn grouped_rows() -> Vec<Vec<Cell>> {
    vec![
        vec![Cell::String("A".to_string()), Cell::Int(1)],
        vec![Cell::String("A".to_string()), Cell::Int(3)],
        vec![Cell::String("B".to_string()), Cell::Int(2)],
    ]
}

#[test]
fn test_avg_group_by() {
    let _guard = setup();

    let child =
        TupleIterator::new_from_rows(&grouped_schema(), &grouped_rows());
    let mut agg =
        Aggregate::new(Box::new(child), 1, Some(0), AggregateOp::Avg)
            .unwrap();
    agg.open().unwrap();

    let got: HashSet<(String, i32)> = collect_tuples(&mut agg)
        .iter()
        .map(|t| match (t.get_cell(0), t.get_cell(1)) {
            (Cell::String(g), Cell::Int(v)) => (g, v),
            other => panic!("unexpected cells {:?}", other),
        })
        .collect();

    let want: HashSet<(String, i32)> =
        [("A".to_string(), 2), ("B".to_string(), 2)]
            .iter()
            .cloned()
            .collect();
    assert_eq!(got, want);
    agg.close().unwrap();
}

#[test]
fn test_aggregates_without_grouping() {
    let _guard = setup();

    let schema = small_int_schema(1, "v");
    let rows: Vec<Vec<Cell>> = [3, -7, 10, 4]
        .iter()
        .map(|v| vec![Cell::Int(*v)])
        .collect();

    let cases = [
        (AggregateOp::Min, -7),
        (AggregateOp::Max, 10),
        (AggregateOp::Sum, 10),
        (AggregateOp::Avg, 2),
        (AggregateOp::Count, 4),
    ];

    for (op, expected) in &cases {
        let child = TupleIterator::new_from_rows(&schema, &rows);
        let mut agg =
            Aggregate::new(Box::new(child), 0, None, *op).unwrap();
        agg.open().unwrap();

        let results = collect_tuples(&mut agg);
        assert_eq!(results.len(), 1, "op: {:?}", op);
        assert_eq!(
            results[0].get_cell(0),
            Cell::Int(*expected),
            "op: {:?}",
            op
        );
        assert_eq!(results[0].get_schema().fields_count(), 1);
        agg.close().unwrap();
    }
}

/// Integer AVG truncates toward zero.
#[test]
fn test_avg_uses_integer_division() {
    let _guard = setup();

    let schema = small_int_schema(1, "v");
    let rows: Vec<Vec<Cell>> =
        [1, 2, 4].iter().map(|v| vec![Cell::Int(*v)]).collect();

    let child = TupleIterator::new_from_rows(&schema, &rows);
    let mut agg =
        Aggregate::new(Box::new(child), 0, None, AggregateOp::Avg).unwrap();
    agg.open().unwrap();
    // (1 + 2 + 4) / 3 = 7 / 3 = 2
    assert_eq!(agg.next().unwrap().get_cell(0), Cell::Int(2));
    agg.close().unwrap();
}

#[test]
fn test_count_over_strings() {
    let _guard = setup();

    let child =
        TupleIterator::new_from_rows(&grouped_schema(), &grouped_rows());
    // count the string field itself, grouped by it
    let mut agg =
        Aggregate::new(Box::new(child), 0, Some(0), AggregateOp::Count)
            .unwrap();
    agg.open().unwrap();

    let got: HashSet<(String, i32)> = collect_tuples(&mut agg)
        .iter()
        .map(|t| match (t.get_cell(0), t.get_cell(1)) {
            (Cell::String(g), Cell::Int(v)) => (g, v),
            other => panic!("unexpected cells {:?}", other),
        })
        .collect();

    let want: HashSet<(String, i32)> =
        [("A".to_string(), 2), ("B".to_string(), 1)]
            .iter()
            .cloned()
            .collect();
    assert_eq!(got, want);
    agg.close().unwrap();
}

/// Anything but COUNT over a string field is refused at construction.
#[test]
fn test_string_aggregate_other_than_count_is_unsupported() {
    let _guard = setup();

    for op in &[
        AggregateOp::Min,
        AggregateOp::Max,
        AggregateOp::Sum,
        AggregateOp::Avg,
    ] {
        let child = TupleIterator::new_from_rows(
            &grouped_schema(),
            &grouped_rows(),
        );
        match Aggregate::new(Box::new(child), 0, Some(0), *op) {
            Ok(_) => panic!("{} over strings must be rejected", op),
            Err(e) => {
                assert_eq!(e.get_kind(), ErrorKind::Unsupported, "op: {}", op)
            }
        }
    }
}

#[test]
fn test_output_schema() {
    let _guard = setup();

    let child =
        TupleIterator::new_from_rows(&grouped_schema(), &grouped_rows());
    let agg =
        Aggregate::new(Box::new(child), 1, Some(0), AggregateOp::Sum)
            .unwrap();

    let schema = agg.get_schema();
    assert_eq!(schema.fields_count(), 2);
    assert_eq!(schema.get_field_type(0), Type::String);
    assert_eq!(schema.get_field_type(1), Type::Int);
    assert_eq!(schema.get_field_name(1), "sum(v)");
}

#[test]
fn test_rewind_replays_results() {
    let _guard = setup();

    let child =
        TupleIterator::new_from_rows(&grouped_schema(), &grouped_rows());
    let mut agg =
        Aggregate::new(Box::new(child), 1, Some(0), AggregateOp::Max)
            .unwrap();
    agg.open().unwrap();

    let first = collect_tuples(&mut agg);
    assert_eq!(first.len(), 2);
    assert!(!agg.has_next().unwrap());

    agg.rewind().unwrap();
    let second = collect_tuples(&mut agg);
    assert_eq!(first.len(), second.len());
    agg.close().unwrap();
}
