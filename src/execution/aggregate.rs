use std::{collections::HashMap, fmt};

use crate::{
    error::TinyError,
    execution::OpIterator,
    storage::{
        schema::{FieldItem, Schema, Type},
        tuple::{Cell, Tuple},
    },
    types::TinyResult,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateOp {
    Min,
    Max,
    Sum,
    Avg,
    Count,
}

impl fmt::Display for AggregateOp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            AggregateOp::Min => "min",
            AggregateOp::Max => "max",
            AggregateOp::Sum => "sum",
            AggregateOp::Avg => "avg",
            AggregateOp::Count => "count",
        };
        write!(f, "{}", name)
    }
}

/// Single-pass accumulation of tuples into per-group buckets. The group
/// key is the cell of the group-by field, or the one anonymous bucket
/// when no grouping is requested.
trait Aggregator {
    fn merge(&mut self, t: &Tuple);

    /// Emit one output tuple per bucket under the given schema.
    fn results(&self, schema: &Schema) -> Vec<Tuple>;
}

struct IntAccumulator {
    count: usize,
    sum: i64,
    min: i32,
    max: i32,
}

impl IntAccumulator {
    fn new() -> Self {
        Self {
            count: 0,
            sum: 0,
            min: i32::MAX,
            max: i32::MIN,
        }
    }

    fn add(&mut self, v: i32) {
        self.count += 1;
        self.sum += v as i64;
        self.min = self.min.min(v);
        self.max = self.max.max(v);
    }

    fn value(&self, op: AggregateOp) -> i32 {
        match op {
            AggregateOp::Min => self.min,
            AggregateOp::Max => self.max,
            AggregateOp::Sum => self.sum as i32,
            // integer division, truncating toward zero
            AggregateOp::Avg => (self.sum / self.count as i64) as i32,
            AggregateOp::Count => self.count as i32,
        }
    }
}

struct IntAggregator {
    group_by: Option<usize>,
    agg_index: usize,
    op: AggregateOp,
    groups: HashMap<Option<Cell>, IntAccumulator>,
}

impl IntAggregator {
    fn new(group_by: Option<usize>, agg_index: usize, op: AggregateOp) -> Self {
        Self {
            group_by,
            agg_index,
            op,
            groups: HashMap::new(),
        }
    }
}

impl Aggregator for IntAggregator {
    fn merge(&mut self, t: &Tuple) {
        let key = self.group_by.map(|g| t.get_cell(g));
        let v = match t.get_cell(self.agg_index) {
            Cell::Int(v) => v,
            other => panic!("int aggregator fed a {:?} cell", other),
        };
        self.groups
            .entry(key)
            .or_insert_with(IntAccumulator::new)
            .add(v);
    }

    fn results(&self, schema: &Schema) -> Vec<Tuple> {
        self.groups
            .iter()
            .map(|(key, acc)| {
                let mut cells = Vec::new();
                if let Some(group_cell) = key {
                    cells.push(group_cell.clone());
                }
                cells.push(Cell::Int(acc.value(self.op)));
                Tuple::new_from_cells(schema, &cells)
            })
            .collect()
    }
}

/// COUNT is the only aggregate defined over string cells; the operator
/// rejects everything else at construction.
struct StringAggregator {
    group_by: Option<usize>,
    groups: HashMap<Option<Cell>, usize>,
}

impl StringAggregator {
    fn new(
        group_by: Option<usize>,
        op: AggregateOp,
    ) -> Result<Self, TinyError> {
        if op != AggregateOp::Count {
            return Err(TinyError::unsupported(&format!(
                "cannot compute {} over string cells",
                op
            )));
        }
        Ok(Self {
            group_by,
            groups: HashMap::new(),
        })
    }
}

impl Aggregator for StringAggregator {
    fn merge(&mut self, t: &Tuple) {
        let key = self.group_by.map(|g| t.get_cell(g));
        *self.groups.entry(key).or_insert(0) += 1;
    }

    fn results(&self, schema: &Schema) -> Vec<Tuple> {
        self.groups
            .iter()
            .map(|(key, count)| {
                let mut cells = Vec::new();
                if let Some(group_cell) = key {
                    cells.push(group_cell.clone());
                }
                cells.push(Cell::Int(*count as i32));
                Tuple::new_from_cells(schema, &cells)
            })
            .collect()
    }
}

/// Group-by aggregation over a single field. `open` drains the child into
/// the group hash, iteration then walks the materialized buckets; the
/// bucket order is unspecified.
pub struct Aggregate {
    child: Box<dyn OpIterator>,
    agg_index: usize,
    group_by: Option<usize>,
    op: AggregateOp,
    agg_type: Type,
    schema: Schema,

    results: Vec<Tuple>,
    cursor: usize,
}

impl Aggregate {
    pub fn new(
        child: Box<dyn OpIterator>,
        agg_index: usize,
        group_by: Option<usize>,
        op: AggregateOp,
    ) -> Result<Self, TinyError> {
        let child_schema = child.get_schema();
        if agg_index >= child_schema.fields_count() {
            return Err(TinyError::db(&format!(
                "aggregate field index {} out of range of schema {}",
                agg_index, child_schema
            )));
        }
        if let Some(g) = group_by {
            if g >= child_schema.fields_count() {
                return Err(TinyError::db(&format!(
                    "group-by field index {} out of range of schema {}",
                    g, child_schema
                )));
            }
        }

        let agg_type = child_schema.get_field_type(agg_index);
        if agg_type == Type::String && op != AggregateOp::Count {
            return Err(TinyError::unsupported(&format!(
                "cannot compute {} over string cells",
                op
            )));
        }

        let agg_field = FieldItem::new(
            &format!(
                "{}({})",
                op,
                child_schema.get_field_name(agg_index)
            ),
            Type::Int,
        );
        let schema = match group_by {
            Some(g) => Schema::new(vec![
                child_schema.fields[g].clone(),
                agg_field,
            ]),
            None => Schema::new(vec![agg_field]),
        };

        Ok(Self {
            child,
            agg_index,
            group_by,
            op,
            agg_type,
            schema,
            results: Vec::new(),
            cursor: 0,
        })
    }

    pub fn set_children(&mut self, mut children: Vec<Box<dyn OpIterator>>) {
        assert_eq!(children.len(), 1);
        self.child = children.remove(0);
        self.results.clear();
        self.cursor = 0;
    }
}

impl OpIterator for Aggregate {
    fn open(&mut self) -> TinyResult {
        let mut aggregator: Box<dyn Aggregator> = match self.agg_type {
            Type::Int => Box::new(IntAggregator::new(
                self.group_by,
                self.agg_index,
                self.op,
            )),
            Type::String => {
                Box::new(StringAggregator::new(self.group_by, self.op)?)
            }
        };

        self.child.open()?;
        while self.child.has_next()? {
            aggregator.merge(&self.child.next()?);
        }

        self.results = aggregator.results(&self.schema);
        self.cursor = 0;
        Ok(())
    }

    fn has_next(&mut self) -> Result<bool, TinyError> {
        Ok(self.cursor < self.results.len())
    }

    fn next(&mut self) -> Result<Tuple, TinyError> {
        if self.cursor >= self.results.len() {
            return Err(TinyError::no_such_element());
        }
        let t = self.results[self.cursor].clone();
        self.cursor += 1;
        Ok(t)
    }

    fn rewind(&mut self) -> TinyResult {
        self.cursor = 0;
        Ok(())
    }

    fn close(&mut self) -> TinyResult {
        self.results.clear();
        self.cursor = 0;
        self.child.close()
    }

    fn get_schema(&self) -> &Schema {
        &self.schema
    }
}
