use std::fmt;

use crate::storage::tuple::{Cell, Tuple};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Equals,
    GreaterThan,
    GreaterThanOrEq,
    LessThan,
    LessThanOrEq,
    NotEquals,
}

impl Op {
    pub fn compare(&self, left: &Cell, right: &Cell) -> bool {
        match self {
            Op::Equals => left == right,
            Op::GreaterThan => left > right,
            Op::GreaterThanOrEq => left >= right,
            Op::LessThan => left < right,
            Op::LessThanOrEq => left <= right,
            Op::NotEquals => left != right,
        }
    }
}

/// Compares one field of a tuple against a constant cell.
#[derive(Clone)]
pub struct Predicate {
    pub field_index: usize,
    pub op: Op,
    pub cell: Cell,
}

impl Predicate {
    pub fn new(field_index: usize, op: Op, cell: &Cell) -> Self {
        Self {
            field_index,
            op,
            cell: cell.clone(),
        }
    }

    pub fn matches(&self, cell: &Cell) -> bool {
        self.op.compare(cell, &self.cell)
    }

    pub fn filter(&self, tuple: &Tuple) -> bool {
        self.matches(&tuple.get_cell(self.field_index))
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "field_index: {}, op: {:?}, cell: {:?}",
            self.field_index, self.op, self.cell
        )
    }
}

/// Compares a field of a left tuple against a field of a right tuple.
#[derive(Clone, Copy)]
pub struct JoinPredicate {
    pub field_index1: usize,
    pub op: Op,
    pub field_index2: usize,
}

impl JoinPredicate {
    pub fn new(field_index1: usize, op: Op, field_index2: usize) -> Self {
        Self {
            field_index1,
            op,
            field_index2,
        }
    }

    pub fn filter(&self, left: &Tuple, right: &Tuple) -> bool {
        self.op.compare(
            &left.get_cell(self.field_index1),
            &right.get_cell(self.field_index2),
        )
    }
}
