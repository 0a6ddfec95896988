use std::fmt;

use crate::{
    error::TinyError,
    io::{Encodeable, TinyReader},
    storage::{heap::HeapPageID, schema::Schema, tuple::Cell},
    types::TinyResult,
};

/// Physical location of a stored tuple: the page plus the slot within it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecordID {
    pid: HeapPageID,
    slot: usize,
}

impl RecordID {
    pub fn new(pid: HeapPageID, slot: usize) -> Self {
        Self { pid, slot }
    }

    pub fn get_pid(&self) -> HeapPageID {
        self.pid
    }

    pub fn get_slot(&self) -> usize {
        self.slot
    }
}

/// A row value. Cells may be absent until set; a tuple read from a page or
/// produced by an operator always has every cell present.
#[derive(Clone)]
pub struct Tuple {
    schema: Schema,
    cells: Vec<Option<Cell>>,
    record_id: Option<RecordID>,
}

impl Tuple {
    pub fn new(schema: &Schema) -> Self {
        let cells = vec![None; schema.fields_count()];
        Self {
            schema: schema.clone(),
            cells,
            record_id: None,
        }
    }

    pub fn new_from_cells(schema: &Schema, cells: &[Cell]) -> Self {
        assert_eq!(schema.fields_count(), cells.len());
        Self {
            schema: schema.clone(),
            cells: cells.iter().cloned().map(Some).collect(),
            record_id: None,
        }
    }

    /// Parse one tuple image of `schema.get_size()` bytes.
    pub fn read_from(reader: &mut TinyReader, schema: &Schema) -> Self {
        let mut cells = Vec::new();
        for field in &schema.fields {
            cells.push(Some(Cell::read_from(reader, field.field_type)));
        }
        Self {
            schema: schema.clone(),
            cells,
            record_id: None,
        }
    }

    pub fn get_schema(&self) -> &Schema {
        &self.schema
    }

    /// Panics when the index is out of range or the cell has not been set.
    pub fn get_cell(&self, i: usize) -> Cell {
        self.cells[i]
            .clone()
            .expect("cell has not been set")
    }

    pub fn get_cells(&self) -> Vec<Cell> {
        (0..self.cells.len()).map(|i| self.get_cell(i)).collect()
    }

    pub fn set_cell(&mut self, i: usize, cell: Cell) -> TinyResult {
        if i >= self.cells.len() {
            return Err(TinyError::db(&format!(
                "field index {} out of range, schema has {} fields",
                i,
                self.cells.len()
            )));
        }
        if cell.get_type() != self.schema.get_field_type(i) {
            return Err(TinyError::db(&format!(
                "cell type {:?} does not match field type {:?}",
                cell.get_type(),
                self.schema.get_field_type(i)
            )));
        }
        self.cells[i] = Some(cell);
        Ok(())
    }

    /// Swap the schema of the tuple. All cells are cleared.
    pub fn reset_schema(&mut self, schema: &Schema) {
        self.cells = vec![None; schema.fields_count()];
        self.schema = schema.clone();
        self.record_id = None;
    }

    pub fn get_record_id(&self) -> Option<RecordID> {
        self.record_id
    }

    pub fn set_record_id(&mut self, rid: Option<RecordID>) {
        self.record_id = rid;
    }

    /// Compare against a row of expected int values, cell by cell.
    pub fn equal_cells(&self, expect: &[i32]) -> bool {
        if self.cells.len() != expect.len() {
            return false;
        }
        for (i, v) in expect.iter().enumerate() {
            if self.get_cell(i) != Cell::Int(*v) {
                return false;
            }
        }
        true
    }

    /// Concatenate the cells of two tuples under the merged schema.
    pub fn merge(left: &Tuple, right: &Tuple) -> Tuple {
        let schema = Schema::merge(left.get_schema(), right.get_schema());
        let mut cells = left.get_cells();
        cells.extend(right.get_cells());
        Tuple::new_from_cells(&schema, &cells)
    }
}

impl Encodeable for Tuple {
    fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::new();
        for i in 0..self.cells.len() {
            bytes.extend(self.get_cell(i).to_bytes());
        }
        bytes
    }
}

// Equality on cell values only; schema names and record id do not matter.
impl PartialEq for Tuple {
    fn eq(&self, other: &Self) -> bool {
        self.cells == other.cells
    }
}

impl Eq for Tuple {}

impl fmt::Display for Tuple {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut content: String = "{".to_owned();
        for cell in &self.cells {
            match cell {
                Some(c) => content.push_str(&format!("{:?}, ", c)),
                None => content.push_str("<unset>, "),
            }
        }
        content = content.trim_end_matches(", ").to_string();
        content.push('}');
        write!(f, "{}", content)
    }
}

impl fmt::Debug for Tuple {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self)
    }
}
