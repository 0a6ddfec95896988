use itertools::Itertools;

use crate::{
    error::TinyError,
    execution::OpIterator,
    storage::{schema::Schema, tuple::Tuple},
    types::TinyResult,
};

/// Materializes the child and yields its tuples sorted by one field.
pub struct OrderBy {
    child: Box<dyn OpIterator>,
    field_index: usize,
    ascending: bool,
    schema: Schema,

    tuples: Vec<Tuple>,
    cursor: usize,
}

impl OrderBy {
    pub fn new(
        child: Box<dyn OpIterator>,
        field_index: usize,
        ascending: bool,
    ) -> Self {
        let schema = child.get_schema().clone();
        Self {
            child,
            field_index,
            ascending,
            schema,
            tuples: Vec::new(),
            cursor: 0,
        }
    }

    pub fn set_children(&mut self, mut children: Vec<Box<dyn OpIterator>>) {
        assert_eq!(children.len(), 1);
        self.child = children.remove(0);
        self.schema = self.child.get_schema().clone();
        self.tuples.clear();
        self.cursor = 0;
    }
}

impl OpIterator for OrderBy {
    fn open(&mut self) -> TinyResult {
        if self.field_index >= self.schema.fields_count() {
            return Err(TinyError::db(&format!(
                "order-by field index {} out of range of schema {}",
                self.field_index, self.schema
            )));
        }

        self.child.open()?;
        let mut drained = Vec::new();
        while self.child.has_next()? {
            drained.push(self.child.next()?);
        }

        let field_index = self.field_index;
        let ascending = self.ascending;
        self.tuples = drained
            .into_iter()
            .sorted_by(|a, b| {
                let ord = a.get_cell(field_index).cmp(&b.get_cell(field_index));
                if ascending {
                    ord
                } else {
                    ord.reverse()
                }
            })
            .collect();
        self.cursor = 0;
        Ok(())
    }

    fn has_next(&mut self) -> Result<bool, TinyError> {
        Ok(self.cursor < self.tuples.len())
    }

    fn next(&mut self) -> Result<Tuple, TinyError> {
        if self.cursor >= self.tuples.len() {
            return Err(TinyError::no_such_element());
        }
        let t = self.tuples[self.cursor].clone();
        self.cursor += 1;
        Ok(t)
    }

    fn rewind(&mut self) -> TinyResult {
        self.cursor = 0;
        Ok(())
    }

    fn close(&mut self) -> TinyResult {
        self.tuples.clear();
        self.cursor = 0;
        self.child.close()
    }

    fn get_schema(&self) -> &Schema {
        &self.schema
    }
}
