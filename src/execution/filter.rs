use crate::{
    error::TinyError,
    execution::OpIterator,
    predicate::Predicate,
    storage::{schema::Schema, tuple::Tuple},
    types::TinyResult,
};

/// Yields the child tuples matching the predicate.
pub struct Filter {
    predicate: Predicate,
    child: Box<dyn OpIterator>,
    schema: Schema,
    next_tuple: Option<Tuple>,
}

impl Filter {
    pub fn new(predicate: Predicate, child: Box<dyn OpIterator>) -> Self {
        let schema = child.get_schema().clone();
        Self {
            predicate,
            child,
            schema,
            next_tuple: None,
        }
    }

    pub fn set_children(&mut self, mut children: Vec<Box<dyn OpIterator>>) {
        assert_eq!(children.len(), 1);
        self.child = children.remove(0);
        self.schema = self.child.get_schema().clone();
        self.next_tuple = None;
    }

    fn fetch_next(&mut self) -> Result<Option<Tuple>, TinyError> {
        while self.child.has_next()? {
            let t = self.child.next()?;
            if self.predicate.filter(&t) {
                return Ok(Some(t));
            }
        }
        Ok(None)
    }
}

impl OpIterator for Filter {
    fn open(&mut self) -> TinyResult {
        if self.predicate.field_index >= self.schema.fields_count() {
            return Err(TinyError::db(&format!(
                "predicate field index {} out of range of schema {}",
                self.predicate.field_index, self.schema
            )));
        }
        self.next_tuple = None;
        self.child.open()
    }

    fn has_next(&mut self) -> Result<bool, TinyError> {
        if self.next_tuple.is_none() {
            self.next_tuple = self.fetch_next()?;
        }
        Ok(self.next_tuple.is_some())
    }

    fn next(&mut self) -> Result<Tuple, TinyError> {
        if !self.has_next()? {
            return Err(TinyError::no_such_element());
        }
        Ok(self.next_tuple.take().unwrap())
    }

    fn rewind(&mut self) -> TinyResult {
        self.next_tuple = None;
        self.child.rewind()
    }

    fn close(&mut self) -> TinyResult {
        self.next_tuple = None;
        self.child.close()
    }

    fn get_schema(&self) -> &Schema {
        &self.schema
    }
}
