use crate::{
    error::TinyError,
    execution::OpIterator,
    predicate::JoinPredicate,
    storage::{schema::Schema, tuple::Tuple},
    types::TinyResult,
};

/// Tuple nested-loops join. Emits left cells followed by right cells for
/// every pair matching the predicate, in stable left-outer order.
pub struct Join {
    predicate: JoinPredicate,
    left: Box<dyn OpIterator>,
    right: Box<dyn OpIterator>,
    schema: Schema,

    current_left: Option<Tuple>,
    next_tuple: Option<Tuple>,
}

impl Join {
    pub fn new(
        predicate: JoinPredicate,
        left: Box<dyn OpIterator>,
        right: Box<dyn OpIterator>,
    ) -> Self {
        let schema = Schema::merge(left.get_schema(), right.get_schema());
        Self {
            predicate,
            left,
            right,
            schema,
            current_left: None,
            next_tuple: None,
        }
    }

    pub fn set_children(&mut self, mut children: Vec<Box<dyn OpIterator>>) {
        assert_eq!(children.len(), 2);
        self.right = children.remove(1);
        self.left = children.remove(0);
        self.schema =
            Schema::merge(self.left.get_schema(), self.right.get_schema());
        self.current_left = None;
        self.next_tuple = None;
    }

    fn fetch_next(&mut self) -> Result<Option<Tuple>, TinyError> {
        loop {
            if self.current_left.is_none() {
                if !self.left.has_next()? {
                    return Ok(None);
                }
                self.current_left = Some(self.left.next()?);
                self.right.rewind()?;
            }

            let left = self.current_left.as_ref().unwrap().clone();
            while self.right.has_next()? {
                let right = self.right.next()?;
                if self.predicate.filter(&left, &right) {
                    return Ok(Some(Tuple::merge(&left, &right)));
                }
            }

            // inner exhausted, advance the outer side
            self.current_left = None;
        }
    }
}

impl OpIterator for Join {
    fn open(&mut self) -> TinyResult {
        if self.predicate.field_index1
            >= self.left.get_schema().fields_count()
            || self.predicate.field_index2
                >= self.right.get_schema().fields_count()
        {
            return Err(TinyError::db(
                "join predicate field index out of range",
            ));
        }
        self.current_left = None;
        self.next_tuple = None;
        self.left.open()?;
        self.right.open()
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
        self.left.rewind()?;
        self.right.rewind()?;
        self.current_left = None;
        self.next_tuple = None;
        Ok(())
    }

    fn close(&mut self) -> TinyResult {
        self.current_left = None;
        self.next_tuple = None;
        self.left.close()?;
        self.right.close()
    }

    fn get_schema(&self) -> &Schema {
        &self.schema
    }
}
