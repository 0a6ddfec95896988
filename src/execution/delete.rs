use crate::{
    database::Database,
    error::TinyError,
    execution::OpIterator,
    storage::{
        schema::{FieldItem, Schema, Type},
        tuple::{Cell, Tuple},
    },
    transaction::Transaction,
    types::TinyResult,
};

/// Deletes every tuple produced by the child (located by record id) and
/// reports the count, symmetric to `Insert`.
pub struct Delete {
    tx: Transaction,
    child: Box<dyn OpIterator>,
    schema: Schema,

    next_tuple: Option<Tuple>,
    done: bool,
}

impl Delete {
    pub fn new(tx: &Transaction, child: Box<dyn OpIterator>) -> Self {
        Self {
            tx: tx.clone(),
            child,
            schema: Schema::new(vec![FieldItem::anonymous(Type::Int)]),
            next_tuple: None,
            done: false,
        }
    }

    pub fn set_children(&mut self, mut children: Vec<Box<dyn OpIterator>>) {
        assert_eq!(children.len(), 1);
        self.child = children.remove(0);
        self.next_tuple = None;
        self.done = false;
    }

    fn fetch_next(&mut self) -> Result<Option<Tuple>, TinyError> {
        if self.done {
            return Ok(None);
        }

        let buffer_pool = Database::buffer_pool();
        let mut count = 0;
        while self.child.has_next()? {
            let mut t = self.child.next()?;
            buffer_pool.delete_tuple(&self.tx, &mut t)?;
            count += 1;
        }

        self.done = true;
        Ok(Some(Tuple::new_from_cells(
            &self.schema,
            &[Cell::Int(count)],
        )))
    }
}

impl OpIterator for Delete {
    fn open(&mut self) -> TinyResult {
        self.next_tuple = None;
        self.done = false;
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
        self.done = false;
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
