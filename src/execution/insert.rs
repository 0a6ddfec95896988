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

/// Drains the child on the first fetch, inserting every tuple into the
/// table through the buffer pool, and reports the inserted count as a
/// single one-column tuple. Further fetches find the operator exhausted.
pub struct Insert {
    tx: Transaction,
    child: Box<dyn OpIterator>,
    table_id: u32,
    schema: Schema,

    next_tuple: Option<Tuple>,
    done: bool,
}

impl Insert {
    pub fn new(
        tx: &Transaction,
        child: Box<dyn OpIterator>,
        table_id: u32,
    ) -> Result<Self, TinyError> {
        let table_schema = Database::catalog().get_schema(table_id)?;
        if child.get_schema() != &table_schema {
            return Err(TinyError::db(&format!(
                "child schema {} does not match table schema {}",
                child.get_schema(),
                table_schema
            )));
        }

        Ok(Self {
            tx: tx.clone(),
            child,
            table_id,
            schema: Schema::new(vec![FieldItem::anonymous(Type::Int)]),
            next_tuple: None,
            done: false,
        })
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
            buffer_pool.insert_tuple(&self.tx, self.table_id, &mut t)?;
            count += 1;
        }

        self.done = true;
        Ok(Some(Tuple::new_from_cells(
            &self.schema,
            &[Cell::Int(count)],
        )))
    }
}

impl OpIterator for Insert {
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
