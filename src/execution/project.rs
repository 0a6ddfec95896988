use crate::{
    error::TinyError,
    execution::OpIterator,
    storage::{
        schema::{FieldItem, Schema, Type},
        tuple::Tuple,
    },
    types::TinyResult,
};

/// Projects the child onto the given field list. Output field names come
/// from the child schema, types are the declared ones.
pub struct Project {
    field_indexes: Vec<usize>,
    child: Box<dyn OpIterator>,
    schema: Schema,
    next_tuple: Option<Tuple>,
}

impl Project {
    pub fn new(
        field_indexes: Vec<usize>,
        types: Vec<Type>,
        child: Box<dyn OpIterator>,
    ) -> Result<Self, TinyError> {
        if field_indexes.len() != types.len() {
            return Err(TinyError::db(&format!(
                "projection declares {} fields but {} types",
                field_indexes.len(),
                types.len()
            )));
        }
        if field_indexes.is_empty() {
            return Err(TinyError::db("projection onto zero fields"));
        }

        let child_schema = child.get_schema();
        let mut fields = Vec::new();
        for (i, t) in field_indexes.iter().zip(types.iter()) {
            if *i >= child_schema.fields_count() {
                return Err(TinyError::db(&format!(
                    "projected field index {} out of range of schema {}",
                    i, child_schema
                )));
            }
            fields.push(FieldItem::new(child_schema.get_field_name(*i), *t));
        }

        Ok(Self {
            field_indexes,
            child,
            schema: Schema::new(fields),
            next_tuple: None,
        })
    }

    pub fn set_children(&mut self, mut children: Vec<Box<dyn OpIterator>>) {
        assert_eq!(children.len(), 1);
        self.child = children.remove(0);
        self.next_tuple = None;
    }

    fn fetch_next(&mut self) -> Result<Option<Tuple>, TinyError> {
        if !self.child.has_next()? {
            return Ok(None);
        }
        let t = self.child.next()?;
        let cells: Vec<_> = self
            .field_indexes
            .iter()
            .map(|i| t.get_cell(*i))
            .collect();
        Ok(Some(Tuple::new_from_cells(&self.schema, &cells)))
    }
}

impl OpIterator for Project {
    fn open(&mut self) -> TinyResult {
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
