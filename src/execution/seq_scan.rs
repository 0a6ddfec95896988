use std::sync::Arc;

use crate::{
    database::Database,
    error::TinyError,
    execution::OpIterator,
    storage::{
        heap::{HeapFile, HeapFileIterator},
        schema::{FieldItem, Schema},
        tuple::Tuple,
    },
    transaction::Transaction,
    types::TinyResult,
};

/// Scans every live tuple of a table through the buffer pool under read
/// locks of the given transaction. Field names of the reported schema are
/// prefixed with the table alias.
pub struct SeqScan {
    tx: Transaction,
    file: Arc<HeapFile>,
    schema: Schema,
    iter: Option<HeapFileIterator>,
}

impl SeqScan {
    pub fn new(
        tx: &Transaction,
        table_id: u32,
        table_alias: &str,
    ) -> Result<Self, TinyError> {
        let file = Database::catalog().get_db_file(table_id)?;
        let schema = Self::alias_schema(file.get_schema(), table_alias);

        Ok(Self {
            tx: tx.clone(),
            file,
            schema,
            iter: None,
        })
    }

    fn alias_schema(schema: &Schema, alias: &str) -> Schema {
        if alias.is_empty() {
            return schema.clone();
        }
        let fields = schema
            .fields
            .iter()
            .map(|f| {
                FieldItem::new(
                    &format!("{}.{}", alias, f.field_name),
                    f.field_type,
                )
            })
            .collect();
        Schema::new(fields)
    }
}

impl OpIterator for SeqScan {
    fn open(&mut self) -> TinyResult {
        let mut iter = HeapFileIterator::new(Arc::clone(&self.file), &self.tx);
        iter.open()?;
        self.iter = Some(iter);
        Ok(())
    }

    fn has_next(&mut self) -> Result<bool, TinyError> {
        match self.iter.as_mut() {
            Some(iter) => iter.has_next(),
            None => Ok(false),
        }
    }

    fn next(&mut self) -> Result<Tuple, TinyError> {
        let iter = self
            .iter
            .as_mut()
            .ok_or_else(|| TinyError::db("scan is not open"))?;
        let t = iter.next()?;

        // re-tag with the aliased schema, keeping the record id
        let mut out = Tuple::new_from_cells(&self.schema, &t.get_cells());
        out.set_record_id(t.get_record_id());
        Ok(out)
    }

    fn rewind(&mut self) -> TinyResult {
        match self.iter.as_mut() {
            Some(iter) => iter.rewind(),
            None => Err(TinyError::db("scan is not open")),
        }
    }

    fn close(&mut self) -> TinyResult {
        if let Some(iter) = self.iter.as_mut() {
            iter.close();
        }
        self.iter = None;
        Ok(())
    }

    fn get_schema(&self) -> &Schema {
        &self.schema
    }
}
