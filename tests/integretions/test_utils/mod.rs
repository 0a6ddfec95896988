use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex, MutexGuard,
};

use once_cell::sync::Lazy;
use rand::Rng;

use tiny_db::{
    buffer_pool::{DEFAULT_PAGES, DEFAULT_PAGE_SIZE},
    error::TinyError,
    execution::OpIterator,
    small_int_schema, utils, BufferPool, Cell, Database, HeapFile, Schema,
    Transaction, Tuple,
};

// The engine state is process-wide (catalog, buffer pool, lock table), so
// the integration tests take turns instead of racing each other.
static TEST_LATCH: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

static TABLE_SEQ: AtomicUsize = AtomicUsize::new(0);

/// # Conduct the initialization
///
/// - Setting up log configurations.
/// - Reset the global database (catalog, buffer pool, lock table).
/// - Reset page size and buffer capacity.
///
/// Holds the returned guard for the whole test.
pub fn setup() -> MutexGuard<'static, ()> {
    let guard = TEST_LATCH.lock().unwrap_or_else(|e| e.into_inner());

    utils::init_log();
    BufferPool::set_page_size(DEFAULT_PAGE_SIZE);
    Database::reset();
    Database::buffer_pool().set_capacity(DEFAULT_PAGES);

    guard
}

/// Path of a fresh data file under the system temp directory. The old
/// file of a previous run is removed, heap files reuse existing bytes
/// otherwise.
pub fn new_data_path(hint: &str) -> String {
    let seq = TABLE_SEQ.fetch_add(1, Ordering::Relaxed);
    let path = std::env::temp_dir().join(format!(
        "tiny_db_{}_{}_{}.dat",
        hint,
        std::process::id(),
        seq
    ));
    let _ = std::fs::remove_file(&path);
    path.to_str().unwrap().to_string()
}

/// Create a table of `columns` int fields, register it under `name` and
/// fill it with `rows` random rows committed by one transaction.
///
/// The inserted rows are appended to `int_tuples` in insertion order.
pub fn new_random_heap_table(
    name: &str,
    columns: usize,
    rows: usize,
    int_tuples: &mut Vec<Vec<i32>>,
) -> Arc<HeapFile> {
    let schema = small_int_schema(columns, "");
    let table = Arc::new(
        HeapFile::new(&new_data_path(name), &schema).unwrap(),
    );
    Database::mut_catalog().add_table(Arc::clone(&table), name, "");

    let mut rng = rand::thread_rng();
    let tx = Transaction::new();
    for _ in 0..rows {
        let row: Vec<i32> =
            (0..columns).map(|_| rng.gen_range(-10000, 10000)).collect();
        let cells: Vec<Cell> = row.iter().map(|v| Cell::Int(*v)).collect();
        let mut tuple = Tuple::new_from_cells(&schema, &cells);
        Database::buffer_pool()
            .insert_tuple(&tx, table.get_id(), &mut tuple)
            .unwrap();
        int_tuples.push(row);
    }
    tx.commit().unwrap();

    table
}

/// Feeds a fixed list of tuples into an operator tree, the in-memory leaf
/// used when a scan would get in the way of what the test exercises.
pub struct TupleIterator {
    schema: Schema,
    tuples: Vec<Tuple>,
    cursor: usize,
    opened: bool,
}

impl TupleIterator {
    pub fn new(schema: &Schema, tuples: Vec<Tuple>) -> Self {
        Self {
            schema: schema.clone(),
            tuples,
            cursor: 0,
            opened: false,
        }
    }

    pub fn new_from_rows(schema: &Schema, rows: &[Vec<Cell>]) -> Self {
        let tuples = rows
            .iter()
            .map(|cells| Tuple::new_from_cells(schema, cells))
            .collect();
        Self::new(schema, tuples)
    }
}

impl OpIterator for TupleIterator {
    fn open(&mut self) -> Result<(), TinyError> {
        self.opened = true;
        self.cursor = 0;
        Ok(())
    }

    fn has_next(&mut self) -> Result<bool, TinyError> {
        Ok(self.opened && self.cursor < self.tuples.len())
    }

    fn next(&mut self) -> Result<Tuple, TinyError> {
        if !self.has_next()? {
            return Err(TinyError::no_such_element());
        }
        let t = self.tuples[self.cursor].clone();
        self.cursor += 1;
        Ok(t)
    }

    fn rewind(&mut self) -> Result<(), TinyError> {
        self.cursor = 0;
        Ok(())
    }

    fn close(&mut self) -> Result<(), TinyError> {
        self.opened = false;
        self.cursor = 0;
        Ok(())
    }

    fn get_schema(&self) -> &Schema {
        &self.schema
    }
}

/// Drain an operator and hand the produced tuples back.
pub fn collect_tuples(op: &mut dyn OpIterator) -> Vec<Tuple> {
    let mut out = Vec::new();
    while op.has_next().unwrap() {
        out.push(op.next().unwrap());
    }
    out
}
