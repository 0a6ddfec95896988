pub mod buffer_pool;
pub mod catalog;
pub mod database;
pub mod error;
pub mod execution;
pub mod histogram;
pub mod io;
pub mod predicate;
pub mod storage;
pub mod transaction;
pub mod types;
pub mod utils;

pub use buffer_pool::BufferPool;
pub use catalog::Catalog;
pub use database::Database;
pub use error::{ErrorKind, TinyError};
pub use predicate::{JoinPredicate, Op, Predicate};
pub use storage::heap::{HeapFile, HeapFileIterator, HeapPage, HeapPageID};
pub use storage::schema::{small_int_schema, FieldItem, Schema, Type};
pub use storage::tuple::{Cell, RecordID, Tuple};
pub use transaction::{Permission, Transaction};
