mod aggregate;
mod delete;
mod filter;
mod insert;
mod join;
mod order_by;
mod project;
mod seq_scan;

pub use aggregate::*;
pub use delete::*;
pub use filter::*;
pub use insert::*;
pub use join::*;
pub use order_by::*;
pub use project::*;
pub use seq_scan::*;

use crate::{
    error::TinyError,
    storage::{schema::Schema, tuple::Tuple},
    types::TinyResult,
};

/// The uniform pull contract of the operator tree.
///
/// Operators are constructed closed; `open` prepares them (and their
/// children) for iteration, `close` tears the state down and a closed
/// operator may be opened again. `next` on an exhausted operator fails
/// with `NoSuchElement`.
pub trait OpIterator {
    fn open(&mut self) -> TinyResult;

    fn has_next(&mut self) -> Result<bool, TinyError>;

    fn next(&mut self) -> Result<Tuple, TinyError>;

    fn rewind(&mut self) -> TinyResult;

    fn close(&mut self) -> TinyResult;

    fn get_schema(&self) -> &Schema;
}
