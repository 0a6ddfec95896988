pub mod heap;
pub mod schema;
pub mod tuple;
