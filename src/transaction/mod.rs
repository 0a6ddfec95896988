mod concurrent_status;
mod tx;

pub use concurrent_status::*;
pub use tx::*;
