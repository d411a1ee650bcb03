//! Document persistence: PostgreSQL or an in-process map.

mod documents;
mod pool;

pub use documents::*;
pub use pool::*;
