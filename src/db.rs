//! Units of work and stores.

pub use seedbed_db::*;
