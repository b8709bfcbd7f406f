//! Factories, fixtures and the fixture root.
//!
//! See [`seedbed_fixtures`] for the full documentation.

pub use seedbed_fixtures::*;
