//! Convenience re-exports for common usage.
//!
//! ```ignore
//! use seedbed_fixtures::prelude::*;
//! ```

// Error types
pub use crate::error::{SeedingError, SeedingResult};

// Factories
pub use crate::factory::{Entity, Factory, FactoryRef};

// Fixtures
pub use crate::fixture::{DynamicFixture, DynamicFixtureDelegate, FixtureRef, StaticFixture};

// Root
pub use crate::bridge::Lookup;
pub use crate::manager::{FixtureLoadFilters, InstallReport};
pub use crate::root::{FixtureRoot, FixtureRootOptions};
pub use crate::settings::SeedingSettings;

// Units of work
pub use seedbed_db::{Isolation, IsolationLevel, UnitOfWork, WorkProvider};

// Registration macros
pub use crate::{register_dynamic_fixture, register_factory, register_static_fixture};

pub use async_trait::async_trait;
