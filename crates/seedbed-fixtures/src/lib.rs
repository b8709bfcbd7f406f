//! Factories and dependency-ordered fixtures for seeding test databases.
//!
//! This crate ties together the graph resolver of `seedbed-graph` and the
//! units of work of `seedbed-db`:
//!
//! - **Factories** ([`Factory`], [`FactoryRef`]) create random or partially
//!   specified entities, optionally persisting them
//! - **Static fixtures** ([`StaticFixture`]) declare dependencies and an
//!   isolation level, and are installed once in dependency order
//! - **Dynamic fixtures** ([`DynamicFixture`]) take parameters and are
//!   installed on demand through a [`DynamicFixtureDelegate`]
//! - **The root** ([`FixtureRoot`]) discovers declarations, instantiates
//!   factories, installs fixtures and caches their results
//!
//! # Quick Start
//!
//! ```ignore
//! use seedbed_fixtures::prelude::*;
//!
//! let root = FixtureRoot::new(
//!     FixtureRootOptions::new(WorkProvider::scoped(store))
//!         .with_factory::<UserFactory>()
//!         .with_static_fixture::<UsersFixture>()
//!         .with_static_fixture::<PostsFixture>(),
//! );
//! root.load()?;
//!
//! // Installs UsersFixture first, since PostsFixture depends on it.
//! root.install_fixtures(FixtureLoadFilters::only([FixtureRef::of_static::<PostsFixture>()])).await?;
//!
//! let posts = root.fixture_result_of::<PostsFixture>()?;
//! ```
//!
//! # Discovery
//!
//! Declarations can also register themselves with [`register_factory!`],
//! [`register_static_fixture!`] and [`register_dynamic_fixture!`], and be
//! discovered through [`SeedingSettings::module_patterns`]:
//!
//! ```toml
//! module_patterns = ["my_app::fixtures::*"]
//! mock_dynamic_fixtures = false
//! ```
//!
//! # Features
//!
//! - `postgres` - PostgreSQL store of `seedbed-db` (enabled by default)

pub mod bridge;
pub mod declaration;
pub mod discovery;
pub mod error;
pub mod factory;
pub mod fixture;
pub mod key;
pub mod manager;
pub mod prelude;
pub mod root;
pub mod settings;

#[doc(hidden)]
pub use inventory;

pub use bridge::{Bridge, ErasedDelegate, Lookup};
pub use declaration::{Declaration, DeclarationSet, FactoryDeclaration, FixtureDeclaration};
pub use discovery::{DeclarationList, DeclarationSource, InventorySource, Registration};
pub use error::{SeedingError, SeedingResult};
pub use factory::{Entity, EntityFactory, Factory, FactoryRef, Saving};
pub use fixture::{
	AnyStaticFixture, DynamicFixture, DynamicFixtureDelegate, FixtureRef, StaticFixture,
};
pub use key::{DEFAULT_FACTORY_NAME, FixtureKind, factory_key, fixture_key};
pub use manager::{FixtureLoadFilters, FixtureManager, InstallReport};
pub use root::{FixtureRoot, FixtureRootOptions};
pub use settings::SeedingSettings;
