//! # Seedbed
//!
//! Factories and dependency-ordered fixtures for seeding test databases.
//!
//! Seedbed lets test code declare how to fabricate entities (factories) and
//! which data sets to install (fixtures), each fixture naming the fixtures it
//! depends on and the transaction isolation it needs. A [`FixtureRoot`]
//! resolves the install order, runs every fixture in a unit of work scoped to
//! its isolation, and caches the results so later fixtures and tests can read
//! them.
//!
//! ## Crates
//!
//! - [`graph`] (`seedbed-graph`) - dependency graph builder and constrained
//!   topological sort
//! - [`db`] (`seedbed-db`) - units of work, isolation scoping, in-memory and
//!   PostgreSQL stores
//! - [`fixtures`] (`seedbed-fixtures`) - factories, fixtures, orchestration
//!   and the root registry
//!
//! ## Feature Flags
//!
//! - `postgres` (default) - PostgreSQL store through sqlx
//! - `testcontainers` - integration tests against a PostgreSQL container
//!
//! ## Quick Example
//!
//! ```rust,ignore
//! use seedbed::prelude::*;
//!
//! #[derive(Debug, Clone, Serialize, Deserialize)]
//! struct User {
//!     id: Option<i64>,
//!     name: String,
//! }
//!
//! impl Entity for User {
//!     const TABLE: &'static str = "users";
//! }
//!
//! struct UsersFixture {
//!     lookup: Lookup,
//! }
//!
//! #[async_trait]
//! impl StaticFixture for UsersFixture {
//!     type Output = Vec<User>;
//!     const NAME: Option<&'static str> = Some("users");
//!
//!     fn instantiate(lookup: Lookup) -> Self {
//!         Self { lookup }
//!     }
//!
//!     async fn install(&self, work: &mut dyn UnitOfWork) -> SeedingResult<Vec<User>> {
//!         self.lookup.require_factory::<User>()?.saving(work).random_many(10).await
//!     }
//! }
//!
//! let store = PgStore::connect("postgres://localhost/test").await?;
//! let root = FixtureRoot::new(
//!     FixtureRootOptions::new(WorkProvider::scoped(store))
//!         .with_factory::<UserFactory>()
//!         .with_static_fixture::<UsersFixture>(),
//! );
//! root.load()?;
//! root.install_all().await?;
//! ```

pub mod db;
pub mod fixtures;
pub mod graph;

// Re-export the most used items at the top level
pub use seedbed_db::{
	DbError, Isolation, IsolationLevel, MemoryStore, Store, Transaction, UnitOfWork, WorkProvider,
	WorkScope,
};
#[cfg(feature = "postgres")]
pub use seedbed_db::PgStore;
pub use seedbed_fixtures::{
	Declaration, DynamicFixture, DynamicFixtureDelegate, Entity, Factory, FactoryRef,
	FixtureLoadFilters, FixtureRef, FixtureRoot, FixtureRootOptions, InstallReport, Lookup,
	SeedingError, SeedingResult, SeedingSettings, StaticFixture, register_dynamic_fixture,
	register_factory, register_static_fixture,
};
pub use seedbed_graph::{GraphError, resolve_load_order};

/// Prelude module for convenient imports
///
/// ```rust,ignore
/// use seedbed::prelude::*;
/// ```
pub mod prelude {
	pub use seedbed_fixtures::prelude::*;

	pub use crate::MemoryStore;
	#[cfg(feature = "postgres")]
	pub use crate::PgStore;

	// External
	pub use serde::{Deserialize, Serialize};
}
