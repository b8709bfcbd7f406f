//! Declarations of factories and fixtures.
//!
//! A declaration carries everything the registry needs about a factory or
//! fixture type without knowing the type: its key, its dependency keys, its
//! isolation and a constructor. Declarations come from a
//! [`DeclarationSource`](crate::discovery::DeclarationSource) or are added to
//! [`FixtureRootOptions`](crate::root::FixtureRootOptions) directly.

use std::any::{Any, type_name};
use std::fmt;
use std::sync::Arc;

use seedbed_db::Isolation;
use seedbed_graph::DependencyDeclaration;

use crate::bridge::Lookup;
use crate::error::{SeedingError, SeedingResult};
use crate::factory::{Factory, FactoryRef};
use crate::fixture::{AnyStaticFixture, DynamicFixture, FixtureRef, StaticFixture};
use crate::key::{FixtureKind, factory_key};

/// Builds a factory and wraps it into a type-erased `FactoryRef`.
pub type FactoryBuilder = fn(Lookup) -> Arc<dyn Any + Send + Sync>;

#[derive(Clone)]
pub struct FactoryDeclaration {
	key: String,
	entity: &'static str,
	factory: &'static str,
	build: FactoryBuilder,
}

impl FactoryDeclaration {
	pub fn of<F: Factory>() -> Self {
		Self {
			key: factory_key::<F::Entity>(F::NAME),
			entity: type_name::<F::Entity>(),
			factory: type_name::<F>(),
			build: build_factory::<F>,
		}
	}

	pub fn key(&self) -> &str {
		&self.key
	}

	pub fn entity(&self) -> &'static str {
		self.entity
	}

	pub fn factory(&self) -> &'static str {
		self.factory
	}

	pub fn build(&self, lookup: Lookup) -> Arc<dyn Any + Send + Sync> {
		(self.build)(lookup)
	}
}

impl fmt::Debug for FactoryDeclaration {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("FactoryDeclaration")
			.field("key", &self.key)
			.field("entity", &self.entity)
			.field("factory", &self.factory)
			.finish_non_exhaustive()
	}
}

fn build_factory<F: Factory>(lookup: Lookup) -> Arc<dyn Any + Send + Sync> {
	Arc::new(FactoryRef::new(F::instantiate(lookup)))
}

/// Instantiates a fixture from a [`Lookup`].
#[derive(Clone, Copy)]
pub enum FixtureConstructor {
	Static(fn(Lookup) -> Box<dyn AnyStaticFixture>),
	Dynamic(fn(Lookup) -> Box<dyn Any + Send + Sync>),
}

fn construct_static<F: StaticFixture>(lookup: Lookup) -> Box<dyn AnyStaticFixture> {
	Box::new(F::instantiate(lookup))
}

fn construct_dynamic<D: DynamicFixture>(lookup: Lookup) -> Box<dyn Any + Send + Sync> {
	Box::new(D::instantiate(lookup))
}

#[derive(Clone)]
pub struct FixtureDeclaration {
	key: String,
	type_name: &'static str,
	dependencies: Vec<FixtureRef>,
	isolation: Isolation,
	constructor: FixtureConstructor,
}

impl FixtureDeclaration {
	pub fn of_static<F: StaticFixture>() -> Self {
		Self {
			key: F::key(),
			type_name: type_name::<F>(),
			dependencies: F::dependencies(),
			isolation: F::isolation(),
			constructor: FixtureConstructor::Static(construct_static::<F>),
		}
	}

	pub fn of_dynamic<D: DynamicFixture>() -> Self {
		Self {
			key: D::key(),
			type_name: type_name::<D>(),
			dependencies: D::dependencies(),
			isolation: D::isolation(),
			constructor: FixtureConstructor::Dynamic(construct_dynamic::<D>),
		}
	}

	pub fn key(&self) -> &str {
		&self.key
	}

	pub fn type_name(&self) -> &'static str {
		self.type_name
	}

	pub fn dependencies(&self) -> &[FixtureRef] {
		&self.dependencies
	}

	pub fn isolation(&self) -> Isolation {
		self.isolation
	}

	pub fn kind(&self) -> FixtureKind {
		match self.constructor {
			FixtureConstructor::Static(_) => FixtureKind::Static,
			FixtureConstructor::Dynamic(_) => FixtureKind::Dynamic,
		}
	}

	pub fn fixture_ref(&self) -> FixtureRef {
		FixtureRef::from_parts(self.key.clone(), self.kind(), self.type_name)
	}

	pub fn instantiate_static(&self, lookup: Lookup) -> SeedingResult<Box<dyn AnyStaticFixture>> {
		match self.constructor {
			FixtureConstructor::Static(construct) => Ok(construct(lookup)),
			FixtureConstructor::Dynamic(_) => Err(SeedingError::FixtureError(format!(
				"'{}' is a dynamic fixture",
				self.key
			))),
		}
	}

	pub fn instantiate_dynamic(&self, lookup: Lookup) -> SeedingResult<Box<dyn Any + Send + Sync>> {
		match self.constructor {
			FixtureConstructor::Dynamic(construct) => Ok(construct(lookup)),
			FixtureConstructor::Static(_) => Err(SeedingError::FixtureError(format!(
				"'{}' is a static fixture",
				self.key
			))),
		}
	}

	pub(crate) fn dependency_declaration(&self) -> DependencyDeclaration {
		DependencyDeclaration::new(
			self.key.clone(),
			self.dependencies.iter().map(|d| d.key().to_string()),
		)
	}
}

impl fmt::Debug for FixtureDeclaration {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("FixtureDeclaration")
			.field("key", &self.key)
			.field("kind", &self.kind())
			.field("dependencies", &self.dependencies)
			.field("isolation", &self.isolation)
			.finish_non_exhaustive()
	}
}

/// A factory or fixture declaration.
#[derive(Debug, Clone)]
pub enum Declaration {
	Factory(FactoryDeclaration),
	Fixture(FixtureDeclaration),
}

impl Declaration {
	pub fn factory<F: Factory>() -> Self {
		Declaration::Factory(FactoryDeclaration::of::<F>())
	}

	pub fn static_fixture<F: StaticFixture>() -> Self {
		Declaration::Fixture(FixtureDeclaration::of_static::<F>())
	}

	pub fn dynamic_fixture<D: DynamicFixture>() -> Self {
		Declaration::Fixture(FixtureDeclaration::of_dynamic::<D>())
	}

	pub fn key(&self) -> &str {
		match self {
			Declaration::Factory(factory) => factory.key(),
			Declaration::Fixture(fixture) => fixture.key(),
		}
	}
}

/// Declarations split by kind, each list in declaration order.
#[derive(Debug, Clone, Default)]
pub struct DeclarationSet {
	pub factories: Vec<FactoryDeclaration>,
	pub static_fixtures: Vec<FixtureDeclaration>,
	pub dynamic_fixtures: Vec<FixtureDeclaration>,
}

impl DeclarationSet {
	pub fn new(declarations: impl IntoIterator<Item = Declaration>) -> Self {
		let mut set = Self::default();
		for declaration in declarations {
			match declaration {
				Declaration::Factory(factory) => set.factories.push(factory),
				Declaration::Fixture(fixture) => match fixture.kind() {
					FixtureKind::Static => set.static_fixtures.push(fixture),
					FixtureKind::Dynamic => set.dynamic_fixtures.push(fixture),
				},
			}
		}
		set
	}

	/// Dynamic fixtures first, then static ones.
	pub fn fixtures(&self) -> impl Iterator<Item = &FixtureDeclaration> {
		self.dynamic_fixtures.iter().chain(&self.static_fixtures)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use async_trait::async_trait;
	use rstest::rstest;
	use seedbed_db::{IsolationLevel, UnitOfWork};

	struct Labels;

	#[async_trait]
	impl StaticFixture for Labels {
		type Output = ();
		const NAME: Option<&'static str> = Some("labels");

		fn instantiate(_lookup: Lookup) -> Self {
			Labels
		}

		async fn install(&self, _work: &mut dyn UnitOfWork) -> SeedingResult<()> {
			Ok(())
		}
	}

	struct Relabel;

	#[async_trait]
	impl DynamicFixture for Relabel {
		type Params = ();
		type Output = ();
		const NAME: Option<&'static str> = Some("relabel");

		fn dependencies() -> Vec<FixtureRef> {
			vec![FixtureRef::of_static::<Labels>()]
		}

		fn isolation() -> Isolation {
			Isolation::Level(IsolationLevel::ReadCommitted)
		}

		fn instantiate(_lookup: Lookup) -> Self {
			Relabel
		}

		async fn install(&self, _work: &mut dyn UnitOfWork, _params: ()) -> SeedingResult<()> {
			Ok(())
		}
	}

	#[rstest]
	fn test_fixture_declaration_captures_metadata() {
		let declaration = FixtureDeclaration::of_dynamic::<Relabel>();

		assert_eq!(declaration.key(), "FIXTURE_DYNAMIC_relabel");
		assert_eq!(declaration.kind(), FixtureKind::Dynamic);
		assert_eq!(
			declaration.isolation(),
			Isolation::Level(IsolationLevel::ReadCommitted)
		);
		assert_eq!(
			declaration.dependency_declaration(),
			DependencyDeclaration::new("FIXTURE_DYNAMIC_relabel", vec!["FIXTURE_STATIC_labels".to_string()])
		);
		assert_eq!(declaration.fixture_ref(), FixtureRef::of_dynamic::<Relabel>());
	}

	#[rstest]
	fn test_instantiate_checks_kind() {
		let labels = FixtureDeclaration::of_static::<Labels>();
		let relabel = FixtureDeclaration::of_dynamic::<Relabel>();

		assert!(labels.instantiate_static(Lookup::detached()).is_ok());
		assert!(labels.instantiate_dynamic(Lookup::detached()).is_err());
		let instance = relabel.instantiate_dynamic(Lookup::detached()).unwrap();
		assert!(instance.downcast::<Relabel>().is_ok());
	}

	#[rstest]
	fn test_declaration_set_lists_dynamic_fixtures_first() {
		let set = DeclarationSet::new([
			Declaration::static_fixture::<Labels>(),
			Declaration::dynamic_fixture::<Relabel>(),
		]);

		let keys: Vec<&str> = set.fixtures().map(|f| f.key()).collect();

		assert_eq!(keys, vec!["FIXTURE_DYNAMIC_relabel", "FIXTURE_STATIC_labels"]);
		assert!(set.factories.is_empty());
	}

	#[derive(Debug, PartialEq)]
	struct Label(String);

	struct LabelFactory;

	impl Factory for LabelFactory {
		type Entity = Label;
		const NAME: &'static str = "short";

		fn instantiate(_lookup: Lookup) -> Self {
			LabelFactory
		}

		fn create_random(&self) -> SeedingResult<Label> {
			Ok(Label("new".to_string()))
		}
	}

	#[rstest]
	fn test_factory_declaration_names_entity_and_factory() {
		let declaration = FactoryDeclaration::of::<LabelFactory>();

		let built = declaration.build(Lookup::detached());

		assert_eq!(declaration.key(), factory_key::<Label>("short"));
		assert_eq!(declaration.entity(), type_name::<Label>());
		assert_eq!(declaration.factory(), type_name::<LabelFactory>());
		let factory = built.downcast::<FactoryRef<Label>>().unwrap();
		assert_eq!(factory.random().unwrap(), Label("new".to_string()));
	}
}
