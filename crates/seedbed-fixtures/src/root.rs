//! The fixture root: registry of factories and fixtures, and their results.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Weak};

use once_cell::sync::OnceCell;
use parking_lot::RwLock;
use seedbed_db::WorkProvider;

use crate::bridge::{Bridge, ErasedDelegate, Lookup};
use crate::declaration::{Declaration, DeclarationSet, FixtureDeclaration};
use crate::discovery::{DeclarationSource, InventorySource};
use crate::error::{SeedingError, SeedingResult};
use crate::factory::{Factory, FactoryRef};
use crate::fixture::{DynamicFixture, DynamicFixtureDelegate, FixtureRef, StaticFixture};
use crate::manager::{FixtureLoadFilters, FixtureManager, InstallReport};
use crate::settings::SeedingSettings;

/// Options for building a [`FixtureRoot`].
pub struct FixtureRootOptions {
	provider: WorkProvider,
	settings: SeedingSettings,
	source: Option<Box<dyn DeclarationSource>>,
	declarations: Vec<Declaration>,
}

impl FixtureRootOptions {
	pub fn new(provider: WorkProvider) -> Self {
		Self {
			provider,
			settings: SeedingSettings::default(),
			source: None,
			declarations: Vec::new(),
		}
	}

	pub fn with_settings(mut self, settings: SeedingSettings) -> Self {
		self.settings = settings;
		self
	}

	/// Replaces discovery through `settings.module_patterns`.
	pub fn with_source(mut self, source: impl DeclarationSource + 'static) -> Self {
		self.source = Some(Box::new(source));
		self
	}

	/// Adds a declaration on top of the discovered ones.
	pub fn with_declaration(mut self, declaration: Declaration) -> Self {
		self.declarations.push(declaration);
		self
	}

	pub fn with_declarations(mut self, declarations: impl IntoIterator<Item = Declaration>) -> Self {
		self.declarations.extend(declarations);
		self
	}

	pub fn with_factory<F: Factory>(self) -> Self {
		self.with_declaration(Declaration::factory::<F>())
	}

	pub fn with_static_fixture<F: StaticFixture>(self) -> Self {
		self.with_declaration(Declaration::static_fixture::<F>())
	}

	pub fn with_dynamic_fixture<D: DynamicFixture>(self) -> Self {
		self.with_declaration(Declaration::dynamic_fixture::<D>())
	}
}

impl fmt::Debug for FixtureRootOptions {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("FixtureRootOptions")
			.field("provider", &self.provider)
			.field("settings", &self.settings)
			.field("source", &self.source.is_some())
			.field("declarations", &self.declarations)
			.finish()
	}
}

/// Everything known after [`FixtureRoot::load`].
struct Registry {
	factory_keys: Vec<String>,
	fixtures: DeclarationSet,
	dynamic_fixtures: HashMap<String, FixtureDeclaration>,
}

impl Registry {
	fn declares(&self, key: &str) -> bool {
		self.fixtures.fixtures().any(|fixture| fixture.key() == key)
	}
}

struct RootInner {
	this: Weak<RootInner>,
	provider: WorkProvider,
	settings: SeedingSettings,
	source: Option<Box<dyn DeclarationSource>>,
	declarations: Vec<Declaration>,
	registry: OnceCell<Registry>,
	/// Filled one factory at a time while loading, so later factories see
	/// earlier ones.
	factories: RwLock<HashMap<String, Arc<dyn Any + Send + Sync>>>,
	results: RwLock<HashMap<String, Arc<dyn Any + Send + Sync>>>,
}

impl RootInner {
	fn lookup(&self) -> Lookup {
		Lookup::new(Arc::new(RootBridge {
			root: self.this.clone(),
		}))
	}

	fn registry(&self) -> SeedingResult<&Registry> {
		self.registry.get().ok_or(SeedingError::NotLoaded)
	}

	fn build_registry(&self) -> SeedingResult<Registry> {
		let mut declarations = match &self.source {
			Some(source) => source.discover()?,
			None => InventorySource::new(self.settings.module_patterns.iter().cloned())?.discover()?,
		};
		declarations.extend(self.declarations.iter().cloned());
		let fixtures = DeclarationSet::new(declarations);

		let lookup = self.lookup();
		let mut factory_keys = Vec::with_capacity(fixtures.factories.len());
		for factory in &fixtures.factories {
			let built = factory.build(lookup.clone());
			let replaced = self
				.factories
				.write()
				.insert(factory.key().to_string(), built)
				.is_some();
			if replaced {
				tracing::warn!(factory = factory.key(), "factory declared twice, keeping the last one");
			} else {
				factory_keys.push(factory.key().to_string());
			}
		}

		let dynamic_fixtures = fixtures
			.dynamic_fixtures
			.iter()
			.map(|fixture| (fixture.key().to_string(), fixture.clone()))
			.collect();

		tracing::info!(
			factories = factory_keys.len(),
			static_fixtures = fixtures.static_fixtures.len(),
			dynamic_fixtures = fixtures.dynamic_fixtures.len(),
			"fixture root loaded"
		);
		Ok(Registry {
			factory_keys,
			fixtures,
			dynamic_fixtures,
		})
	}

	fn factory(&self, key: &str) -> Option<Arc<dyn Any + Send + Sync>> {
		self.factories.read().get(key).cloned()
	}

	fn fixture_result(&self, key: &str) -> SeedingResult<Option<Arc<dyn Any + Send + Sync>>> {
		if !self.registry()?.declares(key) {
			return Err(SeedingError::UnknownFixture(key.to_string()));
		}
		Ok(self.results.read().get(key).cloned())
	}

	fn dynamic_fixture(&self, key: &str) -> Option<ErasedDelegate> {
		let declaration = self.registry.get()?.dynamic_fixtures.get(key)?;
		let instance = declaration.instantiate_dynamic(self.lookup()).ok()?;
		let provider = if self.settings.mock_dynamic_fixtures {
			WorkProvider::mocked()
		} else {
			self.provider.clone()
		};
		Some(ErasedDelegate { instance, provider })
	}
}

/// Bridge handed to factories and fixtures. Holds the root weakly, since the
/// root owns the factories.
struct RootBridge {
	root: Weak<RootInner>,
}

impl Bridge for RootBridge {
	fn factory(&self, key: &str) -> Option<Arc<dyn Any + Send + Sync>> {
		self.root.upgrade()?.factory(key)
	}

	fn fixture_result(&self, key: &str) -> SeedingResult<Option<Arc<dyn Any + Send + Sync>>> {
		self.root
			.upgrade()
			.ok_or(SeedingError::NotLoaded)?
			.fixture_result(key)
	}

	fn dynamic_fixture(&self, key: &str) -> Option<ErasedDelegate> {
		self.root.upgrade()?.dynamic_fixture(key)
	}
}

/// Registry of factories and fixtures for one database.
///
/// # Example
///
/// ```ignore
/// let root = FixtureRoot::new(
///     FixtureRootOptions::new(WorkProvider::scoped(store))
///         .with_factory::<UserFactory>()
///         .with_static_fixture::<UsersFixture>(),
/// );
/// root.load()?;
/// root.install_fixtures(FixtureLoadFilters::new()).await?;
///
/// let users = root.fixture_result_of::<UsersFixture>()?;
/// ```
#[derive(Clone)]
pub struct FixtureRoot {
	inner: Arc<RootInner>,
}

impl FixtureRoot {
	pub fn new(options: FixtureRootOptions) -> Self {
		let FixtureRootOptions {
			provider,
			settings,
			source,
			declarations,
		} = options;
		let inner = Arc::new_cyclic(|this| RootInner {
			this: this.clone(),
			provider,
			settings,
			source,
			declarations,
			registry: OnceCell::new(),
			factories: RwLock::new(HashMap::new()),
			results: RwLock::new(HashMap::new()),
		});
		Self { inner }
	}

	/// A root discovering its declarations through `settings.module_patterns`.
	pub fn from_settings(settings: SeedingSettings, provider: WorkProvider) -> Self {
		Self::new(FixtureRootOptions::new(provider).with_settings(settings))
	}

	pub fn settings(&self) -> &SeedingSettings {
		&self.inner.settings
	}

	pub fn provider(&self) -> &WorkProvider {
		&self.inner.provider
	}

	/// Discovers declarations and instantiates factories.
	///
	/// Only the first successful call does anything.
	pub fn load(&self) -> SeedingResult<()> {
		self.inner
			.registry
			.get_or_try_init(|| self.inner.build_registry())?;
		Ok(())
	}

	pub fn is_loaded(&self) -> bool {
		self.inner.registry.get().is_some()
	}

	/// Installs static fixtures selected by `filters`, caching their results.
	pub async fn install_fixtures(&self, filters: FixtureLoadFilters) -> SeedingResult<InstallReport> {
		let registry = self.inner.registry()?;
		let lookup = self.inner.lookup();
		let sink = Arc::clone(&self.inner);
		let manager = FixtureManager::new(
			&registry.fixtures,
			self.inner.provider.clone(),
			move |declaration| declaration.instantiate_static(lookup.clone()),
			move |key, output| {
				sink.results.write().insert(key.to_string(), output);
			},
		);
		manager.load_all(&filters).await
	}

	/// Installs every static fixture.
	pub async fn install_all(&self) -> SeedingResult<InstallReport> {
		self.install_fixtures(FixtureLoadFilters::new()).await
	}

	/// Forgets cached fixture results. Declarations and factories are kept.
	pub fn clear_fixture_result(&self) {
		self.inner.results.write().clear();
	}

	pub fn lookup(&self) -> Lookup {
		self.inner.lookup()
	}

	pub fn factory_of<E: Send + 'static>(&self) -> Option<FactoryRef<E>> {
		self.lookup().factory_of::<E>()
	}

	pub fn factory_named<E: Send + 'static>(&self, name: &str) -> Option<FactoryRef<E>> {
		self.lookup().factory_named::<E>(name)
	}

	pub fn fixture_result_of<F: StaticFixture>(&self) -> SeedingResult<Option<Arc<F::Output>>> {
		self.lookup().fixture_result_of::<F>()
	}

	pub fn fixture_result(&self, fixture: &FixtureRef) -> SeedingResult<Option<Arc<dyn Any + Send + Sync>>> {
		self.inner.fixture_result(fixture.key())
	}

	pub fn dynamic_fixture_of<D: DynamicFixture>(&self) -> Option<DynamicFixtureDelegate<D>> {
		self.lookup().dynamic_fixture_of::<D>()
	}

	/// Keys of all declared fixtures, dynamic ones first.
	pub fn fixture_keys(&self) -> Vec<String> {
		self.inner
			.registry
			.get()
			.map(|registry| {
				registry
					.fixtures
					.fixtures()
					.map(|fixture| fixture.key().to_string())
					.collect()
			})
			.unwrap_or_default()
	}

	pub fn factory_keys(&self) -> Vec<String> {
		self.inner
			.registry
			.get()
			.map(|registry| registry.factory_keys.clone())
			.unwrap_or_default()
	}
}

impl fmt::Debug for FixtureRoot {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("FixtureRoot")
			.field("provider", &self.inner.provider)
			.field("loaded", &self.is_loaded())
			.field("results", &self.inner.results.read().len())
			.finish()
	}
}
