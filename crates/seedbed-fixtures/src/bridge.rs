//! Access from factories and fixtures back to the registry that built them.
//!
//! Factories and fixtures receive a [`Lookup`] when they are instantiated.
//! Behind it sits a [`Bridge`], normally the owning
//! [`FixtureRoot`](crate::root::FixtureRoot). Tests can plug in their own
//! bridge to instantiate a fixture in isolation.

use std::any::{Any, type_name};
use std::fmt;
use std::sync::Arc;

use seedbed_db::WorkProvider;

use crate::error::{SeedingError, SeedingResult};
use crate::factory::FactoryRef;
use crate::fixture::{DynamicFixture, DynamicFixtureDelegate, StaticFixture};
use crate::key::{DEFAULT_FACTORY_NAME, factory_key};

/// A dynamic fixture instance together with the provider it installs through.
pub struct ErasedDelegate {
	pub instance: Box<dyn Any + Send + Sync>,
	pub provider: WorkProvider,
}

/// Key-based, type-erased view of a registry.
pub trait Bridge: Send + Sync {
	/// Factory stored under `key`, as a `FactoryRef<E>`.
	fn factory(&self, key: &str) -> Option<Arc<dyn Any + Send + Sync>>;

	/// Cached output of the static fixture `key`.
	///
	/// `Ok(None)` means the fixture is known but not installed.
	fn fixture_result(&self, key: &str) -> SeedingResult<Option<Arc<dyn Any + Send + Sync>>>;

	/// Fresh instance of the dynamic fixture `key`.
	fn dynamic_fixture(&self, key: &str) -> Option<ErasedDelegate>;
}

/// Bridge that knows nothing. Used by [`Lookup::detached`].
struct DetachedBridge;

impl Bridge for DetachedBridge {
	fn factory(&self, _key: &str) -> Option<Arc<dyn Any + Send + Sync>> {
		None
	}

	fn fixture_result(&self, _key: &str) -> SeedingResult<Option<Arc<dyn Any + Send + Sync>>> {
		Err(SeedingError::NotLoaded)
	}

	fn dynamic_fixture(&self, _key: &str) -> Option<ErasedDelegate> {
		None
	}
}

/// Typed lookups of factories, fixture results and dynamic fixtures.
#[derive(Clone)]
pub struct Lookup {
	bridge: Arc<dyn Bridge>,
}

impl Lookup {
	pub fn new(bridge: Arc<dyn Bridge>) -> Self {
		Self { bridge }
	}

	/// A lookup outside of any registry.
	pub fn detached() -> Self {
		Self::new(Arc::new(DetachedBridge))
	}

	/// Default factory of `E`.
	pub fn factory_of<E: Send + 'static>(&self) -> Option<FactoryRef<E>> {
		self.factory_named(DEFAULT_FACTORY_NAME)
	}

	pub fn factory_named<E: Send + 'static>(&self, name: &str) -> Option<FactoryRef<E>> {
		let key = factory_key::<E>(name);
		self.bridge
			.factory(&key)?
			.downcast_ref::<FactoryRef<E>>()
			.cloned()
	}

	/// Like [`Lookup::factory_of`], failing with
	/// [`SeedingError::FactoryNotFound`].
	pub fn require_factory<E: Send + 'static>(&self) -> SeedingResult<FactoryRef<E>> {
		self.require_factory_named(DEFAULT_FACTORY_NAME)
	}

	pub fn require_factory_named<E: Send + 'static>(&self, name: &str) -> SeedingResult<FactoryRef<E>> {
		self.factory_named(name)
			.ok_or_else(|| SeedingError::FactoryNotFound(factory_key::<E>(name)))
	}

	/// Cached output of `F`, `None` until `F` has been installed.
	pub fn fixture_result_of<F: StaticFixture>(&self) -> SeedingResult<Option<Arc<F::Output>>> {
		let key = F::key();
		match self.bridge.fixture_result(&key)? {
			Some(value) => downcast_result::<F::Output>(key, value).map(Some),
			None => Ok(None),
		}
	}

	/// Like [`Lookup::fixture_result_of`], failing with
	/// [`SeedingError::FixtureResultMissing`] when `F` is not installed.
	pub fn require_result<F: StaticFixture>(&self) -> SeedingResult<Arc<F::Output>> {
		self.fixture_result_of::<F>()?
			.ok_or_else(|| SeedingError::FixtureResultMissing(F::key()))
	}

	pub fn dynamic_fixture_of<D: DynamicFixture>(&self) -> Option<DynamicFixtureDelegate<D>> {
		let ErasedDelegate { instance, provider } = self.bridge.dynamic_fixture(&D::key())?;
		let instance = instance.downcast::<D>().ok()?;
		Some(DynamicFixtureDelegate::new(*instance, provider))
	}
}

impl fmt::Debug for Lookup {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Lookup").finish_non_exhaustive()
	}
}

pub(crate) fn downcast_result<T: Send + Sync + 'static>(
	key: String,
	value: Arc<dyn Any + Send + Sync>,
) -> SeedingResult<Arc<T>> {
	value
		.downcast::<T>()
		.map_err(|_| SeedingError::ResultTypeMismatch {
			key,
			expected: type_name::<T>(),
		})
}
