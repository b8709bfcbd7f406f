//! Static and dynamic fixtures.
//!
//! A [`StaticFixture`] is installed once by
//! [`FixtureRoot::install_fixtures`](crate::root::FixtureRoot::install_fixtures),
//! after every fixture it depends on. Its output is cached on the root so that
//! dependents can read it through [`Lookup::fixture_result_of`].
//!
//! A [`DynamicFixture`] takes parameters and is never installed eagerly. Test
//! code obtains a [`DynamicFixtureDelegate`] and installs it as often as
//! needed; outputs are returned to the caller and never cached.

use std::any::{Any, type_name};
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use seedbed_db::{Isolation, UnitOfWork, WorkProvider};

use crate::bridge::Lookup;
use crate::error::SeedingResult;
use crate::key::{FixtureKind, fixture_key};

/// A fixture installed once, in dependency order.
///
/// # Example
///
/// ```ignore
/// struct UsersFixture {
///     users: FactoryRef<User>,
/// }
///
/// #[async_trait]
/// impl StaticFixture for UsersFixture {
///     type Output = Vec<User>;
///     const NAME: Option<&'static str> = Some("users");
///
///     fn instantiate(lookup: Lookup) -> Self {
///         Self { users: lookup.factory_of::<User>().expect("user factory") }
///     }
///
///     async fn install(&self, work: &mut dyn UnitOfWork) -> SeedingResult<Vec<User>> {
///         self.users.saving(work).random_many(5).await
///     }
/// }
/// ```
#[async_trait]
pub trait StaticFixture: Send + Sync + Sized + 'static {
	/// Value produced by [`StaticFixture::install`] and cached on the root.
	type Output: Send + Sync + 'static;

	/// Replaces the type name in the fixture key.
	const NAME: Option<&'static str> = None;

	/// Appends a per-process random suffix to the key.
	const UNIQUE_KEY: bool = false;

	fn key() -> String {
		fixture_key::<Self>(FixtureKind::Static, Self::NAME, Self::UNIQUE_KEY)
	}

	/// Fixtures that must be installed before this one.
	fn dependencies() -> Vec<FixtureRef> {
		Vec::new()
	}

	/// Transaction requirement of [`StaticFixture::install`].
	fn isolation() -> Isolation {
		Isolation::None
	}

	fn instantiate(lookup: Lookup) -> Self;

	async fn install(&self, work: &mut dyn UnitOfWork) -> SeedingResult<Self::Output>;
}

/// A fixture installed on demand with parameters.
#[async_trait]
pub trait DynamicFixture: Send + Sync + Sized + 'static {
	type Params: Send + 'static;
	type Output: Send + 'static;

	const NAME: Option<&'static str> = None;
	const UNIQUE_KEY: bool = false;

	fn key() -> String {
		fixture_key::<Self>(FixtureKind::Dynamic, Self::NAME, Self::UNIQUE_KEY)
	}

	fn dependencies() -> Vec<FixtureRef> {
		Vec::new()
	}

	fn isolation() -> Isolation {
		Isolation::None
	}

	fn instantiate(lookup: Lookup) -> Self;

	async fn install(&self, work: &mut dyn UnitOfWork, params: Self::Params) -> SeedingResult<Self::Output>;
}

/// Type-erased [`StaticFixture`], as driven by the installer.
#[async_trait]
pub trait AnyStaticFixture: Send + Sync {
	async fn install_any(&self, work: &mut dyn UnitOfWork) -> SeedingResult<Arc<dyn Any + Send + Sync>>;
}

#[async_trait]
impl<F: StaticFixture> AnyStaticFixture for F {
	async fn install_any(&self, work: &mut dyn UnitOfWork) -> SeedingResult<Arc<dyn Any + Send + Sync>> {
		let output = self.install(work).await?;
		Ok(Arc::new(output))
	}
}

/// Names a fixture by key, e.g. in dependency lists and load filters.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FixtureRef {
	key: String,
	kind: FixtureKind,
	type_name: &'static str,
}

impl FixtureRef {
	pub fn of_static<F: StaticFixture>() -> Self {
		Self {
			key: F::key(),
			kind: FixtureKind::Static,
			type_name: type_name::<F>(),
		}
	}

	pub fn of_dynamic<D: DynamicFixture>() -> Self {
		Self {
			key: D::key(),
			kind: FixtureKind::Dynamic,
			type_name: type_name::<D>(),
		}
	}

	pub(crate) fn from_parts(key: String, kind: FixtureKind, type_name: &'static str) -> Self {
		Self { key, kind, type_name }
	}

	pub fn key(&self) -> &str {
		&self.key
	}

	pub fn kind(&self) -> FixtureKind {
		self.kind
	}

	pub fn type_name(&self) -> &'static str {
		self.type_name
	}
}

impl fmt::Display for FixtureRef {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.key)
	}
}

/// Installs a dynamic fixture through a unit of work scoped to its isolation.
pub struct DynamicFixtureDelegate<D> {
	instance: D,
	provider: WorkProvider,
}

impl<D: DynamicFixture> DynamicFixtureDelegate<D> {
	pub fn new(instance: D, provider: WorkProvider) -> Self {
		Self { instance, provider }
	}

	pub fn provider(&self) -> &WorkProvider {
		&self.provider
	}

	/// Installs through `provider` instead of the root's provider.
	pub fn with_provider(mut self, provider: WorkProvider) -> Self {
		self.provider = provider;
		self
	}

	/// Installs into a fresh in-memory store.
	pub fn mocked(self) -> Self {
		self.with_provider(WorkProvider::mocked())
	}

	/// Runs the fixture with `params`.
	///
	/// A transactional unit of work is committed when the fixture succeeds
	/// and rolled back when it fails.
	pub async fn install(&self, params: D::Params) -> SeedingResult<D::Output> {
		tracing::debug!(
			fixture = %D::key(),
			isolation = %D::isolation(),
			mocked = self.provider.is_mocked(),
			"installing dynamic fixture"
		);
		let mut scoped = self.provider.open(D::isolation()).await?;
		let outcome = self.instance.install(scoped.work(), params).await;
		scoped.finish(outcome).await
	}
}

impl<D> fmt::Debug for DynamicFixtureDelegate<D> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("DynamicFixtureDelegate")
			.field("fixture", &type_name::<D>())
			.field("provider", &self.provider)
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::error::SeedingError;
	use rstest::rstest;
	use seedbed_db::{IsolationLevel, MemoryStore, TransactionOutcome, WorkScope};
	use serde_json::{Value, json};

	struct Accounts;

	#[async_trait]
	impl StaticFixture for Accounts {
		type Output = Vec<Value>;
		const NAME: Option<&'static str> = Some("accounts");

		fn instantiate(_lookup: Lookup) -> Self {
			Accounts
		}

		async fn install(&self, work: &mut dyn UnitOfWork) -> SeedingResult<Vec<Value>> {
			let saved = work.save("accounts", json!({ "owner": "root" })).await?;
			Ok(vec![saved])
		}
	}

	struct Transfer;

	#[async_trait]
	impl DynamicFixture for Transfer {
		type Params = i64;
		type Output = (WorkScope, Value);

		fn isolation() -> Isolation {
			Isolation::Level(IsolationLevel::Serializable)
		}

		fn dependencies() -> Vec<FixtureRef> {
			vec![FixtureRef::of_static::<Accounts>()]
		}

		fn instantiate(_lookup: Lookup) -> Self {
			Transfer
		}

		async fn install(&self, work: &mut dyn UnitOfWork, amount: i64) -> SeedingResult<Self::Output> {
			if amount < 0 {
				return Err(SeedingError::FixtureError("negative amount".to_string()));
			}
			let saved = work.save("transfers", json!({ "amount": amount })).await?;
			Ok((work.scope(), saved))
		}
	}

	#[rstest]
	fn test_fixture_refs() {
		let accounts = FixtureRef::of_static::<Accounts>();
		let transfer = FixtureRef::of_dynamic::<Transfer>();

		assert_eq!(accounts.key(), "FIXTURE_STATIC_accounts");
		assert_eq!(accounts.kind(), FixtureKind::Static);
		assert_eq!(
			transfer.key(),
			format!("FIXTURE_DYNAMIC_{}", type_name::<Transfer>())
		);
		assert_eq!(Transfer::dependencies(), vec![accounts]);
	}

	#[rstest]
	#[tokio::test]
	async fn test_install_any_erases_output() {
		let store = MemoryStore::new();
		let mut work = store.mocked_work();

		let output = Accounts.install_any(&mut work).await.unwrap();

		let accounts = output.downcast::<Vec<Value>>().unwrap();
		assert_eq!(accounts[0]["id"], 1);
	}

	#[rstest]
	#[tokio::test]
	async fn test_delegate_installs_in_declared_isolation() {
		// Arrange
		let store = MemoryStore::new();
		let delegate = DynamicFixtureDelegate::new(Transfer, WorkProvider::scoped(store.clone()));

		// Act
		let (scope, saved) = delegate.install(25).await.unwrap();

		// Assert
		assert_eq!(scope, WorkScope::Transaction(Some(IsolationLevel::Serializable)));
		assert_eq!(saved["amount"], 25);
		assert_eq!(store.transactions()[0].outcome, TransactionOutcome::Committed);
		assert_eq!(store.records("transfers").len(), 1);
	}

	#[rstest]
	#[tokio::test]
	async fn test_delegate_rolls_back_failed_install() {
		let store = MemoryStore::new();
		let delegate = DynamicFixtureDelegate::new(Transfer, WorkProvider::scoped(store.clone()));

		let result = delegate.install(-1).await;

		assert!(matches!(result, Err(SeedingError::FixtureError(_))));
		assert_eq!(store.transactions()[0].outcome, TransactionOutcome::RolledBack);
	}

	#[rstest]
	#[tokio::test]
	async fn test_mocked_delegate_skips_transaction() {
		let store = MemoryStore::new();
		let delegate =
			DynamicFixtureDelegate::new(Transfer, WorkProvider::scoped(store.clone())).mocked();

		let (scope, _) = delegate.install(5).await.unwrap();

		assert_eq!(scope, WorkScope::Mocked);
		assert!(delegate.provider().is_mocked());
		assert!(store.transactions().is_empty());
		assert!(store.records("transfers").is_empty());
	}
}
