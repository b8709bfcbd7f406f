//! Scoped units of work.
//!
//! [`WorkProvider::open`] turns an [`Isolation`] requirement into a handle:
//! the ambient handle when no isolation is declared, otherwise a transaction
//! at the requested level. [`ScopedWork::finish`] then commits or rolls back
//! depending on the outcome of the work done through it.
//!
//! ```
//! # use seedbed_db::{Isolation, MemoryStore, WorkProvider, DbError};
//! # use serde_json::json;
//! # tokio_test::block_on(async {
//! let provider = WorkProvider::scoped(MemoryStore::new());
//! let mut scoped = provider.open(Isolation::Default).await?;
//! let outcome = scoped.work().save("users", json!({ "name": "alice" })).await;
//! let saved = scoped.finish(outcome).await?;
//! assert_eq!(saved["id"], 1);
//! # Ok::<(), DbError>(())
//! # }).unwrap();
//! ```

use std::fmt;
use std::sync::Arc;

use crate::error::DbError;
use crate::isolation::Isolation;
use crate::memory::MemoryStore;
use crate::work::{Store, Transaction, UnitOfWork};

/// Hands out units of work scoped to a fixture's isolation requirement.
#[derive(Clone)]
pub enum WorkProvider {
	/// Opens handles on a real store.
	Scoped(Arc<dyn Store>),
	/// Opens in-memory handles and never starts a transaction.
	Mocked(MemoryStore),
}

impl WorkProvider {
	pub fn scoped(store: impl Store + 'static) -> Self {
		WorkProvider::Scoped(Arc::new(store))
	}

	/// A provider backed by a fresh in-memory store.
	pub fn mocked() -> Self {
		WorkProvider::Mocked(MemoryStore::new())
	}

	pub fn is_mocked(&self) -> bool {
		matches!(self, WorkProvider::Mocked(_))
	}

	/// Opens a unit of work for `isolation`.
	pub async fn open(&self, isolation: Isolation) -> Result<ScopedWork, DbError> {
		match self {
			WorkProvider::Mocked(store) => Ok(ScopedWork::Mocked(Box::new(store.mocked_work()))),
			WorkProvider::Scoped(store) => match isolation {
				Isolation::None => Ok(ScopedWork::Ambient(store.ambient())),
				Isolation::Default | Isolation::Level(_) => {
					let tx = store.begin(isolation.level()).await?;
					tracing::debug!(%isolation, "opened transactional unit of work");
					Ok(ScopedWork::Transaction(tx))
				}
			},
		}
	}
}

impl fmt::Debug for WorkProvider {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			WorkProvider::Scoped(_) => f.write_str("WorkProvider::Scoped(..)"),
			WorkProvider::Mocked(store) => f.debug_tuple("WorkProvider::Mocked").field(store).finish(),
		}
	}
}

/// A unit of work opened by a [`WorkProvider`].
pub enum ScopedWork {
	Ambient(Box<dyn UnitOfWork>),
	Transaction(Box<dyn Transaction>),
	Mocked(Box<dyn UnitOfWork>),
}

impl ScopedWork {
	pub fn work(&mut self) -> &mut dyn UnitOfWork {
		match self {
			ScopedWork::Ambient(work) | ScopedWork::Mocked(work) => work.as_mut(),
			ScopedWork::Transaction(tx) => tx.as_work(),
		}
	}

	pub fn is_transaction(&self) -> bool {
		matches!(self, ScopedWork::Transaction(_))
	}

	/// Ends the unit of work according to `outcome`.
	///
	/// Transactions are committed on `Ok` and rolled back on `Err`. A failed
	/// commit turns the outcome into an error; a failed rollback is logged
	/// and the original error is returned.
	pub async fn finish<T, E>(self, outcome: Result<T, E>) -> Result<T, E>
	where
		E: From<DbError>,
	{
		let ScopedWork::Transaction(tx) = self else {
			return outcome;
		};
		match outcome {
			Ok(value) => {
				tx.commit().await?;
				Ok(value)
			}
			Err(error) => {
				if let Err(rollback_error) = tx.rollback().await {
					tracing::warn!(error = %rollback_error, "failed to roll back unit of work");
				}
				Err(error)
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::isolation::IsolationLevel;
	use crate::memory::{TransactionOutcome, TransactionRecord};
	use crate::work::WorkScope;
	use rstest::rstest;
	use serde_json::json;

	#[rstest]
	#[case(Isolation::None, WorkScope::Ambient)]
	#[case(Isolation::Default, WorkScope::Transaction(None))]
	#[case(
		Isolation::Level(IsolationLevel::Serializable),
		WorkScope::Transaction(Some(IsolationLevel::Serializable))
	)]
	#[tokio::test]
	async fn test_open_scopes_by_isolation(#[case] isolation: Isolation, #[case] scope: WorkScope) {
		let provider = WorkProvider::scoped(MemoryStore::new());

		let mut scoped = provider.open(isolation).await.unwrap();

		assert_eq!(scoped.work().scope(), scope);
		assert_eq!(scoped.is_transaction(), isolation.needs_transaction());
	}

	#[rstest]
	#[tokio::test]
	async fn test_ambient_work_opens_no_transaction() {
		let store = MemoryStore::new();
		let provider = WorkProvider::Scoped(Arc::new(store.clone()));

		let scoped = provider.open(Isolation::None).await.unwrap();
		scoped.finish(Ok::<_, DbError>(())).await.unwrap();

		assert!(store.transactions().is_empty());
	}

	#[rstest]
	#[tokio::test]
	async fn test_finish_commits_on_success() {
		// Arrange
		let store = MemoryStore::new();
		let provider = WorkProvider::Scoped(Arc::new(store.clone()));
		let mut scoped = provider
			.open(Isolation::Level(IsolationLevel::RepeatableRead))
			.await
			.unwrap();

		// Act
		let outcome = scoped.work().save("users", json!({ "name": "a" })).await;
		scoped.finish(outcome).await.unwrap();

		// Assert
		assert_eq!(store.records("users").len(), 1);
		assert_eq!(
			store.transactions(),
			vec![TransactionRecord {
				isolation: Some(IsolationLevel::RepeatableRead),
				outcome: TransactionOutcome::Committed,
			}]
		);
	}

	#[rstest]
	#[tokio::test]
	async fn test_finish_rolls_back_on_error() {
		let store = MemoryStore::new();
		let provider = WorkProvider::Scoped(Arc::new(store.clone()));
		let mut scoped = provider.open(Isolation::Default).await.unwrap();

		scoped
			.work()
			.save("users", json!({ "name": "a" }))
			.await
			.unwrap();
		let outcome: Result<(), DbError> = Err(DbError::TransactionError("boom".into()));
		let result = scoped.finish(outcome).await;

		assert!(result.is_err());
		assert!(store.records("users").is_empty());
		assert_eq!(store.transactions()[0].outcome, TransactionOutcome::RolledBack);
	}

	#[rstest]
	#[tokio::test]
	async fn test_mocked_provider_ignores_isolation() {
		let provider = WorkProvider::mocked();

		let mut scoped = provider
			.open(Isolation::Level(IsolationLevel::Serializable))
			.await
			.unwrap();

		assert!(!scoped.is_transaction());
		assert_eq!(scoped.work().scope(), WorkScope::Mocked);
		let WorkProvider::Mocked(store) = &provider else {
			unreachable!()
		};
		assert!(store.transactions().is_empty());
	}
}
