//! In-memory store.
//!
//! [`MemoryStore`] keeps one [`MockedRepository`] of JSON records per entity
//! name. It backs fixtures that must not touch a real database and doubles as
//! a store for tests: every transaction it opens is journaled together with
//! the isolation level it was requested with and how it ended.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::{Map, Value};

use crate::error::{DbError, DbResult};
use crate::isolation::IsolationLevel;
use crate::work::{Store, Transaction, UnitOfWork, WorkScope};

/// Records of one entity, keyed by integer id.
#[derive(Debug, Clone)]
pub struct MockedRepository {
	entity: String,
	pk_counter: i64,
	records: BTreeMap<i64, Map<String, Value>>,
}

impl MockedRepository {
	pub fn new(entity: impl Into<String>) -> Self {
		Self {
			entity: entity.into(),
			pk_counter: 0,
			records: BTreeMap::new(),
		}
	}

	pub fn entity(&self) -> &str {
		&self.entity
	}

	/// Stores `record`.
	///
	/// A record without an id (or with `null`/`0`) gets the next id of this
	/// repository. A record with an id that is not stored yet is inserted as
	/// given. A record with a stored id is merged field by field into the
	/// stored one.
	pub fn save(&mut self, record: Value) -> DbResult<Value> {
		let Value::Object(mut fields) = record else {
			return Err(DbError::invalid_record(&self.entity, "expected a JSON object"));
		};

		match self.record_id(&fields)? {
			None => {
				self.pk_counter += 1;
				let id = self.pk_counter;
				fields.insert("id".to_string(), Value::from(id));
				self.records.insert(id, fields.clone());
				Ok(Value::Object(fields))
			}
			Some(id) => match self.records.get_mut(&id) {
				Some(stored) => {
					stored.extend(fields);
					Ok(Value::Object(stored.clone()))
				}
				None => {
					self.records.insert(id, fields.clone());
					Ok(Value::Object(fields))
				}
			},
		}
	}

	pub fn find_by_id(&self, id: i64) -> Option<Value> {
		self.records.get(&id).cloned().map(Value::Object)
	}

	/// Returns the stored records among `ids`, skipping unknown ones.
	pub fn find_by_ids(&self, ids: &[i64]) -> Vec<Value> {
		ids.iter().filter_map(|id| self.find_by_id(*id)).collect()
	}

	pub fn remove(&mut self, id: i64) -> Option<Value> {
		self.records.remove(&id).map(Value::Object)
	}

	/// Drops every record. The id counter keeps counting.
	pub fn clear(&mut self) {
		self.records.clear();
	}

	pub fn all(&self) -> Vec<Value> {
		self.records.values().cloned().map(Value::Object).collect()
	}

	pub fn len(&self) -> usize {
		self.records.len()
	}

	pub fn is_empty(&self) -> bool {
		self.records.is_empty()
	}

	fn record_id(&self, fields: &Map<String, Value>) -> DbResult<Option<i64>> {
		match fields.get("id") {
			None | Some(Value::Null) => Ok(None),
			Some(value) => match value.as_i64() {
				Some(0) => Ok(None),
				Some(id) => Ok(Some(id)),
				None => Err(DbError::invalid_record(
					&self.entity,
					format!("id must be an integer, got {value}"),
				)),
			},
		}
	}
}

/// How a journaled transaction ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionOutcome {
	Open,
	Committed,
	RolledBack,
}

/// One transaction opened on a [`MemoryStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransactionRecord {
	/// Requested isolation, `None` for the store default.
	pub isolation: Option<IsolationLevel>,
	pub outcome: TransactionOutcome,
}

#[derive(Debug, Default)]
struct MemoryState {
	repositories: RwLock<HashMap<String, MockedRepository>>,
	journal: RwLock<Vec<TransactionRecord>>,
}

/// Shared in-memory store. Clones share the same data.
///
/// Transactions snapshot every repository when they begin and restore the
/// snapshot on rollback, so only one transaction should be open at a time.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
	state: Arc<MemoryState>,
}

impl MemoryStore {
	pub fn new() -> Self {
		Self::default()
	}

	/// Returns a handle that reports itself as [`WorkScope::Mocked`].
	pub fn mocked_work(&self) -> MemoryWork {
		MemoryWork {
			state: Arc::clone(&self.state),
			scope: WorkScope::Mocked,
		}
	}

	/// Returns a copy of the repository for `entity`, if anything was saved
	/// to it.
	pub fn repository(&self, entity: &str) -> Option<MockedRepository> {
		self.state.repositories.read().get(entity).cloned()
	}

	/// Returns every record of `entity` ordered by id.
	pub fn records(&self, entity: &str) -> Vec<Value> {
		self.state
			.repositories
			.read()
			.get(entity)
			.map(MockedRepository::all)
			.unwrap_or_default()
	}

	/// Returns the journal of transactions opened so far.
	pub fn transactions(&self) -> Vec<TransactionRecord> {
		self.state.journal.read().clone()
	}

	/// Drops every repository and the transaction journal.
	pub fn reset(&self) {
		self.state.repositories.write().clear();
		self.state.journal.write().clear();
	}

	fn set_outcome(&self, index: usize, outcome: TransactionOutcome) {
		if let Some(record) = self.state.journal.write().get_mut(index) {
			record.outcome = outcome;
		}
	}
}

#[async_trait]
impl Store for MemoryStore {
	fn ambient(&self) -> Box<dyn UnitOfWork> {
		Box::new(MemoryWork {
			state: Arc::clone(&self.state),
			scope: WorkScope::Ambient,
		})
	}

	async fn begin(&self, level: Option<IsolationLevel>) -> DbResult<Box<dyn Transaction>> {
		let snapshot = self.state.repositories.read().clone();
		let index = {
			let mut journal = self.state.journal.write();
			journal.push(TransactionRecord {
				isolation: level,
				outcome: TransactionOutcome::Open,
			});
			journal.len() - 1
		};
		tracing::debug!(isolation = ?level, "began in-memory transaction");

		Ok(Box::new(MemoryTransaction {
			store: self.clone(),
			work: MemoryWork {
				state: Arc::clone(&self.state),
				scope: WorkScope::Transaction(level),
			},
			snapshot,
			index,
		}))
	}
}

/// Unit of work over a [`MemoryStore`].
///
/// Raw SQL is not understood: `execute` and `fetch_all` return
/// [`DbError::Unsupported`].
#[derive(Debug, Clone)]
pub struct MemoryWork {
	state: Arc<MemoryState>,
	scope: WorkScope,
}

#[async_trait]
impl UnitOfWork for MemoryWork {
	fn scope(&self) -> WorkScope {
		self.scope
	}

	async fn execute(&mut self, _sql: &str, _params: Vec<Value>) -> DbResult<u64> {
		Err(DbError::Unsupported(
			"raw SQL is not available in memory".to_string(),
		))
	}

	async fn fetch_all(&mut self, _sql: &str, _params: Vec<Value>) -> DbResult<Vec<Value>> {
		Err(DbError::Unsupported(
			"raw SQL is not available in memory".to_string(),
		))
	}

	async fn save(&mut self, entity: &str, record: Value) -> DbResult<Value> {
		self.state
			.repositories
			.write()
			.entry(entity.to_string())
			.or_insert_with(|| MockedRepository::new(entity))
			.save(record)
	}

	async fn find(&mut self, entity: &str, id: i64) -> DbResult<Option<Value>> {
		Ok(self
			.state
			.repositories
			.read()
			.get(entity)
			.and_then(|repository| repository.find_by_id(id)))
	}

	async fn remove(&mut self, entity: &str, id: i64) -> DbResult<bool> {
		Ok(self
			.state
			.repositories
			.write()
			.get_mut(entity)
			.and_then(|repository| repository.remove(id))
			.is_some())
	}
}

struct MemoryTransaction {
	store: MemoryStore,
	work: MemoryWork,
	snapshot: HashMap<String, MockedRepository>,
	index: usize,
}

#[async_trait]
impl UnitOfWork for MemoryTransaction {
	fn scope(&self) -> WorkScope {
		self.work.scope()
	}

	async fn execute(&mut self, sql: &str, params: Vec<Value>) -> DbResult<u64> {
		self.work.execute(sql, params).await
	}

	async fn fetch_all(&mut self, sql: &str, params: Vec<Value>) -> DbResult<Vec<Value>> {
		self.work.fetch_all(sql, params).await
	}

	async fn save(&mut self, entity: &str, record: Value) -> DbResult<Value> {
		self.work.save(entity, record).await
	}

	async fn find(&mut self, entity: &str, id: i64) -> DbResult<Option<Value>> {
		self.work.find(entity, id).await
	}

	async fn remove(&mut self, entity: &str, id: i64) -> DbResult<bool> {
		self.work.remove(entity, id).await
	}
}

#[async_trait]
impl Transaction for MemoryTransaction {
	fn as_work(&mut self) -> &mut dyn UnitOfWork {
		self
	}

	async fn commit(self: Box<Self>) -> DbResult<()> {
		self.store.set_outcome(self.index, TransactionOutcome::Committed);
		tracing::debug!("committed in-memory transaction");
		Ok(())
	}

	async fn rollback(self: Box<Self>) -> DbResult<()> {
		let MemoryTransaction {
			store,
			snapshot,
			index,
			..
		} = *self;
		*store.state.repositories.write() = snapshot;
		store.set_outcome(index, TransactionOutcome::RolledBack);
		tracing::debug!("rolled back in-memory transaction");
		Ok(())
	}
}
