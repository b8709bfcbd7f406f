//! Unit-of-work abstraction handed to fixtures.
//!
//! A unit of work is whatever a fixture writes through: the ambient
//! connection, an open transaction, or an in-memory mock. Records cross this
//! boundary as JSON objects so that stores stay independent of entity types.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::DbResult;
use crate::isolation::IsolationLevel;

/// What kind of handle a unit of work is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkScope {
	/// The ambient handle, outside of any transaction.
	Ambient,
	/// An open transaction; `None` means the store's default isolation.
	Transaction(Option<IsolationLevel>),
	/// An in-memory handle that never touches a database.
	Mocked,
}

#[async_trait]
pub trait UnitOfWork: Send {
	fn scope(&self) -> WorkScope;

	/// Executes a statement, returning the number of affected rows.
	async fn execute(&mut self, sql: &str, params: Vec<Value>) -> DbResult<u64>;

	/// Runs a query and returns each row as a JSON object.
	async fn fetch_all(&mut self, sql: &str, params: Vec<Value>) -> DbResult<Vec<Value>>;

	/// Inserts `record` into `entity`, or updates it when its `id` already
	/// exists. Returns the stored record, including a generated `id`.
	async fn save(&mut self, entity: &str, record: Value) -> DbResult<Value>;

	async fn find(&mut self, entity: &str, id: i64) -> DbResult<Option<Value>>;

	/// Deletes the record, returning whether it existed.
	async fn remove(&mut self, entity: &str, id: i64) -> DbResult<bool>;
}

/// A unit of work that must be committed or rolled back.
#[async_trait]
pub trait Transaction: UnitOfWork {
	fn as_work(&mut self) -> &mut dyn UnitOfWork;

	async fn commit(self: Box<Self>) -> DbResult<()>;

	async fn rollback(self: Box<Self>) -> DbResult<()>;
}

/// Source of units of work.
#[async_trait]
pub trait Store: Send + Sync {
	/// Returns a handle on the ambient connection.
	fn ambient(&self) -> Box<dyn UnitOfWork>;

	/// Opens a transaction, with the store's default isolation when `level`
	/// is `None`.
	async fn begin(&self, level: Option<IsolationLevel>) -> DbResult<Box<dyn Transaction>>;
}
