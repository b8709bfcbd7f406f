//! Units of work for seedbed fixtures.
//!
//! Fixtures write through a [`UnitOfWork`]. Depending on the isolation a
//! fixture declares, the [`WorkProvider`] hands it either the ambient handle
//! of a [`Store`] or a [`Transaction`] opened at the requested
//! [`IsolationLevel`]. A mocked provider hands out in-memory handles instead.
//!
//! # Stores
//!
//! - [`MemoryStore`]: JSON records held in memory, with snapshot/restore
//!   transactions and a journal of the transactions it opened
//! - [`PgStore`]: PostgreSQL through a sqlx pool (feature `postgres`, on by
//!   default)
//!
//! # Features
//!
//! - `postgres` - PostgreSQL store (enabled by default)
//! - `testcontainers` - integration tests against a PostgreSQL container

pub mod error;
pub mod isolation;
pub mod memory;
#[cfg(feature = "postgres")]
pub mod postgres;
pub mod scoped;
pub mod work;

pub use error::{DbError, DbResult};
pub use isolation::{Isolation, IsolationLevel};
pub use memory::{
	MemoryStore, MemoryWork, MockedRepository, TransactionOutcome, TransactionRecord,
};
#[cfg(feature = "postgres")]
pub use postgres::{PgStore, PgTransaction, PgWork};
pub use scoped::{ScopedWork, WorkProvider};
pub use work::{Store, Transaction, UnitOfWork, WorkScope};
