//! Error types for units of work and stores.

use thiserror::Error;

/// Errors raised by stores and units of work.
#[derive(Debug, Error)]
pub enum DbError {
	/// The operation is not available on this kind of store.
	#[error("Unsupported operation: {0}")]
	Unsupported(String),

	/// Transaction lifecycle failure.
	#[error("Transaction error: {0}")]
	TransactionError(String),

	/// A record could not be stored as given.
	#[error("Invalid record for '{entity}': {message}")]
	InvalidRecord {
		/// Entity (table) name.
		entity: String,
		/// What is wrong with the record.
		message: String,
	},

	/// Unknown isolation level name.
	#[error("Invalid isolation level: {0}")]
	InvalidIsolationLevel(String),

	/// JSON serialization/deserialization error.
	#[error("JSON error: {0}")]
	Serialization(#[from] serde_json::Error),

	/// Error reported by the PostgreSQL driver.
	#[cfg(feature = "postgres")]
	#[error("Database error: {0}")]
	Sqlx(#[from] sqlx::Error),
}

impl DbError {
	pub(crate) fn invalid_record(entity: &str, message: impl Into<String>) -> Self {
		DbError::InvalidRecord {
			entity: entity.to_string(),
			message: message.into(),
		}
	}
}

/// Result type alias for database operations.
pub type DbResult<T> = Result<T, DbError>;
