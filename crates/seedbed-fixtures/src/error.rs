//! Error types for the seeding module.
//!
//! This module defines the error types used throughout the seedbed-fixtures crate.

use seedbed_db::DbError;
use seedbed_graph::GraphError;
use thiserror::Error;

/// Errors that can occur during seeding operations.
#[derive(Debug, Error)]
pub enum SeedingError {
	/// Fixture declarations could not be resolved into an order.
	#[error(transparent)]
	Graph(#[from] GraphError),

	/// Unit-of-work or store failure.
	#[error(transparent)]
	Database(#[from] DbError),

	/// `install_fixtures` or a lookup was used before `load`.
	#[error("Fixtures are not loaded yet, call load() first")]
	NotLoaded,

	/// The key does not belong to any fixture declared to this root.
	#[error("Unknown fixture: {0}")]
	UnknownFixture(String),

	/// No factory is registered for the requested entity and name.
	#[error("Factory not found: {0}")]
	FactoryNotFound(String),

	/// A fixture result was required but the fixture has not been installed.
	#[error("Fixture result not found: {0}")]
	FixtureResultMissing(String),

	/// The cached result cannot be read as the requested type.
	#[error("Fixture result of '{key}' is not a {expected}")]
	ResultTypeMismatch {
		/// Fixture key.
		key: String,
		/// Requested output type.
		expected: &'static str,
	},

	/// Factory operation failed.
	#[error("Factory error: {0}")]
	FactoryError(String),

	/// Fixture install step failed.
	#[error("Fixture error: {0}")]
	FixtureError(String),

	/// A discovery pattern is not a valid glob.
	#[error("Invalid module pattern '{pattern}': {message}")]
	InvalidPattern {
		/// The offending pattern.
		pattern: String,
		/// Parser message.
		message: String,
	},

	/// Settings could not be read or parsed.
	#[error("Settings error: {0}")]
	Settings(String),

	/// I/O operation failed.
	#[error("IO error: {0}")]
	IoError(#[from] std::io::Error),

	/// JSON serialization/deserialization error.
	#[error("JSON error: {0}")]
	JsonError(#[from] serde_json::Error),

	/// Any other error raised by user code.
	#[error(transparent)]
	Other(#[from] anyhow::Error),
}

/// Result type alias for seeding operations.
pub type SeedingResult<T> = Result<T, SeedingError>;
