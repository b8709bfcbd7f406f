//! Transaction isolation.

use std::fmt;
use std::str::FromStr;

use crate::error::DbError;

/// Transaction isolation level.
///
/// # Examples
///
/// ```
/// use seedbed_db::IsolationLevel;
///
/// assert_eq!(IsolationLevel::Serializable.to_sql(), "SERIALIZABLE");
/// assert_eq!(
/// 	"read committed".parse::<IsolationLevel>().unwrap(),
/// 	IsolationLevel::ReadCommitted
/// );
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum IsolationLevel {
	/// Allows dirty reads, non-repeatable reads, and phantom reads.
	ReadUncommitted,
	/// Prevents dirty reads but allows non-repeatable reads and phantom reads.
	#[default]
	ReadCommitted,
	/// Prevents dirty reads and non-repeatable reads but allows phantom reads.
	RepeatableRead,
	/// Transactions are fully serializable.
	Serializable,
}

impl IsolationLevel {
	/// SQL spelling, as used in `SET TRANSACTION ISOLATION LEVEL ...`.
	pub fn to_sql(&self) -> &'static str {
		match self {
			IsolationLevel::ReadUncommitted => "READ UNCOMMITTED",
			IsolationLevel::ReadCommitted => "READ COMMITTED",
			IsolationLevel::RepeatableRead => "REPEATABLE READ",
			IsolationLevel::Serializable => "SERIALIZABLE",
		}
	}
}

impl fmt::Display for IsolationLevel {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.to_sql())
	}
}

impl FromStr for IsolationLevel {
	type Err = DbError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let normalized = s.trim().replace(['_', '-'], " ").to_ascii_uppercase();
		match normalized.as_str() {
			"READ UNCOMMITTED" => Ok(IsolationLevel::ReadUncommitted),
			"READ COMMITTED" => Ok(IsolationLevel::ReadCommitted),
			"REPEATABLE READ" => Ok(IsolationLevel::RepeatableRead),
			"SERIALIZABLE" => Ok(IsolationLevel::Serializable),
			_ => Err(DbError::InvalidIsolationLevel(s.to_string())),
		}
	}
}

/// How a fixture's install step is scoped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Isolation {
	/// Runs on the ambient handle, no transaction is opened.
	#[default]
	None,
	/// Runs in a transaction using the store's default isolation level.
	Default,
	/// Runs in a transaction with the given isolation level.
	Level(IsolationLevel),
}

impl Isolation {
	pub fn needs_transaction(&self) -> bool {
		!matches!(self, Isolation::None)
	}

	/// The level to request from the store, `None` meaning its default.
	pub fn level(&self) -> Option<IsolationLevel> {
		match self {
			Isolation::Level(level) => Some(*level),
			Isolation::None | Isolation::Default => None,
		}
	}
}

impl From<IsolationLevel> for Isolation {
	fn from(level: IsolationLevel) -> Self {
		Isolation::Level(level)
	}
}

impl FromStr for Isolation {
	type Err = DbError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim().to_ascii_lowercase().as_str() {
			"" | "none" => Ok(Isolation::None),
			"default" => Ok(Isolation::Default),
			_ => s.parse().map(Isolation::Level),
		}
	}
}

impl fmt::Display for Isolation {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Isolation::None => f.write_str("none"),
			Isolation::Default => f.write_str("default"),
			Isolation::Level(level) => level.fmt(f),
		}
	}
}
