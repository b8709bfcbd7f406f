//! Keys identifying factories and fixtures.
//!
//! A key is derived once from a type (and name) and is the only identity used
//! afterwards: graph nodes, caches and lookups are all keyed by it.
//!
//! - factories: `FACTORY_{entity type}_{name}`, the name defaulting to
//!   [`DEFAULT_FACTORY_NAME`]
//! - fixtures: `FIXTURE_{STATIC|DYNAMIC}_{name}`, the name defaulting to the
//!   fixture's type name, optionally followed by a per-type random suffix

use std::any::{TypeId, type_name};
use std::collections::HashMap;
use std::fmt;

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use uuid::Uuid;

/// Name used by factories that do not declare one.
pub const DEFAULT_FACTORY_NAME: &str = "default";

/// Per-type random key suffixes, generated on first use.
static UNIQUE_SUFFIXES: Lazy<RwLock<HashMap<TypeId, String>>> =
	Lazy::new(|| RwLock::new(HashMap::new()));

/// Whether a fixture is installed eagerly or on demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FixtureKind {
	/// Installed by `install_fixtures`, result cached.
	Static,
	/// Installed on demand with parameters, never cached.
	Dynamic,
}

impl FixtureKind {
	pub fn as_str(&self) -> &'static str {
		match self {
			FixtureKind::Static => "STATIC",
			FixtureKind::Dynamic => "DYNAMIC",
		}
	}
}

impl fmt::Display for FixtureKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Key of the factory named `name` for entity type `E`.
pub fn factory_key<E: 'static>(name: &str) -> String {
	format!("FACTORY_{}_{}", type_name::<E>(), name)
}

/// Key of fixture type `T`.
///
/// `name` replaces the type name when given. With `unique`, a random suffix
/// generated once per type and process is appended.
pub fn fixture_key<T: 'static>(kind: FixtureKind, name: Option<&str>, unique: bool) -> String {
	let name = name.unwrap_or_else(|| type_name::<T>());
	let mut key = format!("FIXTURE_{kind}_{name}");
	if unique {
		key.push('_');
		key.push_str(&unique_suffix::<T>());
	}
	key
}

fn unique_suffix<T: 'static>() -> String {
	let type_id = TypeId::of::<T>();
	if let Some(suffix) = UNIQUE_SUFFIXES.read().get(&type_id) {
		return suffix.clone();
	}
	UNIQUE_SUFFIXES
		.write()
		.entry(type_id)
		.or_insert_with(|| Uuid::new_v4().simple().to_string()[..8].to_string())
		.clone()
}
