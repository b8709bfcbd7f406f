//! Discovering declarations.
//!
//! Factories and fixtures register themselves at compile time with
//! [`register_factory!`](crate::register_factory),
//! [`register_static_fixture!`](crate::register_static_fixture) and
//! [`register_dynamic_fixture!`](crate::register_dynamic_fixture). Each
//! registration remembers the module it was made in, and an
//! [`InventorySource`] picks the registrations whose module matches one of
//! its glob patterns.
//!
//! ```ignore
//! mod fixtures {
//!     seedbed_fixtures::register_factory!(UserFactory);
//!     seedbed_fixtures::register_static_fixture!(UsersFixture);
//! }
//!
//! let source = InventorySource::new(["my_app::fixtures"])?;
//! ```

use globset::{Glob, GlobSet, GlobSetBuilder};

use crate::declaration::Declaration;
use crate::error::{SeedingError, SeedingResult};

/// Supplies the declarations a root loads.
pub trait DeclarationSource: Send + Sync {
	fn discover(&self) -> SeedingResult<Vec<Declaration>>;
}

/// A declaration submitted by one of the registration macros.
pub struct Registration {
	pub module_path: &'static str,
	pub declare: fn() -> Declaration,
}

inventory::collect!(Registration);

/// Declarations registered in modules matching any of the patterns.
#[derive(Debug, Clone)]
pub struct InventorySource {
	patterns: Vec<String>,
	matcher: GlobSet,
}

impl InventorySource {
	pub fn new<I, S>(patterns: I) -> SeedingResult<Self>
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		let patterns: Vec<String> = patterns.into_iter().map(Into::into).collect();
		let mut builder = GlobSetBuilder::new();
		for pattern in &patterns {
			let glob = Glob::new(pattern).map_err(|e| SeedingError::InvalidPattern {
				pattern: pattern.clone(),
				message: e.to_string(),
			})?;
			builder.add(glob);
		}
		let matcher = builder.build().map_err(|e| SeedingError::InvalidPattern {
			pattern: patterns.join(", "),
			message: e.to_string(),
		})?;
		Ok(Self { patterns, matcher })
	}

	pub fn patterns(&self) -> &[String] {
		&self.patterns
	}

	pub fn matches(&self, module_path: &str) -> bool {
		self.matcher.is_match(module_path)
	}
}

impl DeclarationSource for InventorySource {
	/// Matching declarations ordered by module path, then key.
	fn discover(&self) -> SeedingResult<Vec<Declaration>> {
		let mut found: Vec<(&'static str, Declaration)> = inventory::iter::<Registration>
			.into_iter()
			.filter(|registration| self.matches(registration.module_path))
			.map(|registration| (registration.module_path, (registration.declare)()))
			.collect();
		found.sort_by(|(a_path, a), (b_path, b)| a_path.cmp(b_path).then_with(|| a.key().cmp(b.key())));

		tracing::debug!(
			patterns = ?self.patterns,
			discovered = found.len(),
			"discovered registered declarations"
		);
		Ok(found.into_iter().map(|(_, declaration)| declaration).collect())
	}
}

/// A fixed list of declarations.
#[derive(Debug, Clone, Default)]
pub struct DeclarationList(Vec<Declaration>);

impl DeclarationList {
	pub fn new(declarations: impl IntoIterator<Item = Declaration>) -> Self {
		Self(declarations.into_iter().collect())
	}

	pub fn with(mut self, declaration: Declaration) -> Self {
		self.0.push(declaration);
		self
	}
}

impl DeclarationSource for DeclarationList {
	fn discover(&self) -> SeedingResult<Vec<Declaration>> {
		Ok(self.0.clone())
	}
}

/// Registers a [`Factory`](crate::factory::Factory) for discovery.
#[macro_export]
macro_rules! register_factory {
	($factory:ty) => {
		$crate::inventory::submit! {
			$crate::discovery::Registration {
				module_path: ::core::module_path!(),
				declare: $crate::declaration::Declaration::factory::<$factory>,
			}
		}
	};
}

/// Registers a [`StaticFixture`](crate::fixture::StaticFixture) for discovery.
#[macro_export]
macro_rules! register_static_fixture {
	($fixture:ty) => {
		$crate::inventory::submit! {
			$crate::discovery::Registration {
				module_path: ::core::module_path!(),
				declare: $crate::declaration::Declaration::static_fixture::<$fixture>,
			}
		}
	};
}

/// Registers a [`DynamicFixture`](crate::fixture::DynamicFixture) for discovery.
#[macro_export]
macro_rules! register_dynamic_fixture {
	($fixture:ty) => {
		$crate::inventory::submit! {
			$crate::discovery::Registration {
				module_path: ::core::module_path!(),
				declare: $crate::declaration::Declaration::dynamic_fixture::<$fixture>,
			}
		}
	};
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	#[case("shop::fixtures::*", "shop::fixtures::users", true)]
	#[case("shop::fixtures::*", "shop::factories", false)]
	#[case("shop::fixtures", "shop::fixtures", true)]
	#[case("shop::fixtures", "shop::fixtures::users", false)]
	#[case("*::fixtures::*", "billing::fixtures::invoices", true)]
	fn test_pattern_matching(#[case] pattern: &str, #[case] module_path: &str, #[case] expected: bool) {
		let source = InventorySource::new([pattern]).unwrap();
		assert_eq!(source.matches(module_path), expected);
	}

	#[rstest]
	fn test_invalid_pattern() {
		let result = InventorySource::new(["shop::{fixtures"]);

		assert!(matches!(
			result,
			Err(SeedingError::InvalidPattern { pattern, .. }) if pattern == "shop::{fixtures"
		));
	}

	#[rstest]
	fn test_no_patterns_discover_nothing() {
		let source = InventorySource::new(Vec::<String>::new()).unwrap();

		assert!(source.discover().unwrap().is_empty());
	}
}
