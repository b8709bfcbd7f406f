//! Installing static fixtures in dependency order.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use seedbed_db::WorkProvider;
use seedbed_graph::{DependencyDeclaration, SortOptions, resolve_load_order};

use crate::declaration::{DeclarationSet, FixtureDeclaration};
use crate::error::{SeedingError, SeedingResult};
use crate::fixture::{AnyStaticFixture, FixtureRef};
use crate::key::FixtureKind;

/// Restricts which fixtures [`FixtureManager::load_all`] installs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FixtureLoadFilters {
	/// Fixtures to install. All fixtures when `None`.
	pub only: Option<Vec<FixtureRef>>,
	/// Whether dependencies of `only` are installed too. Defaults to `true`.
	pub propagate_dependencies: Option<bool>,
}

impl FixtureLoadFilters {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn only(fixtures: impl IntoIterator<Item = FixtureRef>) -> Self {
		Self::new().with_only(fixtures)
	}

	pub fn with_only(mut self, fixtures: impl IntoIterator<Item = FixtureRef>) -> Self {
		self.only = Some(fixtures.into_iter().collect());
		self
	}

	pub fn with_propagate_dependencies(mut self, propagate: bool) -> Self {
		self.propagate_dependencies = Some(propagate);
		self
	}

	fn propagates(&self) -> bool {
		self.propagate_dependencies.unwrap_or(true)
	}
}

/// What a call to [`FixtureManager::load_all`] did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstallReport {
	/// Static fixtures installed, in installation order.
	pub installed: Vec<String>,
	/// Dynamic fixtures that came up in the order and were left alone.
	pub skipped_dynamic: Vec<String>,
}

type Instantiator = Box<dyn Fn(&FixtureDeclaration) -> SeedingResult<Box<dyn AnyStaticFixture>> + Send + Sync>;
type ResultSink = Box<dyn Fn(&str, Arc<dyn Any + Send + Sync>) + Send + Sync>;

/// Resolves the install order of a set of fixtures and installs them.
///
/// Instantiation and result storage are delegated to the caller, so the
/// manager itself keeps no state between calls.
pub struct FixtureManager {
	fixtures: HashMap<String, FixtureDeclaration>,
	declarations: Vec<DependencyDeclaration>,
	provider: WorkProvider,
	instantiate: Instantiator,
	on_result: ResultSink,
}

impl FixtureManager {
	pub fn new<I, S>(fixtures: &DeclarationSet, provider: WorkProvider, instantiate: I, on_result: S) -> Self
	where
		I: Fn(&FixtureDeclaration) -> SeedingResult<Box<dyn AnyStaticFixture>> + Send + Sync + 'static,
		S: Fn(&str, Arc<dyn Any + Send + Sync>) + Send + Sync + 'static,
	{
		let declarations = fixtures
			.fixtures()
			.map(FixtureDeclaration::dependency_declaration)
			.collect();
		let fixtures = fixtures
			.fixtures()
			.map(|fixture| (fixture.key().to_string(), fixture.clone()))
			.collect();
		Self {
			fixtures,
			declarations,
			provider,
			instantiate: Box::new(instantiate),
			on_result: Box::new(on_result),
		}
	}

	/// Install order of the fixtures selected by `filters`.
	///
	/// With `only` and propagation, the selected fixtures and everything they
	/// depend on are returned. Without propagation only the selected fixtures
	/// may be visited, so selecting a fixture whose dependencies are not
	/// selected fails with a forbidden traversal.
	pub fn resolve_order(&self, filters: &FixtureLoadFilters) -> SeedingResult<Vec<String>> {
		let options = match &filters.only {
			None => SortOptions::new(),
			Some(only) => {
				let keys = only
					.iter()
					.map(|fixture| {
						if self.fixtures.contains_key(fixture.key()) {
							Ok(fixture.key().to_string())
						} else {
							Err(SeedingError::UnknownFixture(fixture.key().to_string()))
						}
					})
					.collect::<SeedingResult<Vec<_>>>()?;
				let options = SortOptions::new().with_traversal_roots(keys.clone());
				if filters.propagates() {
					options
				} else {
					options.with_traversal_nodes(keys)
				}
			}
		};
		Ok(resolve_load_order(&self.declarations, &options)?)
	}

	/// Installs every static fixture selected by `filters`.
	///
	/// Each fixture runs in a unit of work opened for its isolation; its
	/// output goes to the result sink before the next fixture starts. The
	/// first failure stops the run.
	pub async fn load_all(&self, filters: &FixtureLoadFilters) -> SeedingResult<InstallReport> {
		let order = self.resolve_order(filters)?;
		tracing::debug!(?order, "resolved fixture install order");

		let mut report = InstallReport::default();
		for key in order {
			let Some(declaration) = self.fixtures.get(&key) else {
				return Err(SeedingError::UnknownFixture(key));
			};
			if declaration.kind() == FixtureKind::Dynamic {
				tracing::debug!(fixture = %key, "skipping dynamic fixture");
				report.skipped_dynamic.push(key);
				continue;
			}

			let fixture = (self.instantiate)(declaration)?;
			let mut scoped = self.provider.open(declaration.isolation()).await?;
			let outcome = fixture.install_any(scoped.work()).await;
			match scoped.finish(outcome).await {
				Ok(output) => {
					(self.on_result)(&key, output);
					tracing::info!(fixture = %key, isolation = %declaration.isolation(), "installed fixture");
					report.installed.push(key);
				}
				Err(error) => {
					tracing::warn!(fixture = %key, %error, "fixture install failed");
					return Err(error);
				}
			}
		}

		tracing::debug!(
			installed = report.installed.len(),
			skipped_dynamic = report.skipped_dynamic.len(),
			"fixtures installed"
		);
		Ok(report)
	}
}
