//! Dependency resolution for seedbed fixtures.
//!
//! Fixtures name the fixtures they depend on. This crate turns those
//! declarations into an installation order in which every dependency comes
//! before the fixtures that declared it.
//!
//! Resolution happens in two steps:
//!
//! 1. [`build_dependent_map`] validates the declarations and records the
//!    reverse edges ("dependents") of every node.
//! 2. [`sort`] runs a depth-first topological sort over those reverse edges,
//!    optionally limited to the closure of a set of roots, or rejecting any
//!    descent into a set of forbidden nodes.
//!
//! # Example
//!
//! ```
//! use seedbed_graph::{DependencyDeclaration, SortOptions, resolve_load_order};
//!
//! let order = resolve_load_order(
//! 	&[
//! 		DependencyDeclaration::new("posts", ["users"]),
//! 		DependencyDeclaration::new("users", Vec::<String>::new()),
//! 	],
//! 	&SortOptions::default(),
//! )
//! .unwrap();
//! assert_eq!(order, vec!["users".to_string(), "posts".to_string()]);
//! ```

pub mod error;
pub mod graph;
pub mod sort;

pub use error::{GraphError, GraphResult};
pub use graph::{DependencyDeclaration, DependencyGraph, DependencyNode, build_dependent_map};
pub use sort::{SortOptions, sort};

/// Builds the dependency graph for `declarations` and sorts it.
pub fn resolve_load_order(
	declarations: &[DependencyDeclaration],
	options: &SortOptions,
) -> GraphResult<Vec<String>> {
	let graph = build_dependent_map(declarations)?;
	sort(&graph, options)
}
