//! Constrained topological sort.
//!
//! The sort walks the graph depth first along the dependents edges and
//! records each node after its whole dependents subtree, so reversing the
//! record gives an order in which dependencies precede their dependents.

use std::collections::{HashMap, HashSet};

use crate::error::{GraphError, GraphResult};
use crate::graph::DependencyGraph;

/// Optional restrictions applied while sorting.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SortOptions {
	/// Keep only these nodes and the nodes they (transitively) depend on.
	pub traversal_roots: Option<Vec<String>>,
	/// Fail as soon as the sort descends into one of these nodes.
	pub traversal_nodes: Option<Vec<String>>,
}

impl SortOptions {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_traversal_roots<I, S>(mut self, roots: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.traversal_roots = Some(roots.into_iter().map(Into::into).collect());
		self
	}

	pub fn with_traversal_nodes<I, S>(mut self, nodes: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.traversal_nodes = Some(nodes.into_iter().map(Into::into).collect());
		self
	}
}

#[derive(Debug, Clone, Copy)]
enum Mark {
	InProgress,
	Done { root_found: bool },
}

struct Sorter<'g> {
	graph: &'g DependencyGraph,
	roots: Option<HashSet<&'g str>>,
	forbidden: Option<HashSet<&'g str>>,
	marks: HashMap<&'g str, Mark>,
	post_order: Vec<&'g str>,
}

impl<'g> Sorter<'g> {
	/// Visits `key` and everything depending on it.
	///
	/// Returns whether a root was found in the subtree rooted at `key`.
	fn visit(&mut self, key: &'g str, descending: bool) -> GraphResult<bool> {
		if descending
			&& self
				.forbidden
				.as_ref()
				.is_some_and(|forbidden| forbidden.contains(key))
		{
			return Err(GraphError::ForbiddenTraversal(key.to_string()));
		}

		match self.marks.get(key) {
			Some(Mark::InProgress) => {
				return Err(GraphError::CircularDependency(key.to_string()));
			}
			Some(Mark::Done { root_found }) => return Ok(*root_found),
			None => {}
		}

		let graph = self.graph;
		let node = graph
			.get(key)
			.ok_or_else(|| GraphError::UnresolvedDependency(vec![key.to_string()]))?;

		self.marks.insert(key, Mark::InProgress);
		let mut root_found = self.roots.as_ref().is_some_and(|roots| roots.contains(key));
		for dependent in &node.dependents {
			root_found |= self.visit(dependent.as_str(), true)?;
		}
		self.marks.insert(key, Mark::Done { root_found });

		if self.roots.is_none() || root_found {
			self.post_order.push(key);
		}
		Ok(root_found)
	}
}

/// Sorts `graph` so that every node follows the nodes it depends on.
///
/// Nodes without a predecessor are started in graph order and dependents
/// are visited in the order they were recorded, so the result is
/// deterministic for a given input.
///
/// # Errors
///
/// - [`GraphError::CircularDependency`] naming the node at which a cycle
///   closed
/// - [`GraphError::ForbiddenTraversal`] when a node listed in
///   [`SortOptions::traversal_nodes`] is reached as a dependent of another
///   node
pub fn sort(graph: &DependencyGraph, options: &SortOptions) -> GraphResult<Vec<String>> {
	let mut sorter = Sorter {
		graph,
		roots: graph_keys(graph, options.traversal_roots.as_deref()),
		forbidden: graph_keys(graph, options.traversal_nodes.as_deref()),
		marks: HashMap::with_capacity(graph.len()),
		post_order: Vec::with_capacity(graph.len()),
	};

	for key in graph.keys() {
		if !sorter.marks.contains_key(key) {
			sorter.visit(key, false)?;
		}
	}

	let order: Vec<String> = sorter
		.post_order
		.into_iter()
		.rev()
		.map(str::to_string)
		.collect();
	tracing::debug!(nodes = graph.len(), resolved = order.len(), "sorted dependency graph");
	Ok(order)
}

/// Maps `keys` onto the graph's own key strings, dropping unknown ones.
fn graph_keys<'g>(graph: &'g DependencyGraph, keys: Option<&[String]>) -> Option<HashSet<&'g str>> {
	keys.map(|keys| {
		keys.iter()
			.filter_map(|key| graph.get(key).map(|node| node.key.as_str()))
			.collect()
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::graph::{DependencyDeclaration, build_dependent_map};
	use rstest::rstest;

	fn graph(input: &[(&str, &[&str])]) -> DependencyGraph {
		let declarations: Vec<_> = input
			.iter()
			.map(|(key, deps)| DependencyDeclaration::new(*key, deps.iter().copied()))
			.collect();
		build_dependent_map(&declarations).unwrap()
	}

	fn chain() -> DependencyGraph {
		graph(&[("test1", &["test2"]), ("test2", &["test3"]), ("test3", &[])])
	}

	#[rstest]
	fn test_chain_is_sorted_dependencies_first() {
		let order = sort(&chain(), &SortOptions::default()).unwrap();
		assert_eq!(order, vec!["test3", "test2", "test1"]);
	}

	#[rstest]
	fn test_traversal_roots_keep_ancestors_of_root_only() {
		// Arrange
		let options = SortOptions::new().with_traversal_roots(["test2"]);

		// Act
		let order = sort(&chain(), &options).unwrap();

		// Assert
		assert_eq!(order, vec!["test3", "test2"]);
	}

	#[rstest]
	fn test_traversal_roots_on_independent_branches() {
		let graph = graph(&[
			("a", &[]),
			("b", &["a"]),
			("c", &[]),
			("d", &["c"]),
		]);
		let options = SortOptions::new().with_traversal_roots(["b"]);

		let order = sort(&graph, &options).unwrap();

		assert_eq!(order, vec!["a", "b"]);
	}

	#[rstest]
	fn test_unknown_traversal_root_yields_empty_order() {
		let options = SortOptions::new().with_traversal_roots(["nope"]);
		let order = sort(&chain(), &options).unwrap();
		assert!(order.is_empty());
	}

	#[rstest]
	#[case::two_nodes(&[("a", &["b"][..]), ("b", &["a"][..])][..])]
	#[case::five_nodes(&[
		("a", &["e"][..]),
		("b", &["a"][..]),
		("c", &["b"][..]),
		("d", &["c"][..]),
		("e", &["d"][..]),
	][..])]
	fn test_cycles_are_detected(#[case] input: &[(&str, &[&str])]) {
		let result = sort(&graph(input), &SortOptions::default());
		assert!(matches!(result, Err(GraphError::CircularDependency(_))));
	}

	#[rstest]
	fn test_forbidden_node_reached_as_dependent() {
		let options = SortOptions::new()
			.with_traversal_roots(["test2"])
			.with_traversal_nodes(["test2"]);

		let result = sort(&chain(), &options);

		assert_eq!(result, Err(GraphError::ForbiddenTraversal("test2".into())));
	}

	#[rstest]
	fn test_forbidden_node_without_dependencies_is_allowed() {
		let options = SortOptions::new()
			.with_traversal_roots(["test3"])
			.with_traversal_nodes(["test3"]);

		let order = sort(&chain(), &options).unwrap();

		assert_eq!(order, vec!["test3"]);
	}

	#[rstest]
	fn test_forbidden_check_precedes_done_check() {
		// "late" is visited at top level before "early" descends into it.
		let graph = graph(&[("late", &["early"]), ("early", &[])]);
		let options = SortOptions::new()
			.with_traversal_roots(["late"])
			.with_traversal_nodes(["late"]);

		let result = sort(&graph, &options);

		assert_eq!(result, Err(GraphError::ForbiddenTraversal("late".into())));
	}

	#[rstest]
	fn test_siblings_follow_recorded_order() {
		let graph = graph(&[("root", &[]), ("x", &["root"]), ("y", &["root"])]);

		let order = sort(&graph, &SortOptions::default()).unwrap();

		assert_eq!(order, vec!["root", "y", "x"]);
	}
}
