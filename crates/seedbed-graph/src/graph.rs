//! Dependency graph construction.
//!
//! Declarations list the keys they depend on. The graph stores the opposite
//! direction: every node knows the nodes that depend on it, which is what the
//! sorter walks.

use indexmap::IndexMap;

use crate::error::{GraphError, GraphResult};

/// A key together with the keys it depends on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyDeclaration {
	pub key: String,
	pub dependencies: Vec<String>,
}

impl DependencyDeclaration {
	pub fn new<K, I, D>(key: K, dependencies: I) -> Self
	where
		K: Into<String>,
		I: IntoIterator<Item = D>,
		D: Into<String>,
	{
		Self {
			key: key.into(),
			dependencies: dependencies.into_iter().map(Into::into).collect(),
		}
	}
}

/// A node of the graph with its reverse edges.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyNode {
	pub key: String,
	/// Keys that declared this node as a dependency, in declaration order.
	pub dependents: Vec<String>,
}

/// Validated dependency graph, keyed in order of first appearance.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
	nodes: IndexMap<String, DependencyNode>,
}

impl DependencyGraph {
	pub fn get(&self, key: &str) -> Option<&DependencyNode> {
		self.nodes.get(key)
	}

	pub fn contains(&self, key: &str) -> bool {
		self.nodes.contains_key(key)
	}

	pub fn keys(&self) -> impl Iterator<Item = &str> {
		self.nodes.keys().map(String::as_str)
	}

	pub fn nodes(&self) -> impl Iterator<Item = &DependencyNode> {
		self.nodes.values()
	}

	pub fn len(&self) -> usize {
		self.nodes.len()
	}

	pub fn is_empty(&self) -> bool {
		self.nodes.is_empty()
	}
}

struct PendingNode {
	node: DependencyNode,
	declared: bool,
}

impl PendingNode {
	fn new(key: &str, declared: bool) -> Self {
		Self {
			node: DependencyNode {
				key: key.to_string(),
				dependents: Vec::new(),
			},
			declared,
		}
	}
}

/// Builds the reverse-edge graph for `declarations`.
///
/// # Errors
///
/// - [`GraphError::DuplicateKey`] when a key is declared twice
/// - [`GraphError::SelfDependency`] when a key lists itself
/// - [`GraphError::UnresolvedDependency`] with every key that is referenced
///   as a dependency but never declared, in order of first reference
pub fn build_dependent_map(declarations: &[DependencyDeclaration]) -> GraphResult<DependencyGraph> {
	let mut pending: IndexMap<String, PendingNode> = IndexMap::with_capacity(declarations.len());

	for declaration in declarations {
		match pending.get_mut(&declaration.key) {
			Some(entry) if entry.declared => {
				return Err(GraphError::DuplicateKey(declaration.key.clone()));
			}
			Some(entry) => entry.declared = true,
			None => {
				pending.insert(
					declaration.key.clone(),
					PendingNode::new(&declaration.key, true),
				);
			}
		}

		for dependency in &declaration.dependencies {
			if *dependency == declaration.key {
				return Err(GraphError::SelfDependency(declaration.key.clone()));
			}
			pending
				.entry(dependency.clone())
				.or_insert_with(|| PendingNode::new(dependency, false))
				.node
				.dependents
				.push(declaration.key.clone());
		}
	}

	let unresolved: Vec<String> = pending
		.values()
		.filter(|entry| !entry.declared)
		.map(|entry| entry.node.key.clone())
		.collect();
	if !unresolved.is_empty() {
		return Err(GraphError::UnresolvedDependency(unresolved));
	}

	Ok(DependencyGraph {
		nodes: pending
			.into_iter()
			.map(|(key, entry)| (key, entry.node))
			.collect(),
	})
}
