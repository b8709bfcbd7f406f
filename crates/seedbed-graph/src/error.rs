//! Error types for dependency resolution.

use thiserror::Error;

/// Errors raised while building or sorting a dependency graph.
///
/// All of them are fatal to the resolve call that produced them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
	/// Two declarations share the same key.
	#[error("Duplicate key '{0}'")]
	DuplicateKey(String),

	/// A declaration lists its own key as a dependency.
	#[error("'{0}' references itself")]
	SelfDependency(String),

	/// Keys referenced as dependencies without a declaration of their own.
	#[error("Some keys are dependencies but not given: {}", .0.join(", "))]
	UnresolvedDependency(Vec<String>),

	/// A cycle was found while sorting.
	#[error("Circular dependency from '{0}' detected")]
	CircularDependency(String),

	/// The sort descended into a node it was told not to traverse.
	#[error("Traversal into '{0}' is not allowed")]
	ForbiddenTraversal(String),
}

impl GraphError {
	/// Returns the keys this error is about.
	pub fn keys(&self) -> Vec<&str> {
		match self {
			GraphError::DuplicateKey(key)
			| GraphError::SelfDependency(key)
			| GraphError::CircularDependency(key)
			| GraphError::ForbiddenTraversal(key) => vec![key.as_str()],
			GraphError::UnresolvedDependency(keys) => keys.iter().map(String::as_str).collect(),
		}
	}
}

/// Result type alias for graph operations.
pub type GraphResult<T> = Result<T, GraphError>;

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	#[case(GraphError::DuplicateKey("a".into()), "Duplicate key 'a'")]
	#[case(GraphError::SelfDependency("a".into()), "'a' references itself")]
	#[case(GraphError::CircularDependency("b".into()), "Circular dependency from 'b' detected")]
	#[case(GraphError::ForbiddenTraversal("c".into()), "Traversal into 'c' is not allowed")]
	#[case(
		GraphError::UnresolvedDependency(vec!["x".into(), "y".into()]),
		"Some keys are dependencies but not given: x, y"
	)]
	fn test_error_messages(#[case] error: GraphError, #[case] expected: &str) {
		assert_eq!(error.to_string(), expected);
	}

	#[rstest]
	fn test_keys_lists_every_unresolved_key() {
		let error = GraphError::UnresolvedDependency(vec!["x".into(), "y".into()]);
		assert_eq!(error.keys(), vec!["x", "y"]);
	}
}
