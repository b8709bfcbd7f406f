//! Dependency graph module.
//!
//! ```rust
//! use seedbed::graph::{DependencyDeclaration, SortOptions, resolve_load_order};
//!
//! let order = resolve_load_order(
//!     &[
//!         DependencyDeclaration::new("posts", ["users"]),
//!         DependencyDeclaration::new("users", Vec::<String>::new()),
//!     ],
//!     &SortOptions::default(),
//! )
//! .unwrap();
//! assert_eq!(order, vec!["users", "posts"]);
//! ```

pub use seedbed_graph::*;
