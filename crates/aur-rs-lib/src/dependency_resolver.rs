//! Utilities for getting the full set of AUR packages required by a list of requested packages
//! and the order they have to be built in.
//!
//! # Usage
//! 1. Create a [`ResolverBuilder`] with a [`Registry`](crate::registry::Registry) and a [`LocalIndex`](crate::local_index::LocalIndex).
//! 1. Use the builder to add the requested package names and tune request limits.
//! 1. [`ResolverBuilder::build()`] to get a [`Resolver`]
//! 1. [`Resolver::resolve()`] to gather metadata and plan the install.
//! 1. [`ResolverFinalized::install_order()`] to list all packages in the order they can be built.
//!
//! # Process
//! Resolving happens in three stages, each only starts once the previous one has finished.
//! - Metadata gathering walks the dependency tokens of every record, fetching records concurrently.
//!   Names the registry doesn't know about are assumed to come from the official repositories and are dropped.
//! - Graph building connects every gathered package to its gathered dependencies.
//! - The graph is checked for cycles and topologically sorted to get an install order.

use crate::constraint::Constraint;

mod dependency_table;
pub use dependency_table::DependencyTable;

mod gatherer;
pub use gatherer::MetadataGatherer;
pub use gatherer::Gathered;
pub use gatherer::Lookup;
pub use gatherer::LookupFailure;

mod dependency_graph;
pub use dependency_graph::DependencyGraph;

mod resolver_builder;
pub use resolver_builder::ResolverBuilder;
mod processing_resolver;
pub use processing_resolver::Resolver;
mod finalized_resolver;
pub use finalized_resolver::ResolverFinalized;

/// These errors halt the resolver.
///
/// Both represent a problem the resolver can't solve without the user changing their request or system.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
	/// Neither the registry nor the installed version of a package satisfies a versioned dependency.
	#[error("{dependent} requires {constraint} but the registry has {remote_version} and the installed version is {}", .local_version.as_deref().unwrap_or("none"))]
	UnsatisfiableConstraint {
		dependent: String,
		constraint: Constraint,
		remote_version: String,
		local_version: Option<String>,
	},
	/// Packages that depend on each other, directly or through other packages.
	#[error("dependency cycle between {}", .0.join(", "))]
	CyclicDependency(Vec<String>),
}

impl ResolveError {
	pub fn requires_manual_intervention(&self) -> bool {
		match self {
			ResolveError::UnsatisfiableConstraint { .. } | ResolveError::CyclicDependency(_) => true,
		}
	}
}
