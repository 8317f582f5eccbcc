use std::collections::HashSet;

use super::{DependencyGraph, DependencyTable, Gathered, LookupFailure};
use crate::registry::PackageRecord;

/// A completed resolve.
#[derive(Debug)]
pub struct ResolverFinalized {
	explicit: Vec<String>,
	table: DependencyTable,
	missing: Vec<String>,
	failed: Vec<LookupFailure>,
	graph: DependencyGraph,
	install_order: Vec<String>,
}

impl ResolverFinalized {
	pub(super) fn new(explicit: Vec<String>, gathered: Gathered, graph: DependencyGraph, install_order: Vec<String>) -> Self {
		Self {
			explicit,
			table: gathered.table,
			missing: gathered.missing,
			failed: gathered.failed,
			graph,
			install_order,
		}
	}

	/// Package names in the order they have to be built and installed.
	pub fn install_order(&self) -> &[String] {
		&self.install_order
	}

	/// Requested packages that exist in the registry.
	pub fn explicit(&self) -> &[String] {
		&self.explicit
	}

	/// Packages pulled in as dependencies of the requested ones.
	pub fn dependencies(&self) -> impl Iterator<Item = &str> {
		self.install_order.iter()
			.map(String::as_str)
			.filter(|n| !self.explicit.iter().any(|e| e == *n))
	}

	pub fn table(&self) -> &DependencyTable {
		&self.table
	}

	pub fn graph(&self) -> &DependencyGraph {
		&self.graph
	}

	pub fn get_graph(self) -> DependencyGraph {
		self.graph
	}

	/// Names that aren't AUR packages.
	pub fn missing(&self) -> &[String] {
		&self.missing
	}

	pub fn failed(&self) -> &[LookupFailure] {
		&self.failed
	}

	/// Records to build in install order, one per package base.
	///
	/// Split packages share a package base and are built by a single makepkg run.
	pub fn build_targets(&self) -> Vec<&PackageRecord> {
		let mut seen = HashSet::<&str>::new();
		self.install_order.iter()
			.filter_map(|name| self.table.get(name))
			.filter(|record| seen.insert(record.package_base.as_str()))
			.collect()
	}
}
