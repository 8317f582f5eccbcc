//! Module for only DependencyGraph functions not related to the overall resolving process.

use std::collections::{HashMap, HashSet};
use std::fmt::Write;

use petgraph::prelude::*;

use crate::constraint;
use super::{DependencyTable, ResolveError};

/// Directed graph of package names, an edge `a -> b` means `a` depends on `b`.
///
/// Only packages present in the [`DependencyTable`] it was built from are vertices.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
	graph: DiGraph<String, ()>,
	indices: HashMap<String, NodeIndex>,
}

impl DependencyGraph {
	/// Builds the graph reachable from `explicit` through records in `table`.
	///
	/// Explicit names without a record are left out.
	pub fn build<I, S>(explicit: I, table: &DependencyTable) -> Self
	where
		I: IntoIterator<Item = S>,
		S: AsRef<str>,
	{
		let mut graph = Self::default();
		let mut stack = explicit.into_iter()
			.filter_map(|name| table.get_key_value(name.as_ref()).map(|(k, _)| k))
			.collect::<Vec<&str>>();
		let mut expanded = HashSet::<&str>::new();

		while let Some(current) = stack.pop() {
			graph.get_or_add_node_index(current);
			if !expanded.insert(current) {
				continue;
			}
			let Some(record) = table.get(current) else { continue };

			for token in record.all_depends() {
				let Some((dependency, _)) = table.get_key_value(constraint::strip(token)) else {
					/* Not an AUR package */
					continue;
				};
				if graph.add_edge(current, dependency) {
					stack.push(dependency);
				}
			}
		}

		log::debug!("Built dependency graph with {} vertices and {} edges", graph.vertex_count(), graph.edge_count());
		graph
	}

	fn get_or_add_node_index(&mut self, name: &str) -> NodeIndex {
		if let Some(i) = self.indices.get(name) {
			return *i;
		}
		let i = self.graph.add_node(name.to_string());
		self.indices.insert(name.to_string(), i);
		i
	}

	/// Adds both vertices if needed and an edge between them unless it already exists.
	///
	/// Returns `true` when the edge is new.
	pub fn add_edge(&mut self, from: &str, to: &str) -> bool {
		let a = self.get_or_add_node_index(from);
		let b = self.get_or_add_node_index(to);
		if self.graph.contains_edge(a, b) {
			return false;
		}
		self.graph.add_edge(a, b, ());
		true
	}

	pub fn vertex_count(&self) -> usize {
		self.graph.node_count()
	}

	pub fn edge_count(&self) -> usize {
		self.graph.edge_count()
	}

	pub fn contains_vertex(&self, name: &str) -> bool {
		self.indices.contains_key(name)
	}

	pub fn contains_edge(&self, from: &str, to: &str) -> bool {
		match (self.indices.get(from), self.indices.get(to)) {
			(Some(a), Some(b)) => self.graph.contains_edge(*a, *b),
			_ => false,
		}
	}

	pub fn vertices(&self) -> impl Iterator<Item = &str> {
		self.graph.node_weights().map(String::as_str)
	}

	pub fn edges(&self) -> impl Iterator<Item = (&str, &str)> {
		self.graph.edge_references().map(|e| (self.graph[e.source()].as_str(), self.graph[e.target()].as_str()))
	}

	/// Direct dependencies of `name` in the graph.
	pub fn dependencies_of<'a>(&'a self, name: &str) -> impl Iterator<Item = &'a str> + 'a {
		self.indices.get(name)
			.into_iter()
			.flat_map(move |i| self.graph.neighbors_directed(*i, Outgoing))
			.map(move |n| self.graph[n].as_str())
	}

	pub fn is_acyclic(&self) -> bool {
		!petgraph::algo::is_cyclic_directed(&self.graph)
	}

	/// Vertices that are part of a cycle, grouped per cycle.
	pub fn cycles(&self) -> Vec<Vec<String>> {
		petgraph::algo::tarjan_scc(&self.graph)
			.into_iter()
			.filter(|component| component.len() > 1 || self.graph.contains_edge(component[0], component[0]))
			.map(|component| {
				let mut names = component.into_iter().map(|i| self.graph[i].clone()).collect::<Vec<_>>();
				names.sort();
				names
			})
			.collect()
	}

	/// Every vertex ordered so that dependencies come before the packages that need them.
	pub fn install_order(&self) -> Result<Vec<String>, ResolveError> {
		match petgraph::algo::toposort(&self.graph, None) {
			/* toposort puts dependents first */
			Ok(order) => Ok(order.into_iter().rev().map(|i| self.graph[i].clone()).collect()),
			Err(cycle) => Err(ResolveError::CyclicDependency(vec![self.graph[cycle.node_id()].clone()])),
		}
	}

	/// Renders the graph in Graphviz DOT format.
	pub fn to_dot(&self) -> String {
		fn escape(s: &str) -> String {
			s.replace('\\', "\\\\").replace('"', "\\\"")
		}

		let mut out = String::from("digraph dependencies {\n");
		for i in self.graph.node_indices() {
			let _ = writeln!(out, "\t{} [label=\"{}\"];", i.index(), escape(&self.graph[i]));
		}
		for e in self.graph.edge_references() {
			let _ = writeln!(out, "\t{} -> {};", e.source().index(), e.target().index());
		}
		out.push_str("}\n");
		out
	}
}
