use std::sync::Arc;

use log::*;

use super::*;
use crate::local_index::LocalIndex;
use crate::registry::{Registry, RetryPolicy};

/// Resolver takes a list of requested packages and generates the install order of every AUR package required.
///
/// # Usage
/// Create a resolver using [`ResolverBuilder`] then call [`Resolver::resolve`].
///
/// ## Failures
/// The resolver may fail for reasons described in [`ResolveError`]
/// when these occur they represent an error the resolver can't solve without human intervention.
pub struct Resolver {
	registry: Arc<dyn Registry>,
	local_index: Arc<dyn LocalIndex>,

	packages: Vec<String>,
	max_concurrent_requests: usize,
	retry_policy: RetryPolicy,
	info_batch_size: usize,
}

impl std::fmt::Debug for Resolver {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Resolver")
			.field("packages", &self.packages)
			.field("max_concurrent_requests", &self.max_concurrent_requests)
			.field("retry_policy", &self.retry_policy)
			.field("info_batch_size", &self.info_batch_size)
			.finish_non_exhaustive()
	}
}

impl Resolver {
	pub(super) fn new(
		registry: Arc<dyn Registry>,
		local_index: Arc<dyn LocalIndex>,
		packages: Vec<String>,
		max_concurrent_requests: usize,
		retry_policy: RetryPolicy,
		info_batch_size: usize,
	) -> Self {
		Self {
			registry,
			local_index,
			packages,
			max_concurrent_requests,
			retry_policy,
			info_batch_size,
		}
	}

	pub fn packages(&self) -> &[String] {
		&self.packages
	}

	/// Runs the whole resolve process.
	///
	/// Calling this again starts over and gives the same result as long as the registry and local system don't change.
	pub async fn resolve(&self) -> Result<ResolverFinalized, ResolveError> {
		let gathered = MetadataGatherer::new(self.registry.as_ref(), self.local_index.as_ref())
			.max_concurrent_requests(self.max_concurrent_requests)
			.retry_policy(self.retry_policy)
			.batch_size(self.info_batch_size)
			.gather(&self.packages)
			.await?;

		let graph = DependencyGraph::build(&self.packages, &gathered.table);
		if !graph.is_acyclic() {
			let members = graph.cycles().into_iter().flatten().collect::<Vec<_>>();
			error!("Dependency cycle between {}", members.join(", "));
			return Err(ResolveError::CyclicDependency(members));
		}
		let order = graph.install_order()?;
		info!("Install order: {}", order.join(" "));

		let explicit = self.packages.iter()
			.filter(|name| gathered.table.contains(name))
			.cloned()
			.collect();

		Ok(ResolverFinalized::new(explicit, gathered, graph, order))
	}
}
