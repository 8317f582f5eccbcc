use std::sync::Arc;

use super::Resolver;
use crate::local_index::LocalIndex;
use crate::registry::{Registry, RetryPolicy};

pub struct ResolverBuilder {
	registry: Arc<dyn Registry>,
	local_index: Arc<dyn LocalIndex>,

	packages: Vec<String>,
	max_concurrent_requests: usize,
	retry_policy: RetryPolicy,
	info_batch_size: usize,
}

impl ResolverBuilder {
	pub fn new(registry: Arc<dyn Registry>, local_index: Arc<dyn LocalIndex>) -> Self {
		Self {
			registry,
			local_index,
			packages: Default::default(),
			max_concurrent_requests: 16,
			retry_policy: RetryPolicy::default(),
			info_batch_size: 100,
		}
	}

	/// Takes request limits from the user configuration.
	pub fn configure(self, config: &crate::AurRsConfig) -> Self {
		self.max_concurrent_requests(config.max_concurrent_requests())
			.retry_policy(config.retry_policy())
			.info_batch_size(config.info_batch_size())
	}

	/// Adds explicitly requested package names, duplicates are ignored.
	pub fn add_packages(mut self, names: impl IntoIterator<Item = impl Into<String>>) -> Self {
		for name in names {
			let name = name.into();
			if !self.packages.contains(&name) {
				self.packages.push(name);
			}
		}
		self
	}

	pub fn max_concurrent_requests(mut self, limit: usize) -> Self {
		self.max_concurrent_requests = limit;
		self
	}

	pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
		self.retry_policy = policy;
		self
	}

	pub fn info_batch_size(mut self, size: usize) -> Self {
		self.info_batch_size = size;
		self
	}

	pub fn build(self) -> Resolver {
		Resolver::new(
			self.registry,
			self.local_index,
			self.packages,
			self.max_concurrent_requests,
			self.retry_policy,
			self.info_batch_size,
		)
	}
}
