//! Concurrent collection of the records of every package reachable from the requested packages.

use dashmap::{DashMap, DashSet};
use futures::stream::{FuturesUnordered, StreamExt};
use tokio::sync::Semaphore;
use log::*;

use crate::constraint::Constraint;
use crate::local_index::LocalIndex;
use crate::registry::{PackageRecord, Registry, RegistryError, RetryPolicy};
use super::{DependencyTable, ResolveError};

/// Outcome of looking up a single name.
#[derive(Debug)]
pub enum Lookup {
	Resolved(PackageRecord),
	/// The registry doesn't know the name, usually because it's in the official repositories.
	NotFound,
	/// The registry couldn't be reached even after retrying.
	Failed(RegistryError),
}

/// Names whose lookup failed together.
#[derive(Debug)]
pub struct LookupFailure {
	pub names: Vec<String>,
	pub error: RegistryError,
}

/// Result of [`MetadataGatherer::gather()`]
#[derive(Debug, Default)]
pub struct Gathered {
	pub table: DependencyTable,
	/// Names the registry has no record for, sorted.
	pub missing: Vec<String>,
	/// Lookups that failed, these names are treated like `missing` ones.
	pub failed: Vec<LookupFailure>,
}

/// A dependency on a name some other task already requested.
///
/// Settled once every lookup has finished so the name isn't fetched again.
#[derive(Debug)]
struct Deferred {
	dependent: String,
	name: String,
	constraint: Option<Constraint>,
}

/// Output of a lookup or expanding a single record.
#[derive(Debug, Default)]
struct Discovered {
	records: Vec<PackageRecord>,
	missing: Vec<String>,
	failed: Vec<LookupFailure>,
	deferred: Vec<Deferred>,
}

impl Discovered {
	fn merge(&mut self, mut other: Discovered) {
		self.records.append(&mut other.records);
		self.missing.append(&mut other.missing);
		self.failed.append(&mut other.failed);
		self.deferred.append(&mut other.deferred);
	}
}

/// Walks dependency tokens and fetches records until no new names are found.
///
/// Each record is expanded exactly once no matter how many packages depend on it
/// and each name is requested from the registry at most once.
pub struct MetadataGatherer<'r> {
	registry: &'r dyn Registry,
	local_index: &'r dyn LocalIndex,
	limiter: Semaphore,
	retry_policy: RetryPolicy,
	batch_size: usize,

	/// Records accepted into the table.
	visited: DashMap<String, PackageRecord>,
	/// Names that have been queued for lookup.
	requested: DashSet<String>,
	/// Every record the registry returned, including ones satisfied by the installed version.
	fetched: DashMap<String, PackageRecord>,
}

impl<'r> MetadataGatherer<'r> {
	pub fn new(registry: &'r dyn Registry, local_index: &'r dyn LocalIndex) -> Self {
		Self {
			registry,
			local_index,
			limiter: Semaphore::new(16),
			retry_policy: RetryPolicy::default(),
			batch_size: 100,
			visited: DashMap::new(),
			requested: DashSet::new(),
			fetched: DashMap::new(),
		}
	}

	/// Upper bound on registry requests in flight at once.
	pub fn max_concurrent_requests(mut self, limit: usize) -> Self {
		self.limiter = Semaphore::new(limit.max(1));
		self
	}

	pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
		self.retry_policy = policy;
		self
	}

	/// Maximum number of names sent in a single info request.
	pub fn batch_size(mut self, size: usize) -> Self {
		self.batch_size = size.max(1);
		self
	}

	/// Gathers the records of `explicit` and everything they depend on.
	///
	/// Fails on the first unsatisfiable versioned dependency, outstanding lookups are dropped.
	pub async fn gather(self, explicit: &[String]) -> Result<Gathered, ResolveError> {
		let seeds = explicit.iter()
			.filter(|name| self.requested.insert((*name).clone()))
			.cloned()
			.collect::<Vec<_>>();
		info!("Gathering metadata for {} requested packages", seeds.len());

		let mut missing = Vec::<String>::new();
		let mut failed = Vec::<LookupFailure>::new();
		let mut deferred = Vec::<Deferred>::new();

		let mut discovered = self.lookup_batch(seeds).await;
		let mut in_flight = FuturesUnordered::new();
		loop {
			missing.append(&mut discovered.missing);
			failed.append(&mut discovered.failed);
			deferred.append(&mut discovered.deferred);
			for record in discovered.records.drain(..) {
				if let Some(record) = self.visit(record) {
					in_flight.push(self.expand(record));
				}
			}

			match in_flight.next().await {
				Some(result) => discovered = result?,
				None if deferred.is_empty() => break,
				/* Every lookup has finished, so each deferred name is either fetched or reported */
				None => discovered = self.settle(std::mem::take(&mut deferred))?,
			}
		}
		drop(in_flight);

		let table = self.visited.into_iter().map(|(_, record)| record).collect::<DependencyTable>();
		/* A constrained lookup can report a name that a later lookup found */
		missing.retain(|name| !table.contains(name));
		missing.sort();
		missing.dedup();

		info!("Gathered {} packages, {} not in the registry, {} failed lookups", table.len(), missing.len(), failed.len());
		Ok(Gathered { table, missing, failed })
	}

	/// Looks up `names` in batches without following their dependencies.
	///
	/// Batches that still fail after retrying are reported in `failed`.
	pub async fn lookup_many(&self, names: &[String]) -> Gathered {
		let Discovered { records, mut missing, failed, .. } = self.lookup_batch(names.to_vec()).await;
		missing.sort();
		missing.dedup();
		Gathered { table: records.into_iter().collect(), missing, failed }
	}

	/// Looks up a single name, retrying transient failures.
	pub async fn lookup(&self, name: &str) -> Lookup {
		match self.fetch(&[name.to_string()]).await {
			Ok(records) => match records.into_iter().find(|r| r.name == name) {
				Some(record) => Lookup::Resolved(record),
				None => Lookup::NotFound,
			},
			Err(e) => Lookup::Failed(e),
		}
	}

	async fn fetch(&self, names: &[String]) -> Result<Vec<PackageRecord>, RegistryError> {
		let records = self.retry_policy.run(|| async move {
			/* The semaphore is never closed */
			let _permit = self.limiter.acquire().await;
			self.registry.info_many(names).await
		}).await?;
		for record in &records {
			self.fetched.entry(record.name.clone()).or_insert_with(|| record.clone());
		}
		Ok(records)
	}

	async fn lookup_batch(&self, names: Vec<String>) -> Discovered {
		let mut discovered = Discovered::default();
		for chunk in names.chunks(self.batch_size) {
			match self.fetch(chunk).await {
				Ok(records) => {
					for name in chunk {
						if !records.iter().any(|r| &r.name == name) {
							debug!("{} not found in the registry, skipping", name);
							discovered.missing.push(name.clone());
						}
					}
					discovered.records.extend(records);
				},
				Err(error) => {
					warn!("Lookup of {} failed: {}", chunk.join(", "), error);
					discovered.failed.push(LookupFailure { names: chunk.to_vec(), error });
				},
			}
		}
		discovered
	}

	/// Accepts `record` into the table unless a record with the same name is already there.
	///
	/// Returns the record when it still has to be expanded.
	fn visit(&self, record: PackageRecord) -> Option<PackageRecord> {
		use dashmap::mapref::entry::Entry;
		match self.visited.entry(record.name.clone()) {
			Entry::Occupied(_) => None,
			Entry::Vacant(v) => {
				trace!("Visiting {} {}", record.name, record.version);
				v.insert(record.clone());
				Some(record)
			},
		}
	}

	/// Finds the records of the dependencies of `record`.
	async fn expand(&self, record: PackageRecord) -> Result<Discovered, ResolveError> {
		let mut discovered = Discovered::default();
		let mut queued = Vec::<String>::new();

		for (kind, tokens) in record.dependency_classes() {
			for token in tokens {
				match Constraint::parse(token) {
					None => {
						if self.requested.insert(token.clone()) {
							queued.push(token.clone());
						} else if !self.visited.contains_key(token) {
							discovered.deferred.push(Deferred { dependent: record.name.clone(), name: token.clone(), constraint: None });
						}
					},
					Some(constraint) => {
						trace!("{} has {:?} dependency {}", record.name, kind, constraint);
						if let Some(found) = self.check_constraint(&record.name, constraint, &mut discovered).await? {
							discovered.records.push(found);
						}
					},
				}
			}
		}

		let batch = self.lookup_batch(queued).await;
		discovered.merge(batch);
		Ok(discovered)
	}

	/// Checks a versioned dependency against the registry and the installed version.
	///
	/// Returns the registry record when it has to be built.
	async fn check_constraint(&self, dependent: &str, constraint: Constraint, discovered: &mut Discovered) -> Result<Option<PackageRecord>, ResolveError> {
		if let Some(record) = self.visited.get(&constraint.name).map(|r| r.value().clone()) {
			return self.judge(dependent, constraint, record);
		}
		if !self.requested.insert(constraint.name.clone()) {
			trace!("{} is already requested, deferring {}", constraint.name, constraint);
			discovered.deferred.push(Deferred { dependent: dependent.to_string(), name: constraint.name.clone(), constraint: Some(constraint) });
			return Ok(None);
		}

		match self.lookup(&constraint.name).await {
			Lookup::Resolved(record) => self.judge(dependent, constraint, record),
			Lookup::NotFound => {
				debug!("{} not found in the registry, skipping {}", constraint.name, constraint);
				discovered.missing.push(constraint.name);
				Ok(None)
			},
			Lookup::Failed(error) => {
				warn!("Lookup of {} failed: {}", constraint.name, error);
				discovered.failed.push(LookupFailure { names: vec![constraint.name], error });
				Ok(None)
			},
		}
	}

	/// Decides a versioned dependency given the registry record.
	fn judge(&self, dependent: &str, constraint: Constraint, remote: PackageRecord) -> Result<Option<PackageRecord>, ResolveError> {
		let local_version = match self.local_index.installed_version(&constraint.name) {
			Ok(v) => v,
			Err(e) => {
				debug!("Couldn't read installed version of {}: {}", constraint.name, e);
				None
			},
		};

		let satisfaction = constraint.check(&remote.version, local_version.as_deref());
		if !satisfaction.pass {
			error!("{} requires {}, registry has {}", dependent, constraint, remote.version);
			return Err(ResolveError::UnsatisfiableConstraint {
				dependent: dependent.to_string(),
				constraint,
				remote_version: remote.version,
				local_version,
			});
		}
		if !satisfaction.needs_download {
			debug!("{} is satisfied by the installed version", constraint);
			return Ok(None);
		}

		Ok(Some(remote))
	}

	/// Resolves dependencies deferred while their name was being looked up elsewhere.
	fn settle(&self, deferred: Vec<Deferred>) -> Result<Discovered, ResolveError> {
		let mut discovered = Discovered::default();
		for Deferred { dependent, name, constraint } in deferred {
			/* Names without a record were already reported by whoever requested them */
			let Some(remote) = self.fetched.get(&name).map(|r| r.value().clone()) else {
				continue;
			};
			let accepted = match constraint {
				None => Some(remote),
				Some(constraint) => self.judge(&dependent, constraint, remote)?,
			};
			discovered.records.extend(accepted);
		}
		Ok(discovered)
	}
}
