//! Various helper functions for testing
//!
//! functions in this module should use results and not use any panics to avoid confusion in callers

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use aur_rs::PackageRecord;
use aur_rs::registry::{BasicPackageInfo, Registry, RegistryError, SearchField};
use aur_rs::local_index::{LocalIndex, LocalIndexError};

/// Builds a [`PackageRecord`] with only the fields the resolver looks at.
pub struct RecordBuilder(PackageRecord);

pub fn package(name: &str, version: &str) -> RecordBuilder {
	RecordBuilder(PackageRecord::new(name, version))
}

fn tokens(list: &[&str]) -> Vec<String> {
	list.iter().map(|s| s.to_string()).collect()
}

impl RecordBuilder {
	pub fn base(mut self, package_base: &str) -> Self {
		self.0.package_base = package_base.to_string();
		self
	}

	pub fn description(mut self, description: &str) -> Self {
		self.0.description = Some(description.to_string());
		self
	}

	pub fn depends(mut self, depends: &[&str]) -> Self {
		self.0.depends = tokens(depends);
		self
	}

	pub fn make_depends(mut self, make_depends: &[&str]) -> Self {
		self.0.make_depends = tokens(make_depends);
		self
	}

	pub fn check_depends(mut self, check_depends: &[&str]) -> Self {
		self.0.check_depends = tokens(check_depends);
		self
	}

	pub fn build(self) -> PackageRecord {
		self.0
	}
}

/// In-memory registry.
///
/// Counts requests and can be told to fail lookups of a name with a transient error.
#[derive(Debug, Default)]
pub struct MockRegistry {
	records: HashMap<String, PackageRecord>,
	/// Remaining failures per name.
	failures: Mutex<HashMap<String, u32>>,
	info_calls: AtomicUsize,
	requested: Mutex<Vec<String>>,
}

impl MockRegistry {
	pub fn new(records: impl IntoIterator<Item = PackageRecord>) -> Self {
		Self {
			records: records.into_iter().map(|r| (r.name.clone(), r)).collect(),
			..Default::default()
		}
	}

	/// Any request including `name` fails `times` times with a 503 before succeeding.
	pub fn fail_transiently(self, name: &str, times: u32) -> Self {
		self.failures.lock().unwrap_or_else(|e| e.into_inner()).insert(name.to_string(), times);
		self
	}

	/// Any request including `name` fails with a 503.
	pub fn fail_always(self, name: &str) -> Self {
		self.fail_transiently(name, u32::MAX)
	}

	/// Number of `info` requests made.
	pub fn info_calls(&self) -> usize {
		self.info_calls.load(Ordering::SeqCst)
	}

	/// Every name sent in an `info` request, in request order and including retries.
	pub fn requested_names(&self) -> Vec<String> {
		self.requested.lock().unwrap_or_else(|e| e.into_inner()).clone()
	}

	fn take_failure(&self, names: &[String]) -> bool {
		let mut failures = self.failures.lock().unwrap_or_else(|e| e.into_inner());
		let mut failed = false;
		for name in names {
			if let Some(remaining) = failures.get_mut(name) {
				if *remaining > 0 {
					*remaining -= 1;
					failed = true;
				}
			}
		}
		failed
	}
}

fn basic_info(record: &PackageRecord) -> BasicPackageInfo {
	BasicPackageInfo {
		id: record.id,
		name: record.name.clone(),
		package_base_id: record.package_base_id,
		package_base: record.package_base.clone(),
		version: record.version.clone(),
		description: record.description.clone(),
		url: record.url.clone(),
		url_path: record.url_path.clone(),
		maintainer: record.maintainer.clone(),
		num_votes: record.num_votes,
		popularity: record.popularity,
		out_of_date: record.out_of_date,
		first_submitted: record.first_submitted,
		last_modified: record.last_modified,
	}
}

#[async_trait::async_trait]
impl Registry for MockRegistry {
	async fn search(&self, term: &str, field: SearchField) -> Result<Vec<BasicPackageInfo>, RegistryError> {
		let mut results = self.records.values()
			.filter(|r| match field {
				SearchField::Name => r.name.contains(term),
				SearchField::NameDesc => r.name.contains(term) || r.description.as_deref().map_or(false, |d| d.contains(term)),
				SearchField::Depends => r.depends.iter().any(|d| d == term),
				SearchField::MakeDepends => r.make_depends.iter().any(|d| d == term),
				SearchField::CheckDepends => r.check_depends.iter().any(|d| d == term),
				_ => false,
			})
			.map(basic_info)
			.collect::<Vec<_>>();
		results.sort_by(|a, b| a.name.cmp(&b.name));
		Ok(results)
	}

	async fn info_many(&self, names: &[String]) -> Result<Vec<PackageRecord>, RegistryError> {
		self.info_calls.fetch_add(1, Ordering::SeqCst);
		self.requested.lock().unwrap_or_else(|e| e.into_inner()).extend(names.iter().cloned());
		/* Let other lookups run so their order varies */
		tokio::task::yield_now().await;

		if self.take_failure(names) {
			return Err(RegistryError::Status(503));
		}
		Ok(names.iter().filter_map(|n| self.records.get(n).cloned()).collect())
	}

	async fn suggest(&self, prefix: &str) -> Result<Vec<String>, RegistryError> {
		let mut names = self.records.keys().filter(|n| n.starts_with(prefix)).cloned().collect::<Vec<_>>();
		names.sort();
		names.truncate(20);
		Ok(names)
	}

	async fn suggest_pkgbase(&self, prefix: &str) -> Result<Vec<String>, RegistryError> {
		let mut bases = self.records.values()
			.map(|r| r.package_base.clone())
			.filter(|b| b.starts_with(prefix))
			.collect::<HashSet<_>>()
			.into_iter()
			.collect::<Vec<_>>();
		bases.sort();
		bases.truncate(20);
		Ok(bases)
	}
}

/// In-memory set of installed packages.
#[derive(Debug, Default)]
pub struct MockLocalIndex {
	versions: HashMap<String, String>,
	broken: HashSet<String>,
}

impl MockLocalIndex {
	pub fn new(installed: &[(&str, &str)]) -> Self {
		Self {
			versions: installed.iter().map(|(n, v)| (n.to_string(), v.to_string())).collect(),
			broken: Default::default(),
		}
	}

	/// Lookups of `name` fail.
	pub fn broken(mut self, name: &str) -> Self {
		self.broken.insert(name.to_string());
		self
	}
}

impl LocalIndex for MockLocalIndex {
	fn installed_version(&self, name: &str) -> Result<Option<String>, LocalIndexError> {
		if self.broken.contains(name) {
			return Err(LocalIndexError::Parse { path: name.into(), reason: "unreadable entry".to_string() });
		}
		Ok(self.versions.get(name).cloned())
	}
}

/// Writes a pacman local database with the given `(name, version)` entries.
///
/// Open it with `LocalDb::open(dir.path())`.
pub fn local_db(installed: &[(&str, &str)]) -> std::io::Result<tempfile::TempDir> {
	let dir = tempfile::tempdir()?;
	let local = dir.path().join("local");
	std::fs::create_dir_all(&local)?;
	std::fs::write(local.join("ALPM_DB_VERSION"), "9\n")?;
	for (name, version) in installed {
		let entry = local.join(format!("{}-{}", name, version));
		std::fs::create_dir_all(&entry)?;
		std::fs::write(entry.join("desc"), format!("%NAME%\n{}\n\n%VERSION%\n{}\n\n", name, version))?;
	}
	Ok(dir)
}

/// AUR packages of the iup toolkit and its Lua bindings.
///
/// Names like `gtk3` or `lua53` are repository packages and have no record.
pub fn iup_records() -> Vec<PackageRecord> {
	let mut records = vec![
		package("iup", "3.30-1")
			.description("C cross platform GUI toolkit")
			.depends(&["gtk3", "libcd", "libim", "webkit2gtk", "ftgl"])
			.make_depends(&["lua", "lua51", "lua52", "lua53", "lua-cd", "lua51-cd", "lua52-cd", "lua53-cd", "lua-im", "lua51-im", "lua52-im", "lua53-im"])
			.build(),
		package("libcd", "5.14-1")
			.description("2D graphics library")
			.depends(&["freetype2", "libxft", "pdflib-lite", "ftgl"])
			.build(),
		package("pdflib-lite", "7.0.5p3-7")
			.description("PDF creation library")
			.build(),
		package("libim", "3.15-1")
			.description("Toolkit for digital imaging")
			.depends(&["zlib", "libpng"])
			.build(),
	];
	for (lua, lua_dep) in [("lua", "lua"), ("lua51", "lua51"), ("lua52", "lua52"), ("lua53", "lua53")] {
		records.push(package(&format!("{}-cd", lua), "5.14-1")
			.base("lua-cd")
			.depends(&["libcd>=5.14", lua_dep])
			.build());
		records.push(package(&format!("{}-im", lua), "3.15-1")
			.base("lua-im")
			.depends(&["libim=3.15-1", lua_dep])
			.build());
	}
	records
}

/// Every package name reachable from `iup`.
pub const IUP_CLOSURE: [&str; 12] = [
	"iup",
	"lua-cd", "lua51-cd", "lua52-cd", "lua53-cd", "libcd", "pdflib-lite",
	"lua-im", "lua51-im", "lua52-im", "lua53-im", "libim",
];

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn search_by_name_and_description() {
		let registry = MockRegistry::new(iup_records());
		let names = |results: Vec<BasicPackageInfo>| results.into_iter().map(|r| r.name).collect::<Vec<_>>();

		assert_eq!(names(registry.search("lua5", SearchField::Name).await.unwrap()), ["lua51-cd", "lua51-im", "lua52-cd", "lua52-im", "lua53-cd", "lua53-im"]);
		assert_eq!(names(registry.search("imaging", SearchField::NameDesc).await.unwrap()), ["libim"]);
		assert_eq!(names(registry.search("libcd>=5.14", SearchField::Depends).await.unwrap()), ["lua-cd", "lua51-cd", "lua52-cd", "lua53-cd"]);
		assert!(registry.search("imaging", SearchField::Name).await.unwrap().is_empty());
	}

	#[tokio::test]
	async fn suggestions() {
		let registry = MockRegistry::new(iup_records());
		assert_eq!(registry.suggest("lib").await.unwrap(), ["libcd", "libim"]);
		assert_eq!(registry.suggest_pkgbase("lua5").await.unwrap(), Vec::<String>::new());
		assert_eq!(registry.suggest_pkgbase("lua").await.unwrap(), ["lua-cd", "lua-im"]);
	}

	#[tokio::test]
	async fn info_counts_requests_and_failures() {
		let registry = MockRegistry::new(iup_records()).fail_transiently("libcd", 1);
		let names = ["libcd".to_string(), "ghost".to_string()];

		assert!(matches!(registry.info_many(&names).await, Err(RegistryError::Status(503))));
		let records = registry.info_many(&names).await.unwrap();
		assert_eq!(records.len(), 1);
		assert_eq!(registry.info_calls(), 2);
		assert_eq!(registry.requested_names(), ["libcd", "ghost", "libcd", "ghost"]);
	}

	#[test]
	fn local_db_layout() {
		let dir = local_db(&[("foo", "1.0-1")]).unwrap();
		let desc = std::fs::read_to_string(dir.path().join("local").join("foo-1.0-1").join("desc")).unwrap();
		assert!(desc.starts_with("%NAME%\nfoo\n"));
	}
}
