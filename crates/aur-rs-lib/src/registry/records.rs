use serde::{Serialize, Deserialize};

/// The class of a dependency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DependencyKind {
	/// Required to run the package.
	Runtime,
	/// Required only to build the package (`makedepends`).
	Build,
	/// Required to run the package test suite (`checkdepends`).
	Check,
}

/// Detailed package information as returned by an `info` request.
///
/// Dependency arrays hold raw tokens which may carry a version constraint, e.g. `python>=3.9`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PackageRecord {
	#[serde(rename = "ID", default)]
	pub id: u64,
	pub name: String,
	#[serde(rename = "PackageBaseID", default)]
	pub package_base_id: u64,
	pub package_base: String,
	pub version: String,
	#[serde(default)]
	pub description: Option<String>,
	#[serde(rename = "URL", default)]
	pub url: Option<String>,
	#[serde(rename = "URLPath", default)]
	pub url_path: Option<String>,
	#[serde(default)]
	pub maintainer: Option<String>,
	#[serde(default)]
	pub submitter: Option<String>,
	#[serde(default)]
	pub num_votes: u64,
	#[serde(default)]
	pub popularity: f64,
	/// Unix timestamp of when the package was flagged.
	#[serde(default)]
	pub out_of_date: Option<i64>,
	#[serde(default)]
	pub first_submitted: i64,
	#[serde(default)]
	pub last_modified: i64,

	#[serde(default)]
	pub license: Vec<String>,
	#[serde(default)]
	pub depends: Vec<String>,
	#[serde(default)]
	pub make_depends: Vec<String>,
	#[serde(default)]
	pub check_depends: Vec<String>,
	#[serde(default)]
	pub opt_depends: Vec<String>,
	#[serde(default)]
	pub provides: Vec<String>,
	#[serde(default)]
	pub conflicts: Vec<String>,
	#[serde(default)]
	pub replaces: Vec<String>,
	#[serde(default)]
	pub groups: Vec<String>,
	#[serde(default)]
	pub keywords: Vec<String>,
	#[serde(default)]
	pub co_maintainers: Vec<String>,
}

impl PackageRecord {
	/// A record with only a name and version, the package base is the package name.
	pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
		let name = name.into();
		Self {
			id: 0,
			package_base_id: 0,
			package_base: name.clone(),
			name,
			version: version.into(),
			description: None,
			url: None,
			url_path: None,
			maintainer: None,
			submitter: None,
			num_votes: 0,
			popularity: 0.0,
			out_of_date: None,
			first_submitted: 0,
			last_modified: 0,
			license: Vec::new(),
			depends: Vec::new(),
			make_depends: Vec::new(),
			check_depends: Vec::new(),
			opt_depends: Vec::new(),
			provides: Vec::new(),
			conflicts: Vec::new(),
			replaces: Vec::new(),
			groups: Vec::new(),
			keywords: Vec::new(),
			co_maintainers: Vec::new(),
		}
	}

	/// The dependency tokens the resolver follows, optional dependencies are not included.
	pub fn dependency_classes(&self) -> [(DependencyKind, &[String]); 3] {
		[
			(DependencyKind::Runtime, self.depends.as_slice()),
			(DependencyKind::Build, self.make_depends.as_slice()),
			(DependencyKind::Check, self.check_depends.as_slice()),
		]
	}

	/// Runtime, build and check dependency tokens concatenated, duplicates are kept.
	pub fn all_depends(&self) -> impl Iterator<Item = &str> {
		self.depends.iter()
			.chain(self.make_depends.iter())
			.chain(self.check_depends.iter())
			.map(String::as_str)
	}
}

/// Package information as returned by a `search` request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BasicPackageInfo {
	#[serde(rename = "ID", default)]
	pub id: u64,
	pub name: String,
	#[serde(rename = "PackageBaseID", default)]
	pub package_base_id: u64,
	pub package_base: String,
	pub version: String,
	#[serde(default)]
	pub description: Option<String>,
	#[serde(rename = "URL", default)]
	pub url: Option<String>,
	#[serde(rename = "URLPath", default)]
	pub url_path: Option<String>,
	#[serde(default)]
	pub maintainer: Option<String>,
	#[serde(default)]
	pub num_votes: u64,
	#[serde(default)]
	pub popularity: f64,
	#[serde(default)]
	pub out_of_date: Option<i64>,
	#[serde(default)]
	pub first_submitted: i64,
	#[serde(default)]
	pub last_modified: i64,
}

/// Envelope of every RPC response.
#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub(super) struct RpcResponse<T> {
	#[serde(default)]
	pub resultcount: usize,
	#[serde(rename = "type")]
	pub kind: String,
	#[serde(default)]
	pub results: Vec<T>,
	#[serde(default)]
	pub error: Option<String>,
}
