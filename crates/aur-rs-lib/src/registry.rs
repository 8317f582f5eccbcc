//! Remote package metadata from the AUR RPC interface.
//!
//! The resolver only talks to the [`Registry`] trait so it can be driven by [`RpcClient`]
//! or an in-memory registry in tests.

use thiserror::Error;

mod records;
pub use records::PackageRecord;
pub use records::BasicPackageInfo;
pub use records::DependencyKind;

mod rpc;
pub use rpc::RpcClient;

mod retry;
pub use retry::RetryPolicy;

#[derive(Debug, Error)]
pub enum RegistryError {
	#[error("reqwest error: {0}")]
	Reqwest(#[from] reqwest::Error),
	#[error("JSON error: {0}")]
	SerdeJSON(#[from] serde_json::Error),
	#[error("unexpected response status {0}")]
	Status(u16),
	/// The registry answered with an error body, e.g. too many results for a search.
	#[error("registry error: {0}")]
	Rpc(String),
	#[error("invalid registry url: {0}")]
	InvalidUrl(String),
}

impl RegistryError {
	/// Network level failures that are worth retrying.
	pub fn is_transient(&self) -> bool {
		match self {
			RegistryError::Reqwest(e) => e.is_timeout() || e.is_connect() || e.is_request(),
			RegistryError::Status(code) => *code == 429 || (500..600).contains(code),
			RegistryError::SerdeJSON(_) | RegistryError::Rpc(_) | RegistryError::InvalidUrl(_) => false,
		}
	}
}

/// Field a search term is matched against.
///
/// For `Name` and `NameDesc` a contains-like lookup is performed, all other fields require an exact value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SearchField {
	Name,
	#[default] NameDesc,
	Maintainer,
	Depends,
	MakeDepends,
	OptDepends,
	CheckDepends,
	Submitter,
	Provides,
	Conflicts,
	Replaces,
	Keywords,
	Groups,
	CoMaintainers,
}

impl SearchField {
	pub fn as_str(self) -> &'static str {
		match self {
			SearchField::Name => "name",
			SearchField::NameDesc => "name-desc",
			SearchField::Maintainer => "maintainer",
			SearchField::Depends => "depends",
			SearchField::MakeDepends => "makedepends",
			SearchField::OptDepends => "optdepends",
			SearchField::CheckDepends => "checkdepends",
			SearchField::Submitter => "submitter",
			SearchField::Provides => "provides",
			SearchField::Conflicts => "conflicts",
			SearchField::Replaces => "replaces",
			SearchField::Keywords => "keywords",
			SearchField::Groups => "groups",
			SearchField::CoMaintainers => "comaintainers",
		}
	}
}

impl std::fmt::Display for SearchField {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.as_str())
	}
}

/// A source of package metadata.
///
/// An empty result is "not found" and never an error.
/// Implementations must be safe to call concurrently.
#[async_trait::async_trait]
pub trait Registry: Send + Sync {
	async fn search(&self, term: &str, field: SearchField) -> Result<Vec<BasicPackageInfo>, RegistryError>;

	/// Looks up multiple packages at once, names without a package are left out of the result.
	async fn info_many(&self, names: &[String]) -> Result<Vec<PackageRecord>, RegistryError>;

	async fn info(&self, name: &str) -> Result<Option<PackageRecord>, RegistryError> {
		let records = self.info_many(&[name.to_string()]).await?;
		Ok(records.into_iter().find(|r| r.name == name))
	}

	/// Package names starting with `prefix`, at most 20.
	async fn suggest(&self, prefix: &str) -> Result<Vec<String>, RegistryError>;

	/// Package base names starting with `prefix`, at most 20.
	async fn suggest_pkgbase(&self, prefix: &str) -> Result<Vec<String>, RegistryError>;
}
