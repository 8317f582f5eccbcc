//! Library error type.

pub type Result<T> = std::result::Result<T, Error>;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
	#[error("reqwest error: {0}")]
	Reqwest(#[from] reqwest::Error),
	#[error("IO error: {0}")]
	IO(#[from] std::io::Error),
	#[error("JSON error: {0}")]
	SerdeJSON(#[from] serde_json::Error),
	#[error("parsing error: {0}")]
	Parse(String),
	#[error("registry error: {0}")]
	Registry(#[from] crate::registry::RegistryError),
	#[error("local index error: {0}")]
	LocalIndex(#[from] crate::local_index::LocalIndexError),
	#[error("resolver error: {0}")]
	Resolve(#[from] crate::dependency_resolver::ResolveError),
	#[error("installer error: {0}")]
	Install(#[from] crate::installer::InstallError),
}

impl Error {
	/// `true` when the error can only be fixed by the user editing their requested set or local system.
	pub fn requires_manual_intervention(&self) -> bool {
		matches!(self, Error::Resolve(e) if e.requires_manual_intervention())
	}
}
