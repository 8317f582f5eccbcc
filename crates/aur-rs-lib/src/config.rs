//! User configuration.
//!
//! Stored as JSON in `$XDG_CONFIG_HOME/aur-rs/config.json`, every field is optional in the file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Serialize, Deserialize};

pub const DEFAULT_REGISTRY_URL: &str = "https://aur.archlinux.org/rpc/v5/";
pub const DEFAULT_SOURCE_URL: &str = "https://aur.archlinux.org/";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AurRsConfig {
	cache_dir: PathBuf,
	registry_url: String,
	source_url: String,
	local_db_path: PathBuf,
	max_concurrent_requests: usize,
	request_timeout_secs: u64,
	retry_attempts: u32,
	retry_backoff_ms: u64,
	info_batch_size: usize,
}

fn home_dir() -> PathBuf {
	std::env::var_os("HOME").map(PathBuf::from).unwrap_or_else(|| PathBuf::from("."))
}

fn xdg_dir(var: &str, fallback: &str) -> PathBuf {
	match std::env::var_os(var) {
		Some(p) if !p.is_empty() => PathBuf::from(p),
		_ => home_dir().join(fallback),
	}
}

impl Default for AurRsConfig {
	fn default() -> Self {
		Self {
			cache_dir: xdg_dir("XDG_CACHE_HOME", ".cache").join("aur-rs"),
			registry_url: DEFAULT_REGISTRY_URL.to_string(),
			source_url: DEFAULT_SOURCE_URL.to_string(),
			local_db_path: PathBuf::from("/var/lib/pacman"),
			max_concurrent_requests: 16,
			request_timeout_secs: 30,
			retry_attempts: 3,
			retry_backoff_ms: 250,
			info_batch_size: 100,
		}
	}
}

impl AurRsConfig {
	/// Location of the config file in the users config directory.
	pub fn default_path() -> PathBuf {
		xdg_dir("XDG_CONFIG_HOME", ".config").join("aur-rs").join("config.json")
	}

	/// Loads the config from [`default_path()`](AurRsConfig::default_path()).
	///
	/// # Errors
	/// - [`IO`](crate::error::Error::IO) when the file can't be read, including when it does not exist.
	/// - [`SerdeJSON`](crate::error::Error::SerdeJSON) when the file is not a valid config.
	pub fn load_from_disk() -> crate::Result<Self> {
		Self::load_from_path(Self::default_path())
	}

	pub fn load_from_path(path: impl AsRef<Path>) -> crate::Result<Self> {
		let file = std::fs::File::open(path)?;
		Ok(serde_json::from_reader(std::io::BufReader::new(file))?)
	}

	/// Saves the config to [`default_path()`](AurRsConfig::default_path()), creating parent directories.
	pub fn save_to_disk(&self) -> crate::Result<()> {
		self.save_to_path(Self::default_path())
	}

	pub fn save_to_path(&self, path: impl AsRef<Path>) -> crate::Result<()> {
		let path = path.as_ref();
		if let Some(parent) = path.parent() {
			std::fs::create_dir_all(parent)?;
		}
		let file = std::fs::File::create(path)?;
		serde_json::to_writer_pretty(file, self)?;
		Ok(())
	}

	/* Fields */

	/// Where package sources are cloned and built.
	pub fn cache_dir(&self) -> &Path {
		&self.cache_dir
	}
	pub fn set_cache_dir(&mut self, cache_dir: PathBuf) {
		self.cache_dir = cache_dir;
	}

	/// Base url of the RPC interface, must end in a `/`.
	pub fn registry_url(&self) -> &str {
		&self.registry_url
	}
	pub fn set_registry_url(&mut self, registry_url: String) {
		self.registry_url = registry_url;
	}

	/// Base url of the package git repositories.
	pub fn source_url(&self) -> &str {
		&self.source_url
	}
	pub fn set_source_url(&mut self, source_url: String) {
		self.source_url = source_url;
	}

	/// Root of the pacman database, the directory containing `local/`.
	pub fn local_db_path(&self) -> &Path {
		&self.local_db_path
	}
	pub fn set_local_db_path(&mut self, local_db_path: PathBuf) {
		self.local_db_path = local_db_path;
	}

	pub fn max_concurrent_requests(&self) -> usize {
		self.max_concurrent_requests.max(1)
	}
	pub fn set_max_concurrent_requests(&mut self, value: usize) {
		self.max_concurrent_requests = value;
	}

	pub fn request_timeout(&self) -> Duration {
		Duration::from_secs(self.request_timeout_secs)
	}
	pub fn set_request_timeout(&mut self, value: Duration) {
		self.request_timeout_secs = value.as_secs();
	}

	pub fn retry_policy(&self) -> crate::registry::RetryPolicy {
		crate::registry::RetryPolicy::new(self.retry_attempts, Duration::from_millis(self.retry_backoff_ms))
	}
	pub fn set_retry_policy(&mut self, attempts: u32, backoff: Duration) {
		self.retry_attempts = attempts;
		self.retry_backoff_ms = backoff.as_millis() as u64;
	}

	pub fn info_batch_size(&self) -> usize {
		self.info_batch_size.max(1)
	}
	pub fn set_info_batch_size(&mut self, value: usize) {
		self.info_batch_size = value;
	}
}
