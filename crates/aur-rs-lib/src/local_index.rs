//! Versions of packages installed on the local system.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use log::*;

mod installed_package;
pub use installed_package::InstalledPackage;
pub use installed_package::InstallReason;

#[derive(Debug, thiserror::Error)]
pub enum LocalIndexError {
	#[error("IO error: {0}")]
	IO(#[from] std::io::Error),
	#[error("failed to read database directory: {0}")]
	WalkDir(#[from] walkdir::Error),
	#[error("malformed package description {path}: {reason}")]
	Parse {
		path: PathBuf,
		reason: String,
	},
}

/// Read access to installed packages.
///
/// Lookups may be made concurrently from many resolver tasks.
pub trait LocalIndex: Send + Sync {
	/// Version of the installed package `name`, `None` when it isn't installed.
	fn installed_version(&self, name: &str) -> Result<Option<String>, LocalIndexError>;

	fn exists(&self, name: &str) -> bool {
		matches!(self.installed_version(name), Ok(Some(_)))
	}
}

/// The pacman local database, usually at `/var/lib/pacman/local`.
///
/// Every package description is read when opening so lookups never touch the disk.
#[derive(Debug, Default)]
pub struct LocalDb {
	packages: HashMap<String, InstalledPackage>,
}

impl LocalDb {
	/// Reads the database under `db_path`, the directory containing `local/`.
	///
	/// Entries without a readable description file are skipped.
	pub fn open(db_path: impl AsRef<Path>) -> Result<Self, LocalIndexError> {
		let local = db_path.as_ref().join("local");
		let mut packages = HashMap::new();

		for entry in walkdir::WalkDir::new(&local).min_depth(1).max_depth(1) {
			let entry = entry?;
			if !entry.file_type().is_dir() {
				continue;
			}
			let desc = entry.path().join("desc");
			if !desc.exists() {
				warn!("{} has no desc file, skipping", entry.path().display());
				continue;
			}
			let package = std::fs::read_to_string(&desc)
				.map_err(LocalIndexError::from)
				.and_then(|content| InstalledPackage::parse(&content).map_err(|reason| LocalIndexError::Parse { path: desc.clone(), reason }));
			match package {
				Ok(package) => { packages.insert(package.name.clone(), package); },
				Err(e) => warn!("Skipping {}: {}", entry.path().display(), e),
			}
		}

		debug!("Loaded {} installed packages from {}", packages.len(), local.display());
		Ok(Self { packages })
	}

	pub fn package(&self, name: &str) -> Option<&InstalledPackage> {
		self.packages.get(name)
	}

	pub fn packages(&self) -> impl Iterator<Item = &InstalledPackage> {
		self.packages.values()
	}

	pub fn len(&self) -> usize {
		self.packages.len()
	}

	pub fn is_empty(&self) -> bool {
		self.packages.is_empty()
	}
}

impl FromIterator<InstalledPackage> for LocalDb {
	fn from_iter<T: IntoIterator<Item = InstalledPackage>>(iter: T) -> Self {
		Self { packages: iter.into_iter().map(|p| (p.name.clone(), p)).collect() }
	}
}

impl LocalIndex for LocalDb {
	fn installed_version(&self, name: &str) -> Result<Option<String>, LocalIndexError> {
		Ok(self.packages.get(name).map(|p| p.version.clone()))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn write_entry(root: &Path, dir: &str, desc: &str) {
		let path = root.join("local").join(dir);
		std::fs::create_dir_all(&path).unwrap();
		std::fs::write(path.join("desc"), desc).unwrap();
	}

	#[test]
	fn open_database() {
		let root = tempfile::tempdir().unwrap();
		write_entry(root.path(), "libcd-5.14-1", "%NAME%\nlibcd\n\n%VERSION%\n5.14-1\n\n%REASON%\n1\n\n");
		write_entry(root.path(), "iup-3.30-1", "%NAME%\niup\n\n%VERSION%\n3.30-1\n\n%DEPENDS%\nlibcd>=5.14\ngtk3\n\n");
		std::fs::write(root.path().join("local").join("ALPM_DB_VERSION"), "9\n").unwrap();
		std::fs::create_dir_all(root.path().join("local").join("broken-1.0-1")).unwrap();

		let db = LocalDb::open(root.path()).unwrap();
		assert_eq!(db.len(), 2);
		assert_eq!(db.installed_version("libcd").unwrap().as_deref(), Some("5.14-1"));
		assert_eq!(db.installed_version("gtk3").unwrap(), None);
		assert!(db.exists("iup"));
		assert!(!db.exists("broken"));
	}

	#[test]
	fn malformed_entry_is_skipped() {
		let root = tempfile::tempdir().unwrap();
		write_entry(root.path(), "foo-1.0-1", "%NAME%\nfoo\n\n%VERSION%\n1.0-1\n\n");
		write_entry(root.path(), "bar-2.0-1", "%NAME%\nbar\n\n%VERSION%\n2.0-1\n\n");
		write_entry(root.path(), "junk-1-1", "%VERSION%\n1-1\n\n");

		let db = LocalDb::open(root.path()).unwrap();
		assert_eq!(db.len(), 2);
		assert_eq!(db.installed_version("foo").unwrap().as_deref(), Some("1.0-1"));
		assert_eq!(db.installed_version("bar").unwrap().as_deref(), Some("2.0-1"));
		assert!(!db.exists("junk"));
	}

	#[test]
	fn missing_database_is_an_error() {
		let root = tempfile::tempdir().unwrap();
		assert!(LocalDb::open(root.path().join("nothing")).is_err());
	}
}
