//! Retrieval is when we get the build files of a package base from its git repository.

use std::path::{Path, PathBuf};

use futures::stream::{self, StreamExt, TryStreamExt};
use tokio::process::Command;

use super::InstallError;
use crate::registry::PackageRecord;

/// What has to be done to get up to date sources of a package base.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceAction {
	Clone { url: String, dir: PathBuf },
	Pull { dir: PathBuf },
}

impl SourceAction {
	pub fn dir(&self) -> &Path {
		match self {
			SourceAction::Clone { dir, .. } | SourceAction::Pull { dir } => dir,
		}
	}

	pub fn command(&self) -> Command {
		let mut command = Command::new("git");
		match self {
			SourceAction::Clone { url, dir } => {
				command.arg("clone").arg(url).arg(dir);
			},
			SourceAction::Pull { dir } => {
				command.arg("-C").arg(dir).arg("pull");
			},
		}
		command
	}
}

pub fn source_dir(config: &crate::AurRsConfig, package_base: &str) -> PathBuf {
	config.cache_dir().join(package_base)
}

pub fn clone_url(config: &crate::AurRsConfig, package_base: &str) -> String {
	format!("{}/{}.git", config.source_url().trim_end_matches('/'), package_base)
}

/// Pulls when a checkout already exists, otherwise clones.
pub fn plan_retrieval(config: &crate::AurRsConfig, package_base: &str) -> SourceAction {
	let dir = source_dir(config, package_base);
	if dir.join(".git").exists() {
		SourceAction::Pull { dir }
	} else {
		SourceAction::Clone { url: clone_url(config, package_base), dir }
	}
}

pub async fn fetch_source(config: &crate::AurRsConfig, target: &PackageRecord) -> Result<PathBuf, InstallError> {
	let action = plan_retrieval(config, &target.package_base);
	log::info!("Retrieving sources of {}", target.package_base);
	super::run(action.command()).await?;
	Ok(action.dir().to_path_buf())
}

/// Retrieves the sources of multiple targets concurrently.
///
/// Returns the source directories in the same order as `targets`.
pub async fn fetch_sources(config: &crate::AurRsConfig, targets: &[&PackageRecord]) -> Result<Vec<PathBuf>, InstallError> {
	stream::iter(targets)
		.map(|target| fetch_source(config, target))
		.buffered(config.max_concurrent_requests())
		.try_collect()
		.await
}
