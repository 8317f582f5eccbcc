//! Fetching package sources and building them with makepkg.
//!
//! # Process
//! 1. Sources of every build target are cloned or updated concurrently.
//! 1. Each target is built and installed in install order, one at a time.

use log::*;

pub mod retrieval;
pub mod makepkg;

#[derive(Debug, thiserror::Error)]
pub enum InstallError {
	#[error("IO error: {0}")]
	IO(#[from] std::io::Error),
	#[error("{command} failed with exit code {}", .code.map_or_else(|| "none".to_string(), |c| c.to_string()))]
	CommandFailed {
		command: String,
		/// `None` when the process was killed by a signal.
		code: Option<i32>,
	},
}

/// Flags passed on to makepkg.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InstallOptions {
	/// Remove leftover work files after building (`-c`).
	pub clean_build: bool,
	/// Uninstall make dependencies after a successful build (`-r`).
	pub remove_make_deps: bool,
	/// Don't ask pacman for confirmation.
	pub no_confirm: bool,
}

/// Runs `command` until it exits, failing on a non-zero status.
pub(crate) async fn run(mut command: tokio::process::Command) -> Result<(), InstallError> {
	let description = format!("{:?}", command.as_std());
	debug!("Running {}", description);
	let status = command.status().await?;
	if !status.success() {
		error!("{} exited with {}", description, status);
		return Err(InstallError::CommandFailed { command: description, code: status.code() });
	}
	Ok(())
}

/// Retrieves and builds every target of a finished resolve.
pub async fn install(config: &crate::AurRsConfig, finalized: &crate::dependency_resolver::ResolverFinalized, options: &InstallOptions) -> Result<(), InstallError> {
	let targets = finalized.build_targets();
	if targets.is_empty() {
		info!("Nothing to install");
		return Ok(());
	}

	tokio::fs::create_dir_all(config.cache_dir()).await?;
	let dirs = retrieval::fetch_sources(config, &targets).await?;

	let total = targets.len();
	for (i, (target, dir)) in targets.iter().zip(dirs).enumerate() {
		info!("Building {} {} ({}/{})", target.package_base, target.version, i + 1, total);
		makepkg::build_package(&dir, options).await?;
	}
	info!("Installed {} packages", total);
	Ok(())
}
