use std::path::Path;

use tokio::process::Command;

use super::{InstallError, InstallOptions};

/// `makepkg -s -i -f --needed` in `dir`, syncing repository dependencies and installing the result.
///
/// Packages are always rebuilt but not reinstalled when already up to date.
pub fn makepkg_command(dir: &Path, options: &InstallOptions) -> Command {
	let mut command = Command::new("makepkg");
	command.current_dir(dir).args(["-s", "-i", "-f", "--needed"]);
	if options.clean_build {
		command.arg("-c");
	}
	if options.remove_make_deps {
		command.arg("-r");
	}
	if options.no_confirm {
		command.arg("--noconfirm");
	}
	command
}

pub async fn build_package(dir: &Path, options: &InstallOptions) -> Result<(), InstallError> {
	super::run(makepkg_command(dir, options)).await
}
