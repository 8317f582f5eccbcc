/// Why a package was installed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum InstallReason {
	#[default] Explicit,
	/// Installed to satisfy another package.
	Dependency,
}

/// An entry of the pacman local database.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstalledPackage {
	pub name: String,
	pub version: String,
	pub description: Option<String>,
	pub url: Option<String>,
	pub arch: Option<String>,
	pub build_date: Option<i64>,
	pub install_date: Option<i64>,
	pub packager: Option<String>,
	/// Installed size in bytes.
	pub size: Option<u64>,
	pub reason: InstallReason,
	pub license: Vec<String>,
	pub groups: Vec<String>,
	pub depends: Vec<String>,
	pub opt_depends: Vec<String>,
	pub provides: Vec<String>,
	pub conflicts: Vec<String>,
	pub replaces: Vec<String>,
	pub validation: Vec<String>,
}

impl InstalledPackage {
	pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
		Self { name: name.into(), version: version.into(), ..Default::default() }
	}

	/// Parses the contents of a `desc` file.
	///
	/// The file is a list of `%FIELD%` headers each followed by one value per line and ended by a blank line.
	/// Unknown fields are ignored.
	pub fn parse(content: &str) -> Result<Self, String> {
		let mut package = InstalledPackage::default();
		let mut lines = content.lines();

		while let Some(line) = lines.next() {
			let header = line.trim();
			if header.is_empty() {
				continue;
			}
			let Some(field) = header.strip_prefix('%').and_then(|h| h.strip_suffix('%')) else {
				return Err(format!("expected a field header, found \"{}\"", header));
			};
			let values = lines.by_ref()
				.take_while(|l| !l.trim().is_empty())
				.map(|l| l.trim().to_string())
				.collect::<Vec<_>>();

			let first = values.first().cloned();

			match field {
				"NAME" => package.name = first.unwrap_or_default(),
				"VERSION" => package.version = first.unwrap_or_default(),
				"DESC" => package.description = first,
				"URL" => package.url = first,
				"ARCH" => package.arch = first,
				"BUILDDATE" => package.build_date = parse_number(field, first)?,
				"INSTALLDATE" => package.install_date = parse_number(field, first)?,
				"PACKAGER" => package.packager = first,
				"SIZE" => package.size = parse_number(field, first)?.map(|s| s.max(0) as u64),
				"REASON" => package.reason = match first.as_deref() {
					Some("1") => InstallReason::Dependency,
					_ => InstallReason::Explicit,
				},
				"LICENSE" => package.license = values,
				"GROUPS" => package.groups = values,
				"DEPENDS" => package.depends = values,
				"OPTDEPENDS" => package.opt_depends = values,
				"PROVIDES" => package.provides = values,
				"CONFLICTS" => package.conflicts = values,
				"REPLACES" => package.replaces = values,
				"VALIDATION" => package.validation = values,
				_ => log::trace!("Ignoring desc field %{}%", field),
			}
		}

		if package.name.is_empty() {
			return Err("missing %NAME%".to_string());
		}
		if package.version.is_empty() {
			return Err("missing %VERSION%".to_string());
		}
		Ok(package)
	}
}

fn parse_number(field: &str, value: Option<String>) -> Result<Option<i64>, String> {
	value.map(|v| v.parse::<i64>().map_err(|e| format!("%{}% \"{}\": {}", field, v, e))).transpose()
}
