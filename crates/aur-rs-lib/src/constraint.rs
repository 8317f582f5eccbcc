//! Versioned dependency tokens such as `python>=3.9`.

use std::cmp::Ordering;
use std::sync::OnceLock;

use regex::Regex;

/// Comparison operator of a versioned dependency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
	Less,
	LessEqual,
	Equal,
	GreaterEqual,
	Greater,
}

impl Operator {
	pub fn as_str(self) -> &'static str {
		match self {
			Operator::Less => "<",
			Operator::LessEqual => "<=",
			Operator::Equal => "=",
			Operator::GreaterEqual => ">=",
			Operator::Greater => ">",
		}
	}

	/// Checks a comparison result of `vercmp(required, candidate)` against this operator.
	///
	/// e.g. `>=` admits candidates newer or equal to the required version, which is `Less` or `Equal`.
	pub fn admits(self, required_vs_candidate: Ordering) -> bool {
		match self {
			Operator::GreaterEqual => matches!(required_vs_candidate, Ordering::Less | Ordering::Equal),
			Operator::LessEqual => matches!(required_vs_candidate, Ordering::Greater | Ordering::Equal),
			Operator::Equal => required_vs_candidate == Ordering::Equal,
			Operator::Greater => required_vs_candidate == Ordering::Less,
			Operator::Less => required_vs_candidate == Ordering::Greater,
		}
	}

	/// Decides whether a constraint passes and if the package has to be fetched from the registry.
	///
	/// # Arguments
	/// - `remote`: `vercmp(required, registry_version)`
	/// - `local`: `vercmp(required, installed_version)`, `None` when not installed or the lookup failed.
	///
	/// The constraint passes when *either* side admits it, but a download is only skipped when the
	/// installed version admits it.
	/* XXX: `needs_download` ignores `remote`, a pass from the installed version alone never downloads. */
	pub fn evaluate(self, remote: Ordering, local: Option<Ordering>) -> Satisfaction {
		let local_admits = local.map_or(false, |o| self.admits(o));
		Satisfaction {
			pass: self.admits(remote) || local_admits,
			needs_download: !local_admits,
		}
	}
}

impl std::fmt::Display for Operator {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.as_str())
	}
}

impl std::str::FromStr for Operator {
	type Err = crate::Error;
	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"<" => Ok(Operator::Less),
			"<=" => Ok(Operator::LessEqual),
			"=" => Ok(Operator::Equal),
			">=" => Ok(Operator::GreaterEqual),
			">" => Ok(Operator::Greater),
			_ => Err(crate::Error::Parse(format!("unknown version operator \"{}\"", s))),
		}
	}
}

/// Result of checking a [`Constraint`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Satisfaction {
	pub pass: bool,
	pub needs_download: bool,
}

/// A dependency on a range of versions of a package.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Constraint {
	pub name: String,
	pub operator: Operator,
	pub version: String,
}

fn constraint_regex() -> &'static Regex {
	static RE: OnceLock<Regex> = OnceLock::new();
	/* The version may not start with an operator character, otherwise `foo>=` would backtrack into `>` with version `=` */
	RE.get_or_init(|| Regex::new(r"^(?P<name>.+?)(?P<op>>=|<=|=|>|<)(?P<version>[^<>=].*)$").expect("constraint regex is valid"))
}

impl Constraint {
	/// Parses a raw dependency token.
	///
	/// Returns `None` for a bare name, such tokens carry no constraint.
	pub fn parse(token: &str) -> Option<Constraint> {
		let caps = constraint_regex().captures(token)?;
		Some(Constraint {
			name: caps["name"].to_string(),
			operator: caps["op"].parse().ok()?,
			version: caps["version"].to_string(),
		})
	}

	/// Checks this constraint against the registry version and optionally the installed version.
	pub fn check(&self, remote_version: &str, local_version: Option<&str>) -> Satisfaction {
		let remote = crate::version::vercmp(&self.version, remote_version);
		let local = local_version.map(|v| crate::version::vercmp(&self.version, v));
		self.operator.evaluate(remote, local)
	}
}

impl std::fmt::Display for Constraint {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}{}{}", self.name, self.operator, self.version)
	}
}

/// Gets just the package name of a dependency token.
pub fn strip(token: &str) -> &str {
	match constraint_regex().captures(token).and_then(|c| c.name("name")) {
		Some(m) => &token[m.range()],
		None => token,
	}
}
