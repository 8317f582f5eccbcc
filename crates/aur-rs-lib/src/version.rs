//! Package version ordering.
//!
//! Versions take the form `epoch:pkgver-pkgrel` where only `pkgver` is required.
//! Ordering follows pacman's `vercmp`:
//! - The epoch (missing epoch is `0`) is compared first and overrides everything else.
//! - `pkgver` is compared segment by segment, where a segment is a run of digits or a run of letters.
//! - `pkgrel` is only compared when *both* versions have one, so `1.5-1` and `1.5` are equal.
//!   This is what allows dependencies like `foo>=1.5` to ignore the release.

use std::cmp::Ordering;

use serde::{Serialize, Deserialize};

/// Compares two version strings.
///
/// Returns [`Ordering::Greater`] when `a` is newer than `b`.
pub fn vercmp(a: &str, b: &str) -> Ordering {
	if a == b {
		return Ordering::Equal
	}

	let (a_epoch, a_ver, a_rel) = split_evr(a);
	let (b_epoch, b_ver, b_rel) = split_evr(b);

	match rpmvercmp(a_epoch, b_epoch) {
		Ordering::Equal => {},
		ord => return ord,
	}
	match rpmvercmp(a_ver, b_ver) {
		Ordering::Equal => {},
		ord => return ord,
	}
	match (a_rel, b_rel) {
		(Some(a_rel), Some(b_rel)) => rpmvercmp(a_rel, b_rel),
		_ => Ordering::Equal,
	}
}

/// Splits `epoch:pkgver-pkgrel` into its parts, epoch defaults to `"0"`.
fn split_evr(s: &str) -> (&str, &str, Option<&str>) {
	let digits = s.bytes().take_while(u8::is_ascii_digit).count();
	let (epoch, rest) = if s[digits..].starts_with(':') {
		let epoch = &s[..digits];
		(if epoch.is_empty() { "0" } else { epoch }, &s[digits + 1..])
	} else {
		("0", s)
	};

	match rest.rfind('-') {
		Some(i) => (epoch, &rest[..i], Some(&rest[i + 1..])),
		None => (epoch, rest, None),
	}
}

/// Segment comparison of a single version component.
fn rpmvercmp(a: &str, b: &str) -> Ordering {
	if a == b {
		return Ordering::Equal
	}

	let one = a.as_bytes();
	let two = b.as_bytes();

	/* `i`/`j` are the start of the current segment, `p1`/`p2` the end of the previous one */
	let (mut i, mut j) = (0, 0);
	let (mut p1, mut p2) = (0, 0);

	while i < one.len() && j < two.len() {
		while i < one.len() && !one[i].is_ascii_alphanumeric() { i += 1; }
		while j < two.len() && !two[j].is_ascii_alphanumeric() { j += 1; }

		if i >= one.len() || j >= two.len() {
			break;
		}

		/* A longer separator wins, `1..0` is newer than `1.1` */
		let (sep1, sep2) = (i - p1, j - p2);
		if sep1 != sep2 {
			return sep1.cmp(&sep2)
		}

		p1 = i;
		p2 = j;

		let is_num = one[p1].is_ascii_digit();
		if is_num {
			while p1 < one.len() && one[p1].is_ascii_digit() { p1 += 1; }
			while p2 < two.len() && two[p2].is_ascii_digit() { p2 += 1; }
		} else {
			while p1 < one.len() && one[p1].is_ascii_alphabetic() { p1 += 1; }
			while p2 < two.len() && two[p2].is_ascii_alphabetic() { p2 += 1; }
		}

		/* Segments of different types, numeric is always newer than alpha */
		if j == p2 {
			return if is_num { Ordering::Greater } else { Ordering::Less }
		}

		let mut seg1 = &one[i..p1];
		let mut seg2 = &two[j..p2];

		if is_num {
			while let [b'0', rest @ ..] = seg1 { seg1 = rest; }
			while let [b'0', rest @ ..] = seg2 { seg2 = rest; }

			match seg1.len().cmp(&seg2.len()) {
				Ordering::Equal => {},
				ord => return ord,
			}
		}

		match seg1.cmp(seg2) {
			Ordering::Equal => {},
			ord => return ord,
		}

		i = p1;
		j = p2;
	}

	if i >= one.len() && j >= two.len() {
		return Ordering::Equal
	}

	/* A remaining alpha segment never beats nothing, `1.0a` is older than `1.0` */
	if (i >= one.len() && !two[j].is_ascii_alphabetic()) || (i < one.len() && one[i].is_ascii_alphabetic()) {
		Ordering::Less
	} else {
		Ordering::Greater
	}
}

/// A version string ordered with [`vercmp`].
///
/// Only `PartialEq`/`PartialOrd` are implemented because release-less versions make equality non-transitive,
/// `1.5-1 == 1.5` and `1.5 == 1.5-2` but `1.5-1 < 1.5-2`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PackageVersion(String);

impl PackageVersion {
	pub fn new(version: impl Into<String>) -> Self {
		Self(version.into())
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}

	pub fn epoch(&self) -> &str {
		split_evr(&self.0).0
	}

	pub fn pkgver(&self) -> &str {
		split_evr(&self.0).1
	}

	pub fn pkgrel(&self) -> Option<&str> {
		split_evr(&self.0).2
	}
}

impl From<&str> for PackageVersion {
	fn from(value: &str) -> Self { Self::new(value) }
}

impl From<String> for PackageVersion {
	fn from(value: String) -> Self { Self::new(value) }
}

impl AsRef<str> for PackageVersion {
	fn as_ref(&self) -> &str {
		&self.0
	}
}

impl PartialEq for PackageVersion {
	fn eq(&self, other: &Self) -> bool {
		vercmp(&self.0, &other.0) == Ordering::Equal
	}
}

impl PartialOrd for PackageVersion {
	fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
		Some(vercmp(&self.0, &other.0))
	}
}

impl std::fmt::Display for PackageVersion {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", self.0)
	}
}
