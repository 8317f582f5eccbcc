use std::collections::BTreeMap;

use crate::registry::PackageRecord;

/// Every package record found while resolving, keyed by package name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DependencyTable {
	records: BTreeMap<String, PackageRecord>,
}

impl DependencyTable {
	pub fn new() -> Self {
		Self::default()
	}

	/// Adds `record` unless a record with the same name exists.
	///
	/// Returns `true` when the record was added.
	pub fn insert(&mut self, record: PackageRecord) -> bool {
		use std::collections::btree_map::Entry;
		match self.records.entry(record.name.clone()) {
			Entry::Occupied(_) => false,
			Entry::Vacant(v) => {
				v.insert(record);
				true
			},
		}
	}

	pub fn get(&self, name: &str) -> Option<&PackageRecord> {
		self.records.get(name)
	}

	/// Same as [`get()`](Self::get) but also returns the key which lives as long as the table.
	pub fn get_key_value(&self, name: &str) -> Option<(&str, &PackageRecord)> {
		self.records.get_key_value(name).map(|(k, v)| (k.as_str(), v))
	}

	pub fn contains(&self, name: &str) -> bool {
		self.records.contains_key(name)
	}

	pub fn names(&self) -> impl Iterator<Item = &str> {
		self.records.keys().map(String::as_str)
	}

	pub fn records(&self) -> impl Iterator<Item = &PackageRecord> {
		self.records.values()
	}

	pub fn len(&self) -> usize {
		self.records.len()
	}

	pub fn is_empty(&self) -> bool {
		self.records.is_empty()
	}
}

impl FromIterator<PackageRecord> for DependencyTable {
	fn from_iter<T: IntoIterator<Item = PackageRecord>>(iter: T) -> Self {
		let mut table = Self::new();
		for record in iter {
			table.insert(record);
		}
		table
	}
}

impl IntoIterator for DependencyTable {
	type Item = PackageRecord;
	type IntoIter = std::collections::btree_map::IntoValues<String, PackageRecord>;

	fn into_iter(self) -> Self::IntoIter {
		self.records.into_values()
	}
}
