use std::collections::HashSet;

use serde_json::Value;

use crate::{TagType, normalize};

/// A tag proposed for a note, before it is resolved against the tag vocabulary.
#[derive(Clone, Debug, PartialEq)]
pub struct Mention {
	pub name: String,
	pub tag_type: TagType,
	pub normalized_key: String,
	pub value: Option<String>,
	pub metadata: Option<Value>,
}
impl Mention {
	pub fn new(name: &str, tag_type: TagType) -> Self {
		let name = name.trim();

		Self {
			name: name.to_string(),
			tag_type,
			normalized_key: normalize::normalize_key(name),
			value: None,
			metadata: None,
		}
	}

	pub fn with_value(mut self, value: impl Into<String>) -> Self {
		self.value = Some(value.into());

		self
	}

	pub fn with_metadata(mut self, metadata: Value) -> Self {
		self.metadata = Some(metadata);

		self
	}

	pub fn is_empty(&self) -> bool {
		self.normalized_key.is_empty()
	}
}

/// Keeps the first mention for every normalized key and drops mentions whose key is empty.
///
/// Later mentions of the same key are discarded even if they carry a more specific type. The
/// resolver is what upgrades types, and it only sees one mention per key per note.
pub fn dedupe_by_key(mentions: Vec<Mention>) -> Vec<Mention> {
	let mut seen = HashSet::new();

	mentions
		.into_iter()
		.filter(|mention| !mention.is_empty())
		.filter(|mention| seen.insert(mention.normalized_key.clone()))
		.collect()
}
