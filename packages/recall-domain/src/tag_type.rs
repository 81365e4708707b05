use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// Kind of a tag, totally ordered by specificity.
///
/// When two mentions share a normalized key but disagree on the type, the higher-ranked type wins.
/// Adding a kind means adding a variant here and a rank below; the `match` keeps the table
/// exhaustive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TagType {
	Entity,
	Relation,
	Quantity,
	Time,
	Object,
	Activity,
	Event,
	Organization,
	Person,
	Place,
}
impl TagType {
	pub const ALL: [Self; 10] = [
		Self::Entity,
		Self::Relation,
		Self::Quantity,
		Self::Time,
		Self::Object,
		Self::Activity,
		Self::Event,
		Self::Organization,
		Self::Person,
		Self::Place,
	];

	pub fn rank(self) -> u8 {
		match self {
			Self::Entity => 1,
			Self::Relation => 2,
			Self::Quantity => 3,
			Self::Time => 4,
			Self::Object => 5,
			Self::Activity => 6,
			Self::Event => 7,
			Self::Organization => 8,
			Self::Person => 9,
			Self::Place => 10,
		}
	}

	pub fn as_str(self) -> &'static str {
		match self {
			Self::Entity => "entity",
			Self::Relation => "relation",
			Self::Quantity => "quantity",
			Self::Time => "time",
			Self::Object => "object",
			Self::Activity => "activity",
			Self::Event => "event",
			Self::Organization => "organization",
			Self::Person => "person",
			Self::Place => "place",
		}
	}

	/// True when `self` should replace `existing` on a shared key.
	pub fn outranks(self, existing: Self) -> bool {
		self.rank() > existing.rank()
	}

	/// Parses a model-supplied label, mapping anything unrecognized to [`TagType::Entity`].
	pub fn from_label(label: &str) -> Self {
		label.parse().unwrap_or(Self::Entity)
	}
}
impl fmt::Display for TagType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}
impl FromStr for TagType {
	type Err = UnknownTagType;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let lowered = s.trim().to_ascii_lowercase();

		Self::ALL
			.into_iter()
			.find(|kind| kind.as_str() == lowered)
			.ok_or_else(|| UnknownTagType(s.to_string()))
	}
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown tag type {0:?}")]
pub struct UnknownTagType(pub String);

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn ranks_are_distinct_and_ordered_like_all() {
		let ranks: Vec<u8> = TagType::ALL.iter().map(|kind| kind.rank()).collect();

		assert_eq!(ranks, (1..=10).collect::<Vec<u8>>());
	}

	#[test]
	fn entity_is_the_fallback_and_place_the_most_specific() {
		assert_eq!(TagType::Entity.rank(), 1);
		assert_eq!(TagType::Place.rank(), 10);
		assert_eq!(TagType::from_label("Galaxy"), TagType::Entity);
	}

	#[test]
	fn strict_parse_rejects_unknown_labels() {
		let err = "galaxy".parse::<TagType>().expect_err("Unknown label.");

		assert_eq!(err.to_string(), r#"unknown tag type "galaxy""#);
		assert_eq!(" Place ".parse::<TagType>(), Ok(TagType::Place));
	}
}
