use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;

use recall_domain::TagType;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Note {
	pub note_id: i64,
	pub text: String,
	#[serde(with = "crate::time_serde")]
	pub created_at: OffsetDateTime,
	#[serde(with = "crate::time_serde")]
	pub updated_at: OffsetDateTime,
	#[serde(skip)]
	pub embedding: Option<Vec<f32>>,
}
impl Note {
	pub fn has_embedding(&self) -> bool {
		self.embedding.as_ref().is_some_and(|vec| !vec.is_empty())
	}
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
	pub tag_id: i64,
	pub display_name: String,
	pub tag_type: TagType,
	pub normalized_key: String,
}

/// A tag as attached to one note, with the association payload.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AttachedTag {
	#[serde(flatten)]
	pub tag: Tag,
	pub value: Option<String>,
	pub metadata: Option<Value>,
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct TagRow {
	pub tag_id: i64,
	pub display_name: String,
	pub tag_type: String,
	pub normalized_key: String,
}
impl From<TagRow> for Tag {
	fn from(row: TagRow) -> Self {
		Self {
			tag_id: row.tag_id,
			display_name: row.display_name,
			tag_type: TagType::from_label(&row.tag_type),
			normalized_key: row.normalized_key,
		}
	}
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct AttachedTagRow {
	pub tag_id: i64,
	pub display_name: String,
	pub tag_type: String,
	pub normalized_key: String,
	pub value: Option<String>,
	pub metadata: Option<Value>,
}
impl From<AttachedTagRow> for AttachedTag {
	fn from(row: AttachedTagRow) -> Self {
		Self {
			tag: Tag {
				tag_id: row.tag_id,
				display_name: row.display_name,
				tag_type: TagType::from_label(&row.tag_type),
				normalized_key: row.normalized_key,
			},
			value: row.value,
			metadata: row.metadata,
		}
	}
}
