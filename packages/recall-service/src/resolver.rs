use recall_domain::TagType;
use recall_storage::{NoteStore, Tag};

use crate::{Error, Result};

/// Maps a proposed `(name, type, key)` onto the canonical tag for that key.
///
/// A key holds at most one tag in practice. Proposals with a more specific type upgrade the
/// existing tag in place; proposals with an equal or less specific type leave it untouched.
pub struct EntityResolver<'a> {
	store: &'a dyn NoteStore,
}
impl<'a> EntityResolver<'a> {
	pub fn new(store: &'a dyn NoteStore) -> Self {
		Self { store }
	}

	pub async fn resolve(
		&self,
		name: &str,
		proposed_type: TagType,
		normalized_key: &str,
	) -> Result<Tag> {
		if normalized_key.is_empty() {
			return Err(Error::invalid_request("Tag name normalizes to an empty key."));
		}

		match self.resolve_once(name, proposed_type, normalized_key).await {
			Err(recall_storage::Error::Conflict(message)) => {
				tracing::warn!(
					normalized_key,
					tag_type = %proposed_type,
					%message,
					"Concurrent tag write detected. Re-reading."
				);

				Ok(self.resolve_once(name, proposed_type, normalized_key).await?)
			},
			other => Ok(other?),
		}
	}

	async fn resolve_once(
		&self,
		name: &str,
		proposed_type: TagType,
		normalized_key: &str,
	) -> recall_storage::Result<Tag> {
		if let Some(tag) = self.store.find_tag(normalized_key, proposed_type).await? {
			return Ok(tag);
		}

		let existing = self.store.find_tags_by_key(normalized_key).await?;
		let Some(current) = most_specific(existing) else {
			let tag = self.store.create_tag(name, proposed_type, normalized_key).await?;

			tracing::debug!(tag_id = tag.tag_id, tag_type = %tag.tag_type, "Created tag.");

			return Ok(tag);
		};

		if !proposed_type.outranks(current.tag_type) {
			return Ok(current);
		}

		let tag = self.store.update_tag_type(current.tag_id, proposed_type).await?;

		tracing::debug!(
			tag_id = tag.tag_id,
			from = %current.tag_type,
			to = %tag.tag_type,
			"Upgraded tag type."
		);

		Ok(tag)
	}
}

/// Highest ranked tag, first one on ties.
pub(crate) fn most_specific(tags: Vec<Tag>) -> Option<Tag> {
	tags.into_iter().fold(None, |best: Option<Tag>, tag| match best {
		Some(best) if !tag.tag_type.outranks(best.tag_type) => Some(best),
		_ => Some(tag),
	})
}
