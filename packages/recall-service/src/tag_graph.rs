use std::cmp::Reverse;

use recall_domain::normalize;
use recall_storage::{Note, NoteStore, Tag, TagMatch};

use crate::Result;

/// Read side of the note/tag association graph. Note lists are newest first.
pub struct TagGraph<'a> {
	store: &'a dyn NoteStore,
}
impl<'a> TagGraph<'a> {
	pub fn new(store: &'a dyn NoteStore) -> Self {
		Self { store }
	}

	pub async fn entries_for_tag(&self, tag_id: i64) -> Result<Vec<Note>> {
		Ok(self.store.notes_for_tags(&[tag_id], TagMatch::Any).await?)
	}

	pub async fn entries_for_any_tag(&self, tag_ids: &[i64]) -> Result<Vec<Note>> {
		self.entries_for_tags(tag_ids, TagMatch::Any).await
	}

	pub async fn entries_for_all_tags(&self, tag_ids: &[i64]) -> Result<Vec<Note>> {
		self.entries_for_tags(tag_ids, TagMatch::All).await
	}

	pub async fn entries_for_tags(&self, tag_ids: &[i64], mode: TagMatch) -> Result<Vec<Note>> {
		if tag_ids.is_empty() {
			return Ok(Vec::new());
		}

		Ok(self.store.notes_for_tags(tag_ids, mode).await?)
	}

	/// Case-insensitive substring match over display names and normalized keys.
	pub async fn find_tags(&self, name: &str) -> Result<Vec<Tag>> {
		let name = name.trim();

		if name.is_empty() {
			return Ok(Vec::new());
		}

		Ok(self.store.search_tags(name).await?)
	}

	/// The single tag a free-text name most plausibly refers to.
	///
	/// Exact display name matches beat normalized key matches, which beat substring matches.
	/// Within a tier the most specific type wins, then result order.
	pub async fn best_tag(&self, name: &str) -> Result<Option<Tag>> {
		let name = name.trim();
		let key = normalize::normalize_key(name);
		let mut candidates = self.find_tags(name).await?;

		if !key.is_empty() {
			for tag in self.store.find_tags_by_key(&key).await? {
				if !candidates.iter().any(|known| known.tag_id == tag.tag_id) {
					candidates.push(tag);
				}
			}
		}

		let lowered = name.to_lowercase();
		let tier = |tag: &Tag| {
			if tag.display_name.to_lowercase() == lowered {
				0
			} else if !key.is_empty() && tag.normalized_key == key {
				1
			} else {
				2
			}
		};

		Ok(candidates.into_iter().min_by_key(|tag| (tier(tag), Reverse(tag.tag_type.rank()))))
	}
}
