use std::{future::Future, pin::Pin};

use serde_json::Value;
use time::OffsetDateTime;

use recall_domain::TagType;

use crate::{AttachedTag, Note, Result, Tag};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TagMatch {
	/// Notes carrying at least one of the tags.
	Any,
	/// Notes carrying every one of the tags.
	All,
}

/// The relational store the retrieval engine reads and writes through.
///
/// Every list of notes is ordered newest first (`created_at`, then `note_id`, both descending).
/// Implementations must enforce uniqueness of `(normalized_key, tag_type)` and report a violation
/// as [`crate::Error::Conflict`].
pub trait NoteStore
where
	Self: Send + Sync,
{
	fn insert_note<'a>(&'a self, text: &'a str, now: OffsetDateTime) -> BoxFuture<'a, Result<Note>>;

	fn get_note(&self, note_id: i64) -> BoxFuture<'_, Result<Option<Note>>>;

	/// Returns `None` when the note does not exist.
	fn update_note_text<'a>(
		&'a self,
		note_id: i64,
		text: &'a str,
		now: OffsetDateTime,
	) -> BoxFuture<'a, Result<Option<Note>>>;

	/// Deletes the note and its tag associations. Returns whether a note was removed.
	fn delete_note(&self, note_id: i64) -> BoxFuture<'_, Result<bool>>;

	fn set_note_embedding<'a>(
		&'a self,
		note_id: i64,
		embedding: Option<&'a [f32]>,
	) -> BoxFuture<'a, Result<()>>;

	fn recent_notes(&self, limit: u32, offset: u32) -> BoxFuture<'_, Result<Vec<Note>>>;

	/// Like [`NoteStore::recent_notes`], restricted to notes with a stored embedding.
	fn notes_with_embeddings(&self, limit: u32, offset: u32) -> BoxFuture<'_, Result<Vec<Note>>>;

	fn find_tag<'a>(
		&'a self,
		normalized_key: &'a str,
		tag_type: TagType,
	) -> BoxFuture<'a, Result<Option<Tag>>>;

	/// All tags sharing `normalized_key`, in creation order.
	fn find_tags_by_key<'a>(&'a self, normalized_key: &'a str) -> BoxFuture<'a, Result<Vec<Tag>>>;

	/// Case-insensitive substring match on display name or normalized key, in creation order.
	fn search_tags<'a>(&'a self, fragment: &'a str) -> BoxFuture<'a, Result<Vec<Tag>>>;

	fn create_tag<'a>(
		&'a self,
		display_name: &'a str,
		tag_type: TagType,
		normalized_key: &'a str,
	) -> BoxFuture<'a, Result<Tag>>;

	/// Rewrites the type of an existing tag in place, keeping its id and associations.
	fn update_tag_type(&self, tag_id: i64, tag_type: TagType) -> BoxFuture<'_, Result<Tag>>;

	/// Attaches a tag to a note, replacing the payload if the pair already exists.
	fn attach_tag<'a>(
		&'a self,
		note_id: i64,
		tag_id: i64,
		value: Option<&'a str>,
		metadata: Option<&'a Value>,
	) -> BoxFuture<'a, Result<()>>;

	fn clear_note_tags(&self, note_id: i64) -> BoxFuture<'_, Result<()>>;

	fn tags_for_note(&self, note_id: i64) -> BoxFuture<'_, Result<Vec<AttachedTag>>>;

	fn notes_for_tags<'a>(
		&'a self,
		tag_ids: &'a [i64],
		mode: TagMatch,
	) -> BoxFuture<'a, Result<Vec<Note>>>;
}
