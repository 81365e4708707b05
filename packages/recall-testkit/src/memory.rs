use std::{
	collections::{BTreeMap, HashSet},
	sync::{
		Arc, Mutex, MutexGuard,
		atomic::{AtomicBool, AtomicUsize, Ordering},
	},
};

use serde_json::Value;
use time::OffsetDateTime;
use tokio::sync::Notify;

use recall_domain::TagType;
use recall_storage::{AttachedTag, BoxFuture, Error, Note, NoteStore, Result, Tag, TagMatch};

#[derive(Clone, Debug)]
struct Association {
	value: Option<String>,
	metadata: Option<Value>,
}

#[derive(Default)]
struct State {
	next_note_id: i64,
	next_tag_id: i64,
	notes: BTreeMap<i64, Note>,
	tags: BTreeMap<i64, Tag>,
	note_tags: BTreeMap<(i64, i64), Association>,
	pending_races: Vec<(String, String, TagType)>,
	failing_embedding_offset: Option<u32>,
	embedding_read_gate: Option<Arc<ReadGate>>,
}
impl State {
	fn sorted_notes<'a>(&'a self, filter: impl Fn(&Note) -> bool) -> Vec<&'a Note> {
		let mut notes = self.notes.values().filter(|note| filter(note)).collect::<Vec<_>>();

		notes.sort_by(|a, b| {
			b.created_at.cmp(&a.created_at).then_with(|| b.note_id.cmp(&a.note_id))
		});

		notes
	}

	fn insert_tag(
		&mut self,
		display_name: &str,
		tag_type: TagType,
		normalized_key: &str,
	) -> Result<Tag> {
		if self
			.tags
			.values()
			.any(|tag| tag.normalized_key == normalized_key && tag.tag_type == tag_type)
		{
			return Err(Error::Conflict(format!(
				"Tag ({normalized_key}, {tag_type}) already exists."
			)));
		}

		self.next_tag_id += 1;

		let tag = Tag {
			tag_id: self.next_tag_id,
			display_name: display_name.to_string(),
			tag_type,
			normalized_key: normalized_key.to_string(),
		};

		self.tags.insert(tag.tag_id, tag.clone());

		Ok(tag)
	}
}

/// Holds one `notes_with_embeddings` call open until the test releases it.
#[derive(Debug, Default)]
pub struct ReadGate {
	entered: Notify,
	released: Notify,
}
impl ReadGate {
	/// Waits until the gated read has started.
	pub async fn entered(&self) {
		self.entered.notified().await;
	}

	pub fn release(&self) {
		self.released.notify_one();
	}
}

/// An in-memory [`NoteStore`] with the same ordering and uniqueness rules as the Postgres store.
///
/// Failure switches and call counters let tests drive the degraded paths of the engine.
#[derive(Default)]
pub struct MemoryStore {
	state: Mutex<State>,
	fail_embedding_reads: AtomicBool,
	fail_tag_reads: AtomicBool,
	embedding_reads: AtomicUsize,
}
impl MemoryStore {
	pub fn new() -> Self {
		Self::default()
	}

	/// Makes every `notes_with_embeddings` call fail.
	pub fn fail_embedding_reads(&self, fail: bool) {
		self.fail_embedding_reads.store(fail, Ordering::SeqCst);
	}

	/// Makes `notes_with_embeddings` fail for every batch starting at or past `offset`.
	pub fn fail_embedding_reads_from(&self, offset: Option<u32>) {
		self.lock().failing_embedding_offset = offset;
	}

	/// Pauses the next `notes_with_embeddings` call until the returned gate is released.
	pub fn gate_next_embedding_read(&self) -> Arc<ReadGate> {
		let gate = Arc::new(ReadGate::default());

		self.lock().embedding_read_gate = Some(gate.clone());

		gate
	}

	/// Makes every `notes_for_tags` call fail.
	pub fn fail_tag_reads(&self, fail: bool) {
		self.fail_tag_reads.store(fail, Ordering::SeqCst);
	}

	/// Number of `notes_with_embeddings` batches served so far.
	pub fn embedding_reads(&self) -> usize {
		self.embedding_reads.load(Ordering::SeqCst)
	}

	/// Simulates a concurrent writer: the next `create_tag` for `normalized_key` first inserts a
	/// competing tag with `tag_type`, then fails with a conflict.
	pub fn race_next_create(&self, display_name: &str, tag_type: TagType, normalized_key: &str) {
		self.lock().pending_races.push((
			normalized_key.to_string(),
			display_name.to_string(),
			tag_type,
		));
	}

	pub fn note_count(&self) -> usize {
		self.lock().notes.len()
	}

	pub fn tag_count(&self) -> usize {
		self.lock().tags.len()
	}

	pub fn association_count(&self) -> usize {
		self.lock().note_tags.len()
	}

	fn lock(&self) -> MutexGuard<'_, State> {
		self.state.lock().unwrap_or_else(|err| err.into_inner())
	}
}
impl NoteStore for MemoryStore {
	fn insert_note<'a>(
		&'a self,
		text: &'a str,
		now: OffsetDateTime,
	) -> BoxFuture<'a, Result<Note>> {
		Box::pin(async move {
			let mut state = self.lock();

			state.next_note_id += 1;

			let note = Note {
				note_id: state.next_note_id,
				text: text.to_string(),
				created_at: now,
				updated_at: now,
				embedding: None,
			};

			state.notes.insert(note.note_id, note.clone());

			Ok(note)
		})
	}

	fn get_note(&self, note_id: i64) -> BoxFuture<'_, Result<Option<Note>>> {
		Box::pin(async move { Ok(self.lock().notes.get(&note_id).cloned()) })
	}

	fn update_note_text<'a>(
		&'a self,
		note_id: i64,
		text: &'a str,
		now: OffsetDateTime,
	) -> BoxFuture<'a, Result<Option<Note>>> {
		Box::pin(async move {
			let mut state = self.lock();
			let Some(note) = state.notes.get_mut(&note_id) else {
				return Ok(None);
			};

			note.text = text.to_string();
			note.updated_at = now;

			Ok(Some(note.clone()))
		})
	}

	fn delete_note(&self, note_id: i64) -> BoxFuture<'_, Result<bool>> {
		Box::pin(async move {
			let mut state = self.lock();
			let removed = state.notes.remove(&note_id).is_some();

			state.note_tags.retain(|(note, _), _| *note != note_id);

			Ok(removed)
		})
	}

	fn set_note_embedding<'a>(
		&'a self,
		note_id: i64,
		embedding: Option<&'a [f32]>,
	) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move {
			let mut state = self.lock();
			let Some(note) = state.notes.get_mut(&note_id) else {
				return Err(Error::NotFound(format!("Note {note_id} does not exist.")));
			};

			note.embedding = embedding.map(<[f32]>::to_vec);

			Ok(())
		})
	}

	fn recent_notes(&self, limit: u32, offset: u32) -> BoxFuture<'_, Result<Vec<Note>>> {
		Box::pin(async move {
			let state = self.lock();

			Ok(state
				.sorted_notes(|_| true)
				.into_iter()
				.skip(offset as usize)
				.take(limit as usize)
				.cloned()
				.collect())
		})
	}

	fn notes_with_embeddings(&self, limit: u32, offset: u32) -> BoxFuture<'_, Result<Vec<Note>>> {
		Box::pin(async move {
			self.embedding_reads.fetch_add(1, Ordering::SeqCst);

			let failing_from = self.lock().failing_embedding_offset;

			if self.fail_embedding_reads.load(Ordering::SeqCst)
				|| failing_from.is_some_and(|from| offset >= from)
			{
				return Err(Error::InvalidArgument("Embedding reads are disabled.".to_string()));
			}

			let (notes, gate) = {
				let mut state = self.lock();
				let notes = state
					.sorted_notes(|note| note.embedding.is_some())
					.into_iter()
					.skip(offset as usize)
					.take(limit as usize)
					.cloned()
					.collect::<Vec<_>>();

				(notes, state.embedding_read_gate.take())
			};

			// The batch is already read; writes made while the gate is held are not in it.
			if let Some(gate) = gate {
				gate.entered.notify_one();
				gate.released.notified().await;
			}

			Ok(notes)
		})
	}

	fn find_tag<'a>(
		&'a self,
		normalized_key: &'a str,
		tag_type: TagType,
	) -> BoxFuture<'a, Result<Option<Tag>>> {
		Box::pin(async move {
			Ok(self
				.lock()
				.tags
				.values()
				.find(|tag| tag.normalized_key == normalized_key && tag.tag_type == tag_type)
				.cloned())
		})
	}

	fn find_tags_by_key<'a>(&'a self, normalized_key: &'a str) -> BoxFuture<'a, Result<Vec<Tag>>> {
		Box::pin(async move {
			Ok(self
				.lock()
				.tags
				.values()
				.filter(|tag| tag.normalized_key == normalized_key)
				.cloned()
				.collect())
		})
	}

	fn search_tags<'a>(&'a self, fragment: &'a str) -> BoxFuture<'a, Result<Vec<Tag>>> {
		Box::pin(async move {
			let needle = fragment.to_lowercase();

			Ok(self
				.lock()
				.tags
				.values()
				.filter(|tag| {
					tag.display_name.to_lowercase().contains(&needle)
						|| tag.normalized_key.contains(&needle)
				})
				.cloned()
				.collect())
		})
	}

	fn create_tag<'a>(
		&'a self,
		display_name: &'a str,
		tag_type: TagType,
		normalized_key: &'a str,
	) -> BoxFuture<'a, Result<Tag>> {
		Box::pin(async move {
			if normalized_key.is_empty() {
				return Err(Error::InvalidArgument("Tag key must not be empty.".to_string()));
			}

			let mut state = self.lock();

			if let Some(pos) =
				state.pending_races.iter().position(|(key, _, _)| key == normalized_key)
			{
				let (key, name, race_type) = state.pending_races.remove(pos);

				state.insert_tag(&name, race_type, &key)?;

				return Err(Error::Conflict(format!(
					"Tag ({normalized_key}, {tag_type}) was created concurrently."
				)));
			}

			state.insert_tag(display_name, tag_type, normalized_key)
		})
	}

	fn update_tag_type(&self, tag_id: i64, tag_type: TagType) -> BoxFuture<'_, Result<Tag>> {
		Box::pin(async move {
			let mut state = self.lock();
			let Some(key) = state.tags.get(&tag_id).map(|tag| tag.normalized_key.clone()) else {
				return Err(Error::NotFound(format!("Tag {tag_id} does not exist.")));
			};

			if state.tags.values().any(|tag| {
				tag.tag_id != tag_id && tag.normalized_key == key && tag.tag_type == tag_type
			}) {
				return Err(Error::Conflict(format!("Tag ({key}, {tag_type}) already exists.")));
			}

			let Some(tag) = state.tags.get_mut(&tag_id) else {
				return Err(Error::NotFound(format!("Tag {tag_id} does not exist.")));
			};

			tag.tag_type = tag_type;

			Ok(tag.clone())
		})
	}

	fn attach_tag<'a>(
		&'a self,
		note_id: i64,
		tag_id: i64,
		value: Option<&'a str>,
		metadata: Option<&'a Value>,
	) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move {
			let mut state = self.lock();

			if !state.notes.contains_key(&note_id) || !state.tags.contains_key(&tag_id) {
				return Err(Error::NotFound(format!(
					"Cannot attach tag {tag_id} to note {note_id}."
				)));
			}

			state.note_tags.insert(
				(note_id, tag_id),
				Association { value: value.map(str::to_string), metadata: metadata.cloned() },
			);

			Ok(())
		})
	}

	fn clear_note_tags(&self, note_id: i64) -> BoxFuture<'_, Result<()>> {
		Box::pin(async move {
			self.lock().note_tags.retain(|(note, _), _| *note != note_id);

			Ok(())
		})
	}

	fn tags_for_note(&self, note_id: i64) -> BoxFuture<'_, Result<Vec<AttachedTag>>> {
		Box::pin(async move {
			let state = self.lock();

			Ok(state
				.note_tags
				.iter()
				.filter(|((note, _), _)| *note == note_id)
				.filter_map(|((_, tag_id), assoc)| {
					state.tags.get(tag_id).map(|tag| AttachedTag {
						tag: tag.clone(),
						value: assoc.value.clone(),
						metadata: assoc.metadata.clone(),
					})
				})
				.collect())
		})
	}

	fn notes_for_tags<'a>(
		&'a self,
		tag_ids: &'a [i64],
		mode: TagMatch,
	) -> BoxFuture<'a, Result<Vec<Note>>> {
		Box::pin(async move {
			if self.fail_tag_reads.load(Ordering::SeqCst) {
				return Err(Error::InvalidArgument("Tag reads are disabled.".to_string()));
			}

			let wanted = tag_ids.iter().copied().collect::<HashSet<_>>();

			if wanted.is_empty() {
				return Ok(Vec::new());
			}

			let state = self.lock();
			let matches = |note: &Note| {
				let carried = state
					.note_tags
					.keys()
					.filter(|(note_id, tag_id)| *note_id == note.note_id && wanted.contains(tag_id))
					.count();

				match mode {
					TagMatch::Any => carried > 0,
					TagMatch::All => carried == wanted.len(),
				}
			};

			Ok(state.sorted_notes(matches).into_iter().cloned().collect())
		})
	}
}
