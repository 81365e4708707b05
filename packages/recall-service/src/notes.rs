use serde::Serialize;
use serde_json::Value;
use time::OffsetDateTime;

use recall_config::RetrievalStrategy;
use recall_domain::{TagType, mention::{self, Mention}};
use recall_providers::extractor::Extraction;
use recall_storage::{AttachedTag, Note, Tag};

use crate::{Error, RecallService, Result};

const MAX_LIST_LIMIT: u32 = 200;

#[derive(Clone, Debug, Serialize)]
pub struct IngestedNote {
	pub note: Note,
	pub tags: Vec<AttachedTag>,
}

/// Structure derived from note text before anything is written.
struct Derived {
	mentions: Option<Vec<Mention>>,
	embedding: Option<Vec<f32>>,
}

impl RecallService {
	/// Stores a note and derives its tags, embedding or both depending on configuration.
	///
	/// Extraction and embedding run before the insert, so a provider failure leaves no note
	/// behind.
	pub async fn ingest_note(&self, text: &str) -> Result<IngestedNote> {
		let text = require_text(text)?;
		let derived = self.derive(text).await?;
		let note = self.store.insert_note(text, OffsetDateTime::now_utc()).await?;

		tracing::info!(note_id = note.note_id, "Note stored.");

		self.apply(note, derived).await
	}

	/// Replaces the text of a note and rebuilds its tags and embedding from scratch.
	pub async fn update_note(&self, note_id: i64, text: &str) -> Result<IngestedNote> {
		let text = require_text(text)?;

		if self.store.get_note(note_id).await?.is_none() {
			return Err(Error::not_found(format!("Note {note_id} does not exist.")));
		}

		let derived = self.derive(text).await?;
		let Some(note) =
			self.store.update_note_text(note_id, text, OffsetDateTime::now_utc()).await?
		else {
			return Err(Error::not_found(format!("Note {note_id} does not exist.")));
		};

		self.store.clear_note_tags(note_id).await?;

		if derived.embedding.is_none() && note.has_embedding() {
			self.store.set_note_embedding(note_id, None).await?;
		}

		self.index.invalidate();

		tracing::info!(note_id, "Note updated.");

		self.apply(note, derived).await
	}

	pub async fn delete_note(&self, note_id: i64) -> Result<()> {
		if !self.store.delete_note(note_id).await? {
			return Err(Error::not_found(format!("Note {note_id} does not exist.")));
		}

		self.index.invalidate();

		tracing::info!(note_id, "Note deleted.");

		Ok(())
	}

	pub async fn get_note(&self, note_id: i64) -> Result<Note> {
		self.store
			.get_note(note_id)
			.await?
			.ok_or_else(|| Error::not_found(format!("Note {note_id} does not exist.")))
	}

	/// Notes newest first. `limit` is capped at 200.
	pub async fn list_notes(&self, limit: u32, offset: u32) -> Result<Vec<Note>> {
		if limit == 0 {
			return Err(Error::invalid_request("limit must be greater than zero."));
		}

		Ok(self.store.recent_notes(limit.min(MAX_LIST_LIMIT), offset).await?)
	}

	/// Attaches a tag chosen by the caller, going through the same resolution as extracted tags.
	pub async fn add_tag_to_note(
		&self,
		note_id: i64,
		name: &str,
		tag_type: TagType,
		value: Option<&str>,
		metadata: Option<&Value>,
	) -> Result<AttachedTag> {
		let mention = Mention::new(name, tag_type);

		if mention.is_empty() {
			return Err(Error::invalid_request("Tag name must contain letters or digits."));
		}
		if self.store.get_note(note_id).await?.is_none() {
			return Err(Error::not_found(format!("Note {note_id} does not exist.")));
		}

		let tag = self
			.resolver()
			.resolve(&mention.name, mention.tag_type, &mention.normalized_key)
			.await?;

		self.store.attach_tag(note_id, tag.tag_id, value, metadata).await?;

		Ok(AttachedTag { tag, value: value.map(str::to_string), metadata: metadata.cloned() })
	}

	/// Notes carrying the tag that best matches `name`. No matching tag yields an empty list.
	pub async fn entries_for_tag_name(&self, name: &str) -> Result<Vec<Note>> {
		let graph = self.tag_graph();
		let Some(tag) = graph.best_tag(name).await? else {
			return Ok(Vec::new());
		};

		graph.entries_for_tag(tag.tag_id).await
	}

	pub async fn find_tags(&self, name: &str) -> Result<Vec<Tag>> {
		self.tag_graph().find_tags(name).await
	}

	pub async fn tags_for_note(&self, note_id: i64) -> Result<Vec<AttachedTag>> {
		if self.store.get_note(note_id).await?.is_none() {
			return Err(Error::not_found(format!("Note {note_id} does not exist.")));
		}

		Ok(self.store.tags_for_note(note_id).await?)
	}

	async fn derive(&self, text: &str) -> Result<Derived> {
		let retrieval = &self.cfg.retrieval;
		let wants_tags = retrieval.index_both || retrieval.strategy == RetrievalStrategy::Tags;
		let wants_embedding =
			retrieval.index_both || retrieval.strategy == RetrievalStrategy::Embedding;
		let mentions = if wants_tags {
			let extraction = self.providers.extractor.extract(&self.cfg.providers.llm, text).await?;

			Some(mentions_from_extraction(&extraction))
		} else {
			None
		};
		let embedding = if wants_embedding {
			let texts = [text.to_string()];
			let mut vectors =
				self.providers.embedding.embed(&self.cfg.providers.embedding, &texts).await?;

			if vectors.len() != 1 || vectors[0].is_empty() {
				return Err(Error::DependencyUnavailable {
					message: "Embedding provider returned no vector for the note.".to_string(),
				});
			}

			Some(vectors.swap_remove(0))
		} else {
			None
		};

		Ok(Derived { mentions, embedding })
	}

	async fn apply(&self, mut note: Note, derived: Derived) -> Result<IngestedNote> {
		if let Some(mentions) = derived.mentions {
			let resolver = self.resolver();

			for mention in mentions {
				let tag = resolver
					.resolve(&mention.name, mention.tag_type, &mention.normalized_key)
					.await?;

				self.store
					.attach_tag(
						note.note_id,
						tag.tag_id,
						mention.value.as_deref(),
						mention.metadata.as_ref(),
					)
					.await?;
			}
		}
		if let Some(embedding) = derived.embedding {
			self.store.set_note_embedding(note.note_id, Some(&embedding)).await?;
			self.index.invalidate();

			note.embedding = Some(embedding);
		}

		let tags = self.store.tags_for_note(note.note_id).await?;

		tracing::debug!(note_id = note.note_id, tags = tags.len(), "Note structure derived.");

		Ok(IngestedNote { note, tags })
	}
}

/// Turns extractor output into one mention per normalized key.
///
/// Relations become `relation` tags whose value is the object, with subject and object kept in
/// the metadata. Their subject and object are also proposed as plain entities. Quantities carry
/// the amount as value and the unit in metadata.
pub fn mentions_from_extraction(extraction: &Extraction) -> Vec<Mention> {
	let mut mentions = Vec::new();

	for entity in &extraction.entities {
		mentions.push(Mention::new(&entity.name, TagType::from_label(&entity.kind)));
	}
	for relation in &extraction.relations {
		mentions.push(
			Mention::new(&relation.relation, TagType::Relation)
				.with_value(relation.object.trim())
				.with_metadata(serde_json::json!({
					"subject": relation.subject.trim(),
					"object": relation.object.trim(),
				})),
		);
		mentions.push(Mention::new(&relation.subject, TagType::Entity));
		mentions.push(Mention::new(&relation.object, TagType::Entity));
	}
	for quantity in &extraction.quantities {
		mentions.push(
			Mention::new(&quantity.name, TagType::Quantity)
				.with_value(quantity.value.trim())
				.with_metadata(serde_json::json!({ "unit": quantity.unit })),
		);
	}

	mention::dedupe_by_key(mentions)
}

fn require_text(text: &str) -> Result<&str> {
	let text = text.trim();

	if text.is_empty() {
		return Err(Error::invalid_request("Note text must not be empty."));
	}

	Ok(text)
}
