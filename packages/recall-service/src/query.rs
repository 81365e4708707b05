use serde::Serialize;

use recall_config::{RetrievalStrategy, TagMatchMode};
use recall_storage::{Note, TagMatch};

use crate::{QueryPlan, RecallService, Result};

pub const NO_MATCHES_SUMMARY: &str = "No matching entries found for your query.";

#[derive(Clone, Debug, Serialize)]
pub struct QueryAnswer {
	/// Cited notes in citation order, or every candidate when nothing was cited.
	pub entries: Vec<Note>,
	pub summary: String,
	pub cited_note_ids: Vec<i64>,
	pub strategy: RetrievalStrategy,
}

impl RecallService {
	/// Answers a natural-language question from the stored notes.
	///
	/// Only an uninterpretable query is an error. Candidate lookup failures degrade to an empty
	/// candidate set and generation failures to a fixed answer.
	pub async fn answer_query(&self, query: &str) -> Result<QueryAnswer> {
		let strategy = self.cfg.retrieval.strategy;

		tracing::debug!(state = "parsing", ?strategy, "Answering query.");

		let plan = self.interpreter().interpret(query).await?;

		tracing::debug!(state = "resolving_candidates", "Query interpreted.");

		let candidates = match self.candidates(&plan).await {
			Ok(candidates) => candidates,
			Err(err) => {
				tracing::warn!(error = %err, "Candidate lookup failed. Treating as no matches.");

				Vec::new()
			},
		};

		if candidates.is_empty() {
			tracing::debug!(state = "empty", "No candidates for query.");

			return Ok(QueryAnswer {
				entries: Vec::new(),
				summary: NO_MATCHES_SUMMARY.to_string(),
				cited_note_ids: Vec::new(),
				strategy,
			});
		}

		tracing::debug!(
			state = "synthesizing",
			candidates = candidates.len(),
			"Synthesizing answer."
		);

		let synthesis = self.answerer.answer(query.trim(), &candidates).await;
		let entries = if synthesis.cited_note_ids.is_empty() {
			candidates
		} else {
			synthesis
				.cited_note_ids
				.iter()
				.filter_map(|id| candidates.iter().find(|note| note.note_id == *id).cloned())
				.collect()
		};

		tracing::debug!(state = "done", cited = synthesis.cited_note_ids.len(), "Query answered.");

		Ok(QueryAnswer {
			entries,
			summary: synthesis.answer,
			cited_note_ids: synthesis.cited_note_ids,
			strategy,
		})
	}

	async fn candidates(&self, plan: &QueryPlan) -> Result<Vec<Note>> {
		let limit = self.cfg.retrieval.candidate_limit;

		match plan {
			QueryPlan::Tags { tag_names } => {
				let tag_ids = self.interpreter().resolve_tag_ids(tag_names).await?;
				let mode = match self.cfg.retrieval.tag_match {
					TagMatchMode::Any => TagMatch::Any,
					TagMatchMode::All => TagMatch::All,
				};
				let mut notes = self.tag_graph().entries_for_tags(&tag_ids, mode).await?;

				notes.truncate(limit as usize);

				Ok(notes)
			},
			QueryPlan::Vector { vector } => self.index.find_similar(vector.as_deref(), limit).await,
		}
	}
}
