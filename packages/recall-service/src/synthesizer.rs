use std::sync::Arc;

use serde::Serialize;

use recall_config::LlmProviderConfig;
use recall_domain::citation;
use recall_storage::Note;

use crate::{AnswerStrategy, BoxFuture, GenerationProvider};

pub const UNCONFIGURED_ANSWER: &str = "Answer generation is not configured. The entries below are \
	the closest matches in your notes.";
pub const UNAVAILABLE_ANSWER: &str = "Sorry, an answer could not be generated right now. The \
	entries below are the closest matches in your notes.";

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Synthesis {
	pub answer: String,
	pub cited_note_ids: Vec<i64>,
}
impl From<citation::ParsedAnswer> for Synthesis {
	fn from(parsed: citation::ParsedAnswer) -> Self {
		Self { answer: parsed.answer, cited_note_ids: parsed.cited_note_ids }
	}
}

/// Grounded answers from a chat-completions model, with citations recovered from the
/// `RELEVANT_ENTRIES` marker.
pub struct LlmSynthesizer {
	cfg: LlmProviderConfig,
	generator: Arc<dyn GenerationProvider>,
}
impl LlmSynthesizer {
	pub fn new(cfg: LlmProviderConfig, generator: Arc<dyn GenerationProvider>) -> Self {
		Self { cfg, generator }
	}

	async fn synthesize(&self, query: &str, candidates: &[Note]) -> Synthesis {
		if !self.cfg.has_credentials() {
			tracing::info!("Generation provider has no credentials. Returning fixed answer.");

			return Synthesis {
				answer: UNCONFIGURED_ANSWER.to_string(),
				cited_note_ids: Vec::new(),
			};
		}

		let user_prompt = user_prompt(query, candidates);
		let completion = self.generator.complete(&self.cfg, &system_prompt(), &user_prompt).await;
		let response = match completion {
			Ok(response) => response,
			Err(err) => {
				tracing::warn!(error = %err, "Answer generation failed.");

				return Synthesis {
					answer: UNAVAILABLE_ANSWER.to_string(),
					cited_note_ids: Vec::new(),
				};
			},
		};
		let candidate_ids = candidates.iter().map(|note| note.note_id).collect::<Vec<_>>();

		citation::parse_response(&response, &candidate_ids).into()
	}
}
impl AnswerStrategy for LlmSynthesizer {
	fn answer<'a>(&'a self, query: &'a str, candidates: &'a [Note]) -> BoxFuture<'a, Synthesis> {
		Box::pin(self.synthesize(query, candidates))
	}
}

pub(crate) fn system_prompt() -> String {
	format!(
		"\
You answer questions about the user's personal notes.
Use only the numbered entries you are given. If they do not contain the answer, say so briefly.
Address the user as \"you\" and keep the answer short.
End with one line of the form {marker}:[i,j] listing the entry numbers you relied on, \
or {marker}:[] if none apply.",
		marker = citation::MARKER
	)
}

pub(crate) fn user_prompt(query: &str, candidates: &[Note]) -> String {
	let block =
		citation::grounding_block(candidates.iter().map(|note| (note.note_id, note.text.as_str())));

	format!("Entries:\n{block}\n\nQuestion: {query}")
}
