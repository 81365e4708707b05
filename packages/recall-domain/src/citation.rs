//! Text protocol between the answer prompt and the generation provider.
//!
//! Candidates are shown to the model as numbered entries. The model is asked to finish with a
//! line such as `RELEVANT_ENTRIES:[1,3]` naming the entries it relied on. Parsing is best effort:
//! a missing or malformed marker never fails, it just yields no citations.

use std::sync::LazyLock;

use regex::Regex;

pub const MARKER: &str = "RELEVANT_ENTRIES";

static MARKER_RE: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r"RELEVANT_ENTRIES\s*:\s*\[([^\]]*)\]").expect("Marker pattern must compile.")
});

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParsedAnswer {
	pub answer: String,
	pub cited_note_ids: Vec<i64>,
}

/// One line per candidate: `Entry <1-based index> [ID: <id>]: <text>`, in input order.
pub fn grounding_block<'a, I>(entries: I) -> String
where
	I: IntoIterator<Item = (i64, &'a str)>,
{
	entries
		.into_iter()
		.enumerate()
		.map(|(idx, (note_id, text))| format!("Entry {} [ID: {note_id}]: {text}", idx + 1))
		.collect::<Vec<_>>()
		.join("\n")
}

/// Splits a model response into the answer text and the ids of the cited candidates.
///
/// `candidate_ids[i]` is the note shown as entry `i + 1`. When several markers are present the
/// last one is used and all of them are removed from the answer.
pub fn parse_response(response: &str, candidate_ids: &[i64]) -> ParsedAnswer {
	let Some(captures) = MARKER_RE.captures_iter(response).last() else {
		return ParsedAnswer { answer: response.trim().to_string(), cited_note_ids: Vec::new() };
	};
	let list = captures.get(1).map(|m| m.as_str()).unwrap_or_default();
	let mut cited_note_ids = Vec::new();

	for raw in list.split(',') {
		let Ok(index) = raw.trim().parse::<usize>() else {
			continue;
		};
		let Some(note_id) = index.checked_sub(1).and_then(|i| candidate_ids.get(i)) else {
			continue;
		};

		if !cited_note_ids.contains(note_id) {
			cited_note_ids.push(*note_id);
		}
	}

	let answer = MARKER_RE.replace_all(response, "").trim().to_string();

	ParsedAnswer { answer, cited_note_ids }
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn marker_pattern_tolerates_spacing() {
		assert!(MARKER_RE.is_match("RELEVANT_ENTRIES : [ 1 , 2 ]"));
		assert!(!MARKER_RE.is_match("RELEVANT_ENTRIES 1,2"));
	}
}
