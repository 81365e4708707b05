use serde_json::json;

use recall_domain::{
	TagType, citation,
	mention::{self, Mention},
	normalize, similarity,
};

#[test]
fn normalizes_case_punctuation_and_whitespace() {
	assert_eq!(normalize::normalize_key("  Central   Park! "), "central park");
	assert_eq!(normalize::normalize_key("O'Hare"), "ohare");
	assert_eq!(normalize::normalize_key("\u{FF21}lice"), "alice");
	assert_eq!(normalize::normalize_key("?!"), "");
}

#[test]
fn normalize_all_dedupes_in_first_seen_order() {
	let keys = normalize::normalize_all(["Park", "coffee", "PARK", "", "Coffee!"]);

	assert_eq!(keys, vec!["park".to_string(), "coffee".to_string()]);
}

#[test]
fn dedupe_keeps_first_mention_per_key() {
	let mentions = vec![
		Mention::new("Park", TagType::Entity),
		Mention::new("park", TagType::Place),
		Mention::new("Alice", TagType::Person),
		Mention::new("...", TagType::Object),
	];
	let deduped = mention::dedupe_by_key(mentions);

	assert_eq!(deduped.len(), 2);
	assert_eq!(deduped[0].name, "Park");
	assert_eq!(deduped[0].tag_type, TagType::Entity);
	assert_eq!(deduped[1].normalized_key, "alice");
}

#[test]
fn mention_builders_attach_payload() {
	let mention = Mention::new(" coffee ", TagType::Quantity)
		.with_value("3")
		.with_metadata(json!({ "unit": "cups" }));

	assert_eq!(mention.name, "coffee");
	assert_eq!(mention.value.as_deref(), Some("3"));
	assert_eq!(mention.metadata, Some(json!({ "unit": "cups" })));
}

#[test]
fn higher_rank_outranks_lower() {
	assert!(TagType::Place.outranks(TagType::Entity));
	assert!(!TagType::Entity.outranks(TagType::Place));
	assert!(!TagType::Person.outranks(TagType::Person));
	assert_eq!("PERSON".parse::<TagType>(), Ok(TagType::Person));
	assert!("planet".parse::<TagType>().is_err());
}

#[test]
fn cosine_of_parallel_and_orthogonal_vectors() {
	let same = similarity::cosine_similarity(&[1.0, 2.0, 3.0], &[2.0, 4.0, 6.0])
		.expect("Parallel vectors have a similarity.");
	let orthogonal = similarity::cosine_similarity(&[1.0, 0.0], &[0.0, 1.0])
		.expect("Orthogonal vectors have a similarity.");

	assert!((same - 1.0).abs() < 1e-6);
	assert!(orthogonal.abs() < 1e-6);
}

#[test]
fn cosine_is_undefined_for_degenerate_inputs() {
	assert_eq!(similarity::cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), None);
	assert_eq!(similarity::cosine_similarity(&[1.0], &[1.0, 2.0]), None);
	assert_eq!(similarity::cosine_similarity(&[], &[]), None);
	assert_eq!(similarity::cosine_similarity(&[f32::NAN, 1.0], &[1.0, 1.0]), None);
}

#[test]
fn grounding_block_numbers_entries_from_one() {
	let block = citation::grounding_block([(10, "first"), (20, "second")]);

	assert_eq!(block, "Entry 1 [ID: 10]: first\nEntry 2 [ID: 20]: second");
}

#[test]
fn parses_marker_and_maps_indices_to_ids() {
	let parsed =
		citation::parse_response("... text ... RELEVANT_ENTRIES:[1,3]", &[10, 20, 30]);

	assert_eq!(parsed.answer, "... text ...");
	assert_eq!(parsed.cited_note_ids, vec![10, 30]);
}

#[test]
fn missing_marker_keeps_whole_response() {
	let parsed = citation::parse_response("You walked in the park.\n", &[10]);

	assert_eq!(parsed.answer, "You walked in the park.");
	assert!(parsed.cited_note_ids.is_empty());
}

#[test]
fn drops_out_of_range_and_non_numeric_entries() {
	let parsed = citation::parse_response(
		"Answer.\nRELEVANT_ENTRIES:[0, 2, x, 9, 2, -1]",
		&[10, 20, 30],
	);

	assert_eq!(parsed.answer, "Answer.");
	assert_eq!(parsed.cited_note_ids, vec![20]);
}

#[test]
fn empty_marker_yields_no_citations() {
	let parsed = citation::parse_response("Nothing relevant.\nRELEVANT_ENTRIES:[]", &[10]);

	assert_eq!(parsed.answer, "Nothing relevant.");
	assert!(parsed.cited_note_ids.is_empty());
}

#[test]
fn last_marker_wins_and_all_markers_are_stripped() {
	let parsed = citation::parse_response(
		"RELEVANT_ENTRIES:[1]\nThe answer.\nRELEVANT_ENTRIES:[2]",
		&[10, 20],
	);

	assert_eq!(parsed.answer, "The answer.");
	assert_eq!(parsed.cited_note_ids, vec![20]);
}
