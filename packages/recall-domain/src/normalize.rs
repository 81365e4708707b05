use unicode_normalization::UnicodeNormalization;

/// Canonical lookup key for a tag name: NFKC, lowercased, punctuation and symbols removed,
/// whitespace collapsed.
pub fn normalize_key(input: &str) -> String {
	let folded: String = input
		.nfkc()
		.flat_map(char::to_lowercase)
		.filter(|ch| ch.is_alphanumeric() || ch.is_whitespace())
		.collect();

	folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Normalizes every name and drops empty keys and repeats, keeping first-seen order.
pub fn normalize_all<'a, I>(names: I) -> Vec<String>
where
	I: IntoIterator<Item = &'a str>,
{
	let mut out: Vec<String> = Vec::new();

	for name in names {
		let key = normalize_key(name);

		if key.is_empty() || out.contains(&key) {
			continue;
		}

		out.push(key);
	}

	out
}
