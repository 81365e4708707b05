use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{Error, Result};

const MAX_ATTEMPTS: usize = 3;
const SYSTEM_PROMPT: &str = "\
You extract structure from short personal notes and from questions about them.
Return a single JSON object with these arrays and nothing else:
- \"entities\": objects {\"name\": string, \"type\": string}. type is one of person, place, \
organization, event, object, activity, time, quantity, entity. Use entity only when nothing \
more specific applies.
- \"relations\": objects {\"subject\": string, \"relation\": string, \"object\": string}, \
for example {\"subject\": \"alice\", \"relation\": \"works at\", \"object\": \"acme\"}.
- \"quantities\": objects {\"name\": string, \"value\": string, \"unit\": string or null}.
Use the wording of the text for names. Return empty arrays when nothing applies.";

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Extraction {
	#[serde(default)]
	pub entities: Vec<ExtractedEntity>,
	#[serde(default)]
	pub relations: Vec<ExtractedRelation>,
	#[serde(default)]
	pub quantities: Vec<ExtractedQuantity>,
}
impl Extraction {
	pub fn is_empty(&self) -> bool {
		self.entities.is_empty() && self.relations.is_empty() && self.quantities.is_empty()
	}
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExtractedEntity {
	pub name: String,
	#[serde(rename = "type", default = "default_entity_type")]
	pub kind: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExtractedRelation {
	pub subject: String,
	pub relation: String,
	pub object: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExtractedQuantity {
	pub name: String,
	#[serde(deserialize_with = "string_or_number")]
	pub value: String,
	#[serde(default)]
	pub unit: Option<String>,
}

pub async fn extract(cfg: &recall_config::LlmProviderConfig, text: &str) -> Result<Extraction> {
	let messages = serde_json::json!([
		{ "role": "system", "content": SYSTEM_PROMPT },
		{ "role": "user", "content": text },
	]);
	let format = serde_json::json!({ "type": "json_object" });
	let mut last_err = None;

	for _ in 0..MAX_ATTEMPTS {
		let json = crate::generation::chat(cfg, &messages, Some(format.clone())).await?;

		match parse_extractor_json(json) {
			Ok(extraction) => return Ok(extraction),
			Err(err) => last_err = Some(err),
		}
	}

	Err(last_err.unwrap_or_else(|| Error::invalid_response("Extractor returned no response.")))
}

fn parse_extractor_json(json: Value) -> Result<Extraction> {
	if let Some(content) = crate::first_choice_content(&json) {
		let content = strip_code_fence(content);

		return serde_json::from_str(content).map_err(|err| {
			Error::invalid_response(format!("Extractor content is not valid JSON: {err}"))
		});
	}
	if json.get("entities").is_some() || json.get("relations").is_some() {
		return Ok(serde_json::from_value(json)?);
	}

	Err(Error::invalid_response("Extractor response is missing JSON content."))
}

fn strip_code_fence(content: &str) -> &str {
	let trimmed = content.trim();
	let Some(inner) = trimmed.strip_prefix("```") else {
		return trimmed;
	};
	let inner = inner.strip_prefix("json").unwrap_or(inner);

	inner.strip_suffix("```").unwrap_or(inner).trim()
}

fn default_entity_type() -> String {
	"entity".to_string()
}

fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
	D: serde::Deserializer<'de>,
{
	match Value::deserialize(deserializer)? {
		Value::String(raw) => Ok(raw),
		Value::Number(number) => Ok(number.to_string()),
		other => Err(serde::de::Error::custom(format!("expected string or number, got {other}"))),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_choice_content_json() {
		let content = r#"{"entities": [{"name": "Alice", "type": "person"}]}"#;
		let json = serde_json::json!({ "choices": [{ "message": { "content": content } }] });
		let parsed = parse_extractor_json(json).expect("parse failed");

		assert_eq!(parsed.entities.len(), 1);
		assert_eq!(parsed.entities[0].kind, "person");
		assert!(parsed.relations.is_empty());
	}

	#[test]
	fn accepts_fenced_content_and_numeric_quantities() {
		let content = r#"```json
{"quantities": [{"name": "coffee", "value": 3, "unit": "cups"}]}
```"#;
		let json = serde_json::json!({ "choices": [{ "message": { "content": content } }] });
		let parsed = parse_extractor_json(json).expect("parse failed");

		assert_eq!(parsed.quantities[0].value, "3");
		assert_eq!(parsed.quantities[0].unit.as_deref(), Some("cups"));
	}

	#[test]
	fn rejects_prose_content() {
		let json = serde_json::json!({
			"choices": [{ "message": { "content": "Sure! Here are the entities." } }]
		});

		assert!(parse_extractor_json(json).is_err());
	}
}
