use serde_json::Value;

use crate::{Error, Result};

/// Single-turn chat completion: one system message, one user message, plain text back.
pub async fn complete(
	cfg: &recall_config::LlmProviderConfig,
	system_prompt: &str,
	user_prompt: &str,
) -> Result<String> {
	let messages = serde_json::json!([
		{ "role": "system", "content": system_prompt },
		{ "role": "user", "content": user_prompt },
	]);
	let json = chat(cfg, &messages, None).await?;

	crate::first_choice_content(&json)
		.map(str::to_string)
		.ok_or_else(|| Error::invalid_response("Completion response is missing message content."))
}

pub(crate) async fn chat(
	cfg: &recall_config::LlmProviderConfig,
	messages: &Value,
	response_format: Option<Value>,
) -> Result<Value> {
	let client = crate::client(cfg.timeout_ms)?;
	let url = format!("{}{}", cfg.api_base, cfg.path);
	let mut body = serde_json::json!({
		"model": cfg.model,
		"temperature": cfg.temperature,
		"messages": messages,
	});

	if let (Some(format), Some(obj)) = (response_format, body.as_object_mut()) {
		obj.insert("response_format".to_string(), format);
	}

	let res = client
		.post(&url)
		.headers(crate::auth_headers(&cfg.api_key, &cfg.default_headers)?)
		.json(&body)
		.send()
		.await?;

	Ok(crate::check_status(res)?.json().await?)
}
