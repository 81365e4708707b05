pub mod embedding;
pub mod extractor;
pub mod generation;

mod error;

pub use error::{Error, Result};

use std::time::Duration;

use reqwest::{
	Client, Response, StatusCode,
	header::{AUTHORIZATION, HeaderMap, HeaderName},
};
use serde_json::{Map, Value};

pub fn auth_headers(api_key: &str, default_headers: &Map<String, Value>) -> Result<HeaderMap> {
	let mut headers = HeaderMap::new();

	if !api_key.is_empty() {
		headers.insert(AUTHORIZATION, format!("Bearer {api_key}").parse()?);
	}

	for (key, value) in default_headers {
		let Some(raw) = value.as_str() else {
			return Err(Error::InvalidConfig {
				message: format!("Default header {key:?} must be a string."),
			});
		};

		headers.insert(HeaderName::from_bytes(key.as_bytes())?, raw.parse()?);
	}

	Ok(headers)
}

pub(crate) fn client(timeout_ms: u64) -> Result<Client> {
	Ok(Client::builder().timeout(Duration::from_millis(timeout_ms)).build()?)
}

/// Maps non-success statuses onto the error kinds callers branch on.
pub(crate) fn check_status(res: Response) -> Result<Response> {
	let status = res.status();

	if status.is_success() {
		return Ok(res);
	}

	Err(match status {
		StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Error::Auth { status: status.as_u16() },
		StatusCode::TOO_MANY_REQUESTS => Error::RateLimited,
		_ => Error::Status { status: status.as_u16() },
	})
}

/// Text of the first choice in an OpenAI-style chat completion.
pub(crate) fn first_choice_content(json: &Value) -> Option<&str> {
	json.get("choices")
		.and_then(|v| v.as_array())
		.and_then(|arr| arr.first())
		.and_then(|choice| choice.get("message"))
		.and_then(|msg| msg.get("content"))
		.and_then(|c| c.as_str())
}
