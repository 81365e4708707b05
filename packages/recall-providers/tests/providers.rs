use std::net::SocketAddr;

use axum::{Json, Router, http::StatusCode, routing::post};
use reqwest::header::AUTHORIZATION;
use serde_json::{Map, Value, json};
use tokio::net::TcpListener;

use recall_config::{EmbeddingProviderConfig, LlmProviderConfig};
use recall_providers::{Error, embedding, extractor, generation};

async fn spawn_mock() -> SocketAddr {
	let app = Router::new()
		.route(
			"/embeddings",
			post(|Json(body): Json<Value>| async move {
				let inputs = body["input"].as_array().map(Vec::len).unwrap_or(0);
				let data: Vec<Value> = (0..inputs)
					.rev()
					.map(|idx| json!({ "index": idx, "embedding": [idx as f64, 1.0] }))
					.collect();

				Json(json!({ "data": data }))
			}),
		)
		.route(
			"/chat/completions",
			post(|Json(body): Json<Value>| async move {
				let content = if body.get("response_format").is_some() {
					json!({ "entities": [{ "name": "Central Park", "type": "place" }] }).to_string()
				} else {
					"You walked there.\nRELEVANT_ENTRIES:[1]".to_string()
				};

				Json(json!({ "choices": [{ "message": { "content": content } }] }))
			}),
		)
		.route("/unauthorized", post(|| async { StatusCode::UNAUTHORIZED }))
		.route("/limited", post(|| async { StatusCode::TOO_MANY_REQUESTS }));
	let listener = TcpListener::bind("127.0.0.1:0").await.expect("Failed to bind mock provider.");
	let addr = listener.local_addr().expect("Failed to read mock address.");

	tokio::spawn(async move {
		let _ = axum::serve(listener, app).await;
	});

	addr
}

fn embedding_cfg(addr: SocketAddr, path: &str) -> EmbeddingProviderConfig {
	EmbeddingProviderConfig {
		provider_id: "mock".to_string(),
		api_base: format!("http://{addr}"),
		api_key: "test-key".to_string(),
		path: path.to_string(),
		model: "m".to_string(),
		dimensions: 2,
		timeout_ms: 5_000,
		default_headers: Map::new(),
	}
}

fn llm_cfg(addr: SocketAddr, path: &str) -> LlmProviderConfig {
	LlmProviderConfig {
		provider_id: "mock".to_string(),
		api_base: format!("http://{addr}"),
		api_key: "test-key".to_string(),
		path: path.to_string(),
		model: "m".to_string(),
		temperature: 0.0,
		timeout_ms: 5_000,
		default_headers: Map::new(),
	}
}

#[test]
fn builds_bearer_auth_header() {
	let headers =
		recall_providers::auth_headers("secret", &Map::new()).expect("Failed to build headers.");
	let value = headers.get(AUTHORIZATION).expect("Missing authorization header.");

	assert_eq!(value, "Bearer secret");
}

#[test]
fn omits_auth_header_without_key_and_rejects_non_string_defaults() {
	let headers =
		recall_providers::auth_headers("", &Map::new()).expect("Failed to build headers.");

	assert!(headers.get(AUTHORIZATION).is_none());

	let mut defaults = Map::new();

	defaults.insert("x-retries".to_string(), json!(3));

	let err = recall_providers::auth_headers("k", &defaults).expect_err("Expected config error.");

	assert!(matches!(err, Error::InvalidConfig { .. }));
}

#[tokio::test]
async fn embeds_texts_in_input_order() {
	let addr = spawn_mock().await;
	let texts = vec!["a".to_string(), "b".to_string()];
	let vectors = embedding::embed(&embedding_cfg(addr, "/embeddings"), &texts)
		.await
		.expect("Embedding call failed.");

	assert_eq!(vectors, vec![vec![0.0, 1.0], vec![1.0, 1.0]]);
}

#[tokio::test]
async fn completes_chat_prompt() {
	let addr = spawn_mock().await;
	let text = generation::complete(&llm_cfg(addr, "/chat/completions"), "system", "user")
		.await
		.expect("Completion call failed.");

	assert!(text.contains("RELEVANT_ENTRIES:[1]"));
}

#[tokio::test]
async fn extracts_structured_entities() {
	let addr = spawn_mock().await;
	let cfg = llm_cfg(addr, "/chat/completions");
	let extraction =
		extractor::extract(&cfg, "Walked in Central Park").await.expect("Extraction call failed.");

	assert_eq!(extraction.entities.len(), 1);
	assert_eq!(extraction.entities[0].name, "Central Park");
	assert_eq!(extraction.entities[0].kind, "place");
}

#[tokio::test]
async fn maps_auth_and_rate_limit_statuses() {
	let addr = spawn_mock().await;
	let auth = generation::complete(&llm_cfg(addr, "/unauthorized"), "s", "u")
		.await
		.expect_err("Expected auth error.");
	let limited = embedding::embed(&embedding_cfg(addr, "/limited"), &["a".to_string()])
		.await
		.expect_err("Expected rate limit error.");

	assert!(matches!(auth, Error::Auth { status: 401 }));
	assert!(matches!(limited, Error::RateLimited));
}
