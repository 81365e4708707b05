use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Clone, Debug, Deserialize)]
pub struct Config {
	pub service: Service,
	pub storage: Storage,
	pub providers: Providers,
	#[serde(default)]
	pub retrieval: Retrieval,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Service {
	pub http_bind: String,
	#[serde(default = "default_log_level")]
	pub log_level: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Storage {
	pub postgres: Postgres,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Postgres {
	pub dsn: String,
	pub pool_max_conns: u32,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Providers {
	pub embedding: EmbeddingProviderConfig,
	pub llm: LlmProviderConfig,
}

#[derive(Clone, Debug, Deserialize)]
pub struct EmbeddingProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	/// Empty when the provider does not require a bearer token.
	#[serde(default)]
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub dimensions: u32,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

/// Chat-completions endpoint used for both answer generation and entity extraction.
#[derive(Clone, Debug, Deserialize)]
pub struct LlmProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	/// An empty key means generation is not configured. Answers then fall back to a fixed
	/// explanation instead of calling the provider.
	#[serde(default)]
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub temperature: f32,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}
impl LlmProviderConfig {
	pub fn has_credentials(&self) -> bool {
		!self.api_key.trim().is_empty()
	}
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetrievalStrategy {
	#[default]
	Tags,
	Embedding,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TagMatchMode {
	#[default]
	Any,
	All,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Retrieval {
	pub strategy: RetrievalStrategy,
	pub tag_match: TagMatchMode,
	/// Derive both tags and embeddings at ingestion regardless of the query strategy.
	pub index_both: bool,
	pub candidate_limit: u32,
	pub scan_batch_size: u32,
	pub max_scan_batches: u32,
	pub high_confidence_threshold: f32,
	pub cache_capacity: u32,
	pub fingerprint_prefix_len: u32,
}
impl Default for Retrieval {
	fn default() -> Self {
		Self {
			strategy: RetrievalStrategy::Tags,
			tag_match: TagMatchMode::Any,
			index_both: false,
			candidate_limit: 10,
			scan_batch_size: 25,
			max_scan_batches: 10,
			high_confidence_threshold: 0.8,
			cache_capacity: 20,
			fingerprint_prefix_len: 8,
		}
	}
}

fn default_log_level() -> String {
	"info".to_string()
}
