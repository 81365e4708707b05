use std::{
	env, fs,
	path::PathBuf,
	sync::atomic::{AtomicU64, Ordering},
	time::{SystemTime, UNIX_EPOCH},
};

use toml::Value;

use recall_config::{Error, RetrievalStrategy, TagMatchMode};

const SAMPLE_CONFIG_TOML: &str = include_str!("fixtures/sample_config.toml");

static COUNTER: AtomicU64 = AtomicU64::new(0);

fn write_temp_config(payload: &str) -> PathBuf {
	let nanos = SystemTime::now().duration_since(UNIX_EPOCH).expect("Clock went backwards.");
	let seq = COUNTER.fetch_add(1, Ordering::SeqCst);
	let path = env::temp_dir().join(format!(
		"recall_config_test_{}_{}_{}.toml",
		std::process::id(),
		nanos.as_nanos(),
		seq
	));

	fs::write(&path, payload).expect("Failed to write test config.");

	path
}

fn sample_with(section: &str, key: &str, value: Value) -> String {
	let mut root: Value =
		toml::from_str(SAMPLE_CONFIG_TOML).expect("Failed to parse sample config.");
	let mut table = root.as_table_mut().expect("Sample config must be a table.");

	for part in section.split('.') {
		table = table
			.get_mut(part)
			.and_then(Value::as_table_mut)
			.unwrap_or_else(|| panic!("Sample config must include [{section}]."));
	}

	table.insert(key.to_string(), value);

	toml::to_string(&root).expect("Failed to render sample config.")
}

fn load_str(payload: &str) -> recall_config::Result<recall_config::Config> {
	let path = write_temp_config(payload);
	let result = recall_config::load(&path);

	fs::remove_file(&path).expect("Failed to remove test config.");

	result
}

#[test]
fn loads_sample_config_with_retrieval_defaults() {
	let cfg = load_str(SAMPLE_CONFIG_TOML).expect("Sample config should load.");

	assert_eq!(cfg.retrieval.strategy, RetrievalStrategy::Embedding);
	assert_eq!(cfg.retrieval.tag_match, TagMatchMode::Any);
	assert_eq!(cfg.retrieval.scan_batch_size, 25);
	assert_eq!(cfg.retrieval.max_scan_batches, 10);
	assert_eq!(cfg.retrieval.cache_capacity, 20);
	assert!((cfg.retrieval.high_confidence_threshold - 0.8).abs() < f32::EPSILON);
}

#[test]
fn normalizes_keys_and_api_bases() {
	let cfg = load_str(SAMPLE_CONFIG_TOML).expect("Sample config should load.");

	assert_eq!(cfg.providers.embedding.api_key, "sk-embedding");
	assert_eq!(cfg.providers.embedding.api_base, "https://api.openai.com/v1");
	assert!(!cfg.providers.llm.has_credentials());
}

#[test]
fn rejects_zero_embedding_dimensions() {
	let payload = sample_with("providers.embedding", "dimensions", Value::Integer(0));
	let err = load_str(&payload).expect_err("Expected validation error.");

	match err {
		Error::Validation { field, .. } => assert_eq!(field, "providers.embedding.dimensions"),
		other => panic!("Unexpected error: {other:?}"),
	}
}

#[test]
fn rejects_zero_scan_batch_size() {
	let payload = sample_with("retrieval", "scan_batch_size", Value::Integer(0));
	let err = load_str(&payload).expect_err("Expected validation error.");

	assert!(matches!(err, Error::Validation { field: "retrieval.scan_batch_size", .. }));
}

#[test]
fn rejects_out_of_range_threshold() {
	let payload = sample_with("retrieval", "high_confidence_threshold", Value::Float(1.5));
	let err = load_str(&payload).expect_err("Expected validation error.");

	assert!(matches!(err, Error::Validation { field: "retrieval.high_confidence_threshold", .. }));
}

#[test]
fn rejects_unknown_strategy() {
	let payload = sample_with("retrieval", "strategy", Value::String("keywords".to_string()));
	let err = load_str(&payload).expect_err("Expected parse error.");

	assert!(matches!(err, Error::ParseConfig { .. }));
}

#[test]
fn rejects_non_http_api_base() {
	let payload = sample_with("providers.llm", "api_base", Value::String("ftp://host".to_string()));
	let err = load_str(&payload).expect_err("Expected validation error.");

	assert!(matches!(err, Error::Validation { field: "providers.llm.api_base", .. }));
}

#[test]
fn missing_file_reports_read_error() {
	let path = env::temp_dir().join("recall_config_test_missing.toml");
	let err = recall_config::load(&path).expect_err("Expected read error.");

	assert!(matches!(err, Error::ReadConfig { .. }));
}
