mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	Config, EmbeddingProviderConfig, LlmProviderConfig, Postgres, Providers, Retrieval,
	RetrievalStrategy, Service, Storage, TagMatchMode,
};

use std::{fs, path::Path};

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	let mut cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.service.http_bind.trim().is_empty() {
		return Err(Error::validation("service.http_bind", "must be non-empty."));
	}
	if cfg.storage.postgres.dsn.trim().is_empty() {
		return Err(Error::validation("storage.postgres.dsn", "must be non-empty."));
	}
	if cfg.storage.postgres.pool_max_conns == 0 {
		return Err(Error::validation(
			"storage.postgres.pool_max_conns",
			"must be greater than zero.",
		));
	}
	if cfg.providers.embedding.dimensions == 0 {
		return Err(Error::validation(
			"providers.embedding.dimensions",
			"must be greater than zero.",
		));
	}

	for (field, base) in [
		("providers.embedding.api_base", &cfg.providers.embedding.api_base),
		("providers.llm.api_base", &cfg.providers.llm.api_base),
	] {
		if !base.starts_with("http://") && !base.starts_with("https://") {
			return Err(Error::validation(field, "must be an http(s) URL."));
		}
	}

	if !cfg.providers.llm.temperature.is_finite() || cfg.providers.llm.temperature < 0.0 {
		return Err(Error::validation(
			"providers.llm.temperature",
			"must be a finite number, zero or greater.",
		));
	}

	validate_retrieval(&cfg.retrieval)
}

fn validate_retrieval(retrieval: &crate::Retrieval) -> Result<()> {
	if retrieval.candidate_limit == 0 {
		return Err(Error::validation("retrieval.candidate_limit", "must be greater than zero."));
	}
	if retrieval.scan_batch_size == 0 {
		return Err(Error::validation("retrieval.scan_batch_size", "must be greater than zero."));
	}
	if retrieval.max_scan_batches == 0 {
		return Err(Error::validation("retrieval.max_scan_batches", "must be greater than zero."));
	}
	if !retrieval.high_confidence_threshold.is_finite() {
		return Err(Error::validation(
			"retrieval.high_confidence_threshold",
			"must be a finite number.",
		));
	}
	if !(-1.0..=1.0).contains(&retrieval.high_confidence_threshold) {
		return Err(Error::validation(
			"retrieval.high_confidence_threshold",
			"must be in the range -1.0-1.0.",
		));
	}
	if retrieval.fingerprint_prefix_len == 0 {
		return Err(Error::validation(
			"retrieval.fingerprint_prefix_len",
			"must be greater than zero.",
		));
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	for key in [&mut cfg.providers.embedding.api_key, &mut cfg.providers.llm.api_key] {
		let trimmed = key.trim();

		if trimmed.len() != key.len() {
			*key = trimmed.to_string();
		}
	}

	for base in [&mut cfg.providers.embedding.api_base, &mut cfg.providers.llm.api_base] {
		let trimmed = base.trim().trim_end_matches('/');

		if trimmed.len() != base.len() {
			*base = trimmed.to_string();
		}
	}
}
