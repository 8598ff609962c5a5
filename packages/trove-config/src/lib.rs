mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	Config, EmbeddingProviderConfig, Postgres, ProviderConfig, Providers, Qdrant, Retrieval,
	RetrievalScorer, RetrievalTimeouts, Service, Session, Storage, TitleMatch, Trust,
};

use std::{fs, path::Path};

pub const SESSION_BACKENDS: [&str; 2] = ["memory", "postgres"];

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;
	let cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	finish(cfg)
}

pub fn from_toml_str(raw: &str) -> Result<Config> {
	let cfg: Config = toml::from_str(raw).map_err(|err| Error::ParseInline { source: err })?;

	finish(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.service.http_bind.trim().is_empty() {
		return Err(Error::Validation {
			message: "service.http_bind must be non-empty.".to_string(),
		});
	}
	if cfg.service.request_timeout_ms == 0 {
		return Err(Error::Validation {
			message: "service.request_timeout_ms must be greater than zero.".to_string(),
		});
	}
	if cfg.providers.embedding.dimensions == 0 {
		return Err(Error::Validation {
			message: "providers.embedding.dimensions must be greater than zero.".to_string(),
		});
	}
	if cfg.providers.embedding.dimensions != cfg.storage.qdrant.vector_dim {
		return Err(Error::Validation {
			message: "providers.embedding.dimensions must match storage.qdrant.vector_dim."
				.to_string(),
		});
	}

	for (label, key) in
		[("embedding", &cfg.providers.embedding.api_key), ("rerank", &cfg.providers.rerank.api_key)]
	{
		if key.trim().is_empty() {
			return Err(Error::Validation {
				message: format!("Provider {label} api_key must be non-empty."),
			});
		}
	}

	validate_retrieval(&cfg.retrieval)?;
	validate_trust(&cfg.trust)?;

	let critical_path_ms = cfg.retrieval.timeouts.critical_path_ms();

	if cfg.service.request_timeout_ms <= critical_path_ms {
		return Err(Error::Validation {
			message: format!(
				"service.request_timeout_ms must exceed the retrieval stage timeouts \
				 ({critical_path_ms} ms)."
			),
		});
	}

	if !SESSION_BACKENDS.contains(&cfg.session.backend.as_str()) {
		return Err(Error::Validation {
			message: "session.backend must be one of memory or postgres.".to_string(),
		});
	}
	if cfg.session.history_pairs == 0 {
		return Err(Error::Validation {
			message: "session.history_pairs must be greater than zero.".to_string(),
		});
	}

	Ok(())
}

fn finish(mut cfg: Config) -> Result<Config> {
	normalize(&mut cfg);
	validate(&cfg)?;

	Ok(cfg)
}

fn validate_retrieval(retrieval: &Retrieval) -> Result<()> {
	for (label, value) in [
		("retrieval.vector_top_k", retrieval.vector_top_k),
		("retrieval.max_sub_queries", retrieval.max_sub_queries),
		("retrieval.trending_sample_size", retrieval.trending_sample_size),
		("retrieval.top_k_text", retrieval.top_k_text),
		("retrieval.top_k_voice", retrieval.top_k_voice),
		("retrieval.preview_k", retrieval.preview_k),
		("retrieval.scorer.max_concurrency", retrieval.scorer.max_concurrency),
	] {
		if value == 0 {
			return Err(Error::Validation { message: format!("{label} must be greater than zero.") });
		}
	}

	let timeouts = &retrieval.timeouts;

	for (label, value) in [
		("retrieval.timeouts.session_ms", timeouts.session_ms),
		("retrieval.timeouts.direct_ms", timeouts.direct_ms),
		("retrieval.timeouts.trending_ms", timeouts.trending_ms),
		("retrieval.timeouts.semantic_ms", timeouts.semantic_ms),
		("retrieval.timeouts.fallback_ms", timeouts.fallback_ms),
		("retrieval.timeouts.hydrate_ms", timeouts.hydrate_ms),
		("retrieval.timeouts.scorer_ms", timeouts.scorer_ms),
	] {
		if value == 0 {
			return Err(Error::Validation { message: format!("{label} must be greater than zero.") });
		}
	}

	let title_match = &retrieval.title_match;

	for (label, value) in [
		("retrieval.title_match.short_cutoff", title_match.short_cutoff),
		("retrieval.title_match.long_cutoff", title_match.long_cutoff),
	] {
		if !value.is_finite() || value <= 0.0 || value > 1.0 {
			return Err(Error::Validation {
				message: format!("{label} must be in the range (0.0, 1.0]."),
			});
		}
	}

	Ok(())
}

fn validate_trust(trust: &Trust) -> Result<()> {
	for (label, value) in [
		("trust.direct_floor", trust.direct_floor),
		("trust.trending_floor", trust.trending_floor),
		("trust.confidence_threshold", trust.confidence_threshold),
		("trust.direct_sentinel", trust.direct_sentinel),
		("trust.trending_sentinel", trust.trending_sentinel),
		("trust.fallback_sentinel", trust.fallback_sentinel),
	] {
		if !value.is_finite() {
			return Err(Error::Validation { message: format!("{label} must be a finite number.") });
		}
	}

	for (label, value) in
		[("trust.direct_floor", trust.direct_floor), ("trust.trending_floor", trust.trending_floor)]
	{
		if value <= 0.0 || value > 1.0 {
			return Err(Error::Validation {
				message: format!("{label} must be in the range (0.0, 1.0]."),
			});
		}
	}

	if trust.direct_floor <= trust.trending_floor {
		return Err(Error::Validation {
			message: "trust.direct_floor must be greater than trust.trending_floor.".to_string(),
		});
	}
	if trust.confidence_threshold < 0.0 {
		return Err(Error::Validation {
			message: "trust.confidence_threshold must be zero or greater.".to_string(),
		});
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	let retrieval = &mut cfg.retrieval;

	retrieval.continuation_markers = normalize_list(&retrieval.continuation_markers, true);
	retrieval.trending_categories = normalize_list(&retrieval.trending_categories, false);
	retrieval.exclude_categories = normalize_list(&retrieval.exclude_categories, false);

	if cfg
		.providers
		.embedding
		.query_prefix
		.as_deref()
		.map(|prefix| prefix.trim().is_empty())
		.unwrap_or(false)
	{
		cfg.providers.embedding.query_prefix = None;
	}

	cfg.session.backend = cfg.session.backend.trim().to_ascii_lowercase();
}

fn normalize_list(values: &[String], lowercase: bool) -> Vec<String> {
	let mut out: Vec<String> = Vec::with_capacity(values.len());

	for value in values {
		let trimmed = value.trim();

		if trimmed.is_empty() {
			continue;
		}

		let value = if lowercase { trimmed.to_lowercase() } else { trimmed.to_string() };

		if !out.contains(&value) {
			out.push(value);
		}
	}

	out
}
