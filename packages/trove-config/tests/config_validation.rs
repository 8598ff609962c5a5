use toml::Value;

use trove_config::{Config, Error};

const SAMPLE_CONFIG_TOML: &str = include_str!("fixtures/sample_config.toml");

fn sample_with(section: &str, key: &str, value: Value) -> String {
	let mut root: Value = toml::from_str(SAMPLE_CONFIG_TOML).expect("Failed to parse fixture.");
	let mut table = root.as_table_mut().expect("Fixture must be a table.");

	for part in section.split('.') {
		table = table
			.entry(part.to_string())
			.or_insert_with(|| Value::Table(Default::default()))
			.as_table_mut()
			.expect("Fixture section must be a table.");
	}

	table.insert(key.to_string(), value);

	toml::to_string(&root).expect("Failed to render fixture.")
}

fn parse(raw: &str) -> trove_config::Result<Config> {
	trove_config::from_toml_str(raw)
}

fn expect_validation(raw: &str, needle: &str) {
	match parse(raw) {
		Err(Error::Validation { message }) => {
			assert!(message.contains(needle), "Unexpected message: {message}");
		},
		other => panic!("Expected validation error containing {needle:?}, got {other:?}."),
	}
}

#[test]
fn sample_config_loads_and_normalizes() {
	let cfg = parse(SAMPLE_CONFIG_TOML).expect("Sample config must be valid.");

	assert_eq!(cfg.retrieval.trending_categories, vec!["Temples", "Nature", "Cafes"]);
	assert_eq!(cfg.retrieval.continuation_markers, vec!["take me there", "directions"]);
	assert_eq!(cfg.retrieval.timeouts.semantic_ms, 3_000);
	assert_eq!(cfg.retrieval.timeouts.direct_ms, 1_500);
	assert_eq!(cfg.providers.embedding.query_prefix.as_deref(), Some("query: "));
	assert_eq!(cfg.session.history_pairs, 5);
}

#[test]
fn omitted_sections_fall_back_to_defaults() {
	let mut root: Value = toml::from_str(SAMPLE_CONFIG_TOML).expect("Failed to parse fixture.");
	let table = root.as_table_mut().expect("Fixture must be a table.");

	table.remove("retrieval");
	table.remove("trust");
	table.remove("session");

	let cfg = parse(&toml::to_string(&root).expect("render")).expect("Defaults must be valid.");

	assert_eq!(cfg.trust.direct_floor, 0.99);
	assert_eq!(cfg.trust.trending_floor, 0.85);
	assert_eq!(cfg.trust.confidence_threshold, 0.45);
	assert_eq!(cfg.retrieval.top_k_text, 5);
	assert!(cfg.retrieval.top_k_voice < cfg.retrieval.top_k_text);
	assert_eq!(cfg.session.backend, "memory");
	assert!(!cfg.retrieval.continuation_markers.is_empty());
}

#[test]
fn direct_floor_must_exceed_trending_floor() {
	let raw = sample_with("trust", "trending_floor", Value::Float(0.995));

	expect_validation(&raw, "trust.direct_floor must be greater than trust.trending_floor");
}

#[test]
fn floors_must_be_within_unit_range() {
	let raw = sample_with("trust", "direct_floor", Value::Float(1.2));

	expect_validation(&raw, "trust.direct_floor must be in the range");
}

#[test]
fn non_finite_threshold_is_rejected() {
	let raw = sample_with("trust", "confidence_threshold", Value::Float(f64::NAN));

	expect_validation(&raw, "trust.confidence_threshold must be a finite number");
}

#[test]
fn zero_top_k_is_rejected() {
	let raw = sample_with("retrieval", "top_k_voice", Value::Integer(0));

	expect_validation(&raw, "retrieval.top_k_voice must be greater than zero");
}

#[test]
fn zero_timeout_is_rejected() {
	let raw = sample_with("retrieval.timeouts", "scorer_ms", Value::Integer(0));

	expect_validation(&raw, "retrieval.timeouts.scorer_ms must be greater than zero");
}

#[test]
fn zero_session_timeout_is_rejected() {
	let raw = sample_with("retrieval.timeouts", "session_ms", Value::Integer(0));

	expect_validation(&raw, "retrieval.timeouts.session_ms must be greater than zero");
}

#[test]
fn request_deadline_must_exceed_stage_timeouts() {
	// 1000 session + (3000 semantic + 1500 fallback) + 1500 hydrate + 8000 scorer.
	let raw = sample_with("service", "request_timeout_ms", Value::Integer(15_000));

	expect_validation(&raw, "must exceed the retrieval stage timeouts (15000 ms)");
}

#[test]
fn default_deadline_leaves_room_for_scorer_degrade() {
	let mut root: Value = toml::from_str(SAMPLE_CONFIG_TOML).expect("Failed to parse fixture.");
	let table = root.as_table_mut().expect("Fixture must be a table.");

	table.remove("retrieval");
	table
		.get_mut("service")
		.and_then(Value::as_table_mut)
		.expect("Service must be a table.")
		.remove("request_timeout_ms");

	let cfg = parse(&toml::to_string(&root).expect("render")).expect("Defaults must be valid.");

	assert_eq!(cfg.retrieval.timeouts.session_ms, 1_000);
	assert!(cfg.service.request_timeout_ms > cfg.retrieval.timeouts.critical_path_ms());
}

#[test]
fn embedding_dimensions_must_match_vector_dim() {
	let raw = sample_with("storage.qdrant", "vector_dim", Value::Integer(768));

	expect_validation(&raw, "must match storage.qdrant.vector_dim");
}

#[test]
fn unknown_session_backend_is_rejected() {
	let raw = sample_with("session", "backend", Value::String("redis".to_string()));

	expect_validation(&raw, "session.backend must be one of memory or postgres");
}

#[test]
fn blank_api_key_is_rejected() {
	let raw = sample_with("providers.rerank", "api_key", Value::String("  ".to_string()));

	expect_validation(&raw, "Provider rerank api_key must be non-empty");
}

#[test]
fn blank_query_prefix_is_dropped() {
	let raw = sample_with("providers.embedding", "query_prefix", Value::String(" ".to_string()));
	let cfg = parse(&raw).expect("Config must be valid.");

	assert!(cfg.providers.embedding.query_prefix.is_none());
}

#[test]
fn unparsable_config_reports_parse_error() {
	assert!(matches!(parse("service = 3"), Err(Error::ParseInline { .. })));
}
