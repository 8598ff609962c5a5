use std::sync::Arc;

use axum::{
	Router,
	body::{self, Body},
	http::{Request, StatusCode},
};
use serde_json::{Value, json};
use tower::util::ServiceExt;

use trove_api::{routes, state::AppState};
use trove_config::{EmbeddingProviderConfig, ProviderConfig, TitleMatch};
use trove_domain::{entry::KnowledgeEntry, query::MetadataFilter, title_match};
use trove_service::{
	Backends, BoxFuture, DocumentStore, EmbeddingProvider, MemorySessions, Providers,
	RerankProvider, Result, TroveService, VectorIndex,
};
use trove_storage::qdrant::VectorHit;

const CONFIG: &str = r#"
[service]
http_bind          = "127.0.0.1:0"
log_level          = "info"
request_timeout_ms = 20000

[storage.postgres]
dsn            = "postgres://unused"
pool_max_conns = 1

[storage.qdrant]
url        = "http://unused"
collection = "unused"
vector_dim = 4

[providers.embedding]
provider_id = "fake"
api_base    = "http://unused"
api_key     = "key"
path        = "/embeddings"
model       = "fake"
dimensions  = 4
timeout_ms  = 1000

[providers.rerank]
provider_id = "fake"
api_base    = "http://unused"
api_key     = "key"
path        = "/rerank"
model       = "fake"
timeout_ms  = 1000
"#;

struct OneEntryStore;
impl DocumentStore for OneEntryStore {
	fn get_by_ids<'a>(&'a self, _ids: &'a [String]) -> BoxFuture<'a, Result<Vec<KnowledgeEntry>>> {
		Box::pin(async { Ok(vec![wat_x()]) })
	}

	fn get_by_title<'a>(
		&'a self,
		title: &'a str,
		cfg: &'a TitleMatch,
	) -> BoxFuture<'a, Result<Option<KnowledgeEntry>>> {
		let entry = wat_x();
		let found =
			title_match::resolve_title(title, [entry.title.as_str()], cfg).map(|_| entry.clone());

		Box::pin(async move { Ok(found) })
	}

	fn sample_by_category<'a>(
		&'a self,
		_categories: &'a [String],
		_limit: u32,
		_seed: &'a str,
	) -> BoxFuture<'a, Result<Vec<KnowledgeEntry>>> {
		Box::pin(async { Ok(Vec::new()) })
	}
}

struct EmptyIndex;
impl VectorIndex for EmptyIndex {
	fn search<'a>(
		&'a self,
		_vector: Vec<f32>,
		_top_k: u32,
		_filter: &'a MetadataFilter,
	) -> BoxFuture<'a, Result<Vec<VectorHit>>> {
		Box::pin(async { Ok(Vec::new()) })
	}
}

struct ZeroEmbedding;
impl EmbeddingProvider for ZeroEmbedding {
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, Result<Vec<Vec<f32>>>> {
		let vectors = vec![vec![0.0; cfg.dimensions as usize]; texts.len()];

		Box::pin(async move { Ok(vectors) })
	}
}

struct FlatRerank;
impl RerankProvider for FlatRerank {
	fn rerank<'a>(
		&'a self,
		_cfg: &'a ProviderConfig,
		_query: &'a str,
		docs: &'a [String],
	) -> BoxFuture<'a, Result<Vec<f32>>> {
		let scores = vec![0.5; docs.len()];

		Box::pin(async move { Ok(scores) })
	}
}

fn wat_x() -> KnowledgeEntry {
	KnowledgeEntry {
		id: "wat-x".to_string(),
		title: "Wat X".to_string(),
		category: "Temples".to_string(),
		summary: "A temple.".to_string(),
		..Default::default()
	}
}

fn app() -> Router {
	let cfg = trove_config::from_toml_str(CONFIG).expect("Failed to parse test config.");
	let backends = Backends {
		store: Arc::new(OneEntryStore),
		index: Arc::new(EmptyIndex),
		sessions: Arc::new(MemorySessions::default()),
	};
	let providers = Providers::new(Arc::new(ZeroEmbedding), Arc::new(FlatRerank));

	routes::router(AppState::from_service(TroveService::with_parts(cfg, backends, providers)))
}

async fn call(app: Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
	let request = Request::builder().method(method).uri(uri);
	let request = match body {
		Some(body) => request
			.header("content-type", "application/json")
			.body(Body::from(body.to_string()))
			.expect("Failed to build request."),
		None => request.body(Body::empty()).expect("Failed to build request."),
	};
	let response = app.oneshot(request).await.expect("Failed to call router.");
	let status = response.status();
	let bytes =
		body::to_bytes(response.into_body(), usize::MAX).await.expect("Failed to read body.");
	let json = if bytes.is_empty() {
		Value::Null
	} else {
		serde_json::from_slice(&bytes).expect("Response is not JSON.")
	};

	(status, json)
}

#[tokio::test]
async fn health_is_ok() {
	let (status, _) = call(app(), "GET", "/health", None).await;

	assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn retrieve_returns_ranked_results() {
	let (status, body) = call(
		app(),
		"POST",
		"/v1/retrieve",
		Some(json!({ "query": "tell me about wat x", "entity": "Wat X" })),
	)
	.await;

	assert_eq!(status, StatusCode::OK);
	assert_eq!(body["ranked"][0]["id"], "wat-x");
	assert_eq!(body["ranked"][0]["is_direct_match"], true);
	assert_eq!(body["ranked"][0]["rank"], 1);
	assert_eq!(body["confidence"]["is_low_confidence"], false);
	assert_eq!(body["primary_topic"], "Wat X");
	assert!(body["context_text"].as_str().unwrap_or_default().starts_with("[Document 1]"));
}

#[tokio::test]
async fn retrieve_reports_no_candidates() {
	let (status, body) =
		call(app(), "POST", "/v1/retrieve", Some(json!({ "query": "zzzz qqqq" }))).await;

	assert_eq!(status, StatusCode::OK);
	assert_eq!(body, json!({ "status": "no_candidates" }));
}

#[tokio::test]
async fn blank_query_is_a_bad_request() {
	let (status, body) = call(app(), "POST", "/v1/retrieve", Some(json!({ "query": "  " }))).await;

	assert_eq!(status, StatusCode::BAD_REQUEST);
	assert_eq!(body["error_code"], "invalid_request");
}

#[tokio::test]
async fn session_turns_round_trip() {
	let app = app();
	let (status, body) = call(
		app.clone(),
		"POST",
		"/v1/sessions/chat-1/turns",
		Some(json!({ "user_text": "what is wat x", "assistant_text": "A temple.", "topic": "Wat X" })),
	)
	.await;

	assert_eq!(status, StatusCode::OK);
	assert_eq!(body["turn_count"], 1);

	let (status, body) = call(app.clone(), "GET", "/v1/sessions/chat-1", None).await;

	assert_eq!(status, StatusCode::OK);
	assert_eq!(body["last_topic"], "Wat X");
	assert_eq!(body["history"].as_array().map(Vec::len), Some(2));

	let (status, body) = call(
		app,
		"POST",
		"/v1/retrieve",
		Some(json!({ "query": "take me there", "session_id": "chat-1" })),
	)
	.await;

	assert_eq!(status, StatusCode::OK);
	assert_eq!(body["used_session_topic"], true);
	assert_eq!(body["ranked"][0]["id"], "wat-x");
}

#[tokio::test]
async fn unknown_session_reads_as_empty() {
	let (status, body) = call(app(), "GET", "/v1/sessions/new-visitor", None).await;

	assert_eq!(status, StatusCode::OK);
	assert_eq!(body["turn_count"], 0);
	assert_eq!(body["last_topic"], Value::Null);
}
