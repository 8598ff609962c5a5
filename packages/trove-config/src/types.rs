use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
	pub service: Service,
	pub storage: Storage,
	pub providers: Providers,
	#[serde(default)]
	pub retrieval: Retrieval,
	#[serde(default)]
	pub trust: Trust,
	#[serde(default)]
	pub session: Session,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Service {
	pub http_bind: String,
	pub log_level: String,
	#[serde(default = "default_request_timeout_ms")]
	pub request_timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Storage {
	pub postgres: Postgres,
	pub qdrant: Qdrant,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Postgres {
	pub dsn: String,
	pub pool_max_conns: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Qdrant {
	pub url: String,
	pub collection: String,
	pub vector_dim: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Providers {
	pub embedding: EmbeddingProviderConfig,
	pub rerank: ProviderConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddingProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub dimensions: u32,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
	/// Optional. Prepended to every query text before embedding, e.g. "query: " for E5 models.
	#[serde(default)]
	pub query_prefix: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Retrieval {
	pub vector_top_k: u32,
	pub max_sub_queries: u32,
	pub trending_sample_size: u32,
	pub trending_categories: Vec<String>,
	pub exclude_categories: Vec<String>,
	/// Lowercase phrases marking a follow-up that refers to the previous turn's topic.
	pub continuation_markers: Vec<String>,
	pub top_k_text: u32,
	pub top_k_voice: u32,
	pub preview_k: u32,
	pub timeouts: RetrievalTimeouts,
	pub scorer: RetrievalScorer,
	pub title_match: TitleMatch,
}
impl Default for Retrieval {
	fn default() -> Self {
		Self {
			vector_top_k: 5,
			max_sub_queries: 4,
			trending_sample_size: 5,
			trending_categories: Vec::new(),
			exclude_categories: Vec::new(),
			continuation_markers: default_continuation_markers(),
			top_k_text: 5,
			top_k_voice: 3,
			preview_k: 5,
			timeouts: RetrievalTimeouts::default(),
			scorer: RetrievalScorer::default(),
			title_match: TitleMatch::default(),
		}
	}
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetrievalTimeouts {
	/// Bound on session store reads and appends.
	pub session_ms: u64,
	pub direct_ms: u64,
	pub trending_ms: u64,
	pub semantic_ms: u64,
	pub fallback_ms: u64,
	pub hydrate_ms: u64,
	pub scorer_ms: u64,
}
impl Default for RetrievalTimeouts {
	fn default() -> Self {
		Self {
			session_ms: 1_000,
			direct_ms: 1_500,
			trending_ms: 1_500,
			semantic_ms: 4_000,
			fallback_ms: 1_500,
			hydrate_ms: 1_500,
			scorer_ms: 8_000,
		}
	}
}
impl RetrievalTimeouts {
	/// Longest run of sequential stage budgets: session lookup, the slowest fan-out branch
	/// (semantic chained with fallback), hydration and scoring.
	pub fn critical_path_ms(&self) -> u64 {
		let fan_out =
			self.direct_ms.max(self.trending_ms).max(self.semantic_ms.saturating_add(self.fallback_ms));

		self.session_ms
			.saturating_add(fan_out)
			.saturating_add(self.hydrate_ms)
			.saturating_add(self.scorer_ms)
	}
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetrievalScorer {
	/// Send every candidate in a single rerank request. When false, one request per candidate.
	pub batched: bool,
	pub max_concurrency: u32,
}
impl Default for RetrievalScorer {
	fn default() -> Self {
		Self { batched: true, max_concurrency: 4 }
	}
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TitleMatch {
	pub short_query_chars: u32,
	pub short_cutoff: f32,
	pub long_cutoff: f32,
	pub prefix_slack: u32,
}
impl Default for TitleMatch {
	fn default() -> Self {
		Self { short_query_chars: 5, short_cutoff: 0.8, long_cutoff: 0.6, prefix_slack: 2 }
	}
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Trust {
	pub direct_floor: f32,
	pub trending_floor: f32,
	pub confidence_threshold: f32,
	pub direct_sentinel: f32,
	pub trending_sentinel: f32,
	pub fallback_sentinel: f32,
}
impl Default for Trust {
	fn default() -> Self {
		Self {
			direct_floor: 0.99,
			trending_floor: 0.85,
			confidence_threshold: 0.45,
			direct_sentinel: 1.5,
			trending_sentinel: 0.85,
			fallback_sentinel: 1.0,
		}
	}
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Session {
	pub backend: String,
	/// Number of user/assistant pairs kept per session.
	pub history_pairs: u32,
}
impl Default for Session {
	fn default() -> Self {
		Self { backend: "memory".to_string(), history_pairs: 5 }
	}
}

fn default_request_timeout_ms() -> u64 {
	20_000
}

fn default_continuation_markers() -> Vec<String> {
	[
		"take me there",
		"go there",
		"get there",
		"navigate",
		"directions",
		"route there",
		"นำทาง",
		"เส้นทาง",
		"พาไป",
		"ขอทาง",
		"ไปยัง",
		"ไปที่",
	]
	.into_iter()
	.map(str::to_string)
	.collect()
}
