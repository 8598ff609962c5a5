pub mod retrieve;
pub mod session;

mod error;

pub use error::{Error, Result};
pub use retrieve::{
	CandidateDocument, ConfidenceVerdict, PreviewCard, RankedResult, ResponseMode,
	RetrievalOutcome, RetrievalResult, RetrieveRequest,
};
pub use session::{MemorySessions, PgSessions, SessionStore};

use std::{future::Future, pin::Pin, sync::Arc};

use sqlx::PgPool;
use time::OffsetDateTime;

use trove_config::{Config, EmbeddingProviderConfig, ProviderConfig, TitleMatch};
use trove_domain::{
	entry::KnowledgeEntry,
	query::MetadataFilter,
	session::{Session, Turn},
};
use trove_providers::{embedding, rerank};
use trove_storage::{
	db::Db,
	entries,
	qdrant::{QdrantStore, VectorHit},
};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub trait EmbeddingProvider
where
	Self: Send + Sync,
{
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, Result<Vec<Vec<f32>>>>;
}

/// Pairwise relevance scorer. Scores are aligned with `docs`.
pub trait RerankProvider
where
	Self: Send + Sync,
{
	fn rerank<'a>(
		&'a self,
		cfg: &'a ProviderConfig,
		query: &'a str,
		docs: &'a [String],
	) -> BoxFuture<'a, Result<Vec<f32>>>;
}

pub trait VectorIndex
where
	Self: Send + Sync,
{
	fn search<'a>(
		&'a self,
		vector: Vec<f32>,
		top_k: u32,
		filter: &'a MetadataFilter,
	) -> BoxFuture<'a, Result<Vec<VectorHit>>>;
}

/// The primary document store holding canonical knowledge entries.
pub trait DocumentStore
where
	Self: Send + Sync,
{
	fn get_by_ids<'a>(&'a self, ids: &'a [String]) -> BoxFuture<'a, Result<Vec<KnowledgeEntry>>>;

	fn get_by_title<'a>(
		&'a self,
		title: &'a str,
		cfg: &'a TitleMatch,
	) -> BoxFuture<'a, Result<Option<KnowledgeEntry>>>;

	/// Returns up to `limit` entries from `categories`; a fixed `seed` yields a fixed sample.
	fn sample_by_category<'a>(
		&'a self,
		categories: &'a [String],
		limit: u32,
		seed: &'a str,
	) -> BoxFuture<'a, Result<Vec<KnowledgeEntry>>>;
}

/// Keyed session persistence. `append` must be atomic per session id.
pub trait SessionBackend
where
	Self: Send + Sync,
{
	fn load<'a>(&'a self, session_id: &'a str) -> BoxFuture<'a, Result<Option<Session>>>;

	fn append<'a>(
		&'a self,
		session_id: &'a str,
		turn: &'a Turn,
		history_pairs: u32,
		now: OffsetDateTime,
	) -> BoxFuture<'a, Result<Session>>;
}

#[derive(Clone)]
pub struct Providers {
	pub embedding: Arc<dyn EmbeddingProvider>,
	pub rerank: Arc<dyn RerankProvider>,
}
impl Providers {
	pub fn new(embedding: Arc<dyn EmbeddingProvider>, rerank: Arc<dyn RerankProvider>) -> Self {
		Self { embedding, rerank }
	}
}
impl Default for Providers {
	fn default() -> Self {
		let provider = Arc::new(DefaultProviders);

		Self { embedding: provider.clone(), rerank: provider }
	}
}

/// Storage-side collaborators, injected so the retrieval core never reaches for globals.
#[derive(Clone)]
pub struct Backends {
	pub store: Arc<dyn DocumentStore>,
	pub index: Arc<dyn VectorIndex>,
	pub sessions: Arc<dyn SessionBackend>,
}

pub struct TroveService {
	pub cfg: Config,
	pub store: Arc<dyn DocumentStore>,
	pub index: Arc<dyn VectorIndex>,
	pub sessions: SessionStore,
	pub providers: Providers,
}
impl TroveService {
	/// Wires the Postgres store and Qdrant index. The session backend follows `session.backend`.
	pub fn new(cfg: Config, db: Db, qdrant: QdrantStore) -> Self {
		let sessions: Arc<dyn SessionBackend> = match cfg.session.backend.as_str() {
			"postgres" => Arc::new(PgSessions::new(db.pool.clone())),
			_ => Arc::new(MemorySessions::default()),
		};
		let backends = Backends {
			store: Arc::new(PgDocumentStore { pool: db.pool }),
			index: Arc::new(QdrantIndex { store: qdrant }),
			sessions,
		};

		Self::with_parts(cfg, backends, Providers::default())
	}

	pub fn with_parts(cfg: Config, backends: Backends, providers: Providers) -> Self {
		let sessions = SessionStore::new(
			backends.sessions,
			cfg.session.history_pairs,
			cfg.retrieval.timeouts.session_ms,
		);

		Self { cfg, store: backends.store, index: backends.index, sessions, providers }
	}

	pub async fn get_session(&self, session_id: &str) -> Result<Session> {
		self.sessions.get_session(session_id).await
	}

	pub async fn append_turn(&self, session_id: &str, turn: &Turn) -> Result<Session> {
		self.sessions.append_turn(session_id, turn).await
	}
}

struct DefaultProviders;
impl EmbeddingProvider for DefaultProviders {
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, Result<Vec<Vec<f32>>>> {
		Box::pin(async move { embedding::embed(cfg, texts).await.map_err(Error::from) })
	}
}
impl RerankProvider for DefaultProviders {
	fn rerank<'a>(
		&'a self,
		cfg: &'a ProviderConfig,
		query: &'a str,
		docs: &'a [String],
	) -> BoxFuture<'a, Result<Vec<f32>>> {
		Box::pin(async move { rerank::rerank(cfg, query, docs).await.map_err(Error::from) })
	}
}

struct PgDocumentStore {
	pool: PgPool,
}
impl DocumentStore for PgDocumentStore {
	fn get_by_ids<'a>(&'a self, ids: &'a [String]) -> BoxFuture<'a, Result<Vec<KnowledgeEntry>>> {
		Box::pin(async move { entries::get_by_ids(&self.pool, ids).await.map_err(Error::from) })
	}

	fn get_by_title<'a>(
		&'a self,
		title: &'a str,
		cfg: &'a TitleMatch,
	) -> BoxFuture<'a, Result<Option<KnowledgeEntry>>> {
		Box::pin(async move {
			entries::get_by_title(&self.pool, title, cfg).await.map_err(Error::from)
		})
	}

	fn sample_by_category<'a>(
		&'a self,
		categories: &'a [String],
		limit: u32,
		seed: &'a str,
	) -> BoxFuture<'a, Result<Vec<KnowledgeEntry>>> {
		Box::pin(async move {
			entries::sample_by_category(&self.pool, categories, limit, seed)
				.await
				.map_err(Error::from)
		})
	}
}

struct QdrantIndex {
	store: QdrantStore,
}
impl VectorIndex for QdrantIndex {
	fn search<'a>(
		&'a self,
		vector: Vec<f32>,
		top_k: u32,
		filter: &'a MetadataFilter,
	) -> BoxFuture<'a, Result<Vec<VectorHit>>> {
		Box::pin(async move { self.store.search(vector, top_k, filter).await.map_err(Error::from) })
	}
}
