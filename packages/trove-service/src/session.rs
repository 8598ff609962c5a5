//! Per-session conversational memory with fail-soft degradation.
//!
//! The configured backend is authoritative. When it fails, reads and appends fall through to an
//! in-process map so the retrieval path keeps working without durable memory.

use std::{sync::Arc, time::Duration};

use dashmap::DashMap;
use sqlx::PgPool;
use time::OffsetDateTime;

use crate::{BoxFuture, Error, Result, SessionBackend};
use trove_domain::session::{self, Session, Turn};
use trove_storage::sessions;

/// In-process backend. Each append runs under the shard lock of its key, so appends to the same
/// id serialize while other ids proceed independently.
#[derive(Default)]
pub struct MemorySessions {
	sessions: DashMap<String, Session>,
}
impl MemorySessions {
	fn get(&self, session_id: &str) -> Option<Session> {
		self.sessions.get(session_id).map(|session| session.clone())
	}

	fn record(
		&self,
		session_id: &str,
		turn: &Turn,
		history_pairs: u32,
		now: OffsetDateTime,
	) -> Session {
		let mut session = self
			.sessions
			.entry(session_id.to_string())
			.or_insert_with(|| Session::new(session_id, now));

		session.record_turn(turn, history_pairs, now);

		session.clone()
	}
}
impl SessionBackend for MemorySessions {
	fn load<'a>(&'a self, session_id: &'a str) -> BoxFuture<'a, Result<Option<Session>>> {
		Box::pin(async move { Ok(self.get(session_id)) })
	}

	fn append<'a>(
		&'a self,
		session_id: &'a str,
		turn: &'a Turn,
		history_pairs: u32,
		now: OffsetDateTime,
	) -> BoxFuture<'a, Result<Session>> {
		Box::pin(async move { Ok(self.record(session_id, turn, history_pairs, now)) })
	}
}

/// Durable backend on the `chat_sessions` table.
pub struct PgSessions {
	pool: PgPool,
}
impl PgSessions {
	pub fn new(pool: PgPool) -> Self {
		Self { pool }
	}
}
impl SessionBackend for PgSessions {
	fn load<'a>(&'a self, session_id: &'a str) -> BoxFuture<'a, Result<Option<Session>>> {
		Box::pin(async move {
			sessions::load_session(&self.pool, session_id)
				.await
				.map_err(|err| Error::SessionStore { message: err.to_string() })
		})
	}

	fn append<'a>(
		&'a self,
		session_id: &'a str,
		turn: &'a Turn,
		history_pairs: u32,
		now: OffsetDateTime,
	) -> BoxFuture<'a, Result<Session>> {
		Box::pin(async move {
			sessions::append_turn(&self.pool, session_id, turn, history_pairs, now)
				.await
				.map_err(|err| Error::SessionStore { message: err.to_string() })
		})
	}
}

pub struct SessionStore {
	backend: Arc<dyn SessionBackend>,
	ephemeral: MemorySessions,
	history_pairs: u32,
	timeout_ms: u64,
}
impl SessionStore {
	/// Backend calls slower than `timeout_ms` count as failures and degrade like them.
	pub fn new(backend: Arc<dyn SessionBackend>, history_pairs: u32, timeout_ms: u64) -> Self {
		Self { backend, ephemeral: MemorySessions::default(), history_pairs, timeout_ms }
	}

	async fn bounded<T>(&self, call: BoxFuture<'_, Result<T>>) -> Result<T> {
		match tokio::time::timeout(Duration::from_millis(self.timeout_ms), call).await {
			Ok(result) => result,
			Err(_) => Err(Error::SessionStore {
				message: format!("Timed out after {} ms.", self.timeout_ms),
			}),
		}
	}

	/// Never fails for a valid id: unknown ids and backend failures both yield a usable record.
	pub async fn get_session(&self, session_id: &str) -> Result<Session> {
		ensure_valid_id(session_id)?;

		match self.bounded(self.backend.load(session_id)).await {
			Ok(Some(session)) => Ok(session),
			Ok(None) => Ok(Session::new(session_id, OffsetDateTime::now_utc())),
			Err(err) => {
				tracing::warn!(
					error = %err,
					session_id,
					"Session store read failed. Using ephemeral session."
				);

				Ok(self
					.ephemeral
					.get(session_id)
					.unwrap_or_else(|| Session::new(session_id, OffsetDateTime::now_utc())))
			},
		}
	}

	pub async fn append_turn(&self, session_id: &str, turn: &Turn) -> Result<Session> {
		ensure_valid_id(session_id)?;

		let now = OffsetDateTime::now_utc();

		match self.bounded(self.backend.append(session_id, turn, self.history_pairs, now)).await {
			Ok(session) => Ok(session),
			Err(err) => {
				tracing::warn!(
					error = %err,
					session_id,
					"Session store append failed. Recording turn in memory only."
				);

				Ok(self.ephemeral.record(session_id, turn, self.history_pairs, now))
			},
		}
	}

	pub async fn get_last_topic(&self, session_id: &str) -> Option<String> {
		match self.get_session(session_id).await {
			Ok(session) => session.last_topic,
			Err(_) => None,
		}
	}
}

fn ensure_valid_id(session_id: &str) -> Result<()> {
	if session::is_valid_session_id(session_id) {
		Ok(())
	} else {
		Err(Error::invalid_request(format!(
			"session_id must be 1 to {} characters without control characters.",
			session::MAX_SESSION_ID_CHARS
		)))
	}
}
