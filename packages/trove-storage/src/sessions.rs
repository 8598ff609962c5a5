use sqlx::PgPool;
use time::OffsetDateTime;

use crate::{Result, models::SessionRow};
use trove_domain::session::{Session, Turn};

const SESSION_COLUMNS: &str =
	"session_id, turn_count, history, last_topic, created_at, last_active_at";

pub async fn load_session(pool: &PgPool, session_id: &str) -> Result<Option<Session>> {
	let sql = format!("SELECT {SESSION_COLUMNS} FROM chat_sessions WHERE session_id = $1");
	let row: Option<SessionRow> =
		sqlx::query_as(&sql).bind(session_id).fetch_optional(pool).await?;

	row.map(SessionRow::into_session).transpose()
}

/// Appends one turn under a row lock so concurrent appends to the same session serialize,
/// while other sessions proceed independently.
pub async fn append_turn(
	pool: &PgPool,
	session_id: &str,
	turn: &Turn,
	history_pairs: u32,
	now: OffsetDateTime,
) -> Result<Session> {
	let mut tx = pool.begin().await?;

	sqlx::query(
		"\
INSERT INTO chat_sessions (session_id, turn_count, history, last_topic, created_at, last_active_at)
VALUES ($1, 0, '[]'::jsonb, NULL, $2, $2)
ON CONFLICT (session_id) DO NOTHING",
	)
	.bind(session_id)
	.bind(now)
	.execute(&mut *tx)
	.await?;

	let sql = format!("SELECT {SESSION_COLUMNS} FROM chat_sessions WHERE session_id = $1 FOR UPDATE");
	let row: SessionRow = sqlx::query_as(&sql).bind(session_id).fetch_one(&mut *tx).await?;
	let mut session = row.into_session()?;

	session.record_turn(turn, history_pairs, now);

	sqlx::query(
		"\
UPDATE chat_sessions
SET
	turn_count = $2,
	history = $3,
	last_topic = $4,
	last_active_at = $5
WHERE session_id = $1",
	)
	.bind(session_id)
	.bind(i64::try_from(session.turn_count).unwrap_or(i64::MAX))
	.bind(serde_json::to_value(&session.history)?)
	.bind(session.last_topic.as_deref())
	.bind(session.last_active_at)
	.execute(&mut *tx)
	.await?;

	tx.commit().await?;

	Ok(session)
}
