use serde_json::Value;
use time::OffsetDateTime;

use crate::{Error, Result};
use trove_domain::{
	entry::{EntryDetail, KnowledgeEntry},
	session::{HistoryEntry, Session},
};

#[derive(Debug, sqlx::FromRow)]
pub struct EntryRow {
	pub entry_id: String,
	pub title: String,
	pub category: String,
	pub topic: String,
	pub summary: String,
	pub details: Value,
	pub keywords: Vec<String>,
	pub district: Option<String>,
	pub sub_district: Option<String>,
}
impl EntryRow {
	pub fn into_entry(self) -> Result<KnowledgeEntry> {
		let details: Vec<EntryDetail> = serde_json::from_value(self.details).map_err(|err| {
			Error::CorruptRow(format!("knowledge_entries.details of {}: {err}", self.entry_id))
		})?;

		Ok(KnowledgeEntry {
			id: self.entry_id,
			title: self.title,
			category: self.category,
			topic: self.topic,
			summary: self.summary,
			details,
			keywords: self.keywords,
			district: self.district,
			sub_district: self.sub_district,
		})
	}
}

#[derive(Debug, sqlx::FromRow)]
pub struct SessionRow {
	pub session_id: String,
	pub turn_count: i64,
	pub history: Value,
	pub last_topic: Option<String>,
	pub created_at: OffsetDateTime,
	pub last_active_at: OffsetDateTime,
}
impl SessionRow {
	pub fn into_session(self) -> Result<Session> {
		let history: Vec<HistoryEntry> = serde_json::from_value(self.history).map_err(|err| {
			Error::CorruptRow(format!("chat_sessions.history of {}: {err}", self.session_id))
		})?;

		Ok(Session {
			session_id: self.session_id,
			turn_count: self.turn_count.max(0) as u64,
			history: history.into(),
			last_topic: self.last_topic,
			created_at: self.created_at,
			last_active_at: self.last_active_at,
		})
	}
}
