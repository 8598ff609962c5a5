use std::{collections::VecDeque, sync::LazyLock};

use regex::Regex;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

pub const MAX_SESSION_ID_CHARS: usize = 128;

static SESSION_ID_RE: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r"^[^\p{Cc}\s](?:[^\p{Cc}]*[^\p{Cc}\s])?$").expect("session id pattern is valid")
});

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
	User,
	Assistant,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct HistoryEntry {
	pub role: Role,
	pub content: String,
	#[serde(with = "time::serde::rfc3339")]
	pub at: OffsetDateTime,
}

/// One completed exchange, appended after the answer has been generated.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Turn {
	pub user_text: String,
	pub assistant_text: String,
	#[serde(default)]
	pub topic: Option<String>,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Session {
	pub session_id: String,
	pub turn_count: u64,
	pub history: VecDeque<HistoryEntry>,
	pub last_topic: Option<String>,
	#[serde(with = "time::serde::rfc3339")]
	pub created_at: OffsetDateTime,
	#[serde(with = "time::serde::rfc3339")]
	pub last_active_at: OffsetDateTime,
}
impl Session {
	pub fn new(session_id: &str, now: OffsetDateTime) -> Self {
		Self {
			session_id: session_id.to_string(),
			turn_count: 0,
			history: VecDeque::new(),
			last_topic: None,
			created_at: now,
			last_active_at: now,
		}
	}

	/// Appends the exchange, evicting the oldest entries once more than `history_pairs` pairs
	/// are held. `last_topic` only changes when the turn carries a non-blank topic.
	pub fn record_turn(&mut self, turn: &Turn, history_pairs: u32, now: OffsetDateTime) {
		let cap = (history_pairs.max(1) as usize) * 2;

		self.history.push_back(HistoryEntry {
			role: Role::User,
			content: turn.user_text.clone(),
			at: now,
		});
		self.history.push_back(HistoryEntry {
			role: Role::Assistant,
			content: turn.assistant_text.clone(),
			at: now,
		});

		while self.history.len() > cap {
			self.history.pop_front();
		}

		self.turn_count = self.turn_count.saturating_add(1);
		self.last_active_at = now;

		if let Some(topic) = turn.topic.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
			self.last_topic = Some(topic.to_string());
		}
	}
}

/// Session ids are 1..=128 chars, free of control characters and surrounding whitespace.
pub fn is_valid_session_id(session_id: &str) -> bool {
	session_id.chars().count() <= MAX_SESSION_ID_CHARS && SESSION_ID_RE.is_match(session_id)
}
