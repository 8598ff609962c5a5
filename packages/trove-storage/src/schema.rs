pub const KNOWLEDGE_ENTRIES_TABLE: &str = "\
CREATE TABLE IF NOT EXISTS knowledge_entries (
	entry_id text PRIMARY KEY,
	title text NOT NULL,
	category text NOT NULL DEFAULT '',
	topic text NOT NULL DEFAULT '',
	summary text NOT NULL DEFAULT '',
	details jsonb NOT NULL DEFAULT '[]'::jsonb,
	keywords text[] NOT NULL DEFAULT '{}',
	district text NULL,
	sub_district text NULL,
	created_at timestamptz NOT NULL DEFAULT now(),
	updated_at timestamptz NOT NULL DEFAULT now()
);
CREATE INDEX IF NOT EXISTS idx_knowledge_entries_category ON knowledge_entries (category)";

pub const CHAT_SESSIONS_TABLE: &str = "\
CREATE TABLE IF NOT EXISTS chat_sessions (
	session_id text PRIMARY KEY,
	turn_count bigint NOT NULL DEFAULT 0,
	history jsonb NOT NULL DEFAULT '[]'::jsonb,
	last_topic text NULL,
	created_at timestamptz NOT NULL,
	last_active_at timestamptz NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_chat_sessions_last_active ON chat_sessions (last_active_at)";

pub fn render_schema() -> String {
	[KNOWLEDGE_ENTRIES_TABLE, CHAT_SESSIONS_TABLE].join(";\n")
}

pub fn statements() -> Vec<String> {
	render_schema()
		.split(';')
		.map(str::trim)
		.filter(|statement| !statement.is_empty())
		.map(str::to_string)
		.collect()
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn splits_into_individual_statements() {
		let statements = statements();

		assert_eq!(statements.len(), 4);
		assert!(statements[0].starts_with("CREATE TABLE IF NOT EXISTS knowledge_entries"));
		assert!(statements.iter().all(|s| !s.ends_with(';')));
	}
}
