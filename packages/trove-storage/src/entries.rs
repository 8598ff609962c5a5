use sqlx::PgPool;

use crate::{Result, models::EntryRow};
use trove_config::TitleMatch;
use trove_domain::{entry::KnowledgeEntry, title_match};

const ENTRY_COLUMNS: &str = "\
entry_id, title, category, topic, summary, details, keywords, district, sub_district";

pub async fn get_by_ids(pool: &PgPool, ids: &[String]) -> Result<Vec<KnowledgeEntry>> {
	if ids.is_empty() {
		return Ok(Vec::new());
	}

	let sql = format!("SELECT {ENTRY_COLUMNS} FROM knowledge_entries WHERE entry_id = ANY($1)");
	let rows: Vec<EntryRow> = sqlx::query_as(&sql).bind(ids).fetch_all(pool).await?;

	rows.into_iter().map(EntryRow::into_entry).collect()
}

/// Resolves a title against every stored title. Substring matches win over fuzzy ones; both
/// compare NFKC-folded, lowercased text, so matching is done here rather than with `ILIKE`.
pub async fn get_by_title(
	pool: &PgPool,
	title: &str,
	cfg: &TitleMatch,
) -> Result<Option<KnowledgeEntry>> {
	if title.trim().is_empty() {
		return Ok(None);
	}

	let titles = list_titles(pool).await?;
	let Some(index) =
		title_match::resolve_title(title, titles.iter().map(|(_, title)| title.as_str()), cfg)
	else {
		return Ok(None);
	};
	let entry_id = titles[index].0.clone();

	Ok(get_by_ids(pool, &[entry_id]).await?.into_iter().next())
}

/// All `(entry_id, title)` pairs in a stable order, for fuzzy matching.
pub async fn list_titles(pool: &PgPool) -> Result<Vec<(String, String)>> {
	let rows: Vec<(String, String)> =
		sqlx::query_as("SELECT entry_id, title FROM knowledge_entries ORDER BY entry_id")
			.fetch_all(pool)
			.await?;

	Ok(rows)
}

/// Picks up to `limit` entries from `categories`, ordered by a hash of the entry id and `seed`
/// so that a fixed seed yields a fixed sample.
pub async fn sample_by_category(
	pool: &PgPool,
	categories: &[String],
	limit: u32,
	seed: &str,
) -> Result<Vec<KnowledgeEntry>> {
	if categories.is_empty() || limit == 0 {
		return Ok(Vec::new());
	}

	let sql = format!(
		"\
SELECT {ENTRY_COLUMNS}
FROM knowledge_entries
WHERE category = ANY($1)
ORDER BY md5(entry_id || $2), entry_id
LIMIT $3"
	);
	let rows: Vec<EntryRow> = sqlx::query_as(&sql)
		.bind(categories)
		.bind(seed)
		.bind(i64::from(limit))
		.fetch_all(pool)
		.await?;

	rows.into_iter().map(EntryRow::into_entry).collect()
}

pub async fn upsert_entry(pool: &PgPool, entry: &KnowledgeEntry) -> Result<()> {
	sqlx::query(
		"\
INSERT INTO knowledge_entries (
	entry_id,
	title,
	category,
	topic,
	summary,
	details,
	keywords,
	district,
	sub_district
)
VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9)
ON CONFLICT (entry_id) DO UPDATE SET
	title = EXCLUDED.title,
	category = EXCLUDED.category,
	topic = EXCLUDED.topic,
	summary = EXCLUDED.summary,
	details = EXCLUDED.details,
	keywords = EXCLUDED.keywords,
	district = EXCLUDED.district,
	sub_district = EXCLUDED.sub_district,
	updated_at = now()",
	)
	.bind(entry.id.as_str())
	.bind(entry.title.as_str())
	.bind(entry.category.as_str())
	.bind(entry.topic.as_str())
	.bind(entry.summary.as_str())
	.bind(serde_json::to_value(&entry.details)?)
	.bind(&entry.keywords)
	.bind(entry.district.as_deref())
	.bind(entry.sub_district.as_deref())
	.execute(pool)
	.await?;

	Ok(())
}
