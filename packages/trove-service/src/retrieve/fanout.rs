use std::{future::Future, time::Duration};

use futures::future;

use super::fusion::SourceHit;
use crate::{Error, Result, TroveService};
use trove_domain::{provenance::SourceKind, query::MetadataFilter};

pub(crate) struct FanOutPlan<'a> {
	pub(crate) query_text: &'a str,
	pub(crate) entity: Option<&'a str>,
	pub(crate) sub_queries: &'a [String],
	pub(crate) filter: &'a MetadataFilter,
	pub(crate) broad: bool,
	pub(crate) seed: &'a str,
}

impl TroveService {
	/// Queries every candidate source concurrently. Hits come back grouped by source in a fixed
	/// order (direct, trending, semantic or fallback) regardless of completion order.
	pub(crate) async fn fan_out(&self, plan: &FanOutPlan<'_>) -> Vec<SourceHit> {
		let timeouts = &self.cfg.retrieval.timeouts;
		let (direct, trending, similar) = tokio::join!(
			guarded(SourceKind::Direct, timeouts.direct_ms, self.direct_lookup(plan)),
			guarded(SourceKind::Trending, timeouts.trending_ms, self.trending_sample(plan)),
			self.semantic_then_fallback(plan),
		);
		let mut hits = Vec::with_capacity(direct.len() + trending.len() + similar.len());

		hits.extend(direct);
		hits.extend(trending);
		hits.extend(similar);

		hits
	}

	async fn direct_lookup(&self, plan: &FanOutPlan<'_>) -> Result<Vec<SourceHit>> {
		let Some(entity) = plan.entity else {
			return Ok(Vec::new());
		};
		let entry = self.store.get_by_title(entity, &self.cfg.retrieval.title_match).await?;

		Ok(entry
			.into_iter()
			.map(|entry| SourceHit {
				source: SourceKind::Direct,
				entry,
				score: self.cfg.trust.direct_sentinel,
			})
			.collect())
	}

	async fn trending_sample(&self, plan: &FanOutPlan<'_>) -> Result<Vec<SourceHit>> {
		let retrieval = &self.cfg.retrieval;

		if !plan.broad || retrieval.trending_categories.is_empty() {
			return Ok(Vec::new());
		}

		let entries = self
			.store
			.sample_by_category(
				&retrieval.trending_categories,
				retrieval.trending_sample_size,
				plan.seed,
			)
			.await?;

		Ok(entries
			.into_iter()
			.filter(|entry| plan.filter.admits(entry))
			.map(|entry| SourceHit {
				source: SourceKind::Trending,
				entry,
				score: self.cfg.trust.trending_sentinel,
			})
			.collect())
	}

	async fn semantic_then_fallback(&self, plan: &FanOutPlan<'_>) -> Vec<SourceHit> {
		let timeouts = &self.cfg.retrieval.timeouts;
		let semantic =
			guarded(SourceKind::Semantic, timeouts.semantic_ms, self.semantic_search(plan)).await;

		if !semantic.is_empty() {
			return semantic;
		}

		guarded(SourceKind::Fallback, timeouts.fallback_ms, self.fallback_lookup(plan)).await
	}

	async fn semantic_search(&self, plan: &FanOutPlan<'_>) -> Result<Vec<SourceHit>> {
		let embedding_cfg = &self.cfg.providers.embedding;
		let queries = semantic_queries(
			plan.query_text,
			plan.sub_queries,
			self.cfg.retrieval.max_sub_queries as usize,
			embedding_cfg.query_prefix.as_deref(),
		);

		if queries.is_empty() {
			return Ok(Vec::new());
		}

		let vectors = self.providers.embedding.embed(embedding_cfg, &queries).await?;

		if vectors.len() != queries.len() {
			return Err(Error::Provider {
				message: format!(
					"Embedding provider returned {} vectors for {} queries.",
					vectors.len(),
					queries.len()
				),
			});
		}

		let top_k = self.cfg.retrieval.vector_top_k;
		let results = future::join_all(
			vectors.into_iter().map(|vector| self.index.search(vector, top_k, plan.filter)),
		)
		.await;
		let mut hits = Vec::new();
		let mut last_err = None;

		for result in results {
			match result {
				Ok(found) => hits.extend(found.into_iter().map(|hit| SourceHit {
					source: SourceKind::Semantic,
					entry: hit.entry,
					score: hit.score,
				})),
				Err(err) => {
					tracing::warn!(error = %err, "Vector search failed for one sub-query.");

					last_err = Some(err);
				},
			}
		}

		match last_err {
			Some(err) if hits.is_empty() => Err(err),
			_ => Ok(hits),
		}
	}

	async fn fallback_lookup(&self, plan: &FanOutPlan<'_>) -> Result<Vec<SourceHit>> {
		let entry =
			self.store.get_by_title(plan.query_text, &self.cfg.retrieval.title_match).await?;

		Ok(entry
			.into_iter()
			.filter(|entry| plan.filter.admits(entry))
			.map(|entry| SourceHit {
				source: SourceKind::Fallback,
				entry,
				score: self.cfg.trust.fallback_sentinel,
			})
			.collect())
	}
}

/// Runs one source under its own timeout. Errors and timeouts degrade to an empty list.
async fn guarded<F>(kind: SourceKind, timeout_ms: u64, source: F) -> Vec<SourceHit>
where
	F: Future<Output = Result<Vec<SourceHit>>>,
{
	let err = match tokio::time::timeout(Duration::from_millis(timeout_ms), source).await {
		Ok(Ok(hits)) => {
			tracing::debug!(source = kind.as_str(), count = hits.len(), "Candidate source returned.");

			return hits;
		},
		Ok(Err(err)) => Error::SourceUnavailable { kind, message: err.to_string() },
		Err(_) =>
			Error::SourceUnavailable { kind, message: format!("Timed out after {timeout_ms} ms.") },
	};

	tracing::warn!(source = kind.as_str(), error = %err, "Candidate source degraded to empty.");

	Vec::new()
}

/// The query itself followed by its paraphrases, trimmed, deduplicated and capped at `max`.
fn semantic_queries(
	query_text: &str,
	sub_queries: &[String],
	max: usize,
	prefix: Option<&str>,
) -> Vec<String> {
	let mut out: Vec<String> = Vec::new();

	for text in std::iter::once(query_text).chain(sub_queries.iter().map(String::as_str)) {
		let text = text.trim();

		if text.is_empty() || out.iter().any(|seen| seen == text) {
			continue;
		}
		if out.len() == max.max(1) {
			break;
		}

		out.push(text.to_string());
	}

	match prefix {
		Some(prefix) => out.into_iter().map(|text| format!("{prefix}{text}")).collect(),
		None => out,
	}
}
