//! Trust-tiered ordering.
//!
//! Scores from the pairwise scorer are the only comparable scale, so ranking always rescores the
//! fused set before applying provenance floors. Floors only raise a score. Ties fall back to the
//! provenance tier and then to fan-out order, which keeps the output a total, stable order.

use std::{cmp::Ordering, time::Duration};

use futures::{StreamExt, TryStreamExt, stream};

use super::{CandidateDocument, RankedResult};
use crate::{Error, RerankProvider, Result};
use trove_config::{ProviderConfig, RetrievalScorer, Trust};
use trove_domain::provenance::Provenance;

pub fn apply_trust_floor(raw_score: f32, provenance: &Provenance, trust: &Trust) -> f32 {
	if provenance.is_direct_match {
		raw_score.max(trust.direct_floor)
	} else if provenance.is_trending {
		raw_score.max(trust.trending_floor)
	} else {
		raw_score
	}
}

/// Orders `candidates` by boosted score and keeps the first `top_k`.
///
/// `raw_scores` must be aligned with `candidates`. A NaN score counts as zero.
pub fn rank(
	candidates: Vec<CandidateDocument>,
	raw_scores: &[f32],
	trust: &Trust,
	top_k: usize,
) -> Vec<RankedResult> {
	let mut scored: Vec<(usize, CandidateDocument, f32, f32)> = candidates
		.into_iter()
		.zip(raw_scores.iter().copied())
		.enumerate()
		.map(|(position, (document, raw))| {
			let raw = if raw.is_nan() { 0.0 } else { raw };
			let boosted = apply_trust_floor(raw, &document.provenance, trust);

			(position, document, raw, boosted)
		})
		.collect();

	scored.sort_by(|a, b| {
		cmp_f32_desc(a.3, b.3)
			.then_with(|| a.1.provenance.tier().cmp(&b.1.provenance.tier()))
			.then_with(|| a.0.cmp(&b.0))
	});
	scored.truncate(top_k);

	scored
		.into_iter()
		.enumerate()
		.map(|(idx, (_, document, raw_score, boosted_score))| RankedResult {
			document,
			raw_score,
			boosted_score,
			rank: idx as u32 + 1,
		})
		.collect()
}

/// Ordering used when the scorer is unavailable: fan-out order, no floors. The score shown is the
/// best source-local score clamped to `[0, 1]`.
pub fn rank_unscored(candidates: Vec<CandidateDocument>, top_k: usize) -> Vec<RankedResult> {
	candidates
		.into_iter()
		.take(top_k)
		.enumerate()
		.map(|(idx, document)| {
			let score = document.source_scores.best().unwrap_or(0.0).clamp(0.0, 1.0);

			RankedResult { document, raw_score: score, boosted_score: score, rank: idx as u32 + 1 }
		})
		.collect()
}

/// Scores every document against `query`, as one batch or as bounded concurrent per-pair calls.
/// Any failure, timeout or misaligned response fails the whole batch.
pub(crate) async fn score_candidates(
	scorer: &dyn RerankProvider,
	cfg: &ProviderConfig,
	settings: &RetrievalScorer,
	timeout_ms: u64,
	query: &str,
	docs: &[String],
) -> Result<Vec<f32>> {
	let scoring = async {
		if settings.batched {
			return scorer.rerank(cfg, query, docs).await;
		}

		let pending: Vec<_> = docs.iter().map(|doc| score_one(scorer, cfg, query, doc)).collect();

		stream::iter(pending)
			.buffered(settings.max_concurrency.max(1) as usize)
			.try_collect::<Vec<f32>>()
			.await
	};
	let scores = match tokio::time::timeout(Duration::from_millis(timeout_ms), scoring).await {
		Ok(Ok(scores)) => scores,
		Ok(Err(err)) => return Err(Error::ScorerUnavailable { message: err.to_string() }),
		Err(_) =>
			return Err(Error::ScorerUnavailable {
				message: format!("Timed out after {timeout_ms} ms."),
			}),
	};

	if scores.len() != docs.len() {
		return Err(Error::ScorerUnavailable {
			message: format!("Scorer returned {} scores for {} documents.", scores.len(), docs.len()),
		});
	}

	Ok(scores)
}

async fn score_one(
	scorer: &dyn RerankProvider,
	cfg: &ProviderConfig,
	query: &str,
	doc: &String,
) -> Result<f32> {
	let scores = scorer.rerank(cfg, query, std::slice::from_ref(doc)).await?;

	scores.into_iter().next().ok_or_else(|| Error::Provider {
		message: "Scorer returned no score for a document.".to_string(),
	})
}

pub fn cmp_f32_desc(a: f32, b: f32) -> Ordering {
	match (a.is_nan(), b.is_nan()) {
		(true, true) => Ordering::Equal,
		(true, false) => Ordering::Greater,
		(false, true) => Ordering::Less,
		(false, false) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use trove_domain::provenance::{SourceKind, SourceScores};

	fn doc(id: &str, source: SourceKind, score: f32) -> CandidateDocument {
		let mut source_scores = SourceScores::default();

		source_scores.record(source, score);

		CandidateDocument {
			id: id.to_string(),
			title: id.to_string(),
			category: String::new(),
			text: format!("Title: {id}"),
			provenance: Provenance::from_source(source),
			source_scores,
		}
	}

	fn ids(ranked: &[RankedResult]) -> Vec<&str> {
		ranked.iter().map(|r| r.document.id.as_str()).collect()
	}

	#[test]
	fn floors_only_raise() {
		let trust = Trust::default();
		let direct = Provenance::from_source(SourceKind::Direct);
		let trending = Provenance::from_source(SourceKind::Trending);
		let semantic = Provenance::from_source(SourceKind::Semantic);

		assert_eq!(apply_trust_floor(0.1, &direct, &trust), 0.99);
		assert_eq!(apply_trust_floor(0.995, &direct, &trust), 0.995);
		assert_eq!(apply_trust_floor(0.1, &trending, &trust), 0.85);
		assert_eq!(apply_trust_floor(0.1, &semantic, &trust), 0.1);

		for raw in [-3.0_f32, 0.0, 0.2, 0.84, 0.9, 1.0, 7.5] {
			for provenance in [direct, trending, semantic, direct.merge(trending)] {
				assert!(apply_trust_floor(raw, &provenance, &trust) >= raw);
			}
		}
	}

	#[test]
	fn direct_match_outranks_semantic_hits_below_floor() {
		let candidates = vec![
			doc("s1", SourceKind::Semantic, 0.9),
			doc("s2", SourceKind::Semantic, 0.9),
			doc("d", SourceKind::Direct, 1.5),
			doc("s3", SourceKind::Semantic, 0.9),
		];
		let ranked = rank(candidates, &[0.95, 0.9, 0.05, 0.97], &Trust::default(), 4);

		assert_eq!(ids(&ranked), vec!["d", "s3", "s1", "s2"]);
		assert_eq!(ranked[0].boosted_score, 0.99);
		assert_eq!(ranked[0].raw_score, 0.05);
		assert_eq!(ranked.iter().map(|r| r.rank).collect::<Vec<_>>(), vec![1, 2, 3, 4]);
	}

	#[test]
	fn ties_break_by_tier_then_fan_out_order() {
		let candidates = vec![
			doc("s1", SourceKind::Semantic, 0.0),
			doc("t", SourceKind::Trending, 0.85),
			doc("s2", SourceKind::Semantic, 0.0),
		];
		let ranked = rank(candidates, &[0.85, 0.2, 0.85], &Trust::default(), 3);

		assert_eq!(ids(&ranked), vec!["t", "s1", "s2"]);
	}

	#[test]
	fn truncates_and_treats_nan_as_zero() {
		let candidates = vec![
			doc("a", SourceKind::Semantic, 0.0),
			doc("b", SourceKind::Semantic, 0.0),
			doc("c", SourceKind::Semantic, 0.0),
		];
		let ranked = rank(candidates, &[f32::NAN, 0.3, 0.1], &Trust::default(), 2);

		assert_eq!(ids(&ranked), vec!["b", "c"]);
	}

	#[test]
	fn unscored_keeps_fan_out_order() {
		let candidates = vec![
			doc("d", SourceKind::Direct, 1.5),
			doc("s", SourceKind::Semantic, 0.42),
			doc("f", SourceKind::Fallback, 1.0),
		];
		let ranked = rank_unscored(candidates, 2);

		assert_eq!(ids(&ranked), vec!["d", "s"]);
		assert_eq!(ranked[0].boosted_score, 1.0);
		assert_eq!(ranked[1].raw_score, 0.42);
	}

	#[test]
	fn nan_sorts_last() {
		let mut values = [0.2, f32::NAN, 0.9, 0.5];

		values.sort_by(|a, b| cmp_f32_desc(*a, *b));

		assert_eq!(&values[..3], &[0.9, 0.5, 0.2]);
		assert!(values[3].is_nan());
	}
}
