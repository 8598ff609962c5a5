pub mod confidence;
pub mod context;
pub mod fusion;
pub mod ranking;

mod fanout;

pub use context::PreviewCard;

use std::{collections::HashMap, time::Duration};

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{Error, Result, TroveService};
use fanout::FanOutPlan;
use fusion::FusedCandidate;
use trove_domain::{
	provenance::{Provenance, SourceScores},
	query::{self, MetadataFilter},
	session,
};

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseMode {
	#[default]
	Text,
	Voice,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct RetrieveRequest {
	pub query: String,
	/// Spell-corrected query. Used for scoring and search when present.
	#[serde(default)]
	pub corrected_query: Option<String>,
	#[serde(default)]
	pub entity: Option<String>,
	#[serde(default)]
	pub sub_queries: Vec<String>,
	#[serde(default)]
	pub filter: Option<MetadataFilter>,
	#[serde(default)]
	pub session_id: Option<String>,
	#[serde(default)]
	pub mode: ResponseMode,
	#[serde(default)]
	pub top_k: Option<u32>,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct CandidateDocument {
	pub id: String,
	pub title: String,
	pub category: String,
	/// Flattened entry text, shared by the scorer and the context window.
	pub text: String,
	#[serde(flatten)]
	pub provenance: Provenance,
	pub source_scores: SourceScores,
}
impl From<FusedCandidate> for CandidateDocument {
	fn from(candidate: FusedCandidate) -> Self {
		Self {
			text: candidate.entry.flatten(),
			id: candidate.entry.id,
			title: candidate.entry.title,
			category: candidate.entry.category,
			provenance: candidate.provenance,
			source_scores: candidate.scores,
		}
	}
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct RankedResult {
	#[serde(flatten)]
	pub document: CandidateDocument,
	pub raw_score: f32,
	pub boosted_score: f32,
	/// 1-based.
	pub rank: u32,
}

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
pub struct ConfidenceVerdict {
	pub is_low_confidence: bool,
	pub top_score: f32,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct RetrievalResult {
	pub ranked: Vec<RankedResult>,
	pub confidence: ConfidenceVerdict,
	pub context_text: String,
	pub used_session_topic: bool,
	/// Canonical title of the first result, to be recorded as the turn topic.
	pub primary_topic: Option<String>,
	pub preview: Vec<PreviewCard>,
}

/// `NoCandidates` means every source came back empty; callers must say so instead of answering.
#[derive(Clone, Debug, PartialEq)]
pub enum RetrievalOutcome {
	Found(RetrievalResult),
	NoCandidates,
}
impl RetrievalOutcome {
	pub fn found(self) -> Option<RetrievalResult> {
		match self {
			Self::Found(result) => Some(result),
			Self::NoCandidates => None,
		}
	}
}

impl TroveService {
	/// Same as [`TroveService::retrieve`], bounded by `service.request_timeout_ms`. On expiry all
	/// in-flight source and scorer calls are dropped.
	pub async fn retrieve_with_deadline(&self, req: RetrieveRequest) -> Result<RetrievalOutcome> {
		let timeout_ms = self.cfg.service.request_timeout_ms;

		match tokio::time::timeout(Duration::from_millis(timeout_ms), self.retrieve(req)).await {
			Ok(outcome) => outcome,
			Err(_) => {
				tracing::warn!(timeout_ms, "Retrieval deadline exceeded.");

				Err(Error::Timeout { timeout_ms })
			},
		}
	}

	/// Fan-out, fusion, rerank with trust floors, confidence gate and context selection.
	///
	/// Only request validation fails this call. Source, scorer and session failures degrade.
	pub async fn retrieve(&self, req: RetrieveRequest) -> Result<RetrievalOutcome> {
		let top_k = self.validate_request(&req)?;
		let retrieval = &self.cfg.retrieval;
		let query_text = req
			.corrected_query
			.as_deref()
			.map(str::trim)
			.filter(|text| !text.is_empty())
			.unwrap_or_else(|| req.query.trim());
		let filter =
			req.filter.clone().unwrap_or_default().normalized(&retrieval.exclude_categories);
		let mut entity =
			req.entity.as_deref().map(str::trim).filter(|e| !e.is_empty()).map(str::to_string);
		let mut used_session_topic = false;

		if entity.is_none()
			&& let Some(session_id) = req.session_id.as_deref()
			&& query::is_continuation(&req.query, &retrieval.continuation_markers)
			&& let Some(topic) = self.sessions.get_last_topic(session_id).await
		{
			tracing::debug!(session_id, topic = %topic, "Resolved continuation to session topic.");

			entity = Some(topic);
			used_session_topic = true;
		}

		let seed = OffsetDateTime::now_utc().date().to_string();
		let plan = FanOutPlan {
			query_text,
			entity: entity.as_deref(),
			sub_queries: &req.sub_queries,
			filter: &filter,
			broad: query::is_broad(entity.as_deref(), &filter),
			seed: &seed,
		};
		let hits = self.fan_out(&plan).await;
		let mut fused = fusion::fuse(hits);

		tracing::debug!(fused = fused.len(), broad = plan.broad, "Fused candidates.");

		if fused.is_empty() {
			tracing::info!(used_session_topic, "No candidates found.");

			return Ok(RetrievalOutcome::NoCandidates);
		}

		self.hydrate(&mut fused).await;

		let candidates: Vec<CandidateDocument> =
			fused.into_iter().map(CandidateDocument::from).collect();
		let texts: Vec<String> = candidates.iter().map(|c| c.text.clone()).collect();
		let scored = ranking::score_candidates(
			self.providers.rerank.as_ref(),
			&self.cfg.providers.rerank,
			&retrieval.scorer,
			retrieval.timeouts.scorer_ms,
			query_text,
			&texts,
		)
		.await;
		let (ranked, confidence) = match scored {
			Ok(scores) => {
				let ranked = ranking::rank(candidates, &scores, &self.cfg.trust, top_k);
				let verdict = confidence::gate(&ranked, self.cfg.trust.confidence_threshold);

				(ranked, verdict)
			},
			Err(err) => {
				tracing::warn!(error = %err, "Scoring failed. Keeping fan-out order.");

				let ranked = ranking::rank_unscored(candidates, top_k);
				let verdict = confidence::forced_low(&ranked);

				(ranked, verdict)
			},
		};

		if confidence.is_low_confidence {
			tracing::warn!(top_score = confidence.top_score, "Low-confidence retrieval.");
		}

		let context_text = context::build_context(&ranked);
		let preview = context::preview(&ranked, retrieval.preview_k as usize);
		let primary_topic = ranked.first().map(|result| result.document.title.clone());

		tracing::info!(
			ranked = ranked.len(),
			top_score = confidence.top_score,
			is_low_confidence = confidence.is_low_confidence,
			used_session_topic,
			"Retrieval complete."
		);

		Ok(RetrievalOutcome::Found(RetrievalResult {
			ranked,
			confidence,
			context_text,
			used_session_topic,
			primary_topic,
			preview,
		}))
	}

	fn validate_request(&self, req: &RetrieveRequest) -> Result<usize> {
		if req.query.trim().is_empty() {
			return Err(Error::invalid_request("query must not be empty."));
		}
		if let Some(session_id) = req.session_id.as_deref()
			&& !session::is_valid_session_id(session_id)
		{
			return Err(Error::invalid_request(format!(
				"session_id must be 1 to {} characters without control characters.",
				session::MAX_SESSION_ID_CHARS
			)));
		}

		let top_k = match (req.top_k, req.mode) {
			(Some(0), _) => return Err(Error::invalid_request("top_k must be greater than zero.")),
			(Some(top_k), _) => top_k,
			(None, ResponseMode::Text) => self.cfg.retrieval.top_k_text,
			(None, ResponseMode::Voice) => self.cfg.retrieval.top_k_voice,
		};

		Ok(top_k as usize)
	}

	/// Replaces index payloads with canonical entries. Failures keep the payload copies.
	async fn hydrate(&self, fused: &mut [FusedCandidate]) {
		let ids: Vec<String> = fused
			.iter()
			.filter(|c| {
				let p = &c.provenance;

				p.is_semantic && !p.is_direct_match && !p.is_trending && !p.is_fallback
			})
			.map(|c| c.entry.id.clone())
			.collect();

		if ids.is_empty() {
			return;
		}

		let timeout_ms = self.cfg.retrieval.timeouts.hydrate_ms;
		let entries = match tokio::time::timeout(
			Duration::from_millis(timeout_ms),
			self.store.get_by_ids(&ids),
		)
		.await
		{
			Ok(Ok(entries)) => entries,
			Ok(Err(err)) => {
				tracing::warn!(error = %err, "Hydration failed. Using index payloads.");

				return;
			},
			Err(_) => {
				tracing::warn!(timeout_ms, "Hydration timed out. Using index payloads.");

				return;
			},
		};
		let mut by_id: HashMap<String, _> =
			entries.into_iter().map(|entry| (entry.id.clone(), entry)).collect();

		for candidate in fused.iter_mut() {
			if let Some(entry) = by_id.remove(&candidate.entry.id) {
				candidate.entry = entry;
			}
		}
	}
}
