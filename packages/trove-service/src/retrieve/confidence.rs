use super::{ConfidenceVerdict, RankedResult};

/// Flags the ranked head as uncertain when its best score is under `threshold` and nothing in it
/// comes from a trusted source. Read-only: never reorders.
pub fn gate(ranked: &[RankedResult], threshold: f32) -> ConfidenceVerdict {
	let top_score = top_score(ranked);
	let has_trusted = ranked.iter().any(|result| result.document.provenance.is_trusted());

	ConfidenceVerdict { is_low_confidence: top_score < threshold && !has_trusted, top_score }
}

/// Verdict for results that could not be scored.
pub fn forced_low(ranked: &[RankedResult]) -> ConfidenceVerdict {
	ConfidenceVerdict { is_low_confidence: true, top_score: top_score(ranked) }
}

fn top_score(ranked: &[RankedResult]) -> f32 {
	ranked.first().map(|result| result.boosted_score).unwrap_or(0.0)
}
